//! Geometric primitives shared by the layout importer, the adjuster and the simulation setup.
//!
//! All lengths are in layout user units (µm for a conventional GDSII file).

pub type Vector2 = nalgebra::Vector2<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;

/// An axis-aligned box of interest: a source, a flux monitor or the computational cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub center: Vector3,
    pub size: Vector3,
}

impl Region {
    #[inline]
    pub fn new(center: Vector3, size: Vector3) -> Self {
        Self { center, size }
    }

    /// Creates the region spanning two opposite corners.
    #[inline]
    pub fn from_bounds(min: Vector3, max: Vector3) -> Self {
        Self {
            center: (min + max) / 2.0,
            size: max - min,
        }
    }

    #[inline]
    pub fn min(&self) -> Vector3 {
        self.center - self.size / 2.0
    }

    #[inline]
    pub fn max(&self) -> Vector3 {
        self.center + self.size / 2.0
    }

    #[inline]
    pub fn translate(&mut self, offset: &Vector3) {
        self.center += offset;
    }
}

/// A non-dispersive dielectric.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    /// Relative permittivity.
    pub epsilon: f64,
}

impl Material {
    #[inline]
    pub const fn dielectric(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Refractive index.
    #[inline]
    pub fn index(&self) -> f64 {
        self.epsilon.sqrt()
    }
}

/// A layout polygon extruded along z.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtrudedSolid {
    /// Polygon vertices at `z_min`, without a repeated closing vertex.
    pub vertices: Vec<Vector3>,
    /// Vertex centroid in x/y, midway through the extrusion in z.
    pub center: Vector3,
    pub z_min: f64,
    pub z_max: f64,
    pub material: Material,
}

impl ExtrudedSolid {
    /// Extrudes a closed 2D polygon between `z_min` and `z_max`.
    pub fn extrude(outline: &[Vector2], z_min: f64, z_max: f64, material: Material) -> Self {
        let vertices = outline
            .iter()
            .map(|v| Vector3::new(v.x, v.y, z_min))
            .collect::<Vec<_>>();
        let centroid = outline.iter().fold(Vector2::zeros(), |acc, v| acc + v)
            / (outline.len().max(1) as f64);

        Self {
            vertices,
            center: Vector3::new(centroid.x, centroid.y, 0.5 * (z_min + z_max)),
            z_min,
            z_max,
            material,
        }
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.z_max - self.z_min
    }

    /// Moves the center and every vertex by `offset`.
    pub fn translate(&mut self, offset: &Vector3) {
        self.center += offset;
        for vertex in self.vertices.iter_mut() {
            *vertex += offset;
        }
    }
}

/// A rectangular solid.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub center: Vector3,
    pub size: Vector3,
    pub material: Material,
}

/// Anything that can be placed in the simulation cell.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometricObject {
    Prism(ExtrudedSolid),
    Block(Block),
}

impl From<ExtrudedSolid> for GeometricObject {
    fn from(solid: ExtrudedSolid) -> Self {
        GeometricObject::Prism(solid)
    }
}

impl From<Block> for GeometricObject {
    fn from(block: Block) -> Self {
        GeometricObject::Block(block)
    }
}

/// Which coupler branch an entity follows when the separation changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Upper,
    Lower,
    /// Does not move.
    Fixed,
}

impl Side {
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Side::Upper => 1.0,
            Side::Lower => -1.0,
            Side::Fixed => 0.0,
        }
    }
}

/// A region tagged with the branch it follows.
#[derive(Clone, Debug, PartialEq)]
pub struct SidedRegion {
    pub side: Side,
    pub region: Region,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn region_bounds() {
        let region = Region::from_bounds(Vector3::new(-1.0, 0.5, 0.0), Vector3::new(3.0, 1.5, 0.0));

        assert_eq!(region.center, Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(region.size, Vector3::new(4.0, 1.0, 0.0));
        assert_eq!(region.min(), Vector3::new(-1.0, 0.5, 0.0));
        assert_eq!(region.max(), Vector3::new(3.0, 1.5, 0.0));
    }

    #[test]
    fn extrusion_centroid() {
        let outline = [
            Vector2::new(0.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 1.0),
            Vector2::new(0.0, 1.0),
        ];
        let solid = ExtrudedSolid::extrude(&outline, -0.11, 0.11, Material::dielectric(12.0));

        assert_eq!(solid.vertices.len(), 4);
        assert!(solid.vertices.iter().all(|v| v.z == -0.11));
        assert_relative_eq!(solid.center.x, 1.0);
        assert_relative_eq!(solid.center.y, 0.5);
        assert_relative_eq!(solid.center.z, 0.0);
        assert_relative_eq!(solid.height(), 0.22);
        assert_relative_eq!(solid.material.index(), 12f64.sqrt());
    }
}

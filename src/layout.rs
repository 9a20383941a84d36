//! GDSII layout import.
//!
//! A [`Layout`] flattens the cell hierarchy of a GDSII file into per-layer polygons, from which
//! bounding [`Region`]s and [`ExtrudedSolid`]s are extracted.

mod import;
mod roles;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::Error;
use crate::geometry::{ExtrudedSolid, Material, Region, Vector2, Vector3};

pub use import::Polygon;
pub use roles::{LayerMap, LayerRole};

/// A flattened GDSII layout.
#[derive(Clone, Debug)]
pub struct Layout {
    path: PathBuf,
    polygons: BTreeMap<i16, Vec<Polygon>>,
}

impl Layout {
    /// Reads and flattens the layout file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let lib = gds21::GdsLibrary::load(path).map_err(|err| Error::FileFormat {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let layout = Self::from_library(&lib, path)?;

        tracing::info!(
            path = %path.display(),
            structs = lib.structs.len(),
            layers = layout.polygons.len(),
            "loaded layout"
        );
        Ok(layout)
    }

    /// Flattens an in-memory library. `path` only labels errors.
    pub fn from_library(lib: &gds21::GdsLibrary, path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let polygons = import::Flattener::new(lib, path).flatten(lib)?;
        for (layer, polys) in polygons.iter() {
            tracing::debug!(layer, polygons = polys.len(), "flattened layer");
        }

        Ok(Self {
            path: path.to_path_buf(),
            polygons,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Layers holding at least one polygon, in ascending order.
    pub fn layers(&self) -> impl Iterator<Item = i16> + '_ {
        self.polygons.keys().copied()
    }

    /// Polygons on `layer` in traversal order; empty if the layer holds none.
    pub fn polygons(&self, layer: i16) -> &[Polygon] {
        self.polygons.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bounding box of everything on `layer`.
    pub fn bounds(&self, layer: i16) -> Result<(Vector2, Vector2), Error> {
        self.polygons(layer)
            .iter()
            .filter_map(Polygon::bounds)
            .reduce(|(lo, hi), (l, h)| (lo.inf(&l), hi.sup(&h)))
            .ok_or_else(|| self.layer_not_found(layer))
    }

    /// The bounding box of `layer`, spanning `[z_min, z_max]` vertically.
    pub fn region(&self, layer: i16, z_min: f64, z_max: f64) -> Result<Region, Error> {
        check_extrusion(z_min, z_max)?;
        let (lo, hi) = self.bounds(layer)?;

        Ok(Region::from_bounds(
            Vector3::new(lo.x, lo.y, z_min),
            Vector3::new(hi.x, hi.y, z_max),
        ))
    }

    /// One solid of `material` per polygon on `layer`, extruded over `[z_min, z_max]`.
    pub fn solids(
        &self,
        material: Material,
        layer: i16,
        z_min: f64,
        z_max: f64,
    ) -> Result<Vec<ExtrudedSolid>, Error> {
        check_extrusion(z_min, z_max)?;
        let polygons = self.polygons(layer);
        if polygons.is_empty() {
            return Err(self.layer_not_found(layer));
        }

        Ok(polygons
            .iter()
            .map(|p| ExtrudedSolid::extrude(&p.vertices, z_min, z_max, material))
            .collect())
    }

    fn layer_not_found(&self, layer: i16) -> Error {
        Error::LayerNotFound {
            layer,
            path: self.path.clone(),
        }
    }
}

/// Reads `layout_file` and returns the bounding region of `layer` over `[z_min, z_max]`.
pub fn extract_region(
    layout_file: impl AsRef<Path>,
    layer: i16,
    z_min: f64,
    z_max: f64,
) -> Result<Region, Error> {
    Layout::open(layout_file)?.region(layer, z_min, z_max)
}

/// Reads `layout_file` and extrudes every polygon on `layer` over `[z_min, z_max]`.
pub fn extract_solids(
    material: Material,
    layout_file: impl AsRef<Path>,
    layer: i16,
    z_min: f64,
    z_max: f64,
) -> Result<Vec<ExtrudedSolid>, Error> {
    Layout::open(layout_file)?.solids(material, layer, z_min, z_max)
}

fn check_extrusion(z_min: f64, z_max: f64) -> Result<(), Error> {
    if !(z_min.is_finite() && z_max.is_finite()) || z_min > z_max {
        return Err(Error::Geometry(format!(
            "invalid extrusion range [{}, {}]",
            z_min, z_max,
        )));
    }
    Ok(())
}

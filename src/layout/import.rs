use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use nalgebra::Matrix2;
use tracing::{span, Level};

use crate::Error;
use crate::geometry::Vector2;

/// A flattened layout polygon in user units, without a repeated closing vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Vector2>,
}

impl Polygon {
    /// Lower-left and upper-right corners of the bounding box.
    pub fn bounds(&self) -> Option<(Vector2, Vector2)> {
        let first = self.vertices.first()?;
        Some(self.vertices.iter().fold((*first, *first), |(lo, hi), v| {
            (lo.inf(v), hi.sup(v))
        }))
    }
}

/// Placement of a structure inside its parent, in database units.
///
/// Kept as STRANS components rather than a matrix so that absolute magnification and
/// absolute angle can drop the parent's scale or rotation when composed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Placement {
    reflected: bool,
    mag: f64,
    /// Counter-clockwise, in degrees.
    angle: f64,
    offset: Vector2,
    abs_mag: bool,
    abs_angle: bool,
}

impl Placement {
    pub(crate) fn identity() -> Self {
        Self {
            reflected: false,
            mag: 1.0,
            angle: 0.0,
            offset: Vector2::zeros(),
            abs_mag: false,
            abs_angle: false,
        }
    }

    /// GDSII STRANS order: reflect about x, magnify, rotate, then translate to `origin`.
    pub(crate) fn from_strans(origin: Vector2, strans: Option<&gds21::GdsStrans>) -> Self {
        match strans {
            Some(s) => Self {
                reflected: s.reflected,
                mag: s.mag.unwrap_or(1.0),
                angle: s.angle.unwrap_or(0.0),
                offset: origin,
                abs_mag: s.abs_mag,
                abs_angle: s.abs_angle,
            },
            None => Self {
                offset: origin,
                ..Self::identity()
            },
        }
    }

    /// Composes `self` (a child placement) into `parent`.
    pub(crate) fn within(&self, parent: &Placement) -> Self {
        // reflection about x flips the sense of any rotation applied before it
        let angle = if self.abs_angle {
            self.angle
        } else if parent.reflected {
            parent.angle - self.angle
        } else {
            parent.angle + self.angle
        };
        Self {
            reflected: parent.reflected != self.reflected,
            mag: if self.abs_mag { self.mag } else { parent.mag * self.mag },
            angle,
            offset: parent.apply(self.offset),
            abs_mag: false,
            abs_angle: false,
        }
    }

    fn linear(&self) -> Matrix2<f64> {
        let reflect = if self.reflected {
            Matrix2::new(1.0, 0.0, 0.0, -1.0)
        } else {
            Matrix2::identity()
        };
        let (sin, cos) = sin_cos_degrees(self.angle);
        Matrix2::new(cos, -sin, sin, cos) * reflect * self.mag
    }

    pub(crate) fn apply(&self, point: Vector2) -> Vector2 {
        self.linear() * point + self.offset
    }
}

// exact for the right angles that make up nearly every real layout
fn sin_cos_degrees(angle: f64) -> (f64, f64) {
    let quarter = angle / 90.0;
    if quarter.fract() == 0.0 {
        match (quarter as i64).rem_euclid(4) {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        }
    } else {
        angle.to_radians().sin_cos()
    }
}

/// Outline of a path of the given half width, with mitred joins.
///
/// `begin_ext` and `end_ext` lengthen the first and last segments. Returns `None`
/// for paths with fewer than two distinct points or which fold back on themselves.
pub(crate) fn path_outline(
    points: &[Vector2],
    half_width: f64,
    begin_ext: f64,
    end_ext: f64,
) -> Option<Vec<Vector2>> {
    let mut pts: Vec<Vector2> = Vec::with_capacity(points.len());
    for p in points {
        if pts.last() != Some(p) {
            pts.push(*p);
        }
    }
    if pts.len() < 2 {
        return None;
    }

    let dirs = pts
        .windows(2)
        .map(|w| (w[1] - w[0]).normalize())
        .collect::<Vec<_>>();
    let normal = |d: &Vector2| Vector2::new(-d.y, d.x);

    let last = pts.len() - 1;
    pts[0] -= dirs[0] * begin_ext;
    pts[last] += dirs[last - 1] * end_ext;

    let mut offsets = Vec::with_capacity(pts.len());
    offsets.push(normal(&dirs[0]) * half_width);
    for pair in dirs.windows(2) {
        let (n1, n2) = (normal(&pair[0]), normal(&pair[1]));
        let bisector = n1 + n2;
        if bisector.norm() < 1e-12 {
            return None;
        }
        let bisector = bisector.normalize();
        offsets.push(bisector * (half_width / bisector.dot(&n1)));
    }
    offsets.push(normal(&dirs[last - 1]) * half_width);

    let mut outline = pts
        .iter()
        .zip(offsets.iter())
        .map(|(p, o)| p + o)
        .collect::<Vec<_>>();
    outline.extend(pts.iter().zip(offsets.iter()).rev().map(|(p, o)| p - o));
    Some(outline)
}

/// Flattens a GDSII library into per-layer polygons in user units.
pub(crate) struct Flattener<'a> {
    structs: HashMap<&'a str, &'a gds21::GdsStruct>,
    path: &'a Path,
    scale: f64,
    stack: Vec<&'a str>,
    polygons: BTreeMap<i16, Vec<Polygon>>,
}

impl<'a> Flattener<'a> {
    pub(crate) fn new(lib: &'a gds21::GdsLibrary, path: &'a Path) -> Self {
        Self {
            structs: lib.structs.iter().map(|s| (s.name.as_str(), s)).collect(),
            path,
            // the UNITS record's first value: one database unit in user units
            scale: lib.units.db_unit() * lib.units.user_unit(),
            stack: Vec::new(),
            polygons: BTreeMap::new(),
        }
    }

    /// Walks every top-level structure (one referenced by no other) in file order.
    pub(crate) fn flatten(
        mut self,
        lib: &'a gds21::GdsLibrary,
    ) -> Result<BTreeMap<i16, Vec<Polygon>>, Error> {
        let mut referenced = HashSet::new();
        for strukt in &lib.structs {
            for elem in &strukt.elems {
                use gds21::GdsElement::*;
                match elem {
                    GdsStructRef(ref x) => referenced.insert(x.name.as_str()),
                    GdsArrayRef(ref x) => referenced.insert(x.name.as_str()),
                    _ => false,
                };
            }
        }
        let tops = lib
            .structs
            .iter()
            .filter(|s| !referenced.contains(s.name.as_str()))
            .collect::<Vec<_>>();
        if tops.is_empty() && !lib.structs.is_empty() {
            return Err(self.fail("every structure is referenced by another (reference cycle)"));
        }

        for strukt in tops {
            self.walk(strukt, &Placement::identity())?;
        }
        Ok(self.polygons)
    }

    fn walk(&mut self, strukt: &'a gds21::GdsStruct, placement: &Placement) -> Result<(), Error> {
        let span = span!(Level::DEBUG, "struct", name = %strukt.name);
        let _guard = span.enter();

        if self.stack.contains(&strukt.name.as_str()) {
            return Err(self.fail(&format!("reference cycle through `{}`", strukt.name)));
        }
        self.stack.push(strukt.name.as_str());

        for elem in &strukt.elems {
            use gds21::GdsElement::*;
            match elem {
                GdsBoundary(ref x) => self.add_boundary(x, placement)?,
                GdsBox(ref x) => {
                    let pts = x.xy.iter().map(point).collect::<Vec<_>>();
                    self.add_rect(x.layer, &pts, placement);
                }
                GdsPath(ref x) => self.add_path(x, placement),
                GdsStructRef(ref x) => {
                    let child = self.lookup(&x.name)?;
                    let inner = Placement::from_strans(point(&x.xy), x.strans.as_ref())
                        .within(placement);
                    self.walk(child, &inner)?;
                }
                GdsArrayRef(ref x) => {
                    let child = self.lookup(&x.name)?;
                    let cols = i32::from(x.cols);
                    let rows = i32::from(x.rows);
                    if cols <= 0 || rows <= 0 {
                        return Err(self.fail(&format!(
                            "array of `{}` has {} columns and {} rows",
                            x.name, cols, rows,
                        )));
                    }
                    let origin = point(&x.xy[0]);
                    let col_step = (point(&x.xy[1]) - origin) / f64::from(cols);
                    let row_step = (point(&x.xy[2]) - origin) / f64::from(rows);
                    for col in 0..cols {
                        for row in 0..rows {
                            let at = origin + col_step * f64::from(col) + row_step * f64::from(row);
                            let inner = Placement::from_strans(at, x.strans.as_ref())
                                .within(placement);
                            self.walk(child, &inner)?;
                        }
                    }
                }
                other => tracing::debug!(?other, "ignoring non-geometric element"),
            }
        }

        self.stack.pop();
        Ok(())
    }

    fn add_boundary(&mut self, x: &gds21::GdsBoundary, placement: &Placement) -> Result<(), Error> {
        let mut pts = x.xy.iter().map(point).collect::<Vec<_>>();
        if pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        if pts.len() < 3 {
            return Err(self.fail(&format!(
                "boundary on layer {} has {} vertices",
                x.layer,
                pts.len(),
            )));
        }
        self.push(x.layer, &pts, placement);
        Ok(())
    }

    fn add_rect(&mut self, layer: i16, pts: &[Vector2], placement: &Placement) {
        let Some((lo, hi)) = (Polygon { vertices: pts.to_vec() }).bounds() else {
            return;
        };
        let corners = [lo, Vector2::new(hi.x, lo.y), hi, Vector2::new(lo.x, hi.y)];
        self.push(layer, &corners, placement);
    }

    fn add_path(&mut self, x: &gds21::GdsPath, placement: &Placement) {
        let pts = x.xy.iter().map(point).collect::<Vec<_>>();
        let width = f64::from(x.width.unwrap_or(0).abs());
        let (begin_ext, end_ext) = match x.path_type.unwrap_or(0) {
            0 => (0.0, 0.0),
            1 => {
                tracing::warn!(layer = x.layer, "approximating round path ends as square");
                (width / 2.0, width / 2.0)
            }
            2 => (width / 2.0, width / 2.0),
            _ => (
                f64::from(x.begin_extn.unwrap_or(0)),
                f64::from(x.end_extn.unwrap_or(0)),
            ),
        };
        if width == 0.0 {
            tracing::debug!(layer = x.layer, "ignoring zero-width path");
            return;
        }

        match path_outline(&pts, width / 2.0, begin_ext, end_ext) {
            Some(outline) => self.push(x.layer, &outline, placement),
            None => tracing::debug!(layer = x.layer, "ignoring degenerate path"),
        }
    }

    fn push(&mut self, layer: i16, pts: &[Vector2], placement: &Placement) {
        let vertices = pts
            .iter()
            .map(|p| placement.apply(*p) * self.scale)
            .collect::<Vec<_>>();
        self.polygons
            .entry(layer)
            .or_default()
            .push(Polygon { vertices });
    }

    fn lookup(&self, name: &str) -> Result<&'a gds21::GdsStruct, Error> {
        self.structs
            .get(name)
            .copied()
            .ok_or_else(|| self.fail(&format!("reference to undefined structure `{}`", name)))
    }

    fn fail(&self, reason: &str) -> Error {
        Error::FileFormat {
            path: self.path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

fn point(p: &gds21::GdsPoint) -> Vector2 {
    Vector2::new(f64::from(p.x), f64::from(p.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn placement_rotates_then_translates() {
        let strans = gds21::GdsStrans {
            angle: Some(90.0),
            ..Default::default()
        };
        let placement = Placement::from_strans(Vector2::new(10.0, 0.0), Some(&strans));

        assert_eq!(placement.apply(Vector2::new(1.0, 0.0)), Vector2::new(10.0, 1.0));
    }

    #[test]
    fn placement_reflects_before_rotating() {
        let strans = gds21::GdsStrans {
            reflected: true,
            angle: Some(90.0),
            ..Default::default()
        };
        let placement = Placement::from_strans(Vector2::zeros(), Some(&strans));

        // (0, 1) -> reflect -> (0, -1) -> rotate 90 -> (1, 0)
        assert_eq!(placement.apply(Vector2::new(0.0, 1.0)), Vector2::new(1.0, 0.0));
    }

    #[test]
    fn nested_placements_compose() {
        let parent = Placement::from_strans(Vector2::new(100.0, 0.0), None);
        let strans = gds21::GdsStrans {
            mag: Some(2.0),
            ..Default::default()
        };
        let child = Placement::from_strans(Vector2::new(0.0, 5.0), Some(&strans)).within(&parent);

        assert_eq!(child.apply(Vector2::new(1.0, 1.0)), Vector2::new(102.0, 7.0));
    }

    #[test]
    fn absolute_magnification_ignores_parent_scale() {
        let parent = Placement::from_strans(
            Vector2::new(10.0, 0.0),
            Some(&gds21::GdsStrans {
                mag: Some(2.0),
                ..Default::default()
            }),
        );
        let child = Placement::from_strans(
            Vector2::new(1.0, 0.0),
            Some(&gds21::GdsStrans {
                abs_mag: true,
                angle: Some(90.0),
                ..Default::default()
            }),
        )
        .within(&parent);

        // origin scaled by the parent, shape at unit magnification
        assert_eq!(child.apply(Vector2::new(1.0, 0.0)), Vector2::new(12.0, 1.0));
    }

    #[test]
    fn absolute_angle_ignores_parent_rotation() {
        let parent = Placement::from_strans(
            Vector2::zeros(),
            Some(&gds21::GdsStrans {
                angle: Some(90.0),
                ..Default::default()
            }),
        );
        let absolute = Placement::from_strans(
            Vector2::new(0.0, 0.0),
            Some(&gds21::GdsStrans {
                abs_angle: true,
                ..Default::default()
            }),
        )
        .within(&parent);
        let relative = Placement::from_strans(Vector2::zeros(), None).within(&parent);

        assert_eq!(absolute.apply(Vector2::new(1.0, 0.0)), Vector2::new(1.0, 0.0));
        assert_eq!(relative.apply(Vector2::new(1.0, 0.0)), Vector2::new(0.0, 1.0));
    }

    #[test]
    fn rotation_under_reflected_parent() {
        let parent = Placement::from_strans(
            Vector2::zeros(),
            Some(&gds21::GdsStrans {
                reflected: true,
                ..Default::default()
            }),
        );
        let strans = gds21::GdsStrans {
            angle: Some(90.0),
            ..Default::default()
        };
        let child = Placement::from_strans(Vector2::zeros(), Some(&strans)).within(&parent);

        // rotate (1, 0) -> (0, 1), then mirror -> (0, -1)
        assert_eq!(child.apply(Vector2::new(1.0, 0.0)), Vector2::new(0.0, -1.0));
    }

    #[test]
    fn coordinates_scale_by_database_unit() {
        let mut top = gds21::GdsStruct::new("TOP");
        top.elems.push(
            gds21::GdsBoundary {
                layer: 1,
                datatype: 0,
                xy: vec![
                    gds21::GdsPoint::new(0, 0),
                    gds21::GdsPoint::new(8000, 0),
                    gds21::GdsPoint::new(8000, 2000),
                    gds21::GdsPoint::new(0, 0),
                ],
                ..Default::default()
            }
            .into(),
        );
        // 0.1 nm database unit, 1 µm user unit
        let mut lib = gds21::GdsLibrary::new("units");
        lib.units = gds21::GdsUnits::new(1e-4, 1e-10);
        lib.structs.push(top);

        let polygons = Flattener::new(&lib, Path::new("units.gds")).flatten(&lib).unwrap();
        let vertices = &polygons[&1][0].vertices;
        assert_eq!(vertices.len(), 3);
        assert_relative_eq!(vertices[1].x, 0.8, epsilon = 1e-12);
        assert_relative_eq!(vertices[2].y, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn straight_path_outline() {
        let pts = [Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0)];
        let outline = path_outline(&pts, 1.0, 0.0, 0.0).unwrap();

        assert_eq!(
            outline,
            vec![
                Vector2::new(0.0, 1.0),
                Vector2::new(10.0, 1.0),
                Vector2::new(10.0, -1.0),
                Vector2::new(0.0, -1.0),
            ]
        );
    }

    #[test]
    fn bent_path_is_mitred() {
        let pts = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
        ];
        let outline = path_outline(&pts, 1.0, 1.0, 0.0).unwrap();

        assert_eq!(outline.len(), 6);
        assert_relative_eq!(outline[0].x, -1.0);
        // outer corner of the bend
        assert_relative_eq!(outline[4].x, 11.0, epsilon = 1e-12);
        assert_relative_eq!(outline[4].y, -1.0, epsilon = 1e-12);
        // inner corner of the bend
        assert_relative_eq!(outline[1].x, 9.0, epsilon = 1e-12);
        assert_relative_eq!(outline[1].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn folded_path_is_rejected() {
        let pts = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(0.0, 0.0),
        ];
        assert!(path_outline(&pts, 1.0, 0.0, 0.0).is_none());
        assert!(path_outline(&pts[..1], 1.0, 0.0, 0.0).is_none());
    }
}

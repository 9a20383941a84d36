//! Symmetric displacement of the coupler branches to a requested separation.

use crate::Error;
use crate::geometry::{ExtrudedSolid, Region, Side, SidedRegion, Vector3};

/// A displacement of the two branches along y.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Displacement {
    /// How far the upper side moves; the lower side moves by the negative.
    pub delta_y: f64,
}

impl Displacement {
    #[inline]
    pub fn zero() -> Self {
        Self { delta_y: 0.0 }
    }

    /// Half the change in separation, so the midline between the branches stays put.
    #[inline]
    pub fn between(nominal_separation: f64, requested_separation: f64) -> Self {
        Self {
            delta_y: 0.5 * (requested_separation - nominal_separation),
        }
    }

    /// The offset applied to entities on `side`.
    #[inline]
    pub fn offset(&self, side: Side) -> Vector3 {
        Vector3::new(0.0, side.sign() * self.delta_y, 0.0)
    }
}

/// Moves the coupler branches from `nominal_separation` to `requested_separation`.
///
/// Upper solids and regions move by `+delta`, lower ones by `-delta` and the cell grows by
/// `2 |delta|` along y about its unchanged center, where `delta` is half the change in
/// separation. When the separations are equal nothing is touched. Inputs are validated
/// before anything is moved, so on error they are left as they were.
pub fn adjust(
    nominal_separation: f64,
    requested_separation: f64,
    upper_solids: &mut [ExtrudedSolid],
    lower_solids: &mut [ExtrudedSolid],
    regions: &mut [SidedRegion],
    cell: &mut Region,
) -> Result<Displacement, Error> {
    if requested_separation == nominal_separation {
        return Ok(Displacement::zero());
    }
    if !(nominal_separation.is_finite() && requested_separation.is_finite()) {
        return Err(Error::Geometry(format!(
            "cannot move branches from separation {} to {}",
            nominal_separation, requested_separation,
        )));
    }
    for solid in upper_solids.iter().chain(lower_solids.iter()) {
        check_solid(solid)?;
    }

    let displacement = Displacement::between(nominal_separation, requested_separation);
    tracing::debug!(
        nominal_separation,
        requested_separation,
        delta_y = displacement.delta_y,
        "displacing coupler branches"
    );

    let up = displacement.offset(Side::Upper);
    let down = displacement.offset(Side::Lower);
    for solid in upper_solids.iter_mut() {
        solid.translate(&up);
    }
    for solid in lower_solids.iter_mut() {
        solid.translate(&down);
    }
    for sided in regions.iter_mut() {
        sided.region.translate(&displacement.offset(sided.side));
    }
    cell.size.y += 2.0 * displacement.delta_y.abs();

    Ok(displacement)
}

fn check_solid(solid: &ExtrudedSolid) -> Result<(), Error> {
    if solid.vertices.len() < 3 {
        return Err(Error::Geometry(format!(
            "solid centered at ({}, {}) has {} vertices, expected at least 3",
            solid.center.x,
            solid.center.y,
            solid.vertices.len(),
        )));
    }
    let finite = solid.center.iter().all(|c| c.is_finite())
        && solid.vertices.iter().flat_map(|v| v.iter()).all(|c| c.is_finite());
    if !finite {
        return Err(Error::Geometry("solid has non-finite coordinates".to_string()));
    }
    Ok(())
}

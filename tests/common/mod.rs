//! GDSII fixtures written with `gds21`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use gds21::{GdsBoundary, GdsLibrary, GdsPath, GdsPoint, GdsStruct, GdsStructRef, GdsUnits};

/// Converts µm to the fixture's 1 nm database unit.
pub fn nm(um: f64) -> i32 {
    (um * 1000.0).round() as i32
}

pub fn rect(layer: i16, x0: f64, y0: f64, x1: f64, y1: f64) -> GdsBoundary {
    GdsBoundary {
        layer,
        datatype: 0,
        xy: vec![
            GdsPoint::new(nm(x0), nm(y0)),
            GdsPoint::new(nm(x1), nm(y0)),
            GdsPoint::new(nm(x1), nm(y1)),
            GdsPoint::new(nm(x0), nm(y1)),
            GdsPoint::new(nm(x0), nm(y0)),
        ],
        ..Default::default()
    }
}

pub fn library(structs: Vec<GdsStruct>) -> GdsLibrary {
    let mut lib = GdsLibrary::new("fixture");
    lib.units = GdsUnits::new(1e-3, 1e-9);
    lib.structs = structs;
    lib
}

pub fn save(lib: &GdsLibrary, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    lib.save(&path).unwrap();
    path
}

/// A two-branch coupler drawn at 0.3 µm separation.
///
/// Branch centerlines and port centers sit at y = ±0.15. Ports 3 and 4 live in a
/// sub-structure placed by reference at x = 7, and the upper branch ends in a path.
pub fn coupler_library() -> GdsLibrary {
    let mut right_ports = GdsStruct::new("RIGHT_PORTS");
    right_ports.elems.push(rect(3, -0.05, -0.85, 0.05, 1.15).into());
    right_ports.elems.push(rect(4, -0.05, -1.15, 0.05, 0.85).into());

    let mut top = GdsStruct::new("COUPLER");
    top.elems.push(rect(0, -8.0, -4.0, 8.0, 4.0).into());
    top.elems.push(rect(1, -7.05, -0.85, -6.95, 1.15).into());
    top.elems.push(rect(2, -7.05, -1.15, -6.95, 0.85).into());
    top.elems.push(rect(5, -6.55, -0.85, -6.45, 1.15).into());
    top.elems.push(rect(31, -7.5, 0.05, 6.0, 0.25).into());
    top.elems.push(
        GdsPath {
            layer: 31,
            datatype: 0,
            xy: vec![GdsPoint::new(nm(6.0), nm(0.15)), GdsPoint::new(nm(7.5), nm(0.15))],
            width: Some(nm(0.2)),
            ..Default::default()
        }
        .into(),
    );
    top.elems.push(rect(32, -7.5, -0.25, 7.5, -0.05).into());
    top.elems.push(
        GdsStructRef {
            name: "RIGHT_PORTS".to_string(),
            xy: GdsPoint::new(nm(7.0), 0),
            ..Default::default()
        }
        .into(),
    );

    library(vec![right_ports, top])
}

pub fn write_coupler(dir: &Path) -> PathBuf {
    save(&coupler_library(), dir, "coupler.gds")
}

use std::path::PathBuf;

use clap::Parser;
use coupler::geometry::GeometricObject;
use coupler::prelude::*;
use gds21::{GdsBoundary, GdsLibrary, GdsPoint, GdsStruct, GdsUnits};
use tracing_subscriber::EnvFilter;

/// Loads a directional coupler layout and prints the simulation it describes.
#[derive(Parser)]
#[command(name = "coupler")]
struct Cli {
    /// GDSII layout file
    #[arg(long, default_value = "coupler.gds")]
    gds: PathBuf,

    /// Branch separation (µm)
    #[arg(short = 'd', long, default_value_t = 0.3)]
    separation: f64,

    /// Pixels per µm
    #[arg(short, long, default_value_t = 25.0)]
    resolution: f64,

    /// Extrude the layout into a 3D silicon-on-oxide stack
    #[arg(long)]
    three_d: bool,

    /// Write a sample coupler layout to `--gds` before loading it
    #[arg(long)]
    generate: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    if cli.generate {
        sample_layout().save(&cli.gds)?;
    }

    let config = CouplerConfig::new(CouplerParameters {
        layout_file: cli.gds,
        separation: cli.separation,
        resolution: cli.resolution,
        three_d: cli.three_d,
    })?;
    let geometry = CouplerGeometry::load(&config)?;
    let setup = geometry.setup(&config);

    // frequencies are in units of c / 1 µm
    let to_thz = physical_constants::SPEED_OF_LIGHT_IN_VACUUM / 1e-6 / 1e12;
    let prisms = setup
        .geometry
        .iter()
        .filter(|g| matches!(g, GeometricObject::Prism(_)))
        .count();

    println!(
        "\n-- Coupler Setup --\n\
        separation:   {:.3} µm (Δy = {:+.3} µm)\n\
        cell:         {:.2} x {:.2} x {:.2} µm\n\
        prisms:       {}\n\
        substrate:    {}\n\
        band:         {:.1} - {:.1} THz ({} points)\n",
        config.separation(),
        geometry.displacement().delta_y,
        setup.cell.size.x,
        setup.cell.size.y,
        setup.cell.size.z,
        prisms,
        if geometry.substrate().is_some() { "oxide" } else { "none" },
        setup.band.fmin() * to_thz,
        setup.band.fmax() * to_thz,
        setup.band.nfreq,
    );
    println!(
        "source:       center ({:.3}, {:.3}), size ({:.3}, {:.3})",
        setup.source.region.center.x,
        setup.source.region.center.y,
        setup.source.region.size.x,
        setup.source.region.size.y,
    );
    for monitor in &setup.monitors {
        println!(
            "port {}:       center ({:.3}, {:.3}), size ({:.3}, {:.3})",
            monitor.port,
            monitor.region.center.x,
            monitor.region.center.y,
            monitor.region.size.x,
            monitor.region.size.y,
        );
    }

    Ok(())
}

/// Two parallel waveguides at 0.3 µm separation inside a 16 x 8 µm cell.
fn sample_layout() -> GdsLibrary {
    let rect = |layer: i16, x0: i32, y0: i32, x1: i32, y1: i32| -> gds21::GdsElement {
        GdsBoundary {
            layer,
            datatype: 0,
            xy: vec![
                GdsPoint::new(x0, y0),
                GdsPoint::new(x1, y0),
                GdsPoint::new(x1, y1),
                GdsPoint::new(x0, y1),
                GdsPoint::new(x0, y0),
            ],
            ..Default::default()
        }
        .into()
    };

    // nm
    let mut top = GdsStruct::new("COUPLER");
    top.elems.push(rect(0, -8000, -4000, 8000, 4000));
    top.elems.push(rect(1, -7050, -850, -6950, 1150));
    top.elems.push(rect(2, -7050, -1150, -6950, 850));
    top.elems.push(rect(3, 6950, -850, 7050, 1150));
    top.elems.push(rect(4, 6950, -1150, 7050, 850));
    top.elems.push(rect(5, -6550, -850, -6450, 1150));
    top.elems.push(rect(31, -7500, 50, 7500, 250));
    top.elems.push(rect(32, -7500, -250, 7500, -50));

    let mut lib = GdsLibrary::new("coupler");
    lib.units = GdsUnits::new(1e-3, 1e-9);
    lib.structs.push(top);
    lib
}

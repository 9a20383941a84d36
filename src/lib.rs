//! A framework for setting up flux simulations of photonic directional couplers from GDSII layouts.
//!
//! Geometry is read from a layout file, displaced to a requested branch separation and handed,
//! together with a source and per-port flux monitors, to a [`FluxSolver`].
//!
//! To get started, refer to the `demos` directory in the main repository.

mod simulation;

pub mod adjust;
pub mod config;
pub mod coupler;
pub mod geometry;
pub mod layout;
pub mod prelude;
pub mod spectra;

use std::path::PathBuf;

pub use simulation::{
    DecayCriterion, EigenmodeSource, FieldComponent, FluxMonitor, FrequencyBand, Parity,
    RunDescriptor, Simulation, SimulationDescriptor, SimulationSetup,
};
pub use spectra::{FluxSpectra, SaveSettings, SaveType};

/// Represents an error in the layout import, the geometry or the simulation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No geometry on layer {layer} in layout file {}", path.display())]
    LayerNotFound {
        layer: i16,
        path: PathBuf,
    },
    #[error("Layout file {} could not be read: {reason}", path.display())]
    FileFormat {
        path: PathBuf,
        reason: String,
    },
    #[error("Malformed geometry: {0}")]
    Geometry(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Init {array_name} array does not have expected length \
        ( {array_name} array length: {input_length}, \
        expected length: {expected_length} )")]
    BadInit {
        array_name: String,
        input_length: usize,
        expected_length: usize,
    },
    #[error("There was an error during computation: {0}")]
    ComputationError(String),
    #[error("Run `{0}` already exists in the save file")]
    DuplicateRun(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    H5Error(#[from] hdf5::Error),
}

/// Computes per-monitor flux spectra for a fully described simulation.
///
/// Implemented by an external field solver.
pub trait FluxSolver {
    /// Runs the simulation to its stop condition and returns one flux column per monitor.
    fn solve(&mut self, desc: SolveDescriptor) -> Result<FluxSpectra, Error>;
}

/// Describes how a `FluxSolver` should do computations.
pub struct SolveDescriptor<'a> {
    pub setup: &'a SimulationSetup,
    pub bar: &'a Option<indicatif::ProgressBar>,
}

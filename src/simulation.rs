use std::path::Path;

use crate::{Error, FluxSolver, FluxSpectra, SaveSettings, SolveDescriptor};
use crate::geometry::{GeometricObject, Region, Vector3};

/// The band of frequencies sourced and monitored.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrequencyBand {
    /// Center frequency.
    pub fcen: f64,
    /// Full width of the band.
    pub df: f64,
    /// Number of monitored frequencies.
    pub nfreq: usize,
}

impl FrequencyBand {
    /// A band centered on `1 / wavelength`, `relative_width` of the center frequency wide.
    pub fn from_wavelength(wavelength: f64, relative_width: f64, nfreq: usize) -> Self {
        let fcen = wavelength.recip();
        Self {
            fcen,
            df: relative_width * fcen,
            nfreq,
        }
    }

    #[inline]
    pub fn fmin(&self) -> f64 {
        self.fcen - 0.5 * self.df
    }

    #[inline]
    pub fn fmax(&self) -> f64 {
        self.fcen + 0.5 * self.df
    }

    /// `nfreq` equally spaced frequencies spanning `[fmin, fmax]`.
    pub fn frequencies(&self) -> ndarray::Array1<f64> {
        if self.nfreq == 1 {
            ndarray::arr1(&[self.fcen])
        } else {
            ndarray::Array1::linspace(self.fmin(), self.fmax(), self.nfreq)
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if !(self.fcen.is_finite() && self.fcen > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "center frequency must be positive, got {}",
                self.fcen,
            )));
        }
        if !(self.df.is_finite() && self.df >= 0.0 && self.fmin() > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "band width {} does not fit below center frequency {}",
                self.df, self.fcen,
            )));
        }
        if self.nfreq == 0 {
            return Err(Error::InvalidConfig("at least one frequency must be monitored".to_string()));
        }
        Ok(())
    }
}

/// Mirror symmetry imposed on the source mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parity {
    None,
    /// Even under y mirroring, odd under z mirroring (TE-like in 2D).
    EvenYOddZ,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldComponent {
    Ex,
    Ey,
    Ez,
    Hx,
    Hy,
    Hz,
}

/// An eigenmode source launched across a region.
#[derive(Clone, Debug, PartialEq)]
pub struct EigenmodeSource {
    pub region: Region,
    /// Mode number, counting from 1.
    pub eig_band: usize,
    pub parity: Parity,
}

/// A flux plane over one port.
#[derive(Clone, Debug, PartialEq)]
pub struct FluxMonitor {
    pub port: usize,
    pub region: Region,
}

/// Stop once `component` at `point` has decayed by `decay_by` from its peak,
/// checked every `interval` time units after the source has turned off.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecayCriterion {
    pub interval: f64,
    pub component: FieldComponent,
    pub point: Vector3,
    pub decay_by: f64,
}

/// Everything a [`FluxSolver`] needs to run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSetup {
    /// Pixels per unit length.
    pub resolution: f64,
    /// The computational cell, including boundary layers.
    pub cell: Region,
    /// Thickness of the absorbing layers on every face of the cell.
    pub pml_thickness: f64,
    /// Solids in placement order; later objects take precedence where they overlap.
    pub geometry: Vec<GeometricObject>,
    pub source: EigenmodeSource,
    /// Flux monitors, one per flux column of the result.
    pub monitors: Vec<FluxMonitor>,
    pub band: FrequencyBand,
    pub stop: DecayCriterion,
}

impl SimulationSetup {
    fn validate(&self) -> Result<(), Error> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "resolution must be positive, got {}",
                self.resolution,
            )));
        }
        if self.cell.size.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(Error::InvalidConfig(format!(
                "cell size ({}, {}, {}) is not a valid extent",
                self.cell.size.x, self.cell.size.y, self.cell.size.z,
            )));
        }
        if self.monitors.is_empty() {
            return Err(Error::InvalidConfig("no flux monitors to record".to_string()));
        }
        self.band.validate()
    }
}

/// Describes a simulation.
pub struct SimulationDescriptor<S: FluxSolver> {
    /// The `FluxSolver` for the simulation.
    pub solver: S,
    /// The cell, geometry, source and monitors to simulate.
    pub setup: SimulationSetup,
}

/// Describes a simulation run.
pub struct RunDescriptor<P: AsRef<Path>> {
    /// Whether or not to print information to the console.
    pub verbose: bool,
    /// Whether this process writes results. In a distributed run exactly one process should.
    pub primary: bool,
    /// What, if any, information to save to file.
    pub save_settings: Option<SaveSettings<P>>,
}

/// The main `struct` of the framework.
pub struct Simulation<S: FluxSolver> {
    solver: S,
    setup: SimulationSetup,
}

impl<S: FluxSolver> Simulation<S> {
    /// Creates a new `Simulation` instance.
    #[inline]
    pub fn new(desc: SimulationDescriptor<S>) -> Result<Self, Error> {
        desc.setup.validate()?;

        Ok(Self {
            solver: desc.solver,
            setup: desc.setup,
        })
    }

    pub fn setup(&self) -> &SimulationSetup {
        &self.setup
    }

    /// Does a computational run and returns the flux through every monitor.
    pub fn run<P: AsRef<Path>>(
        &mut self,
        desc: RunDescriptor<P>,
    ) -> Result<FluxSpectra, Error> {
        let nfreq = self.setup.band.nfreq;
        let nmonitors = self.setup.monitors.len();
        tracing::info!(
            resolution = self.setup.resolution,
            solids = self.setup.geometry.len(),
            monitors = nmonitors,
            nfreq,
            "starting flux simulation"
        );

        // a colliding save fails before the solve
        if let Some(ref settings) = desc.save_settings {
            if desc.primary {
                settings.check()?;
            }
        }

        // setup output if verbose
        let bar = if desc.verbose {
            println!("# of monitors: {}, # of frequencies: {}", nmonitors, nfreq);
            Some(indicatif::ProgressBar::new_spinner())
        } else {
            None
        };

        let spectra = self.solver.solve(SolveDescriptor {
            setup: &self.setup,
            bar: &bar,
        })?;

        if let Some(ref bar) = bar {
            bar.finish();
        }

        if spectra.nfreq() != nfreq {
            return Err(Error::BadInit {
                array_name: "Frequency".to_string(),
                input_length: spectra.nfreq(),
                expected_length: nfreq,
            });
        }
        if spectra.nmonitors() != nmonitors {
            return Err(Error::BadInit {
                array_name: "Flux".to_string(),
                input_length: spectra.nmonitors(),
                expected_length: nmonitors,
            });
        }

        // only the primary process touches the save file
        if let Some(ref settings) = desc.save_settings {
            if desc.primary {
                spectra.save(settings)?;
                tracing::info!(path = %settings.filename.as_ref().display(), "saved flux spectra");
            } else {
                tracing::debug!("not the primary process, skipping save");
            }
        }

        Ok(spectra)
    }
}

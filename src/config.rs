//! Run configuration, built once from command-line-equivalent inputs.

use std::path::{Path, PathBuf};

use crate::{Error, FrequencyBand};
use crate::geometry::Material;
use crate::layout::LayerMap;

/// Branch separation the default layout is drawn with.
pub const NOMINAL_SEPARATION: f64 = 0.3;

/// Inputs a user chooses per run.
#[derive(Clone, Debug, PartialEq)]
pub struct CouplerParameters {
    /// Path to the GDSII layout.
    pub layout_file: PathBuf,
    /// Requested branch separation.
    pub separation: f64,
    /// Pixels per unit length.
    pub resolution: f64,
    /// Extrude the layout into a 3D stack instead of simulating a 2D cross-section.
    pub three_d: bool,
}

impl Default for CouplerParameters {
    fn default() -> Self {
        Self {
            layout_file: PathBuf::from("coupler.gds"),
            separation: NOMINAL_SEPARATION,
            resolution: 25.0,
            three_d: false,
        }
    }
}

/// Vertical layer thicknesses of the 3D stack.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayerStack {
    pub oxide: f64,
    pub silicon: f64,
    pub air: f64,
    pub pml: f64,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self {
            oxide: 1.0,
            silicon: 0.22,
            air: 0.78,
            pml: 1.0,
        }
    }
}

impl LayerStack {
    /// Total cell height: oxide, silicon and air between two PML layers.
    #[inline]
    pub fn cell_thickness(&self) -> f64 {
        self.pml + self.oxide + self.silicon + self.air + self.pml
    }
}

/// A validated, immutable run configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct CouplerConfig {
    layout_file: PathBuf,
    separation: f64,
    nominal_separation: f64,
    resolution: f64,
    three_d: bool,
    stack: LayerStack,
    silicon: Material,
    oxide: Material,
    band: FrequencyBand,
    eig_band: usize,
    layers: LayerMap,
}

impl CouplerConfig {
    /// Creates a configuration with the default stack, materials, band and layer map.
    pub fn new(params: CouplerParameters) -> Result<Self, Error> {
        let config = Self {
            layout_file: params.layout_file,
            separation: params.separation,
            nominal_separation: NOMINAL_SEPARATION,
            resolution: params.resolution,
            three_d: params.three_d,
            stack: LayerStack::default(),
            silicon: Material::dielectric(12.0),
            oxide: Material::dielectric(2.25),
            band: FrequencyBand::from_wavelength(1.55, 0.2, 50),
            eig_band: 1,
            layers: LayerMap::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_layers(mut self, layers: LayerMap) -> Result<Self, Error> {
        self.layers = layers;
        self.validate()?;
        Ok(self)
    }

    pub fn with_stack(mut self, stack: LayerStack) -> Result<Self, Error> {
        self.stack = stack;
        self.validate()?;
        Ok(self)
    }

    pub fn with_band(mut self, band: FrequencyBand) -> Result<Self, Error> {
        self.band = band;
        self.validate()?;
        Ok(self)
    }

    /// Sets the separation the layout is drawn with.
    pub fn with_nominal_separation(mut self, nominal: f64) -> Result<Self, Error> {
        self.nominal_separation = nominal;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), Error> {
        positive("resolution", self.resolution)?;
        positive("separation", self.separation)?;
        positive("nominal separation", self.nominal_separation)?;
        positive("oxide thickness", self.stack.oxide)?;
        positive("silicon thickness", self.stack.silicon)?;
        positive("air thickness", self.stack.air)?;
        positive("PML thickness", self.stack.pml)?;
        self.band.validate()?;
        if self.eig_band == 0 {
            return Err(Error::InvalidConfig("eigenmode band index starts at 1".to_string()));
        }
        self.layers.validate()
    }

    pub fn layout_file(&self) -> &Path {
        &self.layout_file
    }

    pub fn separation(&self) -> f64 {
        self.separation
    }

    pub fn nominal_separation(&self) -> f64 {
        self.nominal_separation
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn three_d(&self) -> bool {
        self.three_d
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn silicon(&self) -> Material {
        self.silicon
    }

    pub fn oxide(&self) -> Material {
        self.oxide
    }

    pub fn band(&self) -> &FrequencyBand {
        &self.band
    }

    pub fn eig_band(&self) -> usize {
        self.eig_band
    }

    pub fn layers(&self) -> &LayerMap {
        &self.layers
    }

    /// Vertical extent of the cell; collapsed to the z = 0 plane in 2D.
    pub fn cell_z(&self) -> (f64, f64) {
        if self.three_d {
            let half = 0.5 * self.stack.cell_thickness();
            (-half, half)
        } else {
            (0.0, 0.0)
        }
    }

    /// Vertical extent of the silicon waveguides, ports and source.
    ///
    /// In 2D the waveguides are extruded well past the zero-thickness cell.
    pub fn silicon_z(&self) -> (f64, f64) {
        if self.three_d {
            let half = 0.5 * self.stack.silicon;
            (-half, half)
        } else {
            (-10.0, 10.0)
        }
    }
}

fn positive(name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{} must be positive, got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn two_d_extents() {
        let config = CouplerConfig::new(CouplerParameters::default()).unwrap();

        assert_eq!(config.cell_z(), (0.0, 0.0));
        assert_eq!(config.silicon_z(), (-10.0, 10.0));
        assert_eq!(config.layout_file(), Path::new("coupler.gds"));
        assert_eq!(config.separation(), config.nominal_separation());
    }

    #[test]
    fn three_d_extents() {
        let config = CouplerConfig::new(CouplerParameters {
            three_d: true,
            ..Default::default()
        })
        .unwrap();

        let (zmin, zmax) = config.cell_z();
        assert_relative_eq!(zmin, -2.0);
        assert_relative_eq!(zmax, 2.0);
        let (zmin, zmax) = config.silicon_z();
        assert_relative_eq!(zmin, -0.11);
        assert_relative_eq!(zmax, 0.11);
    }

    #[test]
    fn rejects_bad_inputs() {
        for params in [
            CouplerParameters { resolution: 0.0, ..Default::default() },
            CouplerParameters { separation: -0.1, ..Default::default() },
            CouplerParameters { separation: f64::NAN, ..Default::default() },
        ] {
            assert!(matches!(CouplerConfig::new(params), Err(Error::InvalidConfig(_))));
        }

        let config = CouplerConfig::new(CouplerParameters::default()).unwrap();
        assert!(config
            .clone()
            .with_stack(LayerStack { silicon: 0.0, ..Default::default() })
            .is_err());
        assert!(config.with_layers(LayerMap::new()).is_err());
    }
}

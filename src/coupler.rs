//! The directional coupler: geometry loaded from a layout and displaced to the requested
//! separation, and the simulation setup built from it.

use crate::{
    DecayCriterion, EigenmodeSource, Error, FieldComponent, FluxMonitor, Parity, SimulationSetup,
};
use crate::adjust::{adjust, Displacement};
use crate::config::CouplerConfig;
use crate::geometry::{Block, ExtrudedSolid, GeometricObject, Region, Side, SidedRegion, Vector3};
use crate::layout::Layout;

/// Port whose center is watched for field decay, when present.
const DECAY_PORT: usize = 3;

/// Coupler geometry at the configured separation.
#[derive(Clone, Debug, PartialEq)]
pub struct CouplerGeometry {
    cell: Region,
    upper_branch: Vec<ExtrudedSolid>,
    lower_branch: Vec<ExtrudedSolid>,
    /// The source region followed by one region per port.
    regions: Vec<SidedRegion>,
    /// Port index of each entry after the source in `regions`.
    port_indices: Vec<usize>,
    substrate: Option<Block>,
    displacement: Displacement,
}

impl CouplerGeometry {
    /// Reads the configured layout file and builds the geometry from it.
    pub fn load(config: &CouplerConfig) -> Result<Self, Error> {
        let layout = Layout::open(config.layout_file())?;
        Self::from_layout(&layout, config)
    }

    /// Extracts every layer named in the configured layer map, then displaces the branches.
    pub fn from_layout(layout: &Layout, config: &CouplerConfig) -> Result<Self, Error> {
        let layers = config.layers();
        let (si_zmin, si_zmax) = config.silicon_z();
        let (cell_zmin, cell_zmax) = config.cell_z();

        let mut upper_branch = Vec::new();
        for layer in layers.branch_layers(Side::Upper) {
            upper_branch.extend(layout.solids(config.silicon(), layer, si_zmin, si_zmax)?);
        }
        let mut lower_branch = Vec::new();
        for layer in layers.branch_layers(Side::Lower) {
            lower_branch.extend(layout.solids(config.silicon(), layer, si_zmin, si_zmax)?);
        }

        let cell_layer = layers
            .cell_layer()
            .ok_or_else(|| Error::InvalidConfig("layer map has no cell layer".to_string()))?;
        let mut cell = layout.region(cell_layer, cell_zmin, cell_zmax)?;

        let (source_layer, source_side) = layers
            .source()
            .ok_or_else(|| Error::InvalidConfig("layer map has no source layer".to_string()))?;
        let mut regions = vec![SidedRegion {
            side: source_side,
            region: layout.region(source_layer, si_zmin, si_zmax)?,
        }];
        let mut port_indices = Vec::new();
        for (layer, index, side) in layers.ports() {
            regions.push(SidedRegion {
                side,
                region: layout.region(layer, si_zmin, si_zmax)?,
            });
            port_indices.push(index);
        }

        let displacement = adjust(
            config.nominal_separation(),
            config.separation(),
            &mut upper_branch,
            &mut lower_branch,
            &mut regions,
            &mut cell,
        )?;

        // oxide fills the cell footprint below the silicon
        let substrate = config.three_d().then(|| {
            let oxide = config.stack().oxide;
            Block {
                center: Vector3::new(cell.center.x, cell.center.y, si_zmin - 0.5 * oxide),
                size: Vector3::new(cell.size.x, cell.size.y, oxide),
                material: config.oxide(),
            }
        });

        tracing::info!(
            upper = upper_branch.len(),
            lower = lower_branch.len(),
            ports = port_indices.len(),
            delta_y = displacement.delta_y,
            "built coupler geometry"
        );

        Ok(Self {
            cell,
            upper_branch,
            lower_branch,
            regions,
            port_indices,
            substrate,
            displacement,
        })
    }

    pub fn cell(&self) -> &Region {
        &self.cell
    }

    pub fn upper_branch(&self) -> &[ExtrudedSolid] {
        &self.upper_branch
    }

    pub fn lower_branch(&self) -> &[ExtrudedSolid] {
        &self.lower_branch
    }

    pub fn substrate(&self) -> Option<&Block> {
        self.substrate.as_ref()
    }

    pub fn displacement(&self) -> Displacement {
        self.displacement
    }

    pub fn source(&self) -> &SidedRegion {
        &self.regions[0]
    }

    /// `(port index, region)` pairs in ascending port order.
    pub fn ports(&self) -> impl Iterator<Item = (usize, &SidedRegion)> + '_ {
        self.port_indices.iter().copied().zip(self.regions[1..].iter())
    }

    pub fn port(&self, index: usize) -> Option<&SidedRegion> {
        self.ports().find(|(i, _)| *i == index).map(|(_, r)| r)
    }

    /// Substrate first, then the upper and lower branches, so the silicon wins where they touch.
    pub fn geometry(&self) -> Vec<GeometricObject> {
        self.substrate
            .iter()
            .cloned()
            .map(GeometricObject::from)
            .chain(self.upper_branch.iter().cloned().map(GeometricObject::from))
            .chain(self.lower_branch.iter().cloned().map(GeometricObject::from))
            .collect()
    }

    /// Builds the source, one flux monitor per port and the stop condition.
    pub fn setup(&self, config: &CouplerConfig) -> SimulationSetup {
        let monitors = self
            .ports()
            .map(|(port, sided)| FluxMonitor {
                port,
                region: sided.region.clone(),
            })
            .collect::<Vec<_>>();
        let decay_point = self
            .port(DECAY_PORT)
            .or_else(|| self.ports().last().map(|(_, r)| r))
            .map(|r| r.region.center)
            .unwrap_or(self.cell.center);

        SimulationSetup {
            resolution: config.resolution(),
            cell: self.cell.clone(),
            pml_thickness: config.stack().pml,
            geometry: self.geometry(),
            source: EigenmodeSource {
                region: self.source().region.clone(),
                eig_band: config.eig_band(),
                parity: if config.three_d() { Parity::None } else { Parity::EvenYOddZ },
            },
            monitors,
            band: *config.band(),
            stop: DecayCriterion {
                interval: 50.0,
                component: FieldComponent::Ey,
                point: decay_point,
                decay_by: 1e-8,
            },
        }
    }
}

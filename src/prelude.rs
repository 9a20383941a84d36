//! Includes commonly used library components.

pub use crate::{
    DecayCriterion,
    EigenmodeSource,
    Error,
    FieldComponent,
    FluxMonitor,
    FluxSolver,
    FluxSpectra,
    FrequencyBand,
    Parity,
    RunDescriptor,
    SaveSettings,
    SaveType,
    Simulation,
    SimulationDescriptor,
    SimulationSetup,
    SolveDescriptor,
};
pub use crate::config::{CouplerConfig, CouplerParameters};
pub use crate::coupler::CouplerGeometry;
pub use crate::geometry::{ExtrudedSolid, Material, Region, Side, SidedRegion, Vector3};
pub use crate::layout::{Layout, LayerMap, LayerRole};

// trkf_sim/src/prelude.rs

// Re-export the entire trkf_core prelude so the harness sees the fitter
// types directly.
pub use trkf_core::prelude::*;

// Simulation-specific types.
pub use crate::simulation::config::{
    ContainerKind, DetectorConfig, FitConfig, GeneratorConfig, ScenarioConfig,
};
pub use crate::simulation::error::{SimError, SimResult};
pub use crate::simulation::fitter::{FitOutcome, TrackFitter};
pub use crate::simulation::generator::{GeneratedEvent, TrackGenerator, TrueTrack};
pub use crate::simulation::detector::Detector;
pub use crate::simulation::runner::{run_scenario, ScenarioSummary};

// trkf_sim/src/simulation/config/mod.rs

//! This module handles loading, resolving, and validating scenario
//! configuration from disk.

mod catalog;

pub use catalog::discover_scenarios;

use crate::simulation::error::{SimError, SimResult};
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_3;
use std::path::Path;
use trkf_core::config::KalmanConfig;
use trkf_core::services::WirePlaneConfig;
use trkf_core::types::MUON_MASS;

// =========================================================================
// == Scenario ==
// =========================================================================

/// One complete, resolved scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub name: String,
    pub kalman: KalmanConfig,
    pub detector: DetectorConfig,
    pub generator: GeneratorConfig,
    pub fit: FitConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            kalman: KalmanConfig::default(),
            detector: DetectorConfig::default(),
            generator: GeneratorConfig::default(),
            fit: FitConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Built-in defaults overlaid with the TOML file at `path`.
    pub fn load(path: &Path) -> SimResult<Self> {
        if !path.is_file() {
            return Err(SimError::InvalidScenario(format!(
                "scenario file {} does not exist",
                path.display()
            )));
        }
        let config: ScenarioConfig = Figment::new()
            .merge(Serialized::defaults(ScenarioConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|source| SimError::Config {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.kalman.validate()?;
        self.detector.validate()?;
        self.generator.validate()?;
        if let Some(plane) = self.fit.only_plane {
            if plane as usize >= self.detector.planes.len() {
                return Err(SimError::InvalidScenario(format!(
                    "fit.only_plane {plane} does not exist"
                )));
            }
        }
        if !(self.fit.seed_momentum > 0.) {
            return Err(SimError::InvalidScenario(
                "fit.seed_momentum must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The resolved configuration as TOML.
    pub fn to_toml(&self) -> SimResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// --- Detector ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Lower corner of the active volume (cm).
    pub min: [f64; 3],
    /// Upper corner of the active volume (cm).
    pub max: [f64; 3],
    pub planes: Vec<WirePlaneConfig>,
    /// K.
    pub temperature: f64,
    /// kV/cm.
    pub efield: f64,
    /// ns per tick.
    pub sampling_rate: f64,
    /// ticks.
    pub trigger_offset: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let plane = |angle_to_vertical| WirePlaneConfig {
            angle_to_vertical,
            pitch: 0.3,
            x: 0.,
        };
        Self {
            min: [0., -50., 0.],
            max: [100., 50., 200.],
            planes: vec![plane(FRAC_PI_3), plane(-FRAC_PI_3), plane(0.)],
            temperature: 87.,
            efield: 0.5,
            sampling_rate: 500.,
            trigger_offset: 0.,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> SimResult<()> {
        if (0..3).any(|i| !(self.max[i] > self.min[i])) {
            return Err(SimError::InvalidScenario(
                "detector.max must exceed detector.min on every axis".to_string(),
            ));
        }
        if self.planes.is_empty() {
            return Err(SimError::InvalidScenario(
                "detector needs at least one wire plane".to_string(),
            ));
        }
        if self.planes.iter().any(|p| !(p.pitch > 0.)) {
            return Err(SimError::InvalidScenario(
                "wire pitch must be positive".to_string(),
            ));
        }
        if !(self.sampling_rate > 0.) || !(self.efield > 0.) {
            return Err(SimError::InvalidScenario(
                "sampling_rate and efield must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// --- Generator ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub events: usize,
    /// Particle mass (GeV/c^2).
    pub mass: f64,
    /// Momentum at the start point (GeV/c).
    pub momentum: f64,
    /// Start point (cm).
    pub start: [f64; 3],
    /// Direction of motion; normalized on use.
    pub direction: [f64; 3],
    /// Random spread (rad) applied to the direction of each event.
    pub direction_spread: f64,
    /// Gaussian smearing of the hit peak time (ticks).
    pub time_smearing: f64,
    /// Deposited charge per cm of track (ADC counts).
    pub charge_per_cm: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            events: 5,
            mass: MUON_MASS,
            momentum: 1.,
            start: [30., -10., 10.],
            direction: [0.2, 0.3, 1.],
            direction_spread: 0.05,
            time_smearing: 0.5,
            charge_per_cm: 250.,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> SimResult<()> {
        let norm2: f64 = self.direction.iter().map(|d| d * d).sum();
        if !(norm2 > 0.) {
            return Err(SimError::InvalidScenario(
                "generator.direction must be non-zero".to_string(),
            ));
        }
        if !(self.momentum > 0.) || !(self.mass > 0.) {
            return Err(SimError::InvalidScenario(
                "generator momentum and mass must be positive".to_string(),
            ));
        }
        if !(self.time_smearing > 0.) || self.direction_spread < 0. {
            return Err(SimError::InvalidScenario(
                "generator.time_smearing must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// --- Fit ---

/// Which measurement type the hits become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    #[default]
    WireX,
    WireLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    pub container: ContainerKind,
    /// Only hits on this plane are fitted.
    pub only_plane: Option<u32>,
    /// Momentum hypothesis (GeV/c) of the seed.
    pub seed_momentum: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            container: ContainerKind::WireX,
            only_plane: None,
            seed_momentum: 1.,
        }
    }
}

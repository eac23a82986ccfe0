// trkf_core/src/config.rs

//! Tunables for propagation and fitting.
//!
//! These structs are plain serde data so that a front end (the simulator, a
//! reconstruction job) can load them from whatever file format it likes.

use crate::error::{KalmanError, KalmanResult};
use serde::{Deserialize, Serialize};

/// `1 / max(|q/p|, 1e-3)`: momenta above this are treated as this value.
pub const DEFAULT_MAX_MOMENTUM: f64 = 1000.;

/// Default PropZero tolerance in cm.
pub const DEFAULT_MAX_DIST: f64 = 1e-3;

/// Top-level configuration for the track-fitting core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct KalmanConfig {
    pub propagator: PropagatorConfig,
    pub filter: FilterConfig,
}

impl KalmanConfig {
    pub fn validate(&self) -> KalmanResult<()> {
        self.propagator.validate()?;
        self.filter.validate()
    }
}

/// Settings shared by every propagator and interactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropagatorConfig {
    /// Maximum delta-ray energy (MeV) used in the restricted stopping power.
    pub tcut: f64,
    /// Master switch for energy-loss propagation.
    pub do_dedx: bool,
    /// PropZero tolerance (cm).
    pub max_dist: f64,
    /// Momentum cap (GeV/c) applied when a momentum vector is extracted.
    pub max_momentum: f64,
    /// Largest fractional kinetic-energy change allowed in one step.
    pub step_energy_fraction: f64,
    /// Floor on the step length (cm) of long propagations.
    pub min_step: f64,
    /// Step cap for long propagations.
    pub max_iterations: usize,
}

impl Default for PropagatorConfig {
    fn default() -> Self {
        Self {
            tcut: 10.,
            do_dedx: true,
            max_dist: DEFAULT_MAX_DIST,
            max_momentum: DEFAULT_MAX_MOMENTUM,
            step_energy_fraction: 0.1,
            min_step: 0.3,
            max_iterations: 10_000,
        }
    }
}

impl PropagatorConfig {
    pub fn validate(&self) -> KalmanResult<()> {
        if !(self.tcut >= 0.) {
            return Err(KalmanError::invalid_config(format!(
                "tcut must be non-negative, got {}",
                self.tcut
            )));
        }
        if !(self.max_dist > 0.) {
            return Err(KalmanError::invalid_config("max_dist must be positive"));
        }
        if !(self.max_momentum > 0.) {
            return Err(KalmanError::invalid_config("max_momentum must be positive"));
        }
        if !(self.step_energy_fraction > 0. && self.step_energy_fraction <= 1.) {
            return Err(KalmanError::invalid_config(
                "step_energy_fraction must lie in (0, 1]",
            ));
        }
        if !(self.min_step > 0.) {
            return Err(KalmanError::invalid_config("min_step must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(KalmanError::invalid_config("max_iterations must be at least 1"));
        }
        Ok(())
    }

    /// Smallest `|q/p|` honoured when converting to a momentum magnitude.
    pub fn min_inverse_momentum(&self) -> f64 {
        1. / self.max_momentum
    }
}

/// Settings of the forward track-building filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Hits whose incremental chi-square exceeds this are not added.
    pub max_incremental_chisq: f64,
    /// Groups farther than this (cm) from the current state are skipped.
    pub max_propagation_distance: f64,
    /// How far (cm) a group may sit behind the current state, against the
    /// filter direction, and still be visited.
    pub max_backtrack_distance: f64,
    /// Keep states measured outside the preferred plane in the output.
    pub store_np_plane: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_incremental_chisq: 50.,
            max_propagation_distance: 10.,
            max_backtrack_distance: 5.,
            store_np_plane: true,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> KalmanResult<()> {
        if !(self.max_incremental_chisq > 0.) {
            return Err(KalmanError::invalid_config(
                "max_incremental_chisq must be positive",
            ));
        }
        if !(self.max_propagation_distance > 0.) {
            return Err(KalmanError::invalid_config(
                "max_propagation_distance must be positive",
            ));
        }
        if !(self.max_backtrack_distance >= 0.) {
            return Err(KalmanError::invalid_config(format!(
                "max_backtrack_distance must be non-negative, got {}",
                self.max_backtrack_distance
            )));
        }
        Ok(())
    }
}

// trkf_sim/src/simulation/runner.rs

use super::config::ScenarioConfig;
use super::detector::Detector;
use super::error::{SimError, SimResult};
use super::fitter::{FitOutcome, TrackFitter};
use super::generator::TrackGenerator;
use tracing::{info, warn};

/// Aggregate results of one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub name: String,
    pub events: usize,
    pub fitted: usize,
    /// Events whose fit failed with a recoverable error.
    pub failed: usize,
    pub mean_states: f64,
    /// rad.
    pub mean_angle_error: f64,
    /// GeV/c.
    pub mean_momentum: f64,
}

impl ScenarioSummary {
    fn from_outcomes(name: &str, events: usize, failed: usize, outcomes: &[FitOutcome]) -> Self {
        let fitted: Vec<&FitOutcome> = outcomes.iter().filter(|o| o.is_fitted()).collect();
        let mean = |values: Vec<f64>| {
            if values.is_empty() {
                0.
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };
        Self {
            name: name.to_string(),
            events,
            fitted: fitted.len(),
            failed,
            mean_states: mean(fitted.iter().map(|o| o.n_states as f64).collect()),
            mean_angle_error: mean(fitted.iter().filter_map(|o| o.angle_error).collect()),
            mean_momentum: mean(fitted.iter().filter_map(|o| o.momentum).collect()),
        }
    }
}

/// Generates and fits the events of a scenario. `events` overrides the
/// scenario's own event count.
pub fn run_scenario(config: &ScenarioConfig, events: Option<usize>) -> SimResult<ScenarioSummary> {
    config.validate()?;
    let n_events = events.unwrap_or(config.generator.events);
    info!("Running scenario '{}' with {} event(s)", config.name, n_events);

    let detector = Detector::from_config(&config.detector);
    let mut generator = TrackGenerator::new(config.generator.clone())?;
    let fitter = TrackFitter::new(&config.kalman, &config.fit, detector.services.clone())?;

    let mut outcomes = Vec::with_capacity(n_events);
    let mut failed = 0;
    for _ in 0..n_events {
        let event = generator.generate(&detector)?;
        match fitter.fit(&event) {
            Ok(outcome) => {
                info!(
                    event = outcome.event,
                    hits = outcome.n_hits,
                    states = outcome.n_states,
                    angle_mrad = outcome.angle_error.map(|a| a * 1e3),
                    momentum = outcome.momentum,
                    "event fitted"
                );
                outcomes.push(outcome);
            }
            Err(SimError::Kalman(err)) if err.is_recoverable() => {
                warn!(event = event.index, %err, "fit failed");
                failed += 1;
            }
            Err(err) => return Err(err),
        }
    }

    let summary = ScenarioSummary::from_outcomes(&config.name, n_events, failed, &outcomes);
    info!(
        "Scenario '{}': {}/{} fitted, mean angle error {:.2} mrad",
        summary.name,
        summary.fitted,
        summary.events,
        summary.mean_angle_error * 1e3
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::ContainerKind;

    fn small_scenario() -> ScenarioConfig {
        let mut config = ScenarioConfig::default();
        config.name = "small".to_string();
        config.generator.events = 2;
        config.generator.start = [40., 0., 150.];
        config
    }

    #[test]
    fn test_run_wire_x() {
        let summary = run_scenario(&small_scenario(), None).unwrap();
        assert_eq!(summary.events, 2);
        assert_eq!(summary.fitted, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.mean_states > 50.);
        assert!(summary.mean_angle_error < 0.05);
    }

    #[test]
    fn test_run_wire_line_with_event_override() {
        let mut config = small_scenario();
        config.fit.container = ContainerKind::WireLine;
        let summary = run_scenario(&config, Some(1)).unwrap();
        assert_eq!(summary.events, 1);
        assert_eq!(summary.fitted, 1);
    }

    #[test]
    fn test_invalid_scenario_rejected() {
        let mut config = small_scenario();
        config.kalman.filter.max_propagation_distance = 0.;
        assert!(run_scenario(&config, None).is_err());
    }
}

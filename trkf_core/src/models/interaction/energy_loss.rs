// trkf_core/src/models/interaction/energy_loss.rs

use crate::error::{KalmanError, KalmanResult};
use crate::services::DetectorProperties;

/// MeV/cm -> GeV/cm.
const MEV_TO_GEV: f64 = 0.001;

/// Result of integrating the mean energy loss over a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedxStep {
    /// `q/p` after the step, with the sign of the input.
    pub pinv: f64,
    /// `d(pinv') / d(pinv)`.
    pub derivative: f64,
}

/// Updates `q/p` for the mean energy loss over a signed path `s` (cm).
///
/// A single midpoint step: the stopping power is evaluated once at the entry
/// momentum to find the midpoint energy, then again at the midpoint to find
/// the exit energy. Negative `s` undoes the loss (the energy grows).
///
/// Fails with `RangeOut` if the particle stops inside the step.
pub fn dedx_prop(
    detprop: &dyn DetectorProperties,
    pinv: f64,
    mass: f64,
    s: f64,
    tcut: f64,
) -> KalmanResult<DedxStep> {
    if pinv == 0. {
        return Ok(DedxStep {
            pinv,
            derivative: 1.,
        });
    }

    let mass2 = mass * mass;
    let p1 = 1. / pinv.abs();
    let e1 = (p1 * p1 + mass2).sqrt();

    let de = -MEV_TO_GEV * s * detprop.eloss(p1, mass, tcut);
    let emid = e1 + 0.5 * de;
    if emid <= mass {
        return Err(KalmanError::RangeOut { path: s });
    }
    let pmid = (emid * emid - mass2).sqrt();

    let e2 = e1 - MEV_TO_GEV * s * detprop.eloss(pmid, mass, tcut);
    if e2 <= mass {
        return Err(KalmanError::RangeOut { path: s });
    }
    let p2 = (e2 * e2 - mass2).sqrt();

    let pinv2 = pinv.signum() / p2;
    let derivative = pinv2.powi(3) * e2 / (pinv.powi(3) * e1);
    Ok(DedxStep {
        pinv: pinv2,
        derivative,
    })
}

/// Kinetic energy (GeV) for momentum `p` and mass `mass`.
pub fn kinetic_energy(p: f64, mass: f64) -> f64 {
    (p * p + mass * mass).sqrt() - mass
}

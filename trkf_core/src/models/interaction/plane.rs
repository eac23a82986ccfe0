// trkf_core/src/models/interaction/plane.rs

use super::energy_loss::kinetic_energy;
use crate::error::{KalmanError, KalmanResult};
use crate::estimation::track::KTrack;
use crate::services::DetectorServices;
use crate::types::{TrackDirection, TrackError};

/// The Highland logarithm uses the residual range, clipped to this (cm).
const MAX_RANGE: f64 = 100.;

/// Multiple-scattering and straggling noise for a state on a plane surface
/// after travelling a signed path `s`.
///
/// The projected scattering angle follows the Highland formula, with the
/// residual range inside the logarithm and the actual step `|s|` under the
/// square root. Straggling enters only `Q[4][4]`.
pub fn plane_noise(
    services: &DetectorServices,
    tcut: f64,
    trk: &KTrack,
    s: f64,
) -> KalmanResult<TrackError> {
    if !trk.surface().is_plane() {
        return Err(KalmanError::UnsupportedSurface(trk.surface().kind().name()));
    }

    let mut q = TrackError::zeros();
    let vec = trk.vector();
    let (dudw, dvdw, pinv) = (vec[2], vec[3], vec[4]);
    if s == 0. || pinv == 0. {
        return Ok(q);
    }

    let mass = trk.mass();
    let mom = 1. / pinv.abs();
    let x0 = services.radiation_length_cm();
    let detprop = &services.detprop;

    let eloss = detprop.eloss(mom, mass, tcut);
    let range = (kinetic_energy(mom, mass) / (0.001 * eloss)).min(MAX_RANGE);

    // 1 / (p beta)
    let invbp = pinv.abs() * (1. + mass * mass * pinv * pinv).sqrt();
    let theta_fact = 0.0136 * invbp * (1. + 0.038 * (range / x0).ln());
    let theta02 = theta_fact * theta_fact * s.abs() / x0;

    let ufact2 = 1. + dudw * dudw;
    let vfact2 = 1. + dvdw * dvdw;
    let uvfact2 = 1. + dudw * dudw + dvdw * dvdw;
    let uvfact = uvfact2.sqrt();
    let uv = dudw * dvdw;
    let dist2_3 = s * s / 3.;
    let mut dist_2 = s.abs() / 2.;
    if trk.direction() == TrackDirection::Backward {
        dist_2 = -dist_2;
    }

    // Straggling: E variance in GeV^2, propagated to q/p.
    let evar = 1e-6 * detprop.eloss_var(mom, mass) * s.abs();
    let pinvvar = evar * (mass * mass + mom * mom) / mom.powi(6);

    // Position block.
    q[(0, 0)] = dist2_3 * theta02 * ufact2;
    q[(1, 0)] = dist2_3 * theta02 * uv;
    q[(1, 1)] = dist2_3 * theta02 * vfact2;

    // Slope block.
    q[(2, 2)] = theta02 * uvfact2 * ufact2;
    q[(3, 2)] = theta02 * uvfact2 * uv;
    q[(3, 3)] = theta02 * uvfact2 * vfact2;

    // Position-slope correlations.
    q[(2, 0)] = dist_2 * theta02 * uvfact * ufact2;
    q[(3, 1)] = dist_2 * theta02 * uvfact * vfact2;
    q[(2, 1)] = dist_2 * theta02 * uvfact * uv;
    q[(3, 0)] = dist_2 * theta02 * uvfact * uv;

    q[(4, 4)] = pinvvar;

    q.fill_upper_triangle_with_lower_triangle();
    Ok(q)
}

// trkf_core/src/surfaces/plane.rs

// Track-parameter helpers common to every plane surface. Plane states are
// (u, v, du/dw, dv/dw, q/p) with the motion along +w for FORWARD tracks.

use crate::error::{KalmanError, KalmanResult};
use crate::types::{TrackDirection, TrackError, TrackVector};
use nalgebra::{Matrix2, Matrix3, SMatrix, Vector3};

/// Unit direction of motion in local (u, v, w) coordinates.
pub(super) fn local_direction(vec: &TrackVector, dir: TrackDirection) -> KalmanResult<Vector3<f64>> {
    let sign = match dir {
        TrackDirection::Forward => 1.,
        TrackDirection::Backward => -1.,
        TrackDirection::Unknown => return Err(KalmanError::DirectionRequired),
    };
    let slopes = Vector3::new(vec[2], vec[3], 1.);
    Ok(sign * slopes / slopes.norm())
}

pub(super) fn global_direction(
    rotation: &Matrix3<f64>,
    vec: &TrackVector,
    dir: TrackDirection,
) -> KalmanResult<Vector3<f64>> {
    Ok(rotation.transpose() * local_direction(vec, dir)?)
}

/// Pointing error from the slope block of the covariance.
///
/// The eigenvalues of the direction covariance are frame independent, so the
/// calculation is done in local coordinates.
pub(super) fn pointing_error(vec: &TrackVector, err: &TrackError) -> f64 {
    let (a, b) = (vec[2], vec[3]);
    let den = 1. + a * a + b * b;
    let norm = den.powf(1.5);

    // d(unit direction) / d(du/dw, dv/dw)
    let jac = SMatrix::<f64, 3, 2>::new(
        (1. + b * b) / norm,
        -a * b / norm,
        -a * b / norm,
        (1. + a * a) / norm,
        -a / norm,
        -b / norm,
    );
    let slopes_err = Matrix2::new(err[(2, 2)], err[(2, 3)], err[(3, 2)], err[(3, 3)]);
    super::largest_eigen_sqrt(&(jac * slopes_err * jac.transpose()))
}

pub(super) fn starting_error() -> TrackError {
    TrackError::from_diagonal(&TrackVector::new(1000., 1000., 0.25, 0.25, 10.))
}

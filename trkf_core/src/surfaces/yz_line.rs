// trkf_core/src/surfaces/yz_line.rs

use super::{largest_eigen_sqrt, SurfaceGeometry};
use crate::error::KalmanResult;
use crate::types::{Point3, TrackDirection, TrackError, TrackVector};
use nalgebra::{Matrix2, Matrix3, SMatrix, Vector3};
use std::f64::consts::{PI, TAU};

/// Tracks with `|eta|` beyond this are considered parallel to the line.
pub const MAX_ETA: f64 = 10.;

/// A line perpendicular to the x-axis, running along the local `v` axis of
/// a frame rotated about x by `phi` (same local frame as
/// [`SurfYZPlane`](super::SurfYZPlane)).
///
/// Track parameters are given at the point of closest approach:
/// `(r, v, phi_d, eta, q/p)`, where the local position is
/// `(-r sin(phi_d), v, r cos(phi_d))` and the unit direction is
/// `(cos(phi_d) sech(eta), tanh(eta), sin(phi_d) sech(eta))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfYZLine {
    pub(crate) x0: f64,
    pub(crate) y0: f64,
    pub(crate) z0: f64,
    pub(crate) phi: f64,
}

impl SurfYZLine {
    pub fn new(x0: f64, y0: f64, z0: f64, phi: f64) -> Self {
        Self { x0, y0, z0, phi }
    }

    pub fn x0(&self) -> f64 {
        self.x0
    }

    pub fn y0(&self) -> f64 {
        self.y0
    }

    pub fn z0(&self) -> f64 {
        self.z0
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }
}

impl Default for SurfYZLine {
    fn default() -> Self {
        Self::new(0., 0., 0., 0.)
    }
}

/// Folds an angle into `(-pi, pi]`.
pub(crate) fn fold_angle(mut a: f64) -> f64 {
    while a <= -PI {
        a += TAU;
    }
    while a > PI {
        a -= TAU;
    }
    a
}

impl SurfaceGeometry for SurfYZLine {
    fn origin(&self) -> Point3 {
        Point3::new(self.x0, self.y0, self.z0)
    }

    fn rotation(&self) -> Matrix3<f64> {
        let (s, c) = self.phi.sin_cos();
        Matrix3::new(1., 0., 0., 0., c, s, 0., -s, c)
    }

    fn to_local(&self, xyz: &Point3) -> Point3 {
        let (s, c) = self.phi.sin_cos();
        let (dy, dz) = (xyz.y - self.y0, xyz.z - self.z0);
        Point3::new(xyz.x - self.x0, dy * c + dz * s, -dy * s + dz * c)
    }

    fn to_global(&self, uvw: &Point3) -> Point3 {
        let (s, c) = self.phi.sin_cos();
        Point3::new(
            self.x0 + uvw.x,
            self.y0 + uvw.y * c - uvw.z * s,
            self.z0 + uvw.y * s + uvw.z * c,
        )
    }

    fn get_position(&self, vec: &TrackVector) -> Point3 {
        let (r, v, phid) = (vec[0], vec[1], vec[2]);
        let (sd, cd) = phid.sin_cos();
        self.to_global(&Point3::new(-r * sd, v, r * cd))
    }

    /// The direction is carried by `(phi_d, eta)`; `dir` is ignored.
    fn get_direction(&self, vec: &TrackVector, _dir: TrackDirection) -> KalmanResult<Vector3<f64>> {
        let (sd, cd) = vec[2].sin_cos();
        let sech = 1. / vec[3].cosh();
        let local = Vector3::new(cd * sech, vec[3].tanh(), sd * sech);
        Ok(self.rotation().transpose() * local)
    }

    fn get_diff(&self, v1: &TrackVector, v2: &TrackVector) -> TrackVector {
        let mut diff = v1 - v2;
        diff[2] = fold_angle(diff[2]);
        diff
    }

    fn is_track_valid(&self, vec: &TrackVector) -> bool {
        vec[3].abs() < MAX_ETA
    }

    fn pointing_error(&self, vec: &TrackVector, err: &TrackError) -> f64 {
        let (sd, cd) = vec[2].sin_cos();
        let sech = 1. / vec[3].cosh();
        let tanh = vec[3].tanh();

        // d(unit direction) / d(phi_d, eta)
        let jac = SMatrix::<f64, 3, 2>::new(
            -sd * sech,
            -cd * sech * tanh,
            0.,
            sech * sech,
            cd * sech,
            -sd * sech * tanh,
        );
        let angle_err = Matrix2::new(err[(2, 2)], err[(2, 3)], err[(3, 2)], err[(3, 3)]);
        largest_eigen_sqrt(&(jac * angle_err * jac.transpose()))
    }

    fn starting_error(&self) -> TrackError {
        TrackError::from_diagonal(&TrackVector::new(1000., 1000., 10., 10., 10.))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_perigee_position_and_momentum() {
        let surf = SurfYZLine::new(0., 0., 0., 0.);
        let vec = TrackVector::new(0.1, 0.2, 2., 1., 0.5);

        let pos = surf.get_position(&vec);
        let expected_pos = Point3::new(-0.1 * 2_f64.sin(), 0.2, 0.1 * 2_f64.cos());
        assert_abs_diff_eq!(pos, expected_pos, epsilon = 1e-12);

        // The direction tag is irrelevant on a line.
        for dir in [TrackDirection::Unknown, TrackDirection::Backward] {
            let mom = surf.get_momentum(&vec, dir).unwrap();
            let expected = Vector3::new(
                2. * 2_f64.cos() / 1_f64.cosh(),
                2. * 1_f64.tanh(),
                2. * 2_f64.sin() / 1_f64.cosh(),
            );
            assert_abs_diff_eq!(mom, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_perigee_is_closest_approach() {
        let surf = SurfYZLine::new(1., 2., -3., 0.6);
        let vec = TrackVector::new(0.7, -1.2, -2.5, 0.4, 1.);
        let pos = surf.to_local(&surf.get_position(&vec));
        let dir = surf.rotation() * surf.get_direction(&vec, TrackDirection::Unknown).unwrap();
        // The u-w part of the position is orthogonal to the u-w part of the direction.
        assert_abs_diff_eq!(pos.x * dir.x + pos.z * dir.z, 0., epsilon = 1e-12);
        assert_abs_diff_eq!(pos.x.hypot(pos.z), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_diff_folds_angle() {
        let surf = SurfYZLine::default();
        let v1 = TrackVector::new(0., 0., 3.1, 0., 0.);
        let v2 = TrackVector::new(0., 0., -3.1, 0., 0.);
        let diff = surf.get_diff(&v1, &v2);
        assert_abs_diff_eq!(diff[2], 6.2 - TAU, epsilon = 1e-12);
        assert_abs_diff_eq!(fold_angle(PI), PI, epsilon = 0.);
        assert_abs_diff_eq!(fold_angle(-PI), PI, epsilon = 1e-15);
    }

    #[test]
    fn test_track_validity() {
        let surf = SurfYZLine::default();
        assert!(surf.is_track_valid(&TrackVector::new(0., 0., 0., 9.9, 1.)));
        assert!(!surf.is_track_valid(&TrackVector::new(0., 0., 0., -10., 1.)));
    }

    #[test]
    fn test_pointing_error_perpendicular_track() {
        let surf = SurfYZLine::default();
        let vec = TrackVector::new(0., 0., 0., 0., 1.);
        let mut err = TrackError::zeros();
        err[(2, 2)] = 0.09;
        err[(3, 3)] = 0.01;
        assert_abs_diff_eq!(surf.pointing_error(&vec, &err), 0.3, epsilon = 1e-12);
    }
}

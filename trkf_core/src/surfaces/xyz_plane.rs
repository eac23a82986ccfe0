// trkf_core/src/surfaces/xyz_plane.rs

use super::{plane, SurfaceGeometry};
use crate::error::KalmanResult;
use crate::types::{Point3, TrackDirection, TrackError, TrackVector};
use nalgebra::{Matrix3, RowVector3, Vector3};

/// A plane of arbitrary orientation.
///
/// The local frame is obtained from the global one by a rotation `phi` about
/// x followed by a rotation `theta` about the rotated y axis:
/// * `u = (x-x0) cos(th) - (y-y0) sin(th) sin(phi) + (z-z0) sin(th) cos(phi)`
/// * `v = (y-y0) cos(phi) + (z-z0) sin(phi)`
/// * `w = -(x-x0) sin(th) - (y-y0) cos(th) sin(phi) + (z-z0) cos(th) cos(phi)`
///
/// With `theta = 0` this reduces to [`SurfYZPlane`](super::SurfYZPlane).
/// Track parameters are `(u, v, du/dw, dv/dw, q/p)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfXYZPlane {
    pub(crate) x0: f64,
    pub(crate) y0: f64,
    pub(crate) z0: f64,
    pub(crate) phi: f64,
    pub(crate) theta: f64,
}

impl SurfXYZPlane {
    pub fn new(x0: f64, y0: f64, z0: f64, phi: f64, theta: f64) -> Self {
        Self {
            x0,
            y0,
            z0,
            phi,
            theta,
        }
    }

    /// Plane through `origin` with normal `normal` (need not be a unit vector).
    ///
    /// The local `w` axis points along the normal.
    pub fn from_normal(origin: &Point3, normal: &Vector3<f64>) -> Self {
        let nyz = normal.y.hypot(normal.z);
        let theta = (-normal.x).atan2(nyz);
        let phi = if nyz != 0. {
            (-normal.y).atan2(normal.z)
        } else {
            0.
        };
        Self::new(origin.x, origin.y, origin.z, phi, theta)
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

    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Unit normal (the local `w` axis) in global coordinates.
    pub fn normal(&self) -> Vector3<f64> {
        let (sphi, cphi) = self.phi.sin_cos();
        let (sth, cth) = self.theta.sin_cos();
        Vector3::new(-sth, -cth * sphi, cth * cphi)
    }
}

impl Default for SurfXYZPlane {
    fn default() -> Self {
        Self::new(0., 0., 0., 0., 0.)
    }
}

impl SurfaceGeometry for SurfXYZPlane {
    fn origin(&self) -> Point3 {
        Point3::new(self.x0, self.y0, self.z0)
    }

    fn rotation(&self) -> Matrix3<f64> {
        let (sphi, cphi) = self.phi.sin_cos();
        let (sth, cth) = self.theta.sin_cos();
        Matrix3::from_rows(&[
            RowVector3::new(cth, -sth * sphi, sth * cphi),
            RowVector3::new(0., cphi, sphi),
            RowVector3::new(-sth, -cth * sphi, cth * cphi),
        ])
    }

    fn to_local(&self, xyz: &Point3) -> Point3 {
        let (sphi, cphi) = self.phi.sin_cos();
        let (sth, cth) = self.theta.sin_cos();
        let (dx, dy, dz) = (xyz.x - self.x0, xyz.y - self.y0, xyz.z - self.z0);
        Point3::new(
            dx * cth - dy * sth * sphi + dz * sth * cphi,
            dy * cphi + dz * sphi,
            -dx * sth - dy * cth * sphi + dz * cth * cphi,
        )
    }

    fn to_global(&self, uvw: &Point3) -> Point3 {
        let (sphi, cphi) = self.phi.sin_cos();
        let (sth, cth) = self.theta.sin_cos();
        let (u, v, w) = (uvw.x, uvw.y, uvw.z);
        Point3::new(
            self.x0 + u * cth - w * sth,
            self.y0 - u * sth * sphi + v * cphi - w * cth * sphi,
            self.z0 + u * sth * cphi + v * sphi + w * cth * cphi,
        )
    }

    fn get_position(&self, vec: &TrackVector) -> Point3 {
        self.to_global(&Point3::new(vec[0], vec[1], 0.))
    }

    fn get_direction(&self, vec: &TrackVector, dir: TrackDirection) -> KalmanResult<Vector3<f64>> {
        plane::global_direction(&self.rotation(), vec, dir)
    }

    fn pointing_error(&self, vec: &TrackVector, err: &TrackError) -> f64 {
        plane::pointing_error(vec, err)
    }

    fn starting_error(&self) -> TrackError {
        plane::starting_error()
    }
}

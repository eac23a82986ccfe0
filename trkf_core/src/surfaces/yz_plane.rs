// trkf_core/src/surfaces/yz_plane.rs

use super::{plane, SurfaceGeometry};
use crate::error::KalmanResult;
use crate::types::{Point3, TrackDirection, TrackError, TrackVector};
use nalgebra::{Matrix3, Vector3};

/// A plane parallel to the x-axis, rotated about x by `phi`.
///
/// Local coordinates:
/// * `u = x - x0`
/// * `v = (y - y0) cos(phi) + (z - z0) sin(phi)`
/// * `w = -(y - y0) sin(phi) + (z - z0) cos(phi)`
///
/// Track parameters are `(u, v, du/dw, dv/dw, q/p)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfYZPlane {
    pub(crate) x0: f64,
    pub(crate) y0: f64,
    pub(crate) z0: f64,
    pub(crate) phi: f64,
}

impl SurfYZPlane {
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

impl Default for SurfYZPlane {
    fn default() -> Self {
        Self::new(0., 0., 0., 0.)
    }
}

impl SurfaceGeometry for SurfYZPlane {
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

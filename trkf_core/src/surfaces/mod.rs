// trkf_core/src/surfaces/mod.rs

//! Reference surfaces on which track states are expressed.
//!
//! Every surface carries an origin and an orthonormal local frame `(u, v, w)`.
//! The frame is described by a rotation matrix whose rows are the local axes
//! in global coordinates, so `uvw = R (xyz - origin)`.
//!
//! The concrete surfaces form a closed set and are dispatched through the
//! [`Surface`] enum. Shared ownership goes through [`SurfaceHandle`], which
//! lets every hit on one readout channel point at the same surface.

use crate::config::DEFAULT_MAX_MOMENTUM;
use crate::error::{KalmanError, KalmanResult};
use crate::types::{Point3, TrackDirection, TrackError, TrackVector};
use nalgebra::{Matrix3, Vector3};
use std::fmt;
use std::sync::Arc;

mod plane;
pub mod wire;
pub mod xyz_plane;
pub mod yz_line;
pub mod yz_plane;

pub use wire::{surf_wire_line, surf_wire_x};
pub use xyz_plane::SurfXYZPlane;
pub use yz_line::SurfYZLine;
pub use yz_plane::SurfYZPlane;

/// Orientation angles closer than this are considered identical.
pub const PHI_TOLERANCE: f64 = 1e-10;
pub const THETA_TOLERANCE: f64 = 1e-10;

/// Parallel surfaces closer than this (cm) are considered identical.
pub const SEP_TOLERANCE: f64 = 1e-6;

/// Shared, immutable surface.
pub type SurfaceHandle = Arc<Surface>;

// --- Uniform Capability Set ---

/// What every concrete surface can do with a track state expressed on it.
pub trait SurfaceGeometry {
    /// Origin of the local frame, in global coordinates.
    fn origin(&self) -> Point3;

    /// Rows are the local `u`, `v`, `w` axes in global coordinates.
    fn rotation(&self) -> Matrix3<f64>;

    fn to_local(&self, xyz: &Point3) -> Point3 {
        self.rotation() * (xyz - self.origin())
    }

    fn to_global(&self, uvw: &Point3) -> Point3 {
        self.origin() + self.rotation().transpose() * uvw
    }

    /// Global position of the track described by `vec`.
    fn get_position(&self, vec: &TrackVector) -> Point3;

    /// Global unit direction of motion.
    ///
    /// Plane surfaces need `dir` to resolve the sign of the motion along
    /// the normal and fail with `DirectionRequired` when it is unknown.
    fn get_direction(&self, vec: &TrackVector, dir: TrackDirection) -> KalmanResult<Vector3<f64>>;

    /// Global momentum (GeV/c), capped at [`DEFAULT_MAX_MOMENTUM`].
    fn get_momentum(&self, vec: &TrackVector, dir: TrackDirection) -> KalmanResult<Vector3<f64>> {
        self.get_momentum_capped(vec, dir, DEFAULT_MAX_MOMENTUM)
    }

    /// Global momentum with magnitude `1 / max(|q/p|, 1/max_momentum)`.
    fn get_momentum_capped(
        &self,
        vec: &TrackVector,
        dir: TrackDirection,
        max_momentum: f64,
    ) -> KalmanResult<Vector3<f64>> {
        let p = 1. / vec[4].abs().max(1. / max_momentum);
        Ok(p * self.get_direction(vec, dir)?)
    }

    /// `v1 - v2`, with any angular component folded into its principal range.
    fn get_diff(&self, v1: &TrackVector, v2: &TrackVector) -> TrackVector {
        v1 - v2
    }

    fn is_track_valid(&self, _vec: &TrackVector) -> bool {
        true
    }

    /// Square root of the largest eigenvalue of the pointing-direction covariance.
    fn pointing_error(&self, vec: &TrackVector, err: &TrackError) -> f64;

    /// Large diagonal covariance for seeding a fit on this surface.
    fn starting_error(&self) -> TrackError;
}

/// Square root of the largest eigenvalue of a symmetric 3x3 matrix.
pub(crate) fn largest_eigen_sqrt(m: &Matrix3<f64>) -> f64 {
    m.symmetric_eigen().eigenvalues.max().max(0.).sqrt()
}

// --- Surface Enum ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    YZLine,
    YZPlane,
    XYZPlane,
}

impl SurfaceKind {
    pub fn name(self) -> &'static str {
        match self {
            SurfaceKind::YZLine => "YZLine",
            SurfaceKind::YZPlane => "YZPlane",
            SurfaceKind::XYZPlane => "XYZPlane",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    YZLine(SurfYZLine),
    YZPlane(SurfYZPlane),
    XYZPlane(SurfXYZPlane),
}

impl Surface {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::YZLine(_) => SurfaceKind::YZLine,
            Surface::YZPlane(_) => SurfaceKind::YZPlane,
            Surface::XYZPlane(_) => SurfaceKind::XYZPlane,
        }
    }

    pub fn is_plane(&self) -> bool {
        !matches!(self, Surface::YZLine(_))
    }

    pub fn into_handle(self) -> SurfaceHandle {
        Arc::new(self)
    }

    fn geometry(&self) -> &dyn SurfaceGeometry {
        match self {
            Surface::YZLine(s) => s,
            Surface::YZPlane(s) => s,
            Surface::XYZPlane(s) => s,
        }
    }

    /// Same concrete type with orientation angles equal within tolerance.
    pub fn is_parallel(&self, other: &Surface) -> bool {
        match (self, other) {
            (Surface::YZLine(a), Surface::YZLine(b)) => (a.phi - b.phi).abs() <= PHI_TOLERANCE,
            (Surface::YZPlane(a), Surface::YZPlane(b)) => (a.phi - b.phi).abs() <= PHI_TOLERANCE,
            (Surface::XYZPlane(a), Surface::XYZPlane(b)) => {
                (a.phi - b.phi).abs() <= PHI_TOLERANCE
                    && (a.theta - b.theta).abs() <= THETA_TOLERANCE
            }
            _ => false,
        }
    }

    /// Distance from this surface to a parallel one.
    ///
    /// Planes return the *signed* offset of the other origin along this
    /// surface's normal. Lines have no normal, so they return the unsigned
    /// perpendicular distance between the two axes.
    pub fn distance_to(&self, other: &Surface) -> KalmanResult<f64> {
        if !self.is_parallel(other) {
            return Err(KalmanError::NotParallel);
        }
        let delta = self.to_local(&other.origin());
        Ok(match self {
            Surface::YZLine(_) => delta.x.hypot(delta.z),
            Surface::YZPlane(_) | Surface::XYZPlane(_) => delta.z,
        })
    }

    /// Parallel and coincident within [`SEP_TOLERANCE`].
    ///
    /// Planes may still have different in-plane origins; lines must share
    /// their origin.
    pub fn is_equal(&self, other: &Surface) -> bool {
        if !self.is_parallel(other) {
            return false;
        }
        match self {
            Surface::YZLine(_) => (self.origin() - other.origin())
                .iter()
                .all(|d| d.abs() <= SEP_TOLERANCE),
            Surface::YZPlane(_) | Surface::XYZPlane(_) => self
                .distance_to(other)
                .map(|d| d.abs() <= SEP_TOLERANCE)
                .unwrap_or(false),
        }
    }

    /// A surface of the same type and orientation with its origin moved to `xyz`.
    pub fn with_origin(&self, xyz: &Point3) -> Surface {
        match self {
            Surface::YZLine(s) => Surface::YZLine(SurfYZLine::new(xyz.x, xyz.y, xyz.z, s.phi)),
            Surface::YZPlane(s) => {
                Surface::YZPlane(SurfYZPlane::new(xyz.x, xyz.y, xyz.z, s.phi))
            }
            Surface::XYZPlane(s) => {
                Surface::XYZPlane(SurfXYZPlane::new(xyz.x, xyz.y, xyz.z, s.phi, s.theta))
            }
        }
    }
}

impl SurfaceGeometry for Surface {
    fn origin(&self) -> Point3 {
        self.geometry().origin()
    }

    fn rotation(&self) -> Matrix3<f64> {
        self.geometry().rotation()
    }

    fn to_local(&self, xyz: &Point3) -> Point3 {
        self.geometry().to_local(xyz)
    }

    fn to_global(&self, uvw: &Point3) -> Point3 {
        self.geometry().to_global(uvw)
    }

    fn get_position(&self, vec: &TrackVector) -> Point3 {
        self.geometry().get_position(vec)
    }

    fn get_direction(&self, vec: &TrackVector, dir: TrackDirection) -> KalmanResult<Vector3<f64>> {
        self.geometry().get_direction(vec, dir)
    }

    fn get_momentum_capped(
        &self,
        vec: &TrackVector,
        dir: TrackDirection,
        max_momentum: f64,
    ) -> KalmanResult<Vector3<f64>> {
        self.geometry().get_momentum_capped(vec, dir, max_momentum)
    }

    fn get_diff(&self, v1: &TrackVector, v2: &TrackVector) -> TrackVector {
        self.geometry().get_diff(v1, v2)
    }

    fn is_track_valid(&self, vec: &TrackVector) -> bool {
        self.geometry().is_track_valid(vec)
    }

    fn pointing_error(&self, vec: &TrackVector, err: &TrackError) -> f64 {
        self.geometry().pointing_error(vec, err)
    }

    fn starting_error(&self) -> TrackError {
        self.geometry().starting_error()
    }
}

impl From<SurfYZLine> for Surface {
    fn from(s: SurfYZLine) -> Self {
        Surface::YZLine(s)
    }
}

impl From<SurfYZPlane> for Surface {
    fn from(s: SurfYZPlane) -> Self {
        Surface::YZPlane(s)
    }
}

impl From<SurfXYZPlane> for Surface {
    fn from(s: SurfXYZPlane) -> Self {
        Surface::XYZPlane(s)
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.origin();
        match self {
            Surface::YZLine(s) => write!(
                f,
                "YZLine(x0={:.4}, y0={:.4}, z0={:.4}, phi={:.6})",
                o.x, o.y, o.z, s.phi
            ),
            Surface::YZPlane(s) => write!(
                f,
                "YZPlane(x0={:.4}, y0={:.4}, z0={:.4}, phi={:.6})",
                o.x, o.y, o.z, s.phi
            ),
            Surface::XYZPlane(s) => write!(
                f,
                "XYZPlane(x0={:.4}, y0={:.4}, z0={:.4}, phi={:.6}, theta={:.6})",
                o.x, o.y, o.z, s.phi, s.theta
            ),
        }
    }
}

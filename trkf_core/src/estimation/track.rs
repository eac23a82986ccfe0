// trkf_core/src/estimation/track.rs

use crate::error::{KalmanError, KalmanResult};
use crate::linalg::{symmetrize, syminvert};
use crate::surfaces::{SurfaceGeometry, SurfaceHandle};
use crate::types::{Point3, TrackDirection, TrackError, TrackVector, MUON_MASS};
use nalgebra::Vector3;
use std::fmt;
use std::ops::{Deref, DerefMut};

// =========================================================================
// == KTrack ==
// =========================================================================

/// A track state without errors: a surface, the 5 parameters on it, a
/// direction tag and a mass hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct KTrack {
    surface: SurfaceHandle,
    vector: TrackVector,
    direction: TrackDirection,
    mass: f64,
}

impl KTrack {
    /// A muon-hypothesis track.
    pub fn new(surface: SurfaceHandle, vector: TrackVector, direction: TrackDirection) -> Self {
        Self {
            surface,
            vector,
            direction,
            mass: MUON_MASS,
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    pub fn vector(&self) -> &TrackVector {
        &self.vector
    }

    pub fn direction(&self) -> TrackDirection {
        self.direction
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn set_vector(&mut self, vector: TrackVector) {
        self.vector = vector;
    }

    pub fn set_direction(&mut self, direction: TrackDirection) {
        self.direction = direction;
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
    }

    /// `true` if the parameters make sense on the current surface.
    pub fn is_valid(&self) -> bool {
        self.surface.is_track_valid(&self.vector)
    }

    pub fn position(&self) -> Point3 {
        self.surface.get_position(&self.vector)
    }

    /// Unit direction of motion.
    pub fn unit_direction(&self) -> KalmanResult<Vector3<f64>> {
        self.surface.get_direction(&self.vector, self.direction)
    }

    pub fn momentum(&self) -> KalmanResult<Vector3<f64>> {
        self.surface.get_momentum(&self.vector, self.direction)
    }

    pub fn momentum_capped(&self, max_momentum: f64) -> KalmanResult<Vector3<f64>> {
        self.surface
            .get_momentum_capped(&self.vector, self.direction, max_momentum)
    }

    /// Momentum magnitude; infinite when `q/p` is zero.
    pub fn p(&self) -> f64 {
        let pinv = self.vector[4];
        if pinv == 0. {
            f64::INFINITY
        } else {
            1. / pinv.abs()
        }
    }

    /// Angle of the momentum with respect to the y-z plane.
    pub fn x_latitude(&self) -> KalmanResult<f64> {
        let mom = self.momentum()?;
        Ok(mom.x.atan2(mom.y.hypot(mom.z)))
    }

    /// Azimuth of the momentum around the x axis, measured from +z towards +y.
    pub fn x_longitude(&self) -> KalmanResult<f64> {
        let mom = self.momentum()?;
        Ok(mom.y.atan2(mom.z))
    }
}

impl fmt::Display for KTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.vector;
        write!(
            f,
            "{} dir={:?} m={:.4} vec=[{:.4}, {:.4}, {:.4}, {:.4}, {:.4}]",
            self.surface, self.direction, self.mass, v[0], v[1], v[2], v[3], v[4]
        )
    }
}

// =========================================================================
// == KETrack ==
// =========================================================================

/// A track state with its 5x5 covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct KETrack {
    track: KTrack,
    error: TrackError,
}

impl KETrack {
    pub fn new(track: KTrack, error: TrackError) -> Self {
        Self { track, error }
    }

    /// A track seeded with its surface's starting covariance.
    pub fn with_starting_error(track: KTrack) -> Self {
        let error = track.surface().starting_error();
        Self { track, error }
    }

    pub fn track(&self) -> &KTrack {
        &self.track
    }

    pub fn error(&self) -> &TrackError {
        &self.error
    }

    pub fn set_error(&mut self, error: TrackError) {
        self.error = error;
    }

    pub(crate) fn set_track(&mut self, track: KTrack) {
        self.track = track;
    }

    pub fn into_track(self) -> KTrack {
        self.track
    }

    /// Error (rad) on the pointing direction.
    pub fn pointing_error(&self) -> f64 {
        self.surface().pointing_error(self.vector(), &self.error)
    }

    /// Replaces the covariance with the surface's seed covariance.
    pub fn reset_error(&mut self) {
        self.error = self.surface().starting_error();
    }

    /// Combines `other` (on the same surface) into this state as a weighted
    /// average, returning the chi-square of the combination.
    ///
    /// With `W = (Ca + Cb)^-1` and `d = va - vb`:
    /// `v = va - Ca W d`, `C = Ca W Cb`, `chisq = d^T W d`.
    pub fn combine(&mut self, other: &KETrack) -> KalmanResult<f64> {
        if !self.surface().is_equal(other.surface()) {
            return Err(KalmanError::SurfaceMismatch("combined tracks"));
        }
        let mut w = self.error + other.error;
        if !syminvert(&mut w) {
            return Err(KalmanError::SingularMatrix);
        }
        let d = self.surface().get_diff(self.vector(), other.vector());
        let chisq = (d.transpose() * w * d)[(0, 0)];

        let vector = self.vector() - self.error * w * d;
        let mut error = self.error * w * other.error;
        symmetrize(&mut error);

        self.track.set_vector(vector);
        self.error = error;
        Ok(chisq)
    }
}

impl Deref for KETrack {
    type Target = KTrack;

    fn deref(&self) -> &KTrack {
        &self.track
    }
}

impl DerefMut for KETrack {
    fn deref_mut(&mut self) -> &mut KTrack {
        &mut self.track
    }
}

impl From<KETrack> for KTrack {
    fn from(tre: KETrack) -> Self {
        tre.track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::{Surface, SurfYZLine, SurfYZPlane};
    use approx::assert_abs_diff_eq;

    fn plane_track() -> KTrack {
        let surf = Surface::from(SurfYZPlane::new(0., 0., 0., 0.)).into_handle();
        KTrack::new(
            surf,
            TrackVector::new(1., 2., 0., 0., 0.5),
            TrackDirection::Forward,
        )
    }

    #[test]
    fn test_ktrack_kinematics() {
        let trk = plane_track();
        assert!(trk.is_valid());
        assert_abs_diff_eq!(trk.p(), 2.);
        assert_abs_diff_eq!(trk.position(), Point3::new(1., 2., 0.), epsilon = 1e-12);
        assert_abs_diff_eq!(trk.x_latitude().unwrap(), 0., epsilon = 1e-12);
        assert_abs_diff_eq!(trk.x_longitude().unwrap(), 0., epsilon = 1e-12);
        assert_eq!(trk.mass(), MUON_MASS);
    }

    #[test]
    fn test_unknown_direction_on_plane() {
        let mut trk = plane_track();
        trk.set_direction(TrackDirection::Unknown);
        assert_eq!(trk.momentum(), Err(KalmanError::DirectionRequired));
    }

    #[test]
    fn test_invalid_line_state() {
        let surf = Surface::from(SurfYZLine::default()).into_handle();
        let trk = KTrack::new(
            surf,
            TrackVector::new(0., 0., 0., 12., 1.),
            TrackDirection::Unknown,
        );
        assert!(!trk.is_valid());
    }

    #[test]
    fn test_combine_weighted_average() {
        let trk = plane_track();
        let mut a = KETrack::new(trk.clone(), TrackError::identity());
        let mut shifted = trk;
        shifted.set_vector(TrackVector::new(3., 2., 0., 0., 0.5));
        let b = KETrack::new(shifted, TrackError::identity());

        let chisq = a.combine(&b).unwrap();
        // Equal weights: average of the two, half the variance.
        assert_abs_diff_eq!(a.vector()[0], 2., epsilon = 1e-12);
        assert_abs_diff_eq!(a.error()[(0, 0)], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(chisq, 2., epsilon = 1e-12);
    }

    #[test]
    fn test_combine_requires_same_surface() {
        let trk = plane_track();
        let mut a = KETrack::new(trk.clone(), TrackError::identity());
        let other_surf = Surface::from(SurfYZPlane::new(0., 0., 5., 0.)).into_handle();
        let b = KETrack::new(
            KTrack::new(other_surf, *trk.vector(), TrackDirection::Forward),
            TrackError::identity(),
        );
        assert!(matches!(
            a.combine(&b),
            Err(KalmanError::SurfaceMismatch(_))
        ));
    }
}

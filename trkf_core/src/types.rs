// trkf_core/src/types.rs

use nalgebra::{SMatrix, SVector, Vector3};

// --- Core Type Aliases ---

/// Number of track parameters on every surface.
pub const TRACK_DIM: usize = 5;

/// The 5-parameter track state. Its meaning depends on the surface type.
pub type TrackVector = SVector<f64, TRACK_DIM>;

/// 5x5 symmetric track covariance. Stored dense; both triangles are kept in sync.
pub type TrackError = SMatrix<f64, TRACK_DIM, TRACK_DIM>;

/// 5x5 propagation Jacobian (general, not symmetric).
pub type TrackMatrix = SMatrix<f64, TRACK_DIM, TRACK_DIM>;

/// An N-dimensional measurement vector.
pub type KVector<const N: usize> = SVector<f64, N>;

/// An NxN symmetric measurement matrix.
pub type KSymMatrix<const N: usize> = SMatrix<f64, N, N>;

/// The NxM Kalman H-matrix type.
pub type KHMatrix<const N: usize> = SMatrix<f64, N, TRACK_DIM>;

pub type Point3 = Vector3<f64>;

/// Muon mass in GeV/c^2, the default hypothesis for fitted tracks.
pub const MUON_MASS: f64 = 0.105658367;

// --- Directions ---

/// Which way along the trajectory a state is travelling, relative to the
/// surface normal. Only meaningful on plane surfaces; on line surfaces the
/// direction is carried by the state vector itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackDirection {
    Forward,
    Backward,
    #[default]
    Unknown,
}

impl TrackDirection {
    /// The sign of `dw/ds` this tag stands for (`0` when unknown).
    pub fn sign(self) -> f64 {
        match self {
            TrackDirection::Forward => 1.,
            TrackDirection::Backward => -1.,
            TrackDirection::Unknown => 0.,
        }
    }

    pub fn from_sign(sign: f64) -> Self {
        if sign > 0. {
            TrackDirection::Forward
        } else if sign < 0. {
            TrackDirection::Backward
        } else {
            TrackDirection::Unknown
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            TrackDirection::Forward => TrackDirection::Backward,
            TrackDirection::Backward => TrackDirection::Forward,
            TrackDirection::Unknown => TrackDirection::Unknown,
        }
    }
}

/// Allowed sign of the path length for a propagation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropDirection {
    Forward,
    Backward,
    #[default]
    Unknown,
}

impl PropDirection {
    /// `true` if a signed path length `s` is compatible with this request.
    pub fn accepts(self, s: f64) -> bool {
        match self {
            PropDirection::Forward => s >= 0.,
            PropDirection::Backward => s <= 0.,
            PropDirection::Unknown => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prop_direction_accepts() {
        assert!(PropDirection::Forward.accepts(0.));
        assert!(PropDirection::Forward.accepts(2.));
        assert!(!PropDirection::Forward.accepts(-2.));
        assert!(PropDirection::Backward.accepts(-2.));
        assert!(!PropDirection::Backward.accepts(1e-9));
        assert!(PropDirection::Unknown.accepts(-5.));
    }

    #[test]
    fn test_track_direction_sign_roundtrip() {
        for dir in [TrackDirection::Forward, TrackDirection::Backward] {
            assert_eq!(TrackDirection::from_sign(dir.sign()), dir);
            assert_eq!(dir.reversed().reversed(), dir);
        }
        assert_eq!(TrackDirection::from_sign(0.), TrackDirection::Unknown);
    }
}

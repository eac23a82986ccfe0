// trkf_core/src/error.rs

use thiserror::Error;

/// Every failure the track-fitting core can report.
///
/// Failures come in two classes. *Recoverable* failures (a destination that
/// cannot be reached, a range-out, a singular residual matrix...) leave every
/// input untouched and are expected during normal fitting; callers typically
/// skip the offending surface or hit. All other variants signal a misuse of
/// the API and should abort the pipeline. Use [`KalmanError::is_recoverable`]
/// to tell them apart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KalmanError {
    #[error("surfaces are not parallel")]
    NotParallel,

    #[error("surface mismatch: {0}")]
    SurfaceMismatch(&'static str),

    #[error("a track direction is required on a plane surface")]
    DirectionRequired,

    #[error("track state is not valid on its surface")]
    InvalidState,

    #[error("track container is empty")]
    EmptyTrack,

    #[error("track has zero momentum")]
    NullMomentum,

    #[error("unsupported surface type: {0}")]
    UnsupportedSurface(&'static str),

    #[error("matrix is singular")]
    SingularMatrix,

    #[error("particle ranged out after {path:.3} cm")]
    RangeOut { path: f64 },

    #[error("track is parallel to the destination surface")]
    TrackParallelToPlane,

    #[error("propagation did not converge after {0} steps")]
    IterationLimit(usize),

    #[error("signed path {path:.4} cm disagrees with the requested direction")]
    DirectionMismatch { path: f64 },

    #[error("destination is {distance:.3e} cm from the track, beyond tolerance {max_dist:.3e} cm")]
    OutOfTolerance { distance: f64, max_dist: f64 },

    #[error("measurement surface differs from the state surface and no propagator was supplied")]
    MissingPropagator,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown readout channel {0}")]
    UnknownChannel(u32),
}

impl KalmanError {
    /// `true` for failures that are part of normal fitting (the destination
    /// could not be reached, the particle stopped, a residual matrix was
    /// singular) rather than API misuse.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KalmanError::TrackParallelToPlane
                | KalmanError::OutOfTolerance { .. }
                | KalmanError::DirectionMismatch { .. }
                | KalmanError::SingularMatrix
                | KalmanError::RangeOut { .. }
                | KalmanError::IterationLimit(_)
                | KalmanError::InvalidState
        )
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        KalmanError::InvalidConfig(msg.into())
    }
}

pub type KalmanResult<T> = Result<T, KalmanError>;

// trkf_core/src/prelude.rs

// --- Core Abstractions ---
pub use crate::models::measurement::{KHitBase, MeasurementModel, Prediction};
pub use crate::models::propagation::{Propagation, Propagator};
pub use crate::services::{DetectorProperties, DetectorServices, Geometry, LArProperties, WireId};
pub use crate::surfaces::{Surface, SurfaceGeometry, SurfaceHandle};

// --- Core Data Structures ---
pub use crate::config::{FilterConfig, KalmanConfig, PropagatorConfig};
pub use crate::error::{KalmanError, KalmanResult};
pub use crate::estimation::{KETrack, KGTrack, KHitContainer, KHitGroup, KHitTrack, KTrack};
pub use crate::messages::{FittedTrack, Hit, TrajectoryPoint};
pub use crate::types::{PropDirection, TrackDirection, TrackError, TrackMatrix, TrackVector};

// --- Estimation Algorithms ---
pub use crate::estimation::KalmanFilter;

// --- Concrete Implementations ---
pub use crate::models::measurement::{KHitWireLine, KHitWireX};
pub use crate::models::propagation::{PropAny, PropXYZPlane, PropYZLine, PropYZPlane, PropZero};
pub use crate::services::{SimpleWireGeometry, StandardDetectorProperties, StandardLArProperties};
pub use crate::surfaces::{SurfXYZPlane, SurfYZLine, SurfYZPlane};

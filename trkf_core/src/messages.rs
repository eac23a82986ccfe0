// trkf_core/src/messages.rs

use crate::services::WireId;
use crate::types::{Point3, TrackError};
use nalgebra::Vector3;
use std::collections::BTreeMap;

// =========================================================================
// == Input Data Structures ==
// =========================================================================

/// A reconstructed hit on one readout wire, as delivered by hit finding.
///
/// Only the fields the fitter reads are carried.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub channel: u32,
    pub wire: WireId,
    /// Peak time in ticks.
    pub peak_time: f64,
    /// Peak time uncertainty in ticks.
    pub sigma_peak_time: f64,
    /// Integrated charge (ADC counts).
    pub integral: f64,
}

// =========================================================================
// == Output Data Structures ==
// =========================================================================

/// One fitted trajectory point.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub position: Point3,
    /// Unit direction of motion.
    pub direction: Vector3<f64>,
    /// Momentum magnitude (GeV/c), capped.
    pub momentum: f64,
    /// Path-length key of the point in the fitted track.
    pub path: f64,
    /// Readout plane of the measurement that produced the point.
    pub plane: u32,
}

/// A fitted track ready for consumers outside the fitter.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedTrack {
    pub id: i32,
    /// Points in increasing path order.
    pub trajectory: Vec<TrajectoryPoint>,
    /// Covariance at the first point, on a plane normal to the track.
    pub start_covariance: TrackError,
    /// Covariance at the last point, on a plane normal to the track.
    pub end_covariance: TrackError,
    /// dQ/dx samples per readout plane, in trajectory order.
    pub dqdx: BTreeMap<u32, Vec<f64>>,
}

impl FittedTrack {
    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    /// Sum of the straight segments between consecutive points.
    pub fn length(&self) -> f64 {
        self.trajectory
            .windows(2)
            .map(|pair| (pair[1].position - pair[0].position).norm())
            .sum()
    }

    pub fn start(&self) -> Option<&TrajectoryPoint> {
        self.trajectory.first()
    }

    pub fn end(&self) -> Option<&TrajectoryPoint> {
        self.trajectory.last()
    }
}

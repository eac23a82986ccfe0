// trkf_core/src/estimation/hit_track.rs

use super::track::KETrack;
use crate::models::measurement::KHitBase;
use std::ops::Deref;

/// A fitted state together with the measurement that was folded into it.
#[derive(Debug, Clone)]
pub struct KHitTrack {
    etrack: KETrack,
    hit: Box<dyn KHitBase>,
    /// Path (cm) accumulated along the fit up to this state.
    path: f64,
    /// Distance from the state to the hit at prediction time.
    predicted_distance: f64,
    chisq: f64,
}

impl KHitTrack {
    pub fn new(
        etrack: KETrack,
        hit: Box<dyn KHitBase>,
        path: f64,
        predicted_distance: f64,
        chisq: f64,
    ) -> Self {
        Self {
            etrack,
            hit,
            path,
            predicted_distance,
            chisq,
        }
    }

    pub fn etrack(&self) -> &KETrack {
        &self.etrack
    }

    pub fn hit(&self) -> &dyn KHitBase {
        self.hit.as_ref()
    }

    pub fn path(&self) -> f64 {
        self.path
    }

    pub fn predicted_distance(&self) -> f64 {
        self.predicted_distance
    }

    /// Incremental chi-square of the hit at update time.
    pub fn chisq(&self) -> f64 {
        self.chisq
    }

    /// Key of this state in a [`KGTrack`](super::KGTrack).
    pub fn key(&self) -> f64 {
        self.path + self.predicted_distance
    }
}

impl Deref for KHitTrack {
    type Target = KETrack;

    fn deref(&self) -> &KETrack {
        &self.etrack
    }
}

// trkf_core/src/estimation/gtrack.rs

use super::hit_track::KHitTrack;
use super::track::KTrack;
use crate::config::PropagatorConfig;
use crate::error::{KalmanError, KalmanResult};
use crate::linalg::symmetrize;
use crate::messages::{FittedTrack, TrajectoryPoint};
use crate::models::measurement::KHitBase;
use crate::models::propagation::PropZero;
use crate::surfaces::{Surface, SurfXYZPlane, SurfaceGeometry};
use crate::types::TrackError;
use std::collections::BTreeMap;

/// The accepted states of a fitted track, ordered by path length.
///
/// States are keyed by `path + predicted_distance`. Equal keys keep their
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct KGTrack {
    pref_plane: Option<u32>,
    states: Vec<(f64, KHitTrack)>,
    ref_track: Option<KTrack>,
}

impl KGTrack {
    pub fn new(pref_plane: Option<u32>) -> Self {
        Self {
            pref_plane,
            ..Self::default()
        }
    }

    pub fn pref_plane(&self) -> Option<u32> {
        self.pref_plane
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// `(key, state)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &KHitTrack)> {
        self.states.iter().map(|(key, trh)| (*key, trh))
    }

    pub fn add_track(&mut self, trh: KHitTrack) {
        let key = trh.key();
        let at = self.states.partition_point(|(k, _)| *k <= key);
        self.states.insert(at, (key, trh));
    }

    /// The state with the lowest key.
    pub fn start_track(&self) -> KalmanResult<&KHitTrack> {
        self.states
            .first()
            .map(|(_, trh)| trh)
            .ok_or(KalmanError::EmptyTrack)
    }

    /// The state with the highest key.
    pub fn end_track(&self) -> KalmanResult<&KHitTrack> {
        self.states
            .last()
            .map(|(_, trh)| trh)
            .ok_or(KalmanError::EmptyTrack)
    }

    /// Shifts every key so that the lowest is zero.
    pub fn recalibrate(&mut self) {
        let Some(&(first, _)) = self.states.first() else {
            return;
        };
        for (key, _) in &mut self.states {
            *key -= first;
        }
    }

    /// Optional linearization reference for refits.
    pub fn ref_track(&self) -> Option<&KTrack> {
        self.ref_track.as_ref()
    }

    pub fn set_ref_track(&mut self, trk: KTrack) {
        self.ref_track = Some(trk);
    }

    pub fn clear_ref_track(&mut self) {
        self.ref_track = None;
    }

    /// The measurements of every state, in key order.
    pub fn fill_hits(&self) -> Vec<&dyn KHitBase> {
        self.states.iter().map(|(_, trh)| trh.hit()).collect()
    }

    /// Materializes the fit.
    ///
    /// Unless `store_np_plane` is set, states measured outside the preferred
    /// plane are left out. Returns `None` when fewer than two states remain.
    pub fn fill_track(
        &self,
        id: i32,
        store_np_plane: bool,
        config: &PropagatorConfig,
    ) -> KalmanResult<Option<FittedTrack>> {
        let kept: Vec<(f64, &KHitTrack)> = self
            .iter()
            .filter(|(_, trh)| {
                store_np_plane
                    || self
                        .pref_plane
                        .map_or(true, |plane| trh.hit().meas_plane() == plane)
            })
            .collect();
        let (Some(&(_, first)), Some(&(_, last))) = (kept.first(), kept.last()) else {
            return Ok(None);
        };
        if kept.len() < 2 {
            return Ok(None);
        }

        let mut trajectory = Vec::with_capacity(kept.len());
        let mut dqdx: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for &(path, trh) in &kept {
            let momentum = trh.momentum_capped(config.max_momentum)?;
            let p = momentum.norm();
            if p == 0. {
                return Err(KalmanError::NullMomentum);
            }
            let direction = momentum / p;

            let hit = trh.hit();
            let plane = hit.meas_plane();
            if let Some(pitch) = hit.wire_pitch() {
                // Track length seen by one wire.
                let across = direction.dot(&trh.surface().rotation().row(2).transpose()).abs();
                if across > 0. {
                    dqdx.entry(plane)
                        .or_default()
                        .push(hit.charge() * across / pitch);
                }
            }

            trajectory.push(TrajectoryPoint {
                position: trh.position(),
                direction,
                momentum: p,
                path,
                plane,
            });
        }

        let zero = PropZero::new(config.max_dist);
        Ok(Some(FittedTrack {
            id,
            trajectory,
            start_covariance: normal_plane_error(&zero, first)?,
            end_covariance: normal_plane_error(&zero, last)?,
            dqdx,
        }))
    }
}

/// The covariance of `trh` on a plane through its position normal to its
/// direction.
fn normal_plane_error(zero: &PropZero, trh: &KHitTrack) -> KalmanResult<TrackError> {
    let plane = Surface::from(SurfXYZPlane::from_normal(
        &trh.position(),
        &trh.unit_direction()?,
    ))
    .into_handle();
    let (_, jac) = zero.transform(trh, &plane)?;
    let mut error = jac * trh.error() * jac.transpose();
    symmetrize(&mut error);
    Ok(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::track::KETrack;
    use crate::models::measurement::KHitWireX;
    use crate::models::propagation::tests::services;
    use crate::services::{DetectorServices, WireId};
    use crate::types::{TrackDirection, TrackVector};
    use approx::assert_abs_diff_eq;

    fn state(plane: u32, wire: u32, slope: f64, path: f64, services: &DetectorServices) -> KHitTrack {
        let id = WireId {
            cryostat: 0,
            tpc: 0,
            plane,
            wire,
        };
        let hit = KHitWireX::at_x(&id, 10., 0.1, services)
            .unwrap()
            .with_charge(60.);
        let trk = KTrack::new(
            hit.meas_surface().clone(),
            TrackVector::new(10., 0., slope, 0., 2.),
            TrackDirection::Forward,
        );
        let tre = KETrack::with_starting_error(trk);
        KHitTrack::new(tre, Box::new(hit), path, 0., 1.)
    }

    #[test]
    fn test_ordering_and_endpoints() {
        let services = services();
        let mut gtrack = KGTrack::new(Some(2));
        assert_eq!(gtrack.start_track().err(), Some(KalmanError::EmptyTrack));
        assert_eq!(gtrack.end_track().err(), Some(KalmanError::EmptyTrack));

        for (wire, path) in [(30, 3.), (10, 1.), (20, 2.), (21, 2.)] {
            gtrack.add_track(state(2, wire, 0., path, &services));
        }
        let keys: Vec<f64> = gtrack.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![1., 2., 2., 3.]);
        assert_eq!(gtrack.fill_hits().len(), 4);
        assert_eq!(gtrack.start_track().unwrap().path(), 1.);
        assert_eq!(gtrack.end_track().unwrap().path(), 3.);

        // Equal keys keep insertion order: wire 20 (z = 6.15) before wire 21.
        let z: Vec<f64> = gtrack.iter().map(|(_, trh)| trh.position().z).collect();
        assert_abs_diff_eq!(z[1], 6.15, epsilon = 1e-9);
        assert_abs_diff_eq!(z[2], 6.45, epsilon = 1e-9);
    }

    #[test]
    fn test_recalibrate_is_idempotent() {
        let services = services();
        let mut gtrack = KGTrack::new(None);
        gtrack.recalibrate();
        for (wire, path) in [(10, 4.5), (20, 7.)] {
            gtrack.add_track(state(2, wire, 0., path, &services));
        }
        gtrack.recalibrate();
        let once: Vec<f64> = gtrack.iter().map(|(key, _)| key).collect();
        gtrack.recalibrate();
        let twice: Vec<f64> = gtrack.iter().map(|(key, _)| key).collect();
        assert_eq!(once, vec![0., 2.5]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fill_track() {
        let services = services();
        let mut gtrack = KGTrack::new(Some(2));
        gtrack.add_track(state(2, 10, 0.75, 0., &services));
        gtrack.add_track(state(2, 20, 0.75, 3., &services));
        gtrack.add_track(state(1, 200, 0.75, 1.5, &services));

        let config = PropagatorConfig::default();
        let track = gtrack.fill_track(7, true, &config).unwrap().unwrap();
        assert_eq!(track.id, 7);
        assert_eq!(track.len(), 3);
        assert_eq!(track.trajectory[1].plane, 1);
        for point in &track.trajectory {
            assert_abs_diff_eq!(point.momentum, 0.5, epsilon = 1e-12);
            assert_abs_diff_eq!(point.direction.norm(), 1., epsilon = 1e-12);
        }

        // dx = pitch * sqrt(1 + 0.75^2) = 0.375 for a 0.3 cm pitch.
        let collection = &track.dqdx[&2];
        assert_eq!(collection.len(), 2);
        assert_abs_diff_eq!(collection[0], 60. / 0.375, epsilon = 1e-9);

        // Endpoint covariances are symmetric and positive on the diagonal.
        for cov in [&track.start_covariance, &track.end_covariance] {
            assert_abs_diff_eq!(*cov, cov.transpose(), epsilon = 1e-9);
            for i in 0..5 {
                assert!(cov[(i, i)] > 0.);
            }
        }

        // Dropping the induction state still leaves two points.
        let preferred = gtrack.fill_track(7, false, &config).unwrap().unwrap();
        assert_eq!(preferred.len(), 2);
        assert!(!preferred.dqdx.contains_key(&1));
    }

    #[test]
    fn test_fill_track_needs_two_states() {
        let services = services();
        let mut gtrack = KGTrack::new(Some(2));
        gtrack.add_track(state(2, 10, 0., 0., &services));
        gtrack.add_track(state(1, 200, 0., 1., &services));
        let config = PropagatorConfig::default();
        assert_eq!(gtrack.fill_track(1, false, &config).unwrap(), None);
        assert!(gtrack.fill_track(1, true, &config).unwrap().is_some());
    }

    #[test]
    fn test_ref_track() {
        let services = services();
        let mut gtrack = KGTrack::new(None);
        assert!(gtrack.ref_track().is_none());
        let trh = state(2, 10, 0., 0., &services);
        gtrack.set_ref_track(trh.track().clone());
        assert!(gtrack.ref_track().is_some());
        gtrack.clear_ref_track();
        assert!(gtrack.ref_track().is_none());
    }
}

// trkf_core/src/estimation/filter.rs

use super::gtrack::KGTrack;
use super::hit_container::KHitContainer;
use super::hit_group::KHitGroup;
use super::hit_track::KHitTrack;
use super::track::KETrack;
use crate::config::FilterConfig;
use crate::error::KalmanResult;
use crate::models::measurement::Prediction;
use crate::models::propagation::Propagator;
use crate::types::PropDirection;
use tracing::{debug, trace};

/// A forward Kalman filter that builds a track from a seed and a container
/// of candidate hits.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    propagator: Box<dyn Propagator>,
    config: FilterConfig,
}

impl KalmanFilter {
    pub fn new(propagator: Box<dyn Propagator>, config: FilterConfig) -> KalmanResult<Self> {
        config.validate()?;
        Ok(Self { propagator, config })
    }

    pub fn propagator(&self) -> &dyn Propagator {
        self.propagator.as_ref()
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Runs the filter from `seed` along `dir`.
    ///
    /// Groups are visited in path order from the seed. For each, the state
    /// is propagated with noise and energy loss to the group surface, the
    /// hit with the smallest incremental chi-square is selected, and if it
    /// passes the cut the state is updated and recorded. Visited groups end
    /// up unused; groups out of reach stay unsorted.
    ///
    /// The order comes from the seed, so once the state has been updated a
    /// group may lie slightly behind it. Such steps are taken as long as they
    /// go back no more than `max_backtrack_distance`.
    pub fn build_track(
        &self,
        seed: &KETrack,
        hits: &mut KHitContainer,
        pref_plane: Option<u32>,
        dir: PropDirection,
    ) -> KalmanResult<KGTrack> {
        let prop = self.propagator();
        let mut gtrack = KGTrack::new(pref_plane);
        let mut tre = seed.clone();
        let mut path = 0.;

        hits.sort(tre.track(), true, prop, dir);

        while let Some(group) = hits.pop_sorted() {
            let Some(surface) = group.surface().cloned() else {
                hits.add_unused(group);
                continue;
            };

            let mut moved = tre.clone();
            // Direction is checked below, with some slack.
            let result = prop.noise_prop(&mut moved, &surface, PropDirection::Unknown, true, None);
            let step = match result {
                Ok(step) => step,
                Err(err) if err.is_recoverable() => {
                    debug!(%surface, %err, "dropping unreachable hit group");
                    hits.add_unused(group);
                    continue;
                }
                Err(err) => return Err(err),
            };
            let behind = backtrack(dir, step.distance);
            if behind > self.config.max_backtrack_distance {
                debug!(%surface, behind, "hit group behind the track");
                hits.add_unused(group);
                continue;
            }
            if step.distance.abs() > self.config.max_propagation_distance {
                debug!(distance = step.distance, "hit group beyond propagation limit");
                hits.add_unsorted(group);
                continue;
            }
            tre = moved;
            path += step.distance;

            if let Some((index, prediction)) = self.best_hit(&group, &tre)? {
                if prediction.chisq < self.config.max_incremental_chisq {
                    let hit = &group.hits()[index];
                    hit.update(&prediction, &mut tre)?;
                    trace!(path, chisq = prediction.chisq, id = hit.id(), "hit added");
                    gtrack.add_track(KHitTrack::new(
                        tre.clone(),
                        hit.clone(),
                        path,
                        prediction.distance,
                        prediction.chisq,
                    ));
                }
            }
            hits.add_unused(group);
        }

        debug!(states = gtrack.len(), path, "track built");
        Ok(gtrack)
    }

    /// Index and prediction of the hit of `group` with the smallest
    /// incremental chi-square.
    fn best_hit(&self, group: &KHitGroup, tre: &KETrack) -> KalmanResult<Option<(usize, Prediction)>> {
        let mut best: Option<(usize, Prediction)> = None;
        for (index, hit) in group.hits().iter().enumerate() {
            let prediction = match hit.predict(tre, Some(self.propagator()), None) {
                Ok(prediction) => prediction,
                Err(err) if err.is_recoverable() => continue,
                Err(err) => return Err(err),
            };
            if best.as_ref().map_or(true, |(_, b)| prediction.chisq < b.chisq) {
                best = Some((index, prediction));
            }
        }
        Ok(best)
    }
}

/// How far a signed path `s` goes against `dir`.
fn backtrack(dir: PropDirection, s: f64) -> f64 {
    match dir {
        PropDirection::Forward => -s,
        PropDirection::Backward => s,
        PropDirection::Unknown => 0.,
    }
}

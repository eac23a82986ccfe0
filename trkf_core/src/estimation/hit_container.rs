// trkf_core/src/estimation/hit_container.rs

//! Candidate measurements organized for a fit.
//!
//! Groups move between three lists. *Sorted* groups have a known path
//! length from the current seed, *unsorted* groups do not (never sorted, or
//! unreachable at the last sort), and *unused* groups were consumed or
//! discarded by the filter.

use super::hit_group::KHitGroup;
use super::track::KTrack;
use crate::error::KalmanResult;
use crate::messages::Hit;
use crate::models::measurement::{KHitWireLine, KHitWireX};
use crate::models::propagation::Propagator;
use crate::services::DetectorServices;
use crate::surfaces::surf_wire_x;
use crate::types::PropDirection;
use std::collections::{BTreeMap, VecDeque};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct KHitContainer {
    sorted: VecDeque<KHitGroup>,
    unsorted: Vec<KHitGroup>,
    unused: Vec<KHitGroup>,
}

impl KHitContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted(&self) -> &VecDeque<KHitGroup> {
        &self.sorted
    }

    pub fn unsorted(&self) -> &[KHitGroup] {
        &self.unsorted
    }

    pub fn unused(&self) -> &[KHitGroup] {
        &self.unused
    }

    pub fn len(&self) -> usize {
        self.sorted.len() + self.unsorted.len() + self.unused.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.sorted.clear();
        self.unsorted.clear();
        self.unused.clear();
    }

    /// Moves every sorted and unused group back to the unsorted list.
    pub fn reset(&mut self) {
        for mut group in self.sorted.drain(..).chain(self.unused.drain(..)) {
            group.clear_path();
            self.unsorted.push(group);
        }
    }

    pub fn add_unsorted(&mut self, group: KHitGroup) {
        self.unsorted.push(group);
    }

    pub fn add_unused(&mut self, group: KHitGroup) {
        self.unused.push(group);
    }

    /// Takes the nearest sorted group.
    pub fn pop_sorted(&mut self) -> Option<KHitGroup> {
        self.sorted.pop_front()
    }

    /// Orders the sorted list by path length from `seed`.
    ///
    /// With `add_unsorted` the unsorted groups are sorted too. A copy of the
    /// seed is propagated (without errors or energy loss) to every group
    /// surface; groups that cannot be reached in direction `dir` lose their
    /// path and go back to the unsorted list.
    pub fn sort(
        &mut self,
        seed: &KTrack,
        add_unsorted: bool,
        prop: &dyn Propagator,
        dir: PropDirection,
    ) {
        if add_unsorted {
            self.sorted.extend(self.unsorted.drain(..));
        }

        let mut reachable = Vec::with_capacity(self.sorted.len());
        for mut group in self.sorted.drain(..) {
            let path = group.surface().and_then(|surface| {
                let mut trk = seed.clone();
                match prop.vec_prop(&mut trk, surface, dir, false, false) {
                    Ok(step) => Some(step.distance),
                    Err(err) => {
                        trace!(%surface, %err, "group unreachable from seed");
                        None
                    }
                }
            });
            match path {
                Some(path) => {
                    group.set_path(path);
                    reachable.push(group);
                }
                None => {
                    group.clear_path();
                    self.unsorted.push(group);
                }
            }
        }

        reachable.sort_by(|a, b| {
            let (pa, pb) = (a.path().unwrap_or(0.), b.path().unwrap_or(0.));
            pa.total_cmp(&pb)
        });
        self.sorted = reachable.into();
    }

    /// The plane with the most unsorted groups (lowest plane on ties).
    pub fn preferred_plane(&self) -> Option<u32> {
        let mut counts = BTreeMap::new();
        for plane in self.unsorted.iter().filter_map(KHitGroup::plane) {
            *counts.entry(plane).or_insert(0usize) += 1;
        }
        counts
            .into_iter()
            .rev()
            .max_by_key(|&(_, n)| n)
            .map(|(plane, _)| plane)
    }

    // --- Wire Hit Adapters ---

    /// Adds wire-X measurements for `hits`, one group per channel, all hits
    /// of a channel sharing one surface. With `only_plane` set, hits on
    /// other planes are ignored.
    pub fn fill_wire_x(
        &mut self,
        hits: &[Hit],
        services: &DetectorServices,
        only_plane: Option<u32>,
    ) -> KalmanResult<()> {
        let mut groups: BTreeMap<u32, KHitGroup> = BTreeMap::new();
        for hit in selected(hits, only_plane) {
            let group = groups.entry(hit.channel).or_default();
            let surface = match group.surface() {
                Some(surface) => surface.clone(),
                None => surf_wire_x(services.geometry.as_ref(), &hit.wire)?.into_handle(),
            };
            group.add_hit(Box::new(KHitWireX::from_hit(hit, Some(surface), services)?))?;
        }
        self.unsorted.extend(groups.into_values());
        Ok(())
    }

    /// Adds wire-line measurements for `hits`, one group per hit.
    pub fn fill_wire_line(
        &mut self,
        hits: &[Hit],
        services: &DetectorServices,
        only_plane: Option<u32>,
    ) -> KalmanResult<()> {
        for hit in selected(hits, only_plane) {
            let mut group = KHitGroup::new();
            group.add_hit(Box::new(KHitWireLine::from_hit(hit, services)?))?;
            self.unsorted.push(group);
        }
        Ok(())
    }
}

fn selected(hits: &[Hit], only_plane: Option<u32>) -> impl Iterator<Item = &Hit> {
    hits.iter()
        .filter(move |hit| only_plane.map_or(true, |plane| hit.wire.plane == plane))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PropagatorConfig;
    use crate::models::propagation::tests::services;
    use crate::models::propagation::PropAny;
    use crate::services::WireId;
    use crate::surfaces::{Surface, SurfYZPlane};
    use crate::types::{TrackDirection, TrackVector};
    use approx::assert_abs_diff_eq;

    fn hit(plane: u32, wire: u32, peak_time: f64, services: &DetectorServices) -> Hit {
        let channel = services.geometry.plane_wire_to_channel(plane, wire, 0, 0);
        Hit {
            channel,
            wire: WireId {
                cryostat: 0,
                tpc: 0,
                plane,
                wire,
            },
            peak_time,
            sigma_peak_time: 1.,
            integral: 100.,
        }
    }

    /// Collection-plane hits along z on wires 50, 60, 70, 80, plus an
    /// induction hit; wire 60 carries two hits.
    fn hits(services: &DetectorServices) -> Vec<Hit> {
        vec![
            hit(2, 70, 100., services),
            hit(2, 50, 100., services),
            hit(2, 60, 100., services),
            hit(2, 60, 300., services),
            hit(2, 80, 100., services),
            hit(0, 300, 100., services),
        ]
    }

    fn seed_at(z: f64) -> KTrack {
        KTrack::new(
            Surface::from(SurfYZPlane::new(0., 0., z, 0.)).into_handle(),
            TrackVector::new(10., 0., 0., 0., 1.),
            TrackDirection::Forward,
        )
    }

    #[test]
    fn test_fill_wire_x_groups_by_channel() {
        let services = services();
        let mut container = KHitContainer::new();
        container.fill_wire_x(&hits(&services), &services, None).unwrap();
        assert_eq!(container.unsorted().len(), 5);
        let doubled = container
            .unsorted()
            .iter()
            .find(|group| group.len() == 2)
            .unwrap();
        assert_eq!(doubled.plane(), Some(2));
        assert_eq!(container.preferred_plane(), Some(2));
    }

    #[test]
    fn test_fill_wire_line_respects_plane_filter() {
        let services = services();
        let mut container = KHitContainer::new();
        container
            .fill_wire_line(&hits(&services), &services, Some(2))
            .unwrap();
        assert_eq!(container.unsorted().len(), 5);
        assert!(container.unsorted().iter().all(|g| g.len() == 1));
    }

    #[test]
    fn test_sort_orders_by_path_and_drops_unreachable() {
        let services = services();
        let prop = PropAny::new(PropagatorConfig::default(), &services, false).unwrap();
        let mut container = KHitContainer::new();
        container
            .fill_wire_x(&hits(&services), &services, Some(2))
            .unwrap();

        // Between wires 60 and 70: wires 50 and 60 are behind.
        let z60 = 60.5 * 0.3;
        let seed = seed_at(z60 + 1.);
        container.sort(&seed, true, &prop, PropDirection::Forward);

        assert_eq!(container.sorted().len(), 2);
        assert_eq!(container.unsorted().len(), 2);
        let paths: Vec<f64> = container.sorted().iter().filter_map(KHitGroup::path).collect();
        assert_abs_diff_eq!(paths[0], 2., epsilon = 1e-9);
        assert_abs_diff_eq!(paths[1], 5., epsilon = 1e-9);
        assert!(container.unsorted().iter().all(|g| !g.has_path()));

        // Backwards from the same seed the order flips.
        container.reset();
        container.sort(&seed, true, &prop, PropDirection::Backward);
        let paths: Vec<f64> = container.sorted().iter().filter_map(KHitGroup::path).collect();
        assert_eq!(paths.len(), 2);
        assert_abs_diff_eq!(paths[0], -4., epsilon = 1e-9);
        assert_abs_diff_eq!(paths[1], -1., epsilon = 1e-9);
    }

    #[test]
    fn test_reset_and_clear() {
        let services = services();
        let prop = PropAny::new(PropagatorConfig::default(), &services, false).unwrap();
        let mut container = KHitContainer::new();
        container
            .fill_wire_x(&hits(&services), &services, Some(2))
            .unwrap();
        container.sort(&seed_at(0.), true, &prop, PropDirection::Forward);
        assert_eq!(container.sorted().len(), 4);

        let group = container.pop_sorted().unwrap();
        container.add_unused(group);
        assert_eq!(container.unused().len(), 1);

        container.reset();
        assert_eq!(container.unsorted().len(), 4);
        assert!(container.sorted().is_empty() && container.unused().is_empty());

        container.clear();
        assert!(container.is_empty());
    }
}

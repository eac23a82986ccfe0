// trkf_core/src/estimation/hit_group.rs

use crate::error::{KalmanError, KalmanResult};
use crate::models::measurement::KHitBase;
use crate::surfaces::SurfaceHandle;

/// Measurements sharing one measurement surface, typically every hit on a
/// single readout channel.
///
/// The group carries the candidate path length the container computed for
/// it during the last sort.
#[derive(Debug, Clone, Default)]
pub struct KHitGroup {
    hits: Vec<Box<dyn KHitBase>>,
    path: Option<f64>,
    plane: Option<u32>,
    surface: Option<SurfaceHandle>,
}

impl KHitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hit. Its surface must equal the surface of the hits already in
    /// the group.
    pub fn add_hit(&mut self, hit: Box<dyn KHitBase>) -> KalmanResult<()> {
        match &self.surface {
            Some(surface) if !surface.is_equal(hit.meas_surface()) => {
                return Err(KalmanError::SurfaceMismatch(
                    "hit surface differs from the group surface",
                ));
            }
            Some(_) => {}
            None => self.surface = Some(hit.meas_surface().clone()),
        }
        self.plane.get_or_insert(hit.meas_plane());
        self.hits.push(hit);
        Ok(())
    }

    pub fn hits(&self) -> &[Box<dyn KHitBase>] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// The shared measurement surface, once a hit has been added.
    pub fn surface(&self) -> Option<&SurfaceHandle> {
        self.surface.as_ref()
    }

    /// Readout plane of the first hit.
    pub fn plane(&self) -> Option<u32> {
        self.plane
    }

    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    /// Candidate path length from the last sort, if any.
    pub fn path(&self) -> Option<f64> {
        self.path
    }

    pub fn set_path(&mut self, path: f64) {
        self.path = Some(path);
    }

    pub fn clear_path(&mut self) {
        self.path = None;
    }
}

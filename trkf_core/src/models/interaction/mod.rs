// trkf_core/src/models/interaction/mod.rs

//! Material effects: mean energy loss and process noise.

use crate::error::{KalmanError, KalmanResult};
use crate::estimation::track::KTrack;
use crate::linalg::{invert, symmetrize};
use crate::models::propagation::PropZero;
use crate::services::DetectorServices;
use crate::surfaces::{Surface, SurfXYZPlane};
use crate::types::TrackError;

pub mod energy_loss;
pub mod plane;

pub use energy_loss::{dedx_prop, kinetic_energy, DedxStep};
pub use plane::plane_noise;

/// Process-noise model for liquid argon.
///
/// Plane states get the closed-form plane noise directly. Any other state is
/// first transformed onto a plane normal to its momentum, the noise is
/// evaluated there and mapped back with `Q = F^-1 Q_plane F^-T`.
#[derive(Debug, Clone)]
pub struct Interactor {
    services: DetectorServices,
    tcut: f64,
    zero: PropZero,
}

impl Interactor {
    pub fn new(services: DetectorServices, tcut: f64, zero: PropZero) -> KalmanResult<Self> {
        if !(tcut >= 0.) {
            return Err(KalmanError::invalid_config(format!(
                "tcut must be non-negative, got {tcut}"
            )));
        }
        Ok(Self {
            services,
            tcut,
            zero,
        })
    }

    pub fn tcut(&self) -> f64 {
        self.tcut
    }

    pub fn services(&self) -> &DetectorServices {
        &self.services
    }

    /// Noise accumulated by `trk` over the signed path `s` ending at its
    /// current position.
    pub fn noise(&self, trk: &KTrack, s: f64) -> KalmanResult<TrackError> {
        if trk.surface().is_plane() {
            plane_noise(&self.services, self.tcut, trk, s)
        } else {
            self.general_noise(trk, s)
        }
    }

    fn general_noise(&self, trk: &KTrack, s: f64) -> KalmanResult<TrackError> {
        let normal = trk.unit_direction()?;
        let plane = Surface::from(SurfXYZPlane::from_normal(&trk.position(), &normal)).into_handle();
        let (on_plane, jacobian) = self.zero.transform(trk, &plane)?;
        let q_plane = plane_noise(&self.services, self.tcut, &on_plane, s)?;

        let mut finv = jacobian;
        if !invert(&mut finv) {
            return Err(KalmanError::SingularMatrix);
        }
        let mut q = finv * q_plane * finv.transpose();
        symmetrize(&mut q);
        Ok(q)
    }
}

// trkf_core/src/models/propagation/yz_line.rs

use super::{require_kind, step, Propagation, Propagator, PropagatorBase};
use crate::config::PropagatorConfig;
use crate::error::KalmanResult;
use crate::estimation::track::KTrack;
use crate::services::DetectorServices;
use crate::surfaces::{SurfaceHandle, SurfaceKind};
use crate::types::PropDirection;

/// Propagates to [`SurfYZLine`](crate::surfaces::SurfYZLine) destinations,
/// ending at the point of closest approach to the line.
#[derive(Debug, Clone)]
pub struct PropYZLine {
    base: PropagatorBase,
}

impl PropYZLine {
    pub fn new(
        config: PropagatorConfig,
        services: &DetectorServices,
        with_noise: bool,
    ) -> KalmanResult<Self> {
        Ok(Self::from_base(PropagatorBase::new(config, services, with_noise)?))
    }

    pub fn from_base(base: PropagatorBase) -> Self {
        Self { base }
    }
}

impl Propagator for PropYZLine {
    fn base(&self) -> &PropagatorBase {
        &self.base
    }

    fn short_vec_prop(
        &self,
        trk: &mut KTrack,
        surf: &SurfaceHandle,
        dir: PropDirection,
        do_dedx: bool,
        with_noise: bool,
    ) -> KalmanResult<Propagation> {
        require_kind(surf, SurfaceKind::YZLine)?;
        step::short_step(&self.base, trk, surf, dir, do_dedx, with_noise)
    }

    fn origin_vec_prop(&self, trk: &mut KTrack, orient: &SurfaceHandle) -> KalmanResult<Propagation> {
        require_kind(orient, SurfaceKind::YZLine)?;
        step::origin_step(&self.base, trk, orient)
    }
}

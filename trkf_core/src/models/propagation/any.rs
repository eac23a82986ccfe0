// trkf_core/src/models/propagation/any.rs

use super::{Propagation, Propagator, PropagatorBase, PropXYZPlane, PropYZLine, PropYZPlane};
use crate::config::PropagatorConfig;
use crate::error::KalmanResult;
use crate::estimation::track::KTrack;
use crate::services::DetectorServices;
use crate::surfaces::{Surface, SurfaceHandle};
use crate::types::PropDirection;

/// Propagates to any surface type by handing off to the matching
/// single-type propagator.
#[derive(Debug, Clone)]
pub struct PropAny {
    yz_line: PropYZLine,
    yz_plane: PropYZPlane,
    xyz_plane: PropXYZPlane,
}

impl PropAny {
    pub fn new(
        config: PropagatorConfig,
        services: &DetectorServices,
        with_noise: bool,
    ) -> KalmanResult<Self> {
        let base = PropagatorBase::new(config, services, with_noise)?;
        Ok(Self {
            yz_line: PropYZLine::from_base(base.clone()),
            yz_plane: PropYZPlane::from_base(base.clone()),
            xyz_plane: PropXYZPlane::from_base(base),
        })
    }

    fn for_surface(&self, surf: &Surface) -> &dyn Propagator {
        match surf {
            Surface::YZLine(_) => &self.yz_line,
            Surface::YZPlane(_) => &self.yz_plane,
            Surface::XYZPlane(_) => &self.xyz_plane,
        }
    }
}

impl Propagator for PropAny {
    fn base(&self) -> &PropagatorBase {
        self.yz_plane.base()
    }

    fn short_vec_prop(
        &self,
        trk: &mut KTrack,
        surf: &SurfaceHandle,
        dir: PropDirection,
        do_dedx: bool,
        with_noise: bool,
    ) -> KalmanResult<Propagation> {
        self.for_surface(surf)
            .short_vec_prop(trk, surf, dir, do_dedx, with_noise)
    }

    fn origin_vec_prop(&self, trk: &mut KTrack, orient: &SurfaceHandle) -> KalmanResult<Propagation> {
        self.for_surface(orient).origin_vec_prop(trk, orient)
    }
}

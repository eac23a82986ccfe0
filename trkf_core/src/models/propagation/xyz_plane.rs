// trkf_core/src/models/propagation/xyz_plane.rs

use super::{require_kind, step, Propagation, Propagator, PropagatorBase};
use crate::config::PropagatorConfig;
use crate::error::KalmanResult;
use crate::estimation::track::KTrack;
use crate::services::DetectorServices;
use crate::surfaces::{SurfaceHandle, SurfaceKind};
use crate::types::PropDirection;

/// Propagates to [`SurfXYZPlane`](crate::surfaces::SurfXYZPlane) destinations.
#[derive(Debug, Clone)]
pub struct PropXYZPlane {
    base: PropagatorBase,
}

impl PropXYZPlane {
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

impl Propagator for PropXYZPlane {
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
        require_kind(surf, SurfaceKind::XYZPlane)?;
        step::short_step(&self.base, trk, surf, dir, do_dedx, with_noise)
    }

    fn origin_vec_prop(&self, trk: &mut KTrack, orient: &SurfaceHandle) -> KalmanResult<Propagation> {
        require_kind(orient, SurfaceKind::XYZPlane)?;
        step::origin_step(&self.base, trk, orient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KalmanError;
    use crate::models::propagation::tests::services;
    use crate::models::propagation::zero::tests::numeric_jacobian;
    use crate::surfaces::{Surface, SurfXYZPlane, SurfYZLine, SurfYZPlane, SurfaceGeometry};
    use crate::types::{TrackDirection, TrackVector};
    use approx::assert_abs_diff_eq;

    fn propagator(with_noise: bool) -> PropXYZPlane {
        PropXYZPlane::new(PropagatorConfig::default(), &services(), with_noise).unwrap()
    }

    fn line_start() -> KTrack {
        KTrack::new(
            Surface::from(SurfYZLine::new(2., -1., 5., 0.3)).into_handle(),
            TrackVector::new(0.2, 0.7, 0.4, 0.3, 0.9),
            TrackDirection::Unknown,
        )
    }

    #[test]
    fn test_from_line_to_tilted_plane() {
        let prop = propagator(false);
        let mut trk = line_start();
        let p0 = trk.position();
        let d0 = trk.unit_direction().unwrap();
        let dest = Surface::from(SurfXYZPlane::from_normal(
            &(p0 + d0 * 12.),
            &nalgebra::Vector3::new(0.2, 0.1, 1.),
        ))
        .into_handle();

        let result = prop
            .short_vec_prop(&mut trk, &dest, PropDirection::Forward, false, false)
            .unwrap();
        assert!(result.distance > 0.);
        assert_abs_diff_eq!(trk.position(), p0 + d0 * result.distance, epsilon = 1e-9);
        assert_abs_diff_eq!(trk.unit_direction().unwrap(), d0, epsilon = 1e-12);
        assert_abs_diff_eq!(dest.to_local(&trk.position()).z, 0., epsilon = 1e-9);
    }

    #[test]
    fn test_jacobian_from_line_matches_finite_differences() {
        let prop = propagator(false);
        let trk = line_start();
        let dest = Surface::from(SurfXYZPlane::new(3., 1., 15., 0.2, -0.4)).into_handle();
        let jac = prop
            .short_vec_prop(&mut trk.clone(), &dest, PropDirection::Unknown, false, false)
            .unwrap()
            .jacobian;
        let numeric = numeric_jacobian(&trk, |t| {
            let mut t = t.clone();
            prop.short_vec_prop(&mut t, &dest, PropDirection::Unknown, false, false)
                .unwrap();
            t
        });
        assert_abs_diff_eq!(jac, numeric, epsilon = 1e-5);
    }

    #[test]
    fn test_noise_on_plane_destination() {
        let prop = propagator(true);
        let mut trk = line_start();
        let dest = Surface::from(SurfXYZPlane::new(3., 1., 15., 0.2, -0.4)).into_handle();
        let result = prop
            .short_vec_prop(&mut trk, &dest, PropDirection::Unknown, false, true)
            .unwrap();
        for i in 0..5 {
            assert!(result.noise[(i, i)] > 0.);
        }
    }

    #[test]
    fn test_rejects_yz_plane() {
        let prop = propagator(false);
        let mut trk = line_start();
        let dest = Surface::from(SurfYZPlane::default()).into_handle();
        assert_eq!(
            prop.short_vec_prop(&mut trk, &dest, PropDirection::Unknown, false, false),
            Err(KalmanError::UnsupportedSurface("YZPlane"))
        );
    }
}

// trkf_core/src/models/propagation/yz_plane.rs

use super::{require_kind, step, Propagation, Propagator, PropagatorBase};
use crate::config::PropagatorConfig;
use crate::error::KalmanResult;
use crate::estimation::track::KTrack;
use crate::services::DetectorServices;
use crate::surfaces::{SurfaceHandle, SurfaceKind};
use crate::types::PropDirection;

/// Propagates to [`SurfYZPlane`](crate::surfaces::SurfYZPlane) destinations.
#[derive(Debug, Clone)]
pub struct PropYZPlane {
    base: PropagatorBase,
}

impl PropYZPlane {
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

impl Propagator for PropYZPlane {
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
        require_kind(surf, SurfaceKind::YZPlane)?;
        step::short_step(&self.base, trk, surf, dir, do_dedx, with_noise)
    }

    fn origin_vec_prop(&self, trk: &mut KTrack, orient: &SurfaceHandle) -> KalmanResult<Propagation> {
        require_kind(orient, SurfaceKind::YZPlane)?;
        step::origin_step(&self.base, trk, orient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KalmanError;
    use crate::models::propagation::tests::services;
    use crate::models::propagation::zero::tests::numeric_jacobian;
    use crate::surfaces::{Surface, SurfYZLine, SurfYZPlane, SurfaceGeometry};
    use crate::types::{TrackDirection, TrackVector};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn propagator() -> PropYZPlane {
        PropYZPlane::new(PropagatorConfig::default(), &services(), false).unwrap()
    }

    fn start() -> KTrack {
        KTrack::new(
            Surface::from(SurfYZPlane::new(0., 0., 0., 0.)).into_handle(),
            TrackVector::new(1., 2., 0.5, -0.25, 1.),
            TrackDirection::Forward,
        )
    }

    #[test]
    fn test_parallel_planes_closed_form() {
        let prop = propagator();
        let dest = Surface::from(SurfYZPlane::new(0., 0., 10., 0.)).into_handle();
        let mut trk = start();
        let result = prop
            .short_vec_prop(&mut trk, &dest, PropDirection::Forward, false, false)
            .unwrap();

        let norm = (1. + 0.25 + 0.0625_f64).sqrt();
        assert_relative_eq!(result.distance, 10. * norm, max_relative = 1e-12);
        assert_abs_diff_eq!(
            *trk.vector(),
            TrackVector::new(6., -0.5, 0.5, -0.25, 1.),
            epsilon = 1e-12
        );
        assert_eq!(trk.direction(), TrackDirection::Forward);
        assert_abs_diff_eq!(result.jacobian[(0, 2)], 10., epsilon = 1e-12);
        assert_abs_diff_eq!(result.jacobian[(1, 3)], 10., epsilon = 1e-12);
    }

    #[test]
    fn test_backward_track_has_negative_path() {
        let prop = propagator();
        let dest = Surface::from(SurfYZPlane::new(0., 0., -4., 0.)).into_handle();
        let mut trk = start();
        trk.set_direction(TrackDirection::Backward);
        let result = prop
            .short_vec_prop(&mut trk, &dest, PropDirection::Forward, false, false)
            .unwrap();
        // Moving against the normal towards -z is forward along the track.
        assert!(result.distance > 0.);
        assert_eq!(trk.direction(), TrackDirection::Backward);
    }

    #[test]
    fn test_rotated_destination_preserves_line() {
        let prop = propagator();
        let dest = Surface::from(SurfYZPlane::new(0., 3., 20., 0.6)).into_handle();
        let mut trk = start();
        let p0 = trk.position();
        let d0 = trk.unit_direction().unwrap();
        let result = prop
            .short_vec_prop(&mut trk, &dest, PropDirection::Unknown, false, false)
            .unwrap();
        // The arrival point is on the destination and on the original line.
        assert_abs_diff_eq!(dest.to_local(&trk.position()).z, 0., epsilon = 1e-9);
        assert_abs_diff_eq!(trk.position(), p0 + d0 * result.distance, epsilon = 1e-9);
        assert_abs_diff_eq!(trk.unit_direction().unwrap(), d0, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let prop = propagator();
        let dest = Surface::from(SurfYZPlane::new(0.5, 3., 20., 0.6)).into_handle();
        let mut trk = start();
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

        // Round trip back to the start plane is the identity.
        let back = trk.surface().clone();
        prop.short_vec_prop(&mut trk, &dest, PropDirection::Unknown, false, false)
            .unwrap();
        prop.short_vec_prop(&mut trk, &back, PropDirection::Unknown, false, false)
            .unwrap();
        assert_abs_diff_eq!(*trk.vector(), *start().vector(), epsilon = 1e-9);
    }

    #[test]
    fn test_dedx_jacobian_entry() {
        let prop = propagator();
        let dest = Surface::from(SurfYZPlane::new(0., 0., 10., 0.)).into_handle();
        let mut trk = start();
        let result = prop
            .short_vec_prop(&mut trk, &dest, PropDirection::Forward, true, false)
            .unwrap();
        assert!(trk.vector()[4] > 1.);
        let expected = prop
            .base()
            .dedx_prop(1., trk.mass(), result.distance)
            .unwrap();
        assert_relative_eq!(trk.vector()[4], expected.pinv);
        assert_relative_eq!(result.jacobian[(4, 4)], expected.derivative);
    }

    #[test]
    fn test_wrong_destination_type() {
        let prop = propagator();
        let line = Surface::from(SurfYZLine::default()).into_handle();
        let mut trk = start();
        let before = trk.clone();
        assert_eq!(
            prop.short_vec_prop(&mut trk, &line, PropDirection::Unknown, false, false),
            Err(KalmanError::UnsupportedSurface("YZLine"))
        );
        assert_eq!(
            prop.origin_vec_prop(&mut trk, &line),
            Err(KalmanError::UnsupportedSurface("YZLine"))
        );
        assert_eq!(trk, before);
    }

    #[test]
    fn test_parallel_track_fails() {
        let prop = propagator();
        // Track along z; a plane rotated by 90 degrees has its normal along -y.
        let mut trk = KTrack::new(
            Surface::from(SurfYZPlane::default()).into_handle(),
            TrackVector::new(0., 0., 0., 0., 1.),
            TrackDirection::Forward,
        );
        let dest = Surface::from(SurfYZPlane::new(0., 5., 0., std::f64::consts::FRAC_PI_2))
            .into_handle();
        assert_eq!(
            prop.short_vec_prop(&mut trk, &dest, PropDirection::Unknown, false, false),
            Err(KalmanError::TrackParallelToPlane)
        );
    }

    #[test]
    fn test_origin_vec_prop_keeps_position() {
        let prop = propagator();
        let orient = Surface::from(SurfYZPlane::new(0., 0., 0., 0.4)).into_handle();
        let mut trk = start();
        let p0 = trk.position();
        let result = prop.origin_vec_prop(&mut trk, &orient).unwrap();
        assert_eq!(result.distance, 0.);
        assert!(trk.surface().is_parallel(&orient));
        assert_abs_diff_eq!(trk.position(), p0, epsilon = 1e-9);
    }
}

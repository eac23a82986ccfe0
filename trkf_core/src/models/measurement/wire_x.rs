// trkf_core/src/models/measurement/wire_x.rs

use super::{KHit, MeasurementModel, SubPrediction};
use crate::error::{KalmanError, KalmanResult};
use crate::estimation::track::KETrack;
use crate::messages::Hit;
use crate::services::{DetectorServices, WireId};
use crate::surfaces::{surf_wire_x, SurfaceHandle};
use crate::types::{KHMatrix, KSymMatrix, KVector};

/// Smallest peak-time error (ticks) accepted from hit finding.
pub(crate) const MIN_TIME_ERROR: f64 = 0.288_675_134_594_812_9; // 1/sqrt(12)

/// The drift coordinate `u` of a track crossing a wire plane surface.
///
/// The predicted variance includes the spread of `u` over one wire pitch,
/// `pitch^2 (du/dw)^2 / 12`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireX {
    pub pitch: f64,
}

impl MeasurementModel<1> for WireX {
    fn subpredict(&self, tre: &KETrack) -> KalmanResult<SubPrediction<1>> {
        if !tre.surface().is_plane() {
            return Err(KalmanError::UnsupportedSurface(tre.surface().kind().name()));
        }
        let vec = tre.vector();
        let slope = vec[2];

        let mut h = KHMatrix::<1>::zeros();
        h[(0, 0)] = 1.;
        Ok(SubPrediction {
            vector: KVector::<1>::new(vec[0]),
            error: KSymMatrix::<1>::new(
                tre.error()[(0, 0)] + self.pitch * self.pitch * slope * slope / 12.,
            ),
            h,
        })
    }
}

/// A drift-coordinate measurement on a wire-plane surface.
pub type KHitWireX = KHit<1, WireX>;

impl KHit<1, WireX> {
    /// A measurement of drift coordinate `x` with error `xerr` on `wire`.
    pub fn at_x(
        wire: &WireId,
        x: f64,
        xerr: f64,
        services: &DetectorServices,
    ) -> KalmanResult<Self> {
        let surface = surf_wire_x(services.geometry.as_ref(), wire)?.into_handle();
        Ok(Self::on_surface(surface, wire, x, xerr, services))
    }

    /// Builds the measurement for a reconstructed hit.
    ///
    /// Hits on one channel share a surface; pass it in as `surface` to reuse
    /// it, otherwise a new one is built from the geometry.
    pub fn from_hit(
        hit: &Hit,
        surface: Option<SurfaceHandle>,
        services: &DetectorServices,
    ) -> KalmanResult<Self> {
        let wire = &hit.wire;
        let surface = match surface {
            Some(surface) => surface,
            None => surf_wire_x(services.geometry.as_ref(), wire)?.into_handle(),
        };

        let detprop = services.detprop.as_ref();
        let x = detprop.ticks_to_x(hit.peak_time, wire.plane, wire.tpc, wire.cryostat);
        let terr = hit.sigma_peak_time.max(MIN_TIME_ERROR);
        let xerr = terr * detprop.ticks_coefficient();

        Ok(Self::on_surface(surface, wire, x, xerr, services)
            .with_id(hit_id(hit.channel, hit.peak_time))
            .with_charge(hit.integral))
    }

    fn on_surface(
        surface: SurfaceHandle,
        wire: &WireId,
        x: f64,
        xerr: f64,
        services: &DetectorServices,
    ) -> Self {
        let pitch = services
            .geometry
            .wire_pitch(wire.plane, wire.tpc, wire.cryostat);
        KHit::new(
            surface,
            KVector::<1>::new(x),
            KSymMatrix::<1>::new(xerr * xerr),
            WireX { pitch },
            wire.plane,
        )
        .with_pitch(pitch)
    }
}

/// Unique measurement id from channel and peak time.
pub(crate) fn hit_id(channel: u32, peak_time: f64) -> i64 {
    (channel % 200_000) as i64 * 10_000 + (peak_time.abs() as i64) % 10_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::track::KTrack;
    use crate::models::measurement::KHitBase;
    use crate::config::PropagatorConfig;
    use crate::models::propagation::tests::services;
    use crate::models::propagation::PropYZPlane;
    use crate::surfaces::{Surface, SurfYZLine, SurfYZPlane, SurfaceGeometry};
    use crate::types::{TrackDirection, TrackVector};
    use approx::assert_abs_diff_eq;

    fn hit(channel: u32, peak_time: f64, services: &DetectorServices) -> Hit {
        let wire = services.geometry.channel_to_wire(channel).unwrap();
        Hit {
            channel,
            wire,
            peak_time,
            sigma_peak_time: 0.1,
            integral: 250.,
        }
    }

    #[test]
    fn test_from_hit() {
        let services = services();
        let hit = hit(1, 10., &services);
        let khit = KHitWireX::from_hit(&hit, None, &services).unwrap();

        let detprop = services.detprop.as_ref();
        assert_eq!(khit.id(), 10_010);
        assert_eq!(khit.meas_plane(), 0);
        assert_eq!(khit.charge(), 250.);
        assert_eq!(khit.wire_pitch(), Some(0.3));
        assert_abs_diff_eq!(khit.meas_vector()[0], detprop.ticks_to_x(10., 0, 0, 0));

        // Sub-1/sqrt(12) errors are floored.
        let xerr = MIN_TIME_ERROR * detprop.ticks_coefficient();
        assert_abs_diff_eq!(khit.meas_error()[(0, 0)], xerr * xerr, epsilon = 1e-15);
    }

    #[test]
    fn test_hit_id() {
        assert_eq!(hit_id(1, 10.7), 10_010);
        assert_eq!(hit_id(200_003, -12_345.), 32_345);
    }

    #[test]
    fn test_subpredict_adds_pitch_variance() {
        let model = WireX { pitch: 0.3 };
        let surf = Surface::from(SurfYZPlane::default()).into_handle();
        let trk = KTrack::new(surf, TrackVector::new(4., 1., 2., 0., 1.), TrackDirection::Forward);
        let tre = KETrack::new(trk, crate::types::TrackError::identity());

        let sub = model.subpredict(&tre).unwrap();
        assert_eq!(sub.vector[0], 4.);
        assert_abs_diff_eq!(sub.error[(0, 0)], 1. + 0.09 * 4. / 12., epsilon = 1e-15);
        assert_eq!(sub.h[(0, 0)], 1.);
        assert_eq!(sub.h.sum(), 1.);
    }

    #[test]
    fn test_subpredict_rejects_line() {
        let model = WireX { pitch: 0.3 };
        let surf = Surface::from(SurfYZLine::default()).into_handle();
        let trk = KTrack::new(surf, TrackVector::new(0., 0., 0., 0., 1.), TrackDirection::Unknown);
        let tre = KETrack::with_starting_error(trk);
        assert_eq!(
            model.subpredict(&tre),
            Err(KalmanError::UnsupportedSurface("YZLine"))
        );
    }

    #[test]
    fn test_predict_through_propagator() {
        let services = services();
        let prop = PropYZPlane::new(PropagatorConfig::default(), &services, false).unwrap();
        let wire = services.geometry.channel_to_wire(1).unwrap();
        let khit = KHitWireX::at_x(&wire, 20., 0.05, &services).unwrap();

        // Start on a parallel plane upstream of the wire.
        let meas = khit.meas_surface().clone();
        let upstream = meas.origin() - meas.rotation().row(2).transpose() * 2.;
        let start = meas.with_origin(&upstream).into_handle();
        let trk = KTrack::new(start, TrackVector::new(19., 0., 0.5, 0., 1.), TrackDirection::Forward);
        let tre = KETrack::with_starting_error(trk);

        let pred = khit.predict(&tre, Some(&prop), None).unwrap();
        assert_abs_diff_eq!(pred.distance, 2. * 1.25f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(pred.vector[0], 20., epsilon = 1e-9);
        assert_abs_diff_eq!(pred.residual[0], 0., epsilon = 1e-9);
        // H = H' F picks up the slope dependence of the propagated u.
        assert_abs_diff_eq!(pred.h[(0, 0)], 1., epsilon = 1e-12);
        assert_abs_diff_eq!(pred.h[(0, 2)], 2., epsilon = 1e-9);
        assert!(pred.chisq >= 0.);
        assert!(pred.surface.is_equal(tre.surface()));
    }
}

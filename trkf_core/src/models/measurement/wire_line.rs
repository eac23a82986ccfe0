// trkf_core/src/models/measurement/wire_line.rs

use super::wire_x::{hit_id, MIN_TIME_ERROR};
use super::{KHit, MeasurementModel, SubPrediction};
use crate::error::{KalmanError, KalmanResult};
use crate::estimation::track::KETrack;
use crate::messages::Hit;
use crate::services::{DetectorServices, WireId};
use crate::surfaces::{surf_wire_line, SurfaceKind};
use crate::types::{KHMatrix, KSymMatrix, KVector};

/// The impact parameter of a track to a wire displaced to the hit's drift
/// coordinate. The measured value is always zero.
///
/// No geometric pitch variance is added here.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WireLine;

impl MeasurementModel<1> for WireLine {
    fn subpredict(&self, tre: &KETrack) -> KalmanResult<SubPrediction<1>> {
        if tre.surface().kind() != SurfaceKind::YZLine {
            return Err(KalmanError::UnsupportedSurface(tre.surface().kind().name()));
        }
        let mut h = KHMatrix::<1>::zeros();
        h[(0, 0)] = 1.;
        Ok(SubPrediction {
            vector: KVector::<1>::new(tre.vector()[0]),
            error: KSymMatrix::<1>::new(tre.error()[(0, 0)]),
            h,
        })
    }
}

/// A drift-coordinate measurement expressed as a line surface.
pub type KHitWireLine = KHit<1, WireLine>;

impl KHit<1, WireLine> {
    /// A measurement of drift coordinate `x` with error `xerr` on `wire`.
    pub fn at_x(
        wire: &WireId,
        x: f64,
        xerr: f64,
        services: &DetectorServices,
    ) -> KalmanResult<Self> {
        let surface = surf_wire_line(services.geometry.as_ref(), wire, x)?.into_handle();
        let pitch = services
            .geometry
            .wire_pitch(wire.plane, wire.tpc, wire.cryostat);
        Ok(KHit::new(
            surface,
            KVector::<1>::zeros(),
            KSymMatrix::<1>::new(xerr * xerr),
            WireLine,
            wire.plane,
        )
        .with_pitch(pitch))
    }

    pub fn from_hit(hit: &Hit, services: &DetectorServices) -> KalmanResult<Self> {
        let wire = &hit.wire;
        let detprop = services.detprop.as_ref();
        let x = detprop.ticks_to_x(hit.peak_time, wire.plane, wire.tpc, wire.cryostat);
        let xerr = hit.sigma_peak_time.max(MIN_TIME_ERROR) * detprop.ticks_coefficient();
        Ok(Self::at_x(wire, x, xerr, services)?
            .with_id(hit_id(hit.channel, hit.peak_time))
            .with_charge(hit.integral))
    }
}

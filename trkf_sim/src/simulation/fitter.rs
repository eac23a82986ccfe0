// trkf_sim/src/simulation/fitter.rs

use super::config::{ContainerKind, FitConfig};
use super::generator::{GeneratedEvent, TrueTrack};
use crate::simulation::error::SimResult;
use tracing::debug;
use trkf_core::config::KalmanConfig;
use trkf_core::estimation::{KETrack, KHitContainer, KTrack, KalmanFilter};
use trkf_core::messages::{FittedTrack, Hit};
use trkf_core::models::propagation::PropAny;
use trkf_core::services::DetectorServices;
use trkf_core::surfaces::{Surface, SurfXYZPlane};
use trkf_core::types::{PropDirection, TrackDirection, TrackVector};

/// The fit of one generated event, compared to its truth.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub event: usize,
    pub n_hits: usize,
    /// Accepted filter states, before any plane filtering of the output.
    pub n_states: usize,
    pub track: Option<FittedTrack>,
    /// Angle (rad) between the fitted and true start directions.
    pub angle_error: Option<f64>,
    /// Fitted momentum (GeV/c) at the first trajectory point.
    pub momentum: Option<f64>,
}

impl FitOutcome {
    pub fn is_fitted(&self) -> bool {
        self.track.is_some()
    }
}

/// Runs the Kalman filter over generated hits.
///
/// The seed sits on a plane through the true start point, normal to the
/// true direction, with the plane's starting covariance and a momentum
/// hypothesis from the fit configuration.
#[derive(Debug, Clone)]
pub struct TrackFitter {
    filter: KalmanFilter,
    services: DetectorServices,
    kalman: KalmanConfig,
    fit: FitConfig,
}

impl TrackFitter {
    pub fn new(kalman: &KalmanConfig, fit: &FitConfig, services: DetectorServices) -> SimResult<Self> {
        let prop = PropAny::new(kalman.propagator.clone(), &services, true)?;
        let filter = KalmanFilter::new(Box::new(prop), kalman.filter.clone())?;
        Ok(Self {
            filter,
            services,
            kalman: kalman.clone(),
            fit: fit.clone(),
        })
    }

    /// Converts hits into measurement groups of the configured kind.
    pub fn container(&self, hits: &[Hit]) -> SimResult<KHitContainer> {
        let mut container = KHitContainer::new();
        match self.fit.container {
            ContainerKind::WireX => {
                container.fill_wire_x(hits, &self.services, self.fit.only_plane)?
            }
            ContainerKind::WireLine => {
                container.fill_wire_line(hits, &self.services, self.fit.only_plane)?
            }
        }
        Ok(container)
    }

    pub fn seed(&self, truth: &TrueTrack) -> KETrack {
        let surface = Surface::from(SurfXYZPlane::from_normal(&truth.start, &truth.direction));
        let trk = KTrack::new(
            surface.into_handle(),
            TrackVector::new(0., 0., 0., 0., 1. / self.fit.seed_momentum),
            TrackDirection::Forward,
        )
        .with_mass(truth.mass);
        KETrack::with_starting_error(trk)
    }

    pub fn fit(&self, event: &GeneratedEvent) -> SimResult<FitOutcome> {
        let mut container = self.container(&event.hits)?;
        let pref_plane = container.preferred_plane();
        let seed = self.seed(&event.truth);

        let mut gtrack =
            self.filter
                .build_track(&seed, &mut container, pref_plane, PropDirection::Forward)?;
        gtrack.recalibrate();
        debug!(
            event = event.index,
            states = gtrack.len(),
            unused = container.unused().len(),
            unsorted = container.unsorted().len(),
            "filter finished"
        );

        let track = gtrack.fill_track(
            event.index as i32,
            self.kalman.filter.store_np_plane,
            &self.kalman.propagator,
        )?;
        let start = track.as_ref().and_then(FittedTrack::start);
        Ok(FitOutcome {
            event: event.index,
            n_hits: event.hits.len(),
            n_states: gtrack.len(),
            angle_error: start.map(|p| p.direction.dot(&event.truth.direction).clamp(-1., 1.).acos()),
            momentum: start.map(|p| p.momentum),
            track,
        })
    }
}

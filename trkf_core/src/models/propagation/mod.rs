// trkf_core/src/models/propagation/mod.rs

//! Track propagation between surfaces.
//!
//! Every propagator is built from the same [`PropagatorBase`] (settings,
//! energy loss, optional interactor) and differs only in the destination
//! surface type it accepts. The long-distance, linearized and
//! error-propagating entry points are provided methods of [`Propagator`]
//! built on top of the single-step `short_vec_prop`.
//!
//! All entry points are all-or-nothing: on failure the track (and the
//! reference track, if any) is left exactly as it was.

use crate::config::PropagatorConfig;
use crate::error::{KalmanError, KalmanResult};
use crate::estimation::track::{KETrack, KTrack};
use crate::linalg::symmetrize;
use crate::models::interaction::{dedx_prop, kinetic_energy, DedxStep, Interactor};
use crate::services::{DetectorProperties, DetectorServices};
use crate::surfaces::{Surface, SurfXYZPlane, SurfaceGeometry, SurfaceHandle, SurfaceKind};
use crate::types::{PropDirection, TrackError, TrackMatrix};
use dyn_clone::DynClone;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

pub mod any;
mod step;
pub mod xyz_plane;
pub mod yz_line;
pub mod yz_plane;
pub mod zero;

pub use any::PropAny;
pub use xyz_plane::PropXYZPlane;
pub use yz_line::PropYZLine;
pub use yz_plane::PropYZPlane;
pub use zero::PropZero;

// --- Propagation Result ---

/// What a successful propagation reports besides the moved track.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    /// Signed path length (cm) along the track.
    pub distance: f64,
    /// `F = d(new params) / d(old params)`.
    pub jacobian: TrackMatrix,
    /// Process noise `Q` accumulated over the path; zero unless requested.
    pub noise: TrackError,
}

impl Propagation {
    /// A zero-length, noiseless propagation.
    pub fn identity() -> Self {
        Self {
            distance: 0.,
            jacobian: TrackMatrix::identity(),
            noise: TrackError::zeros(),
        }
    }

    /// Appends `step` after `self`.
    pub fn chain(&mut self, step: &Propagation) {
        self.distance += step.distance;
        self.noise = step.jacobian * self.noise * step.jacobian.transpose() + step.noise;
        self.jacobian = step.jacobian * self.jacobian;
    }
}

// --- Shared Settings ---

/// Settings and collaborators common to every propagator.
#[derive(Debug, Clone)]
pub struct PropagatorBase {
    config: PropagatorConfig,
    detprop: Arc<dyn DetectorProperties>,
    interactor: Option<Interactor>,
    zero: PropZero,
}

impl PropagatorBase {
    /// `with_noise` attaches an [`Interactor`]; without one the process
    /// noise is always zero.
    pub fn new(
        config: PropagatorConfig,
        services: &DetectorServices,
        with_noise: bool,
    ) -> KalmanResult<Self> {
        config.validate()?;
        let zero = PropZero::new(config.max_dist);
        let interactor = if with_noise {
            Some(Interactor::new(services.clone(), config.tcut, zero.clone())?)
        } else {
            None
        };
        Ok(Self {
            config,
            detprop: services.detprop.clone(),
            interactor,
            zero,
        })
    }

    pub fn config(&self) -> &PropagatorConfig {
        &self.config
    }

    pub fn tcut(&self) -> f64 {
        self.config.tcut
    }

    pub fn do_dedx(&self) -> bool {
        self.config.do_dedx
    }

    pub fn interactor(&self) -> Option<&Interactor> {
        self.interactor.as_ref()
    }

    pub fn zero(&self) -> &PropZero {
        &self.zero
    }

    /// Mean energy loss of `q/p` over a signed path `s`.
    pub fn dedx_prop(&self, pinv: f64, mass: f64, s: f64) -> KalmanResult<DedxStep> {
        dedx_prop(self.detprop.as_ref(), pinv, mass, s, self.config.tcut)
    }

    /// Restricted stopping power (MeV/cm).
    fn stopping_power(&self, p: f64, mass: f64) -> f64 {
        self.detprop.eloss(p, mass, self.config.tcut)
    }

    fn noise(&self, trk: &KTrack, s: f64) -> KalmanResult<TrackError> {
        match &self.interactor {
            Some(interactor) => interactor.noise(trk, s),
            None => Ok(TrackError::zeros()),
        }
    }
}

// =========================================================================
// == Propagator Trait ==
// =========================================================================

pub trait Propagator: DynClone + Debug + Send + Sync {
    fn base(&self) -> &PropagatorBase;

    /// One analytic step to `surf`, which must be of the type this
    /// propagator handles.
    ///
    /// `dir` constrains the sign of the path length. The energy-loss
    /// correction is applied only when both `do_dedx` and the configured
    /// switch are on. `with_noise` fills [`Propagation::noise`].
    fn short_vec_prop(
        &self,
        trk: &mut KTrack,
        surf: &SurfaceHandle,
        dir: PropDirection,
        do_dedx: bool,
        with_noise: bool,
    ) -> KalmanResult<Propagation>;

    /// Re-expresses the track, without moving it, on a surface oriented like
    /// `orient` and centred on the current track position.
    fn origin_vec_prop(&self, trk: &mut KTrack, orient: &SurfaceHandle)
        -> KalmanResult<Propagation>;

    /// Long-distance propagation.
    ///
    /// With energy loss enabled the path is cut into steps short enough that
    /// the kinetic energy changes by at most `step_energy_fraction` per step,
    /// each step ending on an intermediate plane normal to the track.
    fn vec_prop(
        &self,
        trk: &mut KTrack,
        surf: &SurfaceHandle,
        dir: PropDirection,
        do_dedx: bool,
        with_noise: bool,
    ) -> KalmanResult<Propagation> {
        let base = self.base();
        let cfg = base.config();
        if !do_dedx || !cfg.do_dedx || trk.vector()[4] == 0. {
            return self.short_vec_prop(trk, surf, dir, do_dedx, with_noise);
        }

        let mut work = trk.clone();
        let mut total = Propagation::identity();

        for _ in 0..cfg.max_iterations {
            let p = work.p();
            let mass = work.mass();
            let s_max = (cfg.step_energy_fraction * kinetic_energy(p, mass)
                / (0.001 * base.stopping_power(p, mass)))
            .max(cfg.min_step);

            let mut trial = work.clone();
            let s_full = self
                .short_vec_prop(&mut trial, surf, PropDirection::Unknown, false, false)?
                .distance;
            if !dir.accepts(s_full) {
                return Err(KalmanError::DirectionMismatch {
                    path: total.distance + s_full,
                });
            }

            if s_full.abs() <= s_max {
                let last = self.short_vec_prop(&mut work, surf, dir, do_dedx, with_noise)?;
                total.chain(&last);
                *trk = work;
                return Ok(total);
            }

            let start = work.position();
            let origin = start + (trial.position() - start) * (s_max / s_full.abs());
            let normal = work.unit_direction()?;
            let plane = Surface::from(SurfXYZPlane::from_normal(&origin, &normal)).into_handle();
            let step = step::short_step(base, &mut work, &plane, dir, do_dedx, with_noise)?;
            total.chain(&step);
        }

        debug!(
            max_iterations = cfg.max_iterations,
            path = total.distance,
            "propagation exceeded the step limit"
        );
        Err(KalmanError::IterationLimit(cfg.max_iterations))
    }

    /// Linearized propagation about a reference trajectory.
    ///
    /// The reference is propagated for real and the track follows it to
    /// first order: `v' = vref' + F (v - vref)`. Without a reference this is
    /// [`vec_prop`](Self::vec_prop).
    fn lin_prop(
        &self,
        trk: &mut KTrack,
        surf: &SurfaceHandle,
        dir: PropDirection,
        do_dedx: bool,
        tref: Option<&mut KTrack>,
        with_noise: bool,
    ) -> KalmanResult<Propagation> {
        let Some(tref) = tref else {
            return self.vec_prop(trk, surf, dir, do_dedx, with_noise);
        };
        if !trk.surface().is_equal(tref.surface()) {
            return Err(KalmanError::SurfaceMismatch(
                "track and reference track are on different surfaces",
            ));
        }

        let diff = trk.surface().get_diff(trk.vector(), tref.vector());
        let mut new_ref = tref.clone();
        let prop = self.vec_prop(&mut new_ref, surf, dir, do_dedx, with_noise)?;

        let mut moved = new_ref.clone().with_mass(trk.mass());
        moved.set_vector(new_ref.vector() + prop.jacobian * diff);
        if !moved.is_valid() {
            return Err(KalmanError::InvalidState);
        }

        *trk = moved;
        *tref = new_ref;
        Ok(prop)
    }

    /// Propagates the state and its covariance: `C' = F C F^T`.
    fn err_prop(
        &self,
        tre: &mut KETrack,
        surf: &SurfaceHandle,
        dir: PropDirection,
        do_dedx: bool,
        tref: Option<&mut KTrack>,
    ) -> KalmanResult<Propagation> {
        let mut trk = tre.track().clone();
        let prop = self.lin_prop(&mut trk, surf, dir, do_dedx, tref, false)?;
        let mut error = prop.jacobian * tre.error() * prop.jacobian.transpose();
        symmetrize(&mut error);
        tre.set_track(trk);
        tre.set_error(error);
        Ok(prop)
    }

    /// Like [`err_prop`](Self::err_prop), adding the process noise:
    /// `C' = F C F^T + Q`.
    fn noise_prop(
        &self,
        tre: &mut KETrack,
        surf: &SurfaceHandle,
        dir: PropDirection,
        do_dedx: bool,
        tref: Option<&mut KTrack>,
    ) -> KalmanResult<Propagation> {
        let mut trk = tre.track().clone();
        let prop = self.lin_prop(&mut trk, surf, dir, do_dedx, tref, true)?;
        let mut error = prop.jacobian * tre.error() * prop.jacobian.transpose() + prop.noise;
        symmetrize(&mut error);
        tre.set_track(trk);
        tre.set_error(error);
        Ok(prop)
    }
}

dyn_clone::clone_trait_object!(Propagator);

/// Fails unless `surf` is of the given kind.
fn require_kind(surf: &Surface, kind: SurfaceKind) -> KalmanResult<()> {
    if surf.kind() == kind {
        Ok(())
    } else {
        Err(KalmanError::UnsupportedSurface(surf.kind().name()))
    }
}

// trkf_core/src/models/measurement/mod.rs

//! Measurements and the Kalman update.
//!
//! A measurement lives on its own surface. Predicting it from a track state
//! propagates the state there (if needed) and caches the residual and its
//! covariance in a [`Prediction`]; the update then folds that prediction
//! back into the state with the Joseph-form covariance update.

use crate::error::{KalmanError, KalmanResult};
use crate::estimation::track::{KETrack, KTrack};
use crate::linalg::{symmetrize, syminvert};
use crate::models::propagation::Propagator;
use crate::surfaces::SurfaceHandle;
use crate::types::{KHMatrix, KSymMatrix, KVector, PropDirection, TrackMatrix};
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

pub mod wire_line;
pub mod wire_x;

pub use wire_line::{KHitWireLine, WireLine};
pub use wire_x::{KHitWireX, WireX};

// --- Prediction ---

/// Everything the update needs, computed by [`KHitBase::predict`].
///
/// Residual-space quantities are stored dynamically so that one prediction
/// type serves measurements of every dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// The state surface the prediction was made from.
    pub surface: SurfaceHandle,
    /// Signed path from the state surface to the measurement surface.
    pub distance: f64,
    /// Predicted measurement `p`.
    pub vector: DVector<f64>,
    /// Predicted measurement covariance `P`.
    pub error: DMatrix<f64>,
    /// `r = m - p`.
    pub residual: DVector<f64>,
    /// `S = R + P`.
    pub residual_error: DMatrix<f64>,
    pub residual_error_inv: DMatrix<f64>,
    /// `H`, expressed in the basis of the state surface.
    pub h: DMatrix<f64>,
    /// `r^T S^-1 r`.
    pub chisq: f64,
}

impl Prediction {
    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

/// What a measurement model predicts from a state on its own surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SubPrediction<const N: usize> {
    pub vector: KVector<N>,
    pub error: KSymMatrix<N>,
    pub h: KHMatrix<N>,
}

// --- MEASUREMENT TRAITS ---

/// Object-safe face of a measurement, so hits of any dimension can share a
/// container.
pub trait KHitBase: DynClone + Debug + Send + Sync {
    fn meas_surface(&self) -> &SurfaceHandle;

    /// Readout plane of the measurement.
    fn meas_plane(&self) -> u32;

    fn id(&self) -> i64;

    fn dim(&self) -> usize;

    /// Collected charge, for calorimetry.
    fn charge(&self) -> f64 {
        0.
    }

    /// Wire pitch (cm) of the measuring plane, if any.
    fn wire_pitch(&self) -> Option<f64> {
        None
    }

    /// Predicts the measurement from `tre`.
    ///
    /// If the state is not already on the measurement surface, a copy is
    /// error-propagated there without energy loss or noise, which requires a
    /// propagator. `tref` is an optional reference track for linearized
    /// propagation.
    fn predict(
        &self,
        tre: &KETrack,
        prop: Option<&dyn Propagator>,
        tref: Option<&KTrack>,
    ) -> KalmanResult<Prediction>;

    /// Applies the Kalman update for `prediction` to `tre`.
    ///
    /// The state must still be on the surface the prediction was made from.
    fn update(&self, prediction: &Prediction, tre: &mut KETrack) -> KalmanResult<()>;
}

dyn_clone::clone_trait_object!(KHitBase);

/// The mathematical model `p = h(x)` of an N-dimensional measurement.
pub trait MeasurementModel<const N: usize>: Debug + Clone + Send + Sync {
    /// Prediction for a state already on the measurement surface.
    fn subpredict(&self, tre: &KETrack) -> KalmanResult<SubPrediction<N>>;
}

// =========================================================================
// == Generic Measurement ==
// =========================================================================

/// An N-dimensional measurement `m` with covariance `R` on a surface.
#[derive(Debug, Clone)]
pub struct KHit<const N: usize, M> {
    surface: SurfaceHandle,
    meas_vector: KVector<N>,
    meas_error: KSymMatrix<N>,
    meas_plane: u32,
    id: i64,
    charge: f64,
    pitch: Option<f64>,
    model: M,
}

impl<const N: usize, M: MeasurementModel<N>> KHit<N, M> {
    pub fn new(
        surface: SurfaceHandle,
        meas_vector: KVector<N>,
        meas_error: KSymMatrix<N>,
        model: M,
        meas_plane: u32,
    ) -> Self {
        Self {
            surface,
            meas_vector,
            meas_error,
            meas_plane,
            id: 0,
            charge: 0.,
            pitch: None,
            model,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn meas_vector(&self) -> &KVector<N> {
        &self.meas_vector
    }

    pub fn meas_error(&self) -> &KSymMatrix<N> {
        &self.meas_error
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<const N: usize, M: MeasurementModel<N> + 'static> KHitBase for KHit<N, M> {
    fn meas_surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    fn meas_plane(&self) -> u32 {
        self.meas_plane
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn dim(&self) -> usize {
        N
    }

    fn charge(&self) -> f64 {
        self.charge
    }

    fn wire_pitch(&self) -> Option<f64> {
        self.pitch
    }

    fn predict(
        &self,
        tre: &KETrack,
        prop: Option<&dyn Propagator>,
        tref: Option<&KTrack>,
    ) -> KalmanResult<Prediction> {
        let (sub, distance) = if self.surface.is_equal(tre.surface()) {
            (self.model.subpredict(tre)?, 0.)
        } else {
            let prop = prop.ok_or(KalmanError::MissingPropagator)?;
            let mut moved = tre.clone();
            let mut tref = tref.cloned();
            let step = prop.err_prop(
                &mut moved,
                &self.surface,
                PropDirection::Unknown,
                false,
                tref.as_mut(),
            )?;
            let mut sub = self.model.subpredict(&moved)?;
            sub.h *= step.jacobian;
            (sub, step.distance)
        };

        let residual = self.meas_vector - sub.vector;
        let residual_error = self.meas_error + sub.error;
        let mut residual_error_inv = residual_error;
        if !syminvert(&mut residual_error_inv) {
            return Err(KalmanError::SingularMatrix);
        }
        let chisq = (residual.transpose() * residual_error_inv * residual)[(0, 0)];

        Ok(Prediction {
            surface: tre.surface().clone(),
            distance,
            vector: DVector::from_column_slice(sub.vector.as_slice()),
            error: DMatrix::from_column_slice(N, N, sub.error.as_slice()),
            residual: DVector::from_column_slice(residual.as_slice()),
            residual_error: DMatrix::from_column_slice(N, N, residual_error.as_slice()),
            residual_error_inv: DMatrix::from_column_slice(N, N, residual_error_inv.as_slice()),
            h: DMatrix::from_column_slice(N, 5, sub.h.as_slice()),
            chisq,
        })
    }

    fn update(&self, prediction: &Prediction, tre: &mut KETrack) -> KalmanResult<()> {
        if !prediction.surface.is_equal(tre.surface()) {
            return Err(KalmanError::SurfaceMismatch(
                "state is not on the prediction surface",
            ));
        }
        if prediction.dim() != N {
            return Err(KalmanError::SurfaceMismatch(
                "prediction was made for another measurement",
            ));
        }

        let h = KHMatrix::<N>::from_column_slice(prediction.h.as_slice());
        let sinv = KSymMatrix::<N>::from_column_slice(prediction.residual_error_inv.as_slice());
        let r = KVector::<N>::from_column_slice(prediction.residual.as_slice());
        let c = *tre.error();

        // Gain and Joseph-form covariance.
        let k = c * h.transpose() * sinv;
        let vector = tre.vector() + k * r;
        let ikh = TrackMatrix::identity() - k * h;
        let mut error = ikh * c * ikh.transpose() + k * self.meas_error * k.transpose();
        symmetrize(&mut error);

        tre.set_vector(vector);
        tre.set_error(error);
        Ok(())
    }
}

// trkf_core/src/services/mod.rs

//! Read-only detector services consumed by the core.
//!
//! The propagators, interactors and measurements never own detector
//! knowledge. They receive it through the three provider traits below,
//! bundled in a [`DetectorServices`] value that is handed to whoever needs
//! it. Concrete providers for a simple single-TPC wire detector live in the
//! submodules.

use crate::types::Point3;
use std::fmt::Debug;
use std::sync::Arc;

pub mod geometry;
pub mod properties;

pub use geometry::{SimpleWireGeometry, WirePlaneConfig};
pub use properties::{StandardDetectorProperties, StandardLArProperties};

// --- Identifiers ---

/// Fully qualified wire identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireId {
    pub cryostat: u32,
    pub tpc: u32,
    pub plane: u32,
    pub wire: u32,
}

/// A TPC inside a cryostat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TpcId {
    pub cryostat: u32,
    pub tpc: u32,
}

/// Density-effect parameters of the Sternheimer parameterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SternheimerParameters {
    pub a: f64,
    pub k: f64,
    pub x0: f64,
    pub x1: f64,
    pub cbar: f64,
}

// --- Provider Traits ---

/// Wire-plane geometry.
pub trait Geometry: Debug + Send + Sync {
    /// Wire pitch (cm) of a plane.
    fn wire_pitch(&self, plane: u32, tpc: u32, cryostat: u32) -> f64;

    /// Angle (rad) between the wires of a plane and the vertical (y) axis,
    /// measured towards +z.
    fn wire_angle_to_vertical(&self, plane: u32, tpc: u32, cryostat: u32) -> f64;

    /// The TPC containing a point, if any.
    fn find_tpc_at_position(&self, xyz: &Point3) -> Option<TpcId>;

    /// The (y, z) crossing point of two wires, if they cross inside the TPC.
    fn channels_intersect(&self, channel1: u32, channel2: u32) -> Option<(f64, f64)>;

    fn plane_wire_to_channel(&self, plane: u32, wire: u32, tpc: u32, cryostat: u32) -> u32;

    fn channel_to_wire(&self, channel: u32) -> Option<WireId>;

    /// Centre of a wire in world coordinates.
    fn wire_center(&self, wire: &WireId) -> Option<Point3>;

    /// Origin of a wire plane in world coordinates.
    fn plane_origin(&self, plane: u32, tpc: u32, cryostat: u32) -> Point3;
}

/// Readout and stopping-power properties of the detector.
pub trait DetectorProperties: Debug + Send + Sync {
    /// Sampling period in ns per tick.
    fn sampling_rate(&self) -> f64;

    /// Trigger offset in ticks.
    fn trigger_offset(&self) -> f64;

    /// Drift distance per tick (cm/tick).
    fn ticks_coefficient(&self) -> f64;

    /// Argon temperature in K.
    fn temperature(&self) -> f64;

    fn ticks_to_x(&self, ticks: f64, plane: u32, tpc: u32, cryostat: u32) -> f64;

    fn x_to_ticks(&self, x: f64, plane: u32, tpc: u32, cryostat: u32) -> f64;

    /// Restricted stopping power (MeV/cm) for momentum `p` (GeV/c), mass `mass`
    /// (GeV/c^2) and delta-ray cut `tcut` (MeV). Strictly positive.
    fn eloss(&self, p: f64, mass: f64, tcut: f64) -> f64;

    /// Energy-loss straggling variance coefficient (MeV^2/cm).
    fn eloss_var(&self, p: f64, mass: f64) -> f64;
}

/// Material properties of liquid argon.
pub trait LArProperties: Debug + Send + Sync {
    /// Radiation length in g/cm^2.
    fn radiation_length(&self) -> f64;

    /// Density in g/cm^3 at `temperature` (K).
    fn density(&self, temperature: f64) -> f64;

    /// Electron lifetime in us.
    fn electron_lifetime(&self) -> f64;

    /// Nominal drift field in kV/cm.
    fn efield(&self) -> f64;

    /// Electron drift velocity (cm/us).
    fn drift_velocity(&self, efield: f64, temperature: f64) -> f64;

    fn atomic_number(&self) -> f64;

    /// Atomic mass in g/mol.
    fn atomic_mass(&self) -> f64;

    /// Mean excitation energy in eV.
    fn excitation_energy(&self) -> f64;

    fn sternheimer(&self) -> SternheimerParameters;
}

// --- Service Bundle ---

/// The single injection point for detector services.
///
/// Cheap to clone; the providers are shared.
#[derive(Debug, Clone)]
pub struct DetectorServices {
    pub geometry: Arc<dyn Geometry>,
    pub detprop: Arc<dyn DetectorProperties>,
    pub larprop: Arc<dyn LArProperties>,
}

impl DetectorServices {
    pub fn new(
        geometry: Arc<dyn Geometry>,
        detprop: Arc<dyn DetectorProperties>,
        larprop: Arc<dyn LArProperties>,
    ) -> Self {
        Self {
            geometry,
            detprop,
            larprop,
        }
    }

    /// Standard liquid-argon properties around the given geometry.
    pub fn standard(geometry: Arc<dyn Geometry>) -> Self {
        let larprop: Arc<dyn LArProperties> = Arc::new(StandardLArProperties::default());
        let detprop: Arc<dyn DetectorProperties> =
            Arc::new(StandardDetectorProperties::new(larprop.clone()));
        Self::new(geometry, detprop, larprop)
    }

    /// Radiation length in cm at the detector temperature.
    pub fn radiation_length_cm(&self) -> f64 {
        self.larprop.radiation_length() / self.larprop.density(self.detprop.temperature())
    }
}

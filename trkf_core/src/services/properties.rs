// trkf_core/src/services/properties.rs

//! Standard liquid-argon material and readout properties.

use super::{DetectorProperties, LArProperties, SternheimerParameters};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// 4 pi N_A r_e^2 m_e c^2 (MeV cm^2/mol).
const BETHE_K: f64 = 0.307075;

/// Electron mass (MeV/c^2).
const ELECTRON_MASS_MEV: f64 = 0.510998918;

// =========================================================================
// == Liquid Argon ==
// =========================================================================

/// Liquid argon with textbook constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StandardLArProperties {
    pub z: f64,
    pub a: f64,
    /// Mean excitation energy (eV).
    pub i: f64,
    /// Radiation length (g/cm^2).
    pub radiation_length: f64,
    /// Electron lifetime (us).
    pub electron_lifetime: f64,
    /// Drift field (kV/cm).
    pub efield: f64,
    pub sa: f64,
    pub sk: f64,
    pub sx0: f64,
    pub sx1: f64,
    pub scbar: f64,
}

impl Default for StandardLArProperties {
    fn default() -> Self {
        Self {
            z: 18.,
            a: 39.948,
            i: 188.,
            radiation_length: 19.55,
            electron_lifetime: 3000.,
            efield: 0.5,
            sa: 0.1956,
            sk: 3.0,
            sx0: 0.2,
            sx1: 3.0,
            scbar: 5.2146,
        }
    }
}

/// Icarus/Walkowiak parameters of the drift-velocity fit.
struct DriftFit {
    p1: f64,
    p2: f64,
    p3: f64,
    p4: f64,
    p5: f64,
    p6: f64,
    t0: f64,
}

impl DriftFit {
    const ICARUS: DriftFit = DriftFit {
        p1: -0.04640,
        p2: 0.01712,
        p3: 1.88125,
        p4: 0.99408,
        p5: 0.01172,
        p6: 4.20214,
        t0: 105.749,
    };

    const WALKOWIAK: DriftFit = DriftFit {
        p1: -0.01481,
        p2: -0.0075,
        p3: 0.141,
        p4: 12.4,
        p5: 1.627,
        p6: 0.317,
        t0: 90.371,
    };

    /// Drift velocity in mm/us.
    fn eval(&self, efield: f64, temperature: f64) -> f64 {
        (self.p1 * (temperature - self.t0) + 1.)
            * (self.p3 * efield * (1. + self.p4 / efield).ln() + self.p5 * efield.powf(self.p6))
            + self.p2 * (temperature - self.t0)
    }
}

impl LArProperties for StandardLArProperties {
    fn radiation_length(&self) -> f64 {
        self.radiation_length
    }

    fn density(&self, temperature: f64) -> f64 {
        -0.00615 * temperature + 1.928
    }

    fn electron_lifetime(&self) -> f64 {
        self.electron_lifetime
    }

    fn efield(&self) -> f64 {
        self.efield
    }

    fn drift_velocity(&self, efield: f64, temperature: f64) -> f64 {
        if efield > 4.0 {
            warn!(efield, "E-field outside the drift-velocity parameterization range");
        }
        if !(87.0..=94.0).contains(&temperature) {
            warn!(temperature, "temperature outside the drift-velocity parameterization range");
        }

        // Linear at small fields, Icarus fit at most fields, Walkowiak at high fields.
        let tshift = temperature - 87.203;
        let x_fit = 0.0938163 - 0.0052563 * tshift - 0.0001470 * tshift * tshift;
        let u_fit = 5.18406 + 0.01448 * tshift
            - 0.003497 * tshift * tshift
            - 0.000516 * tshift * tshift * tshift;

        let vd = if efield < x_fit {
            efield * u_fit
        } else if efield < 0.619 {
            DriftFit::ICARUS.eval(efield, temperature)
        } else if efield < 0.699 {
            12.5 * (efield - 0.619) * DriftFit::WALKOWIAK.eval(efield, temperature)
                + 12.5 * (0.699 - efield) * DriftFit::ICARUS.eval(efield, temperature)
        } else {
            DriftFit::WALKOWIAK.eval(efield, temperature)
        };

        // mm/us -> cm/us
        vd / 10.
    }

    fn atomic_number(&self) -> f64 {
        self.z
    }

    fn atomic_mass(&self) -> f64 {
        self.a
    }

    fn excitation_energy(&self) -> f64 {
        self.i
    }

    fn sternheimer(&self) -> SternheimerParameters {
        SternheimerParameters {
            a: self.sa,
            k: self.sk,
            x0: self.sx0,
            x1: self.sx1,
            cbar: self.scbar,
        }
    }
}

// =========================================================================
// == Readout & Stopping Power ==
// =========================================================================

/// Readout timing plus Bethe-Bloch energy loss in the argon described by `lar`.
#[derive(Debug, Clone)]
pub struct StandardDetectorProperties {
    pub lar: Arc<dyn LArProperties>,
    /// ns per tick.
    pub sampling_rate: f64,
    /// ticks.
    pub trigger_offset: f64,
    /// K.
    pub temperature: f64,
    /// Per-plane x offsets (cm) added by `ticks_to_x`.
    pub plane_x_offsets: Vec<f64>,
}

impl StandardDetectorProperties {
    pub fn new(lar: Arc<dyn LArProperties>) -> Self {
        Self {
            lar,
            sampling_rate: 500.,
            trigger_offset: 0.,
            temperature: 87.,
            plane_x_offsets: Vec::new(),
        }
    }

    fn plane_offset(&self, plane: u32) -> f64 {
        self.plane_x_offsets
            .get(plane as usize)
            .copied()
            .unwrap_or(0.)
    }

    fn density(&self) -> f64 {
        self.lar.density(self.temperature)
    }
}

impl DetectorProperties for StandardDetectorProperties {
    fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn trigger_offset(&self) -> f64 {
        self.trigger_offset
    }

    fn ticks_coefficient(&self) -> f64 {
        let vd = self.lar.drift_velocity(self.lar.efield(), self.temperature);
        vd * self.sampling_rate / 1000.
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn ticks_to_x(&self, ticks: f64, plane: u32, _tpc: u32, _cryostat: u32) -> f64 {
        (ticks - self.trigger_offset) * self.ticks_coefficient() + self.plane_offset(plane)
    }

    fn x_to_ticks(&self, x: f64, plane: u32, _tpc: u32, _cryostat: u32) -> f64 {
        (x - self.plane_offset(plane)) / self.ticks_coefficient() + self.trigger_offset
    }

    fn eloss(&self, p: f64, mass: f64, tcut: f64) -> f64 {
        let z = self.lar.atomic_number();
        let a = self.lar.atomic_mass();
        let i = self.lar.excitation_energy();
        let st = self.lar.sternheimer();

        // Kinematics.
        let bg = p / mass;
        let gamma = (1. + bg * bg).sqrt();
        let beta = bg / gamma;
        let mer = 0.001 * ELECTRON_MASS_MEV / mass;
        let tmax = 2. * ELECTRON_MASS_MEV * bg * bg / (1. + 2. * gamma * mer + mer * mer);

        // Restrict delta rays to tcut; zero means unrestricted.
        let tcut = if tcut == 0. || tcut > tmax { tmax } else { tcut };

        // Density-effect correction.
        let x = bg.log10();
        let mut delta = 0.;
        if x >= st.x0 {
            delta = 2. * std::f64::consts::LN_10 * x - st.cbar;
            if x < st.x1 {
                delta += st.a * (st.x1 - x).powf(st.k);
            }
        }

        // Stopping number, never below one.
        let b = 0.5 * (2. * ELECTRON_MASS_MEV * bg * bg * tcut / (1e-12 * i * i)).ln()
            - 0.5 * beta * beta * (1. + tcut / tmax)
            - 0.5 * delta;
        let b = b.max(1.);

        self.density() * BETHE_K * z * b / (a * beta * beta)
    }

    fn eloss_var(&self, p: f64, mass: f64) -> f64 {
        let z = self.lar.atomic_number();
        let a = self.lar.atomic_mass();
        let bg = p / mass;
        let gamma2 = 1. + bg * bg;
        let beta2 = bg * bg / gamma2;
        gamma2 * (1. - 0.5 * beta2) * ELECTRON_MASS_MEV * (z / a) * BETHE_K * self.density()
    }
}

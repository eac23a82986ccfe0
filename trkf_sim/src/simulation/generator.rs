// trkf_sim/src/simulation/generator.rs

//! Straight-line track generation with wire-plane readout.
//!
//! A particle starts inside the active volume and travels in a straight
//! line until it leaves it. Every wire it crosses records one hit, whose
//! peak time is the drift time of the crossing point smeared by a Gaussian.

use super::config::GeneratorConfig;
use super::detector::Detector;
use crate::simulation::error::{SimError, SimResult};
use nalgebra::Vector3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use trkf_core::messages::Hit;
use trkf_core::services::{Geometry, WireId};
use trkf_core::types::Point3;

/// The generated truth of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct TrueTrack {
    pub start: Point3,
    /// Unit direction of motion.
    pub direction: Vector3<f64>,
    /// GeV/c.
    pub momentum: f64,
    /// GeV/c^2.
    pub mass: f64,
    /// Path length inside the active volume (cm).
    pub length: f64,
}

impl TrueTrack {
    pub fn end(&self) -> Point3 {
        self.start + self.direction * self.length
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedEvent {
    pub index: usize,
    pub truth: TrueTrack,
    /// Hits ordered along the track.
    pub hits: Vec<Hit>,
}

/// Seeded event source. Two generators built from the same configuration
/// produce the same events.
#[derive(Debug, Clone)]
pub struct TrackGenerator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
    time_noise: Normal<f64>,
    angle_noise: Normal<f64>,
    next_index: usize,
}

impl TrackGenerator {
    pub fn new(config: GeneratorConfig) -> SimResult<Self> {
        config.validate()?;
        let time_noise = Normal::new(0., config.time_smearing)
            .map_err(|e| SimError::InvalidScenario(format!("time smearing: {e}")))?;
        let angle_noise = Normal::new(0., config.direction_spread)
            .map_err(|e| SimError::InvalidScenario(format!("direction spread: {e}")))?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            time_noise,
            angle_noise,
            next_index: 0,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate(&mut self, detector: &Detector) -> SimResult<GeneratedEvent> {
        let index = self.next_index;
        self.next_index += 1;

        let start = Point3::from(self.config.start);
        let (min, max) = detector.geometry.active_volume();
        if (0..3).any(|i| start[i] < min[i] || start[i] > max[i]) {
            return Err(SimError::InvalidScenario(format!(
                "start point {:?} is outside the active volume",
                self.config.start
            )));
        }

        let direction = self.direction();
        let length = exit_length(&start, &direction, &min, &max);
        let truth = TrueTrack {
            start,
            direction,
            momentum: self.config.momentum,
            mass: self.config.mass,
            length,
        };

        let mut crossings: Vec<(f64, Hit)> = Vec::new();
        for plane in 0..detector.geometry.n_planes() {
            self.plane_hits(detector, &truth, plane, &mut crossings);
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(GeneratedEvent {
            index,
            truth,
            hits: crossings.into_iter().map(|(_, hit)| hit).collect(),
        })
    }

    /// The configured direction, normalized and tilted by the angular spread.
    fn direction(&mut self) -> Vector3<f64> {
        let nominal = Vector3::from(self.config.direction).normalize();
        if self.config.direction_spread == 0. {
            return nominal;
        }
        // Any vector not parallel to the nominal direction spans the
        // transverse plane.
        let helper = if nominal.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let e1 = nominal.cross(&helper).normalize();
        let e2 = nominal.cross(&e1);
        let (a1, a2) = (
            self.angle_noise.sample(&mut self.rng),
            self.angle_noise.sample(&mut self.rng),
        );
        (nominal + e1 * a1 + e2 * a2).normalize()
    }

    fn plane_hits(
        &mut self,
        detector: &Detector,
        truth: &TrueTrack,
        plane: u32,
        out: &mut Vec<(f64, Hit)>,
    ) {
        let geometry = detector.geometry.as_ref();
        let detprop = &detector.services.detprop;
        let (start, dir) = (&truth.start, &truth.direction);

        let (s, c) = geometry.wire_angle_to_vertical(plane, 0, 0).sin_cos();
        let pitch = geometry.wire_pitch(plane, 0, 0);
        // Rate of change of the pitch coordinate along the track.
        let rate = -s * dir.y + c * dir.z;
        if rate.abs() < 1e-9 {
            return;
        }
        let Some(offset) = geometry.distance_to_wire(plane, 0, start.y, start.z) else {
            return;
        };
        let c0 = -s * start.y + c * start.z;
        let wire0 = c0 - offset;
        let c1 = c0 + rate * truth.length;
        let (lo, hi) = (c0.min(c1), c0.max(c1));

        let n_wires = geometry.n_wires(plane);
        let first = ((lo - wire0) / pitch).ceil().max(0.);
        let last = ((hi - wire0) / pitch).floor().min(n_wires as f64 - 1.);
        if last < first {
            return;
        }

        let dx = pitch / rate.abs();
        for wire in first as u32..=last as u32 {
            let t = (wire0 + wire as f64 * pitch - c0) / rate;
            let x = start.x + dir.x * t;
            let id = WireId {
                cryostat: 0,
                tpc: 0,
                plane,
                wire,
            };
            let hit = Hit {
                channel: geometry.plane_wire_to_channel(plane, wire, 0, 0),
                wire: id,
                peak_time: detprop.x_to_ticks(x, plane, 0, 0)
                    + self.time_noise.sample(&mut self.rng),
                sigma_peak_time: self.config.time_smearing,
                integral: self.config.charge_per_cm * dx,
            };
            out.push((t, hit));
        }
    }
}

/// Distance from `start` along `dir` to the boundary of the box.
fn exit_length(start: &Point3, dir: &Vector3<f64>, min: &Point3, max: &Point3) -> f64 {
    (0..3)
        .filter_map(|i| {
            if dir[i] > 0. {
                Some((max[i] - start[i]) / dir[i])
            } else if dir[i] < 0. {
                Some((min[i] - start[i]) / dir[i])
            } else {
                None
            }
        })
        .fold(f64::INFINITY, f64::min)
}

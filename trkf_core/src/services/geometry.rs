// trkf_core/src/services/geometry.rs

//! A single-cryostat, single-TPC wire geometry.
//!
//! Wires of plane `p` run along `(0, cos a, sin a)` where `a` is the plane's
//! angle to vertical. Wire `k` is the line `n . (y, z) = c0 + (k + 1/2) pitch`
//! with `n = (-sin a, cos a)` and `c0` the smallest value of `n . (y, z)` over
//! the TPC corners, so the wires tile the whole y-z face. Channels are
//! numbered plane-major starting at zero.

use super::{Geometry, TpcId, WireId};
use crate::types::Point3;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_3;

/// One wire plane as configured by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WirePlaneConfig {
    /// Angle of the wires to the vertical axis (rad).
    pub angle_to_vertical: f64,
    /// Wire spacing (cm).
    pub pitch: f64,
    /// x position of the plane (cm).
    pub x: f64,
}

/// Derived per-plane layout.
#[derive(Debug, Clone, PartialEq)]
struct PlaneLayout {
    config: WirePlaneConfig,
    normal: Vector2<f64>,
    first_coord: f64,
    n_wires: u32,
    first_channel: u32,
}

impl PlaneLayout {
    fn wire_coord(&self, wire: u32) -> f64 {
        self.first_coord + (wire as f64 + 0.5) * self.config.pitch
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleWireGeometry {
    min: Point3,
    max: Point3,
    planes: Vec<PlaneLayout>,
}

impl SimpleWireGeometry {
    /// Builds the layout for the active box `[min, max]`.
    pub fn new(min: Point3, max: Point3, planes: Vec<WirePlaneConfig>) -> Self {
        let corners = [
            Vector2::new(min.y, min.z),
            Vector2::new(min.y, max.z),
            Vector2::new(max.y, min.z),
            Vector2::new(max.y, max.z),
        ];

        let mut layouts = Vec::with_capacity(planes.len());
        let mut next_channel = 0;
        for config in planes {
            let (s, c) = config.angle_to_vertical.sin_cos();
            let normal = Vector2::new(-s, c);
            let coords = corners.iter().map(|p| normal.dot(p));
            let lo = coords.clone().fold(f64::INFINITY, f64::min);
            let hi = coords.fold(f64::NEG_INFINITY, f64::max);
            let n_wires = (((hi - lo) / config.pitch).ceil() as u32).max(1);

            layouts.push(PlaneLayout {
                config,
                normal,
                first_coord: lo,
                n_wires,
                first_channel: next_channel,
            });
            next_channel += n_wires;
        }

        Self {
            min,
            max,
            planes: layouts,
        }
    }

    pub fn n_planes(&self) -> u32 {
        self.planes.len() as u32
    }

    pub fn n_wires(&self, plane: u32) -> u32 {
        self.planes.get(plane as usize).map_or(0, |l| l.n_wires)
    }

    pub fn n_channels(&self) -> u32 {
        self.planes.iter().map(|l| l.n_wires).sum()
    }

    pub fn active_volume(&self) -> (Point3, Point3) {
        (self.min, self.max)
    }

    /// The wire of `plane` nearest to the point `(y, z)`, if inside the plane.
    pub fn nearest_wire(&self, plane: u32, y: f64, z: f64) -> Option<u32> {
        let layout = self.planes.get(plane as usize)?;
        let coord = layout.normal.dot(&Vector2::new(y, z));
        let index = ((coord - layout.first_coord) / layout.config.pitch).floor();
        if index < 0. || index >= layout.n_wires as f64 {
            return None;
        }
        Some(index as u32)
    }

    /// Signed distance (cm) of `(y, z)` from a wire, along the pitch direction.
    pub fn distance_to_wire(&self, plane: u32, wire: u32, y: f64, z: f64) -> Option<f64> {
        let layout = self.planes.get(plane as usize)?;
        Some(layout.normal.dot(&Vector2::new(y, z)) - layout.wire_coord(wire))
    }

    fn layout(&self, plane: u32) -> Option<&PlaneLayout> {
        self.planes.get(plane as usize)
    }

    fn inside_yz(&self, y: f64, z: f64) -> bool {
        y >= self.min.y && y <= self.max.y && z >= self.min.z && z <= self.max.z
    }
}

impl Default for SimpleWireGeometry {
    /// A 1 m x 1 m x 2 m TPC with the usual U/V/Y wire planes at 3 mm pitch.
    fn default() -> Self {
        Self::new(
            Point3::new(0., -50., 0.),
            Point3::new(100., 50., 200.),
            vec![
                WirePlaneConfig {
                    angle_to_vertical: FRAC_PI_3,
                    pitch: 0.3,
                    x: 0.,
                },
                WirePlaneConfig {
                    angle_to_vertical: -FRAC_PI_3,
                    pitch: 0.3,
                    x: 0.,
                },
                WirePlaneConfig {
                    angle_to_vertical: 0.,
                    pitch: 0.3,
                    x: 0.,
                },
            ],
        )
    }
}

impl Geometry for SimpleWireGeometry {
    fn wire_pitch(&self, plane: u32, _tpc: u32, _cryostat: u32) -> f64 {
        self.layout(plane).map_or(0., |l| l.config.pitch)
    }

    fn wire_angle_to_vertical(&self, plane: u32, _tpc: u32, _cryostat: u32) -> f64 {
        self.layout(plane).map_or(0., |l| l.config.angle_to_vertical)
    }

    fn find_tpc_at_position(&self, xyz: &Point3) -> Option<TpcId> {
        let inside = (0..3).all(|i| xyz[i] >= self.min[i] && xyz[i] <= self.max[i]);
        inside.then_some(TpcId {
            cryostat: 0,
            tpc: 0,
        })
    }

    fn channels_intersect(&self, channel1: u32, channel2: u32) -> Option<(f64, f64)> {
        let w1 = self.channel_to_wire(channel1)?;
        let w2 = self.channel_to_wire(channel2)?;
        if w1.plane == w2.plane {
            return None;
        }
        let l1 = self.layout(w1.plane)?;
        let l2 = self.layout(w2.plane)?;
        let (n1, n2) = (l1.normal, l2.normal);
        let det = n1.x * n2.y - n1.y * n2.x;
        if det.abs() < 1e-12 {
            return None;
        }
        let (c1, c2) = (l1.wire_coord(w1.wire), l2.wire_coord(w2.wire));
        let y = (c1 * n2.y - c2 * n1.y) / det;
        let z = (n1.x * c2 - n2.x * c1) / det;
        self.inside_yz(y, z).then_some((y, z))
    }

    fn plane_wire_to_channel(&self, plane: u32, wire: u32, _tpc: u32, _cryostat: u32) -> u32 {
        self.layout(plane).map_or(0, |l| l.first_channel + wire)
    }

    fn channel_to_wire(&self, channel: u32) -> Option<WireId> {
        self.planes.iter().enumerate().find_map(|(plane, l)| {
            (channel >= l.first_channel && channel < l.first_channel + l.n_wires).then(|| {
                WireId {
                    cryostat: 0,
                    tpc: 0,
                    plane: plane as u32,
                    wire: channel - l.first_channel,
                }
            })
        })
    }

    fn wire_center(&self, wire: &WireId) -> Option<Point3> {
        let layout = self.layout(wire.plane)?;
        if wire.wire >= layout.n_wires {
            return None;
        }
        // Foot of the perpendicular from the centre of the y-z face.
        let center = Vector2::new(
            0.5 * (self.min.y + self.max.y),
            0.5 * (self.min.z + self.max.z),
        );
        let shift = layout.wire_coord(wire.wire) - layout.normal.dot(&center);
        let yz = center + shift * layout.normal;
        Some(Point3::new(layout.config.x, yz.x, yz.y))
    }

    fn plane_origin(&self, plane: u32, _tpc: u32, _cryostat: u32) -> Point3 {
        let x = self.layout(plane).map_or(self.min.x, |l| l.config.x);
        Point3::new(
            x,
            0.5 * (self.min.y + self.max.y),
            0.5 * (self.min.z + self.max.z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_channel_wire_round_trip() {
        let geom = SimpleWireGeometry::default();
        for plane in 0..geom.n_planes() {
            for wire in [0, 1, geom.n_wires(plane) - 1] {
                let channel = geom.plane_wire_to_channel(plane, wire, 0, 0);
                let id = geom.channel_to_wire(channel).expect("valid channel");
                assert_eq!((id.plane, id.wire), (plane, wire));
            }
        }
        assert!(geom.channel_to_wire(geom.n_channels()).is_none());
    }

    #[test]
    fn test_collection_plane_wires_are_vertical() {
        let geom = SimpleWireGeometry::default();
        // Plane 2 is vertical: wire k sits at z = (k + 1/2) pitch.
        let center = geom
            .wire_center(&WireId {
                cryostat: 0,
                tpc: 0,
                plane: 2,
                wire: 10,
            })
            .expect("wire exists");
        assert_abs_diff_eq!(center.z, 10.5 * 0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(center.y, 0., epsilon = 1e-9);
        assert_eq!(geom.nearest_wire(2, 12., center.z), Some(10));
    }

    #[test]
    fn test_channels_intersect() {
        let geom = SimpleWireGeometry::default();
        let point = (10.0_f64, 60.0_f64);
        let w0 = geom.nearest_wire(0, point.0, point.1).expect("u wire");
        let w2 = geom.nearest_wire(2, point.0, point.1).expect("y wire");
        let ch0 = geom.plane_wire_to_channel(0, w0, 0, 0);
        let ch2 = geom.plane_wire_to_channel(2, w2, 0, 0);
        let (y, z) = geom.channels_intersect(ch0, ch2).expect("wires cross");
        // Within a couple of pitches of the seed point.
        assert!((y - point.0).abs() < 1.0);
        assert!((z - point.1).abs() < 0.3);
        assert!(geom.channels_intersect(ch2, ch2 + 1).is_none());
    }

    #[test]
    fn test_find_tpc() {
        let geom = SimpleWireGeometry::default();
        assert!(geom.find_tpc_at_position(&Point3::new(50., 0., 100.)).is_some());
        assert!(geom.find_tpc_at_position(&Point3::new(-1., 0., 100.)).is_none());
    }
}

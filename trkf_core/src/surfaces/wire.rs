// trkf_core/src/surfaces/wire.rs

//! Measurement surfaces attached to readout wires.

use super::{Surface, SurfYZLine, SurfYZPlane};
use crate::error::{KalmanError, KalmanResult};
use crate::services::{Geometry, WireId};

/// The plane containing a wire and the drift (x) axis.
///
/// A `YZPlane` at the wire centre with `x0 = 0` and `phi` equal to the wire
/// angle to vertical, so `v` runs along the wire, `w` along the pitch
/// direction and `u` is the drift coordinate.
pub fn surf_wire_x(geom: &dyn Geometry, wire: &WireId) -> KalmanResult<Surface> {
    let center = geom.wire_center(wire).ok_or_else(|| unknown(geom, wire))?;
    let phi = geom.wire_angle_to_vertical(wire.plane, wire.tpc, wire.cryostat);
    Ok(SurfYZPlane::new(0., center.y, center.z, phi).into())
}

/// The line along a wire, displaced to drift coordinate `x`.
pub fn surf_wire_line(geom: &dyn Geometry, wire: &WireId, x: f64) -> KalmanResult<Surface> {
    let center = geom.wire_center(wire).ok_or_else(|| unknown(geom, wire))?;
    let phi = geom.wire_angle_to_vertical(wire.plane, wire.tpc, wire.cryostat);
    Ok(SurfYZLine::new(x, center.y, center.z, phi).into())
}

fn unknown(geom: &dyn Geometry, wire: &WireId) -> KalmanError {
    KalmanError::UnknownChannel(geom.plane_wire_to_channel(
        wire.plane,
        wire.wire,
        wire.tpc,
        wire.cryostat,
    ))
}

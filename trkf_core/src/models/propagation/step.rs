// trkf_core/src/models/propagation/step.rs

//! The single-step kernel shared by every concrete propagator.
//!
//! A step has three stages: a zero-distance transformation onto a copy of
//! the destination surface moved to the track position, a closed-form
//! straight-line move between the two now-parallel surfaces, and an
//! optional energy-loss correction of `q/p`.

use super::{Propagation, PropagatorBase};
use crate::error::{KalmanError, KalmanResult};
use crate::estimation::track::KTrack;
use crate::surfaces::{Surface, SurfaceGeometry, SurfaceHandle};
use crate::types::{Point3, PropDirection, TrackDirection, TrackError, TrackMatrix, TrackVector};
use tracing::trace;

/// Propagates `trk` to `dest` in one straight step.
///
/// `trk` is only modified on success.
pub(crate) fn short_step(
    base: &PropagatorBase,
    trk: &mut KTrack,
    dest: &SurfaceHandle,
    dir: PropDirection,
    do_dedx: bool,
    with_noise: bool,
) -> KalmanResult<Propagation> {
    if !trk.is_valid() {
        return Err(KalmanError::InvalidState);
    }

    let position = trk.position();
    let framing = dest.with_origin(&position).into_handle();
    let (framed, f0) = base.zero().transform(trk, &framing)?;
    let offset = dest.to_local(&position);

    let (mut vec, direction, s, mut f_step) = match dest.as_ref() {
        Surface::YZLine(_) => line_step(framed.vector(), &offset),
        Surface::YZPlane(_) | Surface::XYZPlane(_) => {
            plane_step(framed.vector(), framed.direction(), &offset)
        }
    };

    if !dir.accepts(s) {
        return Err(KalmanError::DirectionMismatch { path: s });
    }

    if do_dedx && base.config().do_dedx && s != 0. && vec[4] != 0. {
        let dedx = base.dedx_prop(vec[4], trk.mass(), s)?;
        vec[4] = dedx.pinv;
        f_step[(4, 4)] = dedx.derivative;
    }

    let moved = KTrack::new(dest.clone(), vec, direction).with_mass(trk.mass());
    if !moved.is_valid() {
        return Err(KalmanError::InvalidState);
    }

    let noise = if with_noise {
        base.noise(&moved, s)?
    } else {
        TrackError::zeros()
    };

    trace!(path = s, dest = %dest, "short step");
    *trk = moved;
    Ok(Propagation {
        distance: s,
        jacobian: f_step * f0,
        noise,
    })
}

/// Zero-distance transformation onto `orient` moved to the track position.
pub(crate) fn origin_step(
    base: &PropagatorBase,
    trk: &mut KTrack,
    orient: &SurfaceHandle,
) -> KalmanResult<Propagation> {
    let framing = orient.with_origin(&trk.position()).into_handle();
    let jacobian = base.zero().prop(trk, &framing)?;
    Ok(Propagation {
        distance: 0.,
        jacobian,
        noise: TrackError::zeros(),
    })
}

/// Moves a plane state from a plane through the track position to the
/// parallel plane whose frame sees that position at `offset`.
fn plane_step(
    vec: &TrackVector,
    direction: TrackDirection,
    offset: &Point3,
) -> (TrackVector, TrackDirection, f64, TrackMatrix) {
    let (u2, v2, w2) = (offset.x, offset.y, offset.z);
    let (u1, v1, dudw, dvdw) = (vec[0], vec[1], vec[2], vec[3]);

    let s = -w2 * (1. + dudw * dudw + dvdw * dvdw).sqrt() * direction.sign();

    let mut moved = *vec;
    moved[0] = u2 + u1 - w2 * dudw;
    moved[1] = v2 + v1 - w2 * dvdw;

    let mut jac = TrackMatrix::identity();
    jac[(0, 2)] = -w2;
    jac[(1, 3)] = -w2;

    (moved, direction, s, jac)
}

/// Moves a line state from a line through the track position to the
/// parallel line whose frame sees that position at `offset`.
fn line_step(vec: &TrackVector, offset: &Point3) -> (TrackVector, TrackDirection, f64, TrackMatrix) {
    let (u2, v2, w2) = (offset.x, offset.y, offset.z);
    let (r1, v1, phi, eta) = (vec[0], vec[1], vec[2], vec[3]);
    let (sphi, cphi) = phi.sin_cos();
    let (sh, ch) = (eta.sinh(), eta.cosh());

    // Perpendicular step in the u-w plane, and the impact parameter offset.
    let d2 = -(w2 * sphi + u2 * cphi);
    let r2 = w2 * cphi - u2 * sphi;
    let s = d2 * ch;

    let mut moved = *vec;
    moved[0] = r2 + r1;
    moved[1] = v2 + v1 + d2 * sh;

    let mut jac = TrackMatrix::identity();
    jac[(0, 2)] = d2;
    jac[(1, 2)] = -r2 * sh;
    jac[(1, 3)] = d2 * ch;

    (moved, TrackDirection::Unknown, s, jac)
}

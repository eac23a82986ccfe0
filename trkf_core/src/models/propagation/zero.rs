// trkf_core/src/models/propagation/zero.rs

use crate::config::DEFAULT_MAX_DIST;
use crate::error::{KalmanError, KalmanResult};
use crate::estimation::track::KTrack;
use crate::surfaces::{Surface, SurfaceGeometry, SurfaceHandle};
use crate::types::{Point3, TrackDirection, TrackMatrix, TrackVector};
use nalgebra::{RowVector3, SMatrix, Vector3};

type Jac3 = SMatrix<f64, 3, 5>;

/// A tangent whose normal component is below this fraction of its length is
/// treated as lying in the destination surface.
const PARALLEL_TOLERANCE: f64 = 1e-12;

/// A track expressed in global coordinates, with the derivatives of each
/// piece with respect to the 5 surface parameters.
///
/// `tangent` is not normalized but always points along the motion.
struct GlobalTrack {
    position: Point3,
    tangent: Vector3<f64>,
    d_position: Jac3,
    d_tangent: Jac3,
}

/// Zero-distance propagation: re-expresses a track on another surface that
/// passes (within `max_dist`) through the track's current position.
///
/// Any source/destination pair of surface types is handled by going through
/// global coordinates. The Jacobian is analytic and the noise is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PropZero {
    max_dist: f64,
}

impl Default for PropZero {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIST)
    }
}

impl PropZero {
    pub fn new(max_dist: f64) -> Self {
        Self { max_dist }
    }

    pub fn max_dist(&self) -> f64 {
        self.max_dist
    }

    /// The track re-expressed on `dest`, and `d(dest params) / d(source params)`.
    pub fn transform(
        &self,
        trk: &KTrack,
        dest: &SurfaceHandle,
    ) -> KalmanResult<(KTrack, TrackMatrix)> {
        if !trk.is_valid() {
            return Err(KalmanError::InvalidState);
        }
        let global = to_global(trk)?;

        let rot = dest.rotation();
        let p = dest.to_local(&global.position);
        let t = rot * global.tangent;
        let jp = rot * global.d_position;
        let jt = rot * global.d_tangent;

        let (mut vec, direction, mut jac) = match dest.as_ref() {
            Surface::YZLine(_) => self.onto_line(&p, &t, &jp, &jt)?,
            Surface::YZPlane(_) | Surface::XYZPlane(_) => self.onto_plane(&p, &t, &jp, &jt)?,
        };
        vec[4] = trk.vector()[4];
        jac[(4, 4)] = 1.;

        let moved = KTrack::new(dest.clone(), vec, direction).with_mass(trk.mass());
        Ok((moved, jac))
    }

    /// Same as [`transform`](Self::transform), committing the result to `trk`.
    pub fn prop(&self, trk: &mut KTrack, dest: &SurfaceHandle) -> KalmanResult<TrackMatrix> {
        let (moved, jac) = self.transform(trk, dest)?;
        *trk = moved;
        Ok(jac)
    }

    fn onto_plane(
        &self,
        p: &Point3,
        t: &Vector3<f64>,
        jp: &Jac3,
        jt: &Jac3,
    ) -> KalmanResult<(TrackVector, TrackDirection, TrackMatrix)> {
        let (pu, pv, pw) = (p.x, p.y, p.z);
        let (tu, tv, tw) = (t.x, t.y, t.z);
        if pw.abs() > self.max_dist {
            return Err(KalmanError::OutOfTolerance {
                distance: pw.abs(),
                max_dist: self.max_dist,
            });
        }
        if tw.abs() <= PARALLEL_TOLERANCE * t.norm() {
            return Err(KalmanError::TrackParallelToPlane);
        }

        let dudw = tu / tw;
        let dvdw = tv / tw;
        let tw2 = tw * tw;

        let d_dudw = RowVector3::new(1. / tw, 0., -tu / tw2) * jt;
        let d_dvdw = RowVector3::new(0., 1. / tw, -tv / tw2) * jt;
        let d_u = RowVector3::new(1., 0., -dudw) * jp - d_dudw * pw;
        let d_v = RowVector3::new(0., 1., -dvdw) * jp - d_dvdw * pw;

        let mut jac = TrackMatrix::zeros();
        jac.set_row(0, &d_u);
        jac.set_row(1, &d_v);
        jac.set_row(2, &d_dudw);
        jac.set_row(3, &d_dvdw);

        let vec = TrackVector::new(pu - pw * dudw, pv - pw * dvdw, dudw, dvdw, 0.);
        Ok((vec, TrackDirection::from_sign(tw), jac))
    }

    fn onto_line(
        &self,
        p: &Point3,
        t: &Vector3<f64>,
        jp: &Jac3,
        jt: &Jac3,
    ) -> KalmanResult<(TrackVector, TrackDirection, TrackMatrix)> {
        let (pu, pv, pw) = (p.x, p.y, p.z);
        let (tu, tv, tw) = (t.x, t.y, t.z);
        let perp = pu.hypot(pw);
        if perp > self.max_dist {
            return Err(KalmanError::OutOfTolerance {
                distance: perp,
                max_dist: self.max_dist,
            });
        }
        let rho2 = tu * tu + tw * tw;
        if rho2.sqrt() <= PARALLEL_TOLERANCE * t.norm() {
            return Err(KalmanError::TrackParallelToPlane);
        }
        let rho = rho2.sqrt();
        let rho3 = rho2 * rho;
        let rho4 = rho2 * rho2;

        let phi = tw.atan2(tu);
        let g = tv / rho;
        let eta = g.asinh();
        let r = (pw * tu - pu * tw) / rho;
        let along = pu * tu + pw * tw;
        let v = pv - tv * along / rho2;

        let d_r = RowVector3::new(-tw / rho, 0., tu / rho) * jp
            + RowVector3::new(pw / rho - r * tu / rho2, 0., -pu / rho - r * tw / rho2) * jt;
        let d_v = RowVector3::new(-tv * tu / rho2, 1., -tv * tw / rho2) * jp
            + RowVector3::new(
                -tv * (pu / rho2 - 2. * along * tu / rho4),
                -along / rho2,
                -tv * (pw / rho2 - 2. * along * tw / rho4),
            ) * jt;
        let d_phi = RowVector3::new(-tw / rho2, 0., tu / rho2) * jt;
        let d_eta = RowVector3::new(-tv * tu / rho3, 1. / rho, -tv * tw / rho3) * jt
            / (1. + g * g).sqrt();

        let mut jac = TrackMatrix::zeros();
        jac.set_row(0, &d_r);
        jac.set_row(1, &d_v);
        jac.set_row(2, &d_phi);
        jac.set_row(3, &d_eta);

        let vec = TrackVector::new(r, v, phi, eta, 0.);
        Ok((vec, TrackDirection::Unknown, jac))
    }
}

fn to_global(trk: &KTrack) -> KalmanResult<GlobalTrack> {
    let surf = trk.surface();
    let vec = trk.vector();
    let rot = surf.rotation();
    let u_hat: Vector3<f64> = rot.row(0).transpose();
    let v_hat: Vector3<f64> = rot.row(1).transpose();
    let w_hat: Vector3<f64> = rot.row(2).transpose();

    let mut d_position = Jac3::zeros();
    let mut d_tangent = Jac3::zeros();

    let tangent = match surf.as_ref() {
        Surface::YZPlane(_) | Surface::XYZPlane(_) => {
            let sigma = match trk.direction() {
                TrackDirection::Unknown => return Err(KalmanError::DirectionRequired),
                dir => dir.sign(),
            };
            d_position.set_column(0, &u_hat);
            d_position.set_column(1, &v_hat);
            d_tangent.set_column(2, &(u_hat * sigma));
            d_tangent.set_column(3, &(v_hat * sigma));
            (u_hat * vec[2] + v_hat * vec[3] + w_hat) * sigma
        }
        Surface::YZLine(_) => {
            let (r, phi, eta) = (vec[0], vec[2], vec[3]);
            let (sphi, cphi) = phi.sin_cos();
            let radial = w_hat * cphi - u_hat * sphi;
            d_position.set_column(0, &radial);
            d_position.set_column(1, &v_hat);
            d_position.set_column(2, &((u_hat * cphi + w_hat * sphi) * -r));
            d_tangent.set_column(2, &radial);
            d_tangent.set_column(3, &(v_hat * eta.cosh()));
            u_hat * cphi + v_hat * eta.sinh() + w_hat * sphi
        }
    };

    Ok(GlobalTrack {
        position: surf.get_position(vec),
        tangent,
        d_position,
        d_tangent,
    })
}

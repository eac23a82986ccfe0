// trkf_core/tests/kalman_scenarios.rs

//! End-to-end behaviour of the public API: surfaces, propagation and one
//! Kalman step against a wire measurement.

use approx::assert_abs_diff_eq;
use std::sync::Arc;
use trkf_core::prelude::*;

fn services() -> DetectorServices {
    DetectorServices::standard(Arc::new(SimpleWireGeometry::default()))
}

fn yz_plane(x0: f64, y0: f64, z0: f64, phi: f64) -> SurfaceHandle {
    Surface::from(SurfYZPlane::new(x0, y0, z0, phi)).into_handle()
}

fn track_at(z: f64, direction: TrackDirection) -> KTrack {
    KTrack::new(
        yz_plane(0., 0., z, 0.),
        TrackVector::new(10., 5., 0.2, -0.1, 1.),
        direction,
    )
}

#[test]
fn surface_equality_and_signed_distance() {
    let a = Surface::from(SurfYZPlane::new(0., 0., 0., 0.));
    let b = Surface::from(SurfYZPlane::new(0., 0., 0., 0.));
    let c = Surface::from(SurfYZPlane::new(0., 1., 1., 0.));
    let d = Surface::from(SurfYZPlane::new(2., 2., 2., 1.));

    assert!(a.is_equal(&b));
    assert!(a.is_parallel(&c) && !a.is_equal(&c));
    assert_abs_diff_eq!(a.distance_to(&c).unwrap(), 1., epsilon = 1e-12);
    assert_eq!(a.distance_to(&d), Err(KalmanError::NotParallel));
}

#[test]
fn kalman_step_on_wire_measurement() {
    let services = services();
    let wire = services.geometry.channel_to_wire(1).unwrap();
    let hit = Hit {
        channel: 1,
        wire,
        peak_time: 10.,
        sigma_peak_time: 1.,
        integral: 50.,
    };
    let meas = KHitWireX::from_hit(&hit, None, &services).unwrap();

    let seed = KTrack::new(
        meas.meas_surface().clone(),
        TrackVector::new(5., 0., 0.1, 0., 1.),
        TrackDirection::Forward,
    );
    let mut tre = KETrack::with_starting_error(seed);
    let before = tre.error()[(0, 0)];

    let prediction = meas.predict(&tre, None, None).unwrap();
    assert!(prediction.chisq.is_finite() && prediction.chisq > 0.);

    meas.update(&prediction, &mut tre).unwrap();
    assert!(tre.error()[(0, 0)] < before);
    for i in 0..5 {
        assert!(tre.error()[(i, i)] > 0.);
    }
}

#[test]
fn backward_propagation_request_is_refused() {
    let services = services();
    let prop = PropAny::new(PropagatorConfig::default(), &services, true).unwrap();
    let mut tre = KETrack::with_starting_error(track_at(10., TrackDirection::Forward));
    let before = tre.clone();

    let behind = yz_plane(0., 0., 5., 0.);
    let result = prop.noise_prop(&mut tre, &behind, PropDirection::Forward, true, None);
    assert!(matches!(result, Err(KalmanError::DirectionMismatch { .. })));
    assert_eq!(tre, before);

    let mut trk = track_at(10., TrackDirection::Forward);
    let untouched = trk.clone();
    assert!(prop
        .vec_prop(&mut trk, &behind, PropDirection::Forward, false, false)
        .is_err());
    assert_eq!(trk, untouched);
}

#[test]
fn direction_tag_follows_motion() {
    let services = services();
    let prop = PropAny::new(PropagatorConfig::default(), &services, false).unwrap();

    // Moving towards -z: the plane at z = 4 lies ahead.
    let mut trk = track_at(10., TrackDirection::Backward);
    let step = prop
        .vec_prop(&mut trk, &yz_plane(0., 0., 4., 0.), PropDirection::Forward, false, false)
        .unwrap();
    assert!(step.distance > 0.);
    assert_eq!(trk.direction(), TrackDirection::Backward);
    assert!(trk.momentum().unwrap().z < 0.);
    assert_abs_diff_eq!(trk.position().z, 4., epsilon = 1e-9);
}

#[test]
fn energy_loss_reduces_momentum() {
    let services = services();
    let prop = PropAny::new(PropagatorConfig::default(), &services, false).unwrap();
    let mut trk = track_at(0., TrackDirection::Forward);
    let p0 = trk.p();
    prop.vec_prop(&mut trk, &yz_plane(0., 0., 30., 0.), PropDirection::Forward, true, false)
        .unwrap();
    assert!(trk.p() < p0);

    // Without energy loss the momentum is untouched.
    let mut trk = track_at(0., TrackDirection::Forward);
    prop.vec_prop(&mut trk, &yz_plane(0., 0., 30., 0.), PropDirection::Forward, false, false)
        .unwrap();
    assert_eq!(trk.p(), p0);
}

#[test]
fn zero_distance_moves_keep_position() {
    let services = services();
    let prop = PropAny::new(PropagatorConfig::default(), &services, false).unwrap();
    let mut trk = track_at(10., TrackDirection::Forward);
    let start = trk.position();

    prop.origin_vec_prop(&mut trk, &yz_plane(0., 0., 0., 0.3)).unwrap();
    assert_abs_diff_eq!(trk.position(), start, epsilon = 1e-6);

    // There and back again through PropZero.
    let zero = PropZero::new(1e-3);
    let home = trk.surface().clone();
    let tilted = Surface::from(SurfXYZPlane::from_normal(&start, &trk.unit_direction().unwrap()))
        .into_handle();
    zero.prop(&mut trk, &tilted).unwrap();
    zero.prop(&mut trk, &home).unwrap();
    assert_abs_diff_eq!(trk.position(), start, epsilon = 1e-6);
}

#[test]
fn filter_builds_ordered_track() {
    let services = services();
    let x = 30.;
    let ticks = services.detprop.x_to_ticks(x, 2, 0, 0);
    let hits: Vec<Hit> = (100..140)
        .map(|wire| Hit {
            channel: services.geometry.plane_wire_to_channel(2, wire, 0, 0),
            wire: WireId {
                cryostat: 0,
                tpc: 0,
                plane: 2,
                wire,
            },
            peak_time: ticks,
            sigma_peak_time: 1.,
            integral: 80.,
        })
        .collect();

    let mut container = KHitContainer::new();
    container.fill_wire_x(&hits, &services, None).unwrap();
    let pref_plane = container.preferred_plane();
    assert_eq!(pref_plane, Some(2));

    let surface = container.unsorted()[0].surface().unwrap().clone();
    let seed = KETrack::with_starting_error(KTrack::new(
        surface,
        TrackVector::new(x, 0., 0., 0., 1.),
        TrackDirection::Forward,
    ));
    let prop = PropAny::new(PropagatorConfig::default(), &services, true).unwrap();
    let filter = KalmanFilter::new(Box::new(prop), FilterConfig::default()).unwrap();
    let mut gtrack = filter
        .build_track(&seed, &mut container, pref_plane, PropDirection::Forward)
        .unwrap();

    assert_eq!(gtrack.len(), 40);
    gtrack.recalibrate();
    let keys: Vec<f64> = gtrack.iter().map(|(key, _)| key).collect();
    assert_eq!(keys[0], 0.);
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));

    let track = gtrack
        .fill_track(1, true, &PropagatorConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(track.len(), 40);
    for sample in &track.dqdx[&2] {
        assert_abs_diff_eq!(*sample, 80. / 0.3, epsilon = 1.);
    }
}

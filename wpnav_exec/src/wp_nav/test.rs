//! Whole-segment tests of waypoint navigation, flown with a vehicle that
//! tracks the target perfectly one cycle behind.

use std::cell::Cell;
use std::f64::consts::FRAC_PI_2;

use nalgebra::{Vector2, Vector3};

use super::*;

const DT_S: f64 = 0.01;
const EPS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

/// Terrain which can be switched off.
struct SwitchTerrain {
    available: Cell<bool>,
    height_cm: f64
}

impl TerrainSource for SwitchTerrain {
    fn terrain_height_cm(&self, _: &Vector2<f64>) -> Option<f64> {
        if self.available.get() {
            Some(self.height_cm)
        }
        else {
            None
        }
    }
}

fn vehicle_at(position_cm: Vector3<f64>) -> VehicleState {
    VehicleState {
        position_cm,
        ..Default::default()
    }
}

fn input(vehicle: VehicleState) -> InputData {
    InputData {
        dt_s: DT_S,
        vehicle,
        rangefinder: RangefinderReading::default()
    }
}

/// Build an initialised module with the vehicle at `position_cm`.
fn nav_at<'a>(position_cm: Vector3<f64>) -> WpNav<'a> {
    let mut nav = WpNav::new(Params::default());
    nav.capture_inputs(&input(vehicle_at(position_cm)));
    nav.init_segments();
    nav
}

/// Advance one cycle then move the vehicle onto the new target.
fn tick(nav: &mut WpNav, vehicle: &mut VehicleState) -> Result<(), WpNavError> {
    nav.advance(&input(*vehicle))?;

    let out = nav.output();
    vehicle.position_cm = out.target_pos_cm;
    vehicle.velocity_cms = out.target_vel_cms;

    Ok(())
}

// ---------------------------------------------------------------------------
// STRAIGHT SEGMENTS
// ---------------------------------------------------------------------------

#[test]
fn test_short_straight_profile() {
    let origin = Vector3::zeros();
    let dest = Vector3::new(1000.0, 0.0, 0.0);
    let mut nav = nav_at(origin);
    let mut vehicle = vehicle_at(origin);

    nav.set_segment(origin, dest, false).unwrap();

    let mut speeds = vec![];
    let mut progress = vec![];
    for _ in 0..2000 {
        tick(&mut nav, &mut vehicle).unwrap();
        speeds.push(nav.target_vel_cms().norm());
        progress.push(nav.report().progress_cm);
    }

    // Progress never goes backwards and ends on the destination
    for p in progress.windows(2) {
        assert!(p[1] >= p[0]);
    }
    assert!((nav.target_pos_cm() - dest).norm() < EPS);
    assert!(nav.reached_destination());
    assert!(nav.waypoint_completed());
    assert_eq!(nav.guidance_state(), GuidanceState::Arrived);

    // Never reaches cruise speed, peaks at sqrt(A * L) near the middle
    let (i_max, v_max) = speeds.iter()
        .enumerate()
        .fold((0, 0.0), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
    assert!(v_max > 305.0 && v_max < 320.0, "peak speed {}", v_max);
    assert!(progress[i_max] > 450.0 && progress[i_max] < 550.0);

    // Speed only falls after the peak
    for v in speeds[i_max..].windows(2) {
        assert!(v[1] <= v[0] + EPS);
    }
}

#[test]
fn test_long_straight_states() {
    let origin = Vector3::new(0.0, 0.0, 1000.0);
    let dest = Vector3::new(0.0, 3000.0, 1000.0);
    let mut nav = nav_at(origin);
    let mut vehicle = vehicle_at(origin);

    assert_eq!(nav.guidance_state(), GuidanceState::Idle);
    nav.set_segment(origin, dest, false).unwrap();
    assert_eq!(nav.guidance_state(), GuidanceState::Tracking);

    let mut states = vec![GuidanceState::Tracking];
    let mut v_max: f64 = 0.0;
    for _ in 0..3000 {
        tick(&mut nav, &mut vehicle).unwrap();

        let state = nav.guidance_state();
        if states.last() != Some(&state) {
            states.push(state);
        }
        v_max = v_max.max(nav.target_vel_cms().norm());
        assert!(nav.crosstrack_error_cm() < EPS);
    }

    assert_eq!(
        states,
        vec![GuidanceState::Tracking, GuidanceState::Slowing, GuidanceState::Arrived]
    );
    assert!((v_max - 500.0).abs() < EPS);
    assert!(nav.distance_to_destination_cm() < nav.params().wp_radius_cm);
}

#[test]
fn test_fast_waypoint_completes_early() {
    let origin = Vector3::zeros();
    let dest = Vector3::new(1000.0, 0.0, 0.0);
    let mut nav = nav_at(origin);
    let mut vehicle = vehicle_at(origin);

    nav.set_segment(origin, dest, false).unwrap();
    nav.set_fast_waypoint(true);

    let mut completed_at = None;
    let mut max_progress: f64 = 0.0;
    for _ in 0..2000 {
        tick(&mut nav, &mut vehicle).unwrap();
        let progress = nav.report().progress_cm;
        max_progress = max_progress.max(progress);

        if completed_at.is_none() && nav.waypoint_completed() {
            completed_at = Some(progress);

            // Handed over before the vehicle gets near the destination
            assert!(!nav.reached_destination());
            assert!(nav.distance_to_destination_cm() > nav.params().wp_radius_cm);
        }
        assert!(!nav.report().slowing_down);
    }

    // 1000 - min(225, leash)
    let completed_at = completed_at.unwrap();
    assert!(completed_at >= 775.0 && completed_at < 780.0, "completed at {}", completed_at);

    // Allowed to overshoot a little
    assert!(max_progress > 1000.0);
    assert!(max_progress <= 1000.0 + nav.params().fast_overshoot_max_cm + EPS);
}

#[test]
fn test_reached_destination_latches() {
    let origin = Vector3::zeros();
    let dest = Vector3::new(2000.0, 0.0, 0.0);
    let mut nav = nav_at(origin);
    let mut vehicle = vehicle_at(origin);
    let radius_cm = nav.params().wp_radius_cm;

    nav.set_segment(origin, dest, false).unwrap();

    let mut prev_dist_cm = nav.distance_to_destination_cm();
    let mut reached_at = None;
    for i in 0..3000 {
        tick(&mut nav, &mut vehicle).unwrap();
        let dist_cm = nav.distance_to_destination_cm();

        match reached_at {
            None if nav.reached_destination() => {
                // Raised on the first cycle inside the radius
                assert!(dist_cm < radius_cm);
                assert!(prev_dist_cm >= radius_cm);
                reached_at = Some(i);
            },
            None => assert!(dist_cm >= radius_cm),
            Some(_) => assert!(nav.reached_destination())
        }
        prev_dist_cm = dist_cm;
    }
    assert!(reached_at.is_some());

    // Moving the vehicle away again doesn't clear it
    let away = vehicle_at(Vector3::new(-500.0, 0.0, 0.0));
    nav.advance(&input(away)).unwrap();
    assert!(nav.reached_destination());

    // Only a new segment does
    nav.set_destination(Vector3::new(2000.0, 2000.0, 0.0), false).unwrap();
    assert!(!nav.reached_destination());
}

#[test]
fn test_leash_holds_target() {
    let origin = Vector3::zeros();
    let dest = Vector3::new(5000.0, 0.0, 0.0);
    let mut nav = nav_at(origin);
    let vehicle = vehicle_at(origin);

    nav.set_segment(origin, dest, false).unwrap();

    // Vehicle doesn't move
    for _ in 0..3000 {
        nav.advance(&input(vehicle)).unwrap();
        assert!(nav.report().progress_cm <= nav.track_limits().leash_cm + EPS);
    }
    assert!((nav.report().progress_cm - 1300.0).abs() < EPS);
    assert!(!nav.reached_destination());
}

#[test]
fn test_reversing_vehicle_holds_target() {
    let origin = Vector3::zeros();
    let dest = Vector3::new(5000.0, 0.0, 0.0);
    let mut nav = nav_at(origin);
    let mut vehicle = vehicle_at(origin);

    nav.set_segment(origin, dest, false).unwrap();
    for _ in 0..200 {
        tick(&mut nav, &mut vehicle).unwrap();
    }
    let progress = nav.report().progress_cm;
    assert!(progress > 0.0);

    vehicle.velocity_cms = Vector3::new(-500.0, 0.0, 0.0);
    for _ in 0..100 {
        nav.advance(&input(vehicle)).unwrap();
        assert_eq!(nav.report().progress_cm, progress);
        assert_eq!(nav.target_vel_cms(), Vector3::zeros());
    }
}

#[test]
fn test_degenerate_segment_arrives() {
    let p = Vector3::new(100.0, 100.0, 100.0);
    let mut nav = nav_at(p);

    nav.set_segment(p, p, false).unwrap();
    assert!(nav.reached_destination());
    assert!(nav.waypoint_completed());
    assert_eq!(nav.guidance_state(), GuidanceState::Arrived);

    nav.advance(&input(vehicle_at(p))).unwrap();
    assert_eq!(nav.target_pos_cm(), p);
}

#[test]
fn test_new_destination_latch() {
    let mut nav = nav_at(Vector3::zeros());

    nav.set_segment(Vector3::zeros(), Vector3::new(1000.0, 0.0, 0.0), false).unwrap();
    assert!(nav.is_new_destination());
    assert!(nav.output().new_destination);

    nav.advance(&input(VehicleState::default())).unwrap();
    assert!(nav.output().new_destination);
    assert!(!nav.is_new_destination());

    nav.advance(&input(VehicleState::default())).unwrap();
    assert!(!nav.output().new_destination);
}

#[test]
fn test_reached_previous_wpt() {
    let a = Vector3::zeros();
    let b = Vector3::new(1000.0, 0.0, 0.0);
    let c = Vector3::new(1000.0, 1000.0, 0.0);
    let mut nav = nav_at(a);
    let mut vehicle = vehicle_at(a);

    nav.set_segment(a, b, false).unwrap();
    assert!(!nav.reached_previous_wpt());
    while !nav.waypoint_completed() {
        tick(&mut nav, &mut vehicle).unwrap();
    }

    nav.set_segment(b, c, false).unwrap();
    assert!(nav.reached_previous_wpt());

    // Replaced before it completed
    nav.set_segment(b, c, false).unwrap();
    assert!(!nav.reached_previous_wpt());

    nav.set_segment(c, c, false).unwrap();
    nav.set_segment(c, a, false).unwrap();
    assert!(nav.reached_previous_wpt());
    nav.reset_reached_previous_wpt();
    assert!(!nav.reached_previous_wpt());

    nav.init_segments();
    assert!(!nav.reached_previous_wpt());
    assert_eq!(nav.guidance_state(), GuidanceState::Idle);
}

#[test]
fn test_yaw() {
    let mut nav = nav_at(Vector3::zeros());
    nav.capture_inputs(&input(VehicleState {
        yaw_rad: 1.0,
        ..Default::default()
    }));

    // Nothing set yet
    assert_eq!(nav.yaw(), 1.0);

    // Too short to set a yaw
    nav.set_segment(Vector3::zeros(), Vector3::new(0.0, 100.0, 0.0), false).unwrap();
    assert_eq!(nav.yaw(), 1.0);

    // Long enough, points along the track
    nav.set_segment(Vector3::zeros(), Vector3::new(0.0, 1000.0, 0.0), false).unwrap();
    assert!((nav.yaw() - FRAC_PI_2).abs() < EPS);
    assert!((nav.bearing_to_destination_rad() - FRAC_PI_2).abs() < EPS);
}

#[test]
fn test_shift_origin_to_current_pos() {
    let vehicle_pos = Vector3::new(10.0, 20.0, 5.0);
    let mut nav = nav_at(vehicle_pos);
    let dest = Vector3::new(1000.0, 0.0, 0.0);

    nav.set_segment(Vector3::zeros(), dest, false).unwrap();
    nav.shift_origin_to_current_pos();

    assert!((nav.target_pos_cm() - vehicle_pos).norm() < EPS);
    assert!((nav.origin().unwrap() - vehicle_pos).norm() < EPS);
    assert!((nav.destination().unwrap() - (dest + vehicle_pos)).norm() < EPS);

    // No effect once the target has moved
    let mut vehicle = vehicle_at(vehicle_pos);
    tick(&mut nav, &mut vehicle).unwrap();
    let origin = nav.origin().unwrap();
    nav.capture_inputs(&input(vehicle_at(Vector3::new(500.0, 500.0, 0.0))));
    nav.shift_origin_to_current_pos();
    assert_eq!(nav.origin().unwrap(), origin);
}

#[test]
fn test_set_destination_origin() {
    let start = Vector3::new(100.0, 0.0, 0.0);
    let mut nav = nav_at(start);

    // Idle and stationary: starts at the vehicle
    nav.set_destination(Vector3::new(1000.0, 0.0, 0.0), false).unwrap();
    assert!((nav.origin().unwrap() - start).norm() < EPS);

    // Active: starts at the current target
    let mut vehicle = vehicle_at(start);
    for _ in 0..100 {
        tick(&mut nav, &mut vehicle).unwrap();
    }
    let target = nav.target_pos_cm();
    nav.set_destination(Vector3::new(1000.0, 1000.0, 0.0), false).unwrap();
    assert!((nav.origin().unwrap() - target).norm() < EPS);
}

#[test]
fn test_speed_change_recalculates_limits() {
    let mut nav = nav_at(Vector3::zeros());
    let mut vehicle = VehicleState::default();

    nav.set_segment(Vector3::zeros(), Vector3::new(5000.0, 0.0, 0.0), false).unwrap();
    tick(&mut nav, &mut vehicle).unwrap();
    assert!(!nav.report().limits_recalculated);

    nav.set_speed_up(100.0);
    tick(&mut nav, &mut vehicle).unwrap();
    assert!(nav.report().limits_recalculated);
    tick(&mut nav, &mut vehicle).unwrap();
    assert!(!nav.report().limits_recalculated);

    // Horizontal speed ramps at the acceleration
    nav.set_speed_xy(300.0);
    tick(&mut nav, &mut vehicle).unwrap();
    assert!(nav.report().limits_recalculated);
    assert!((nav.track_limits().speed_cms - 499.0).abs() < EPS);
    for _ in 0..300 {
        tick(&mut nav, &mut vehicle).unwrap();
    }
    assert!((nav.track_limits().speed_cms - 300.0).abs() < EPS);
}

#[test]
fn test_set_params_sanitises() {
    let mut nav = nav_at(Vector3::zeros());

    nav.set_params(Params {
        wp_accel_cmss: -5.0,
        ..Default::default()
    });
    assert_eq!(nav.params().wp_accel_cmss, params::WP_ACCEL_MIN_CMSS);
}

#[test]
fn test_infinite_speed_still_tracks() {
    let origin = Vector3::zeros();
    let dest = Vector3::new(1000.0, 0.0, 0.0);
    let mut nav = nav_at(origin);
    let mut vehicle = vehicle_at(origin);

    nav.set_params(Params {
        wp_speed_cms: f64::INFINITY,
        ..Default::default()
    });
    nav.set_speed_xy(f64::INFINITY);
    nav.set_segment(origin, dest, false).unwrap();
    assert!(nav.track_limits().leash_cm.is_finite());

    for _ in 0..50 {
        tick(&mut nav, &mut vehicle).unwrap();
        assert!(nav.target_pos_cm().iter().all(|v| v.is_finite()));
    }
    assert!(nav.report().progress_cm > 0.0);

    for _ in 0..3000 {
        tick(&mut nav, &mut vehicle).unwrap();
    }
    assert!(nav.reached_destination());
}

#[test]
fn test_infinite_accel_spline_speed_limited() {
    let origin = Vector3::zeros();
    let dest = Vector3::new(3000.0, 0.0, 0.0);
    let mut nav = nav_at(origin);
    let mut vehicle = vehicle_at(origin);

    nav.set_spline_segment(origin, dest, false, true, SplineEnd::Stop).unwrap();
    nav.set_accel(f64::INFINITY, 100.0);

    // Nowhere near far enough to be going faster than cruise
    for _ in 0..50 {
        tick(&mut nav, &mut vehicle).unwrap();
    }
    let speed_cms = nav.params().wp_speed_cms;
    assert!(nav.target_pos_cm()[0] <= speed_cms * 50.0 * DT_S + EPS);
    assert!(nav.target_vel_cms().norm() <= speed_cms + EPS);
}

// ---------------------------------------------------------------------------
// TERRAIN
// ---------------------------------------------------------------------------

#[test]
fn test_terrain_offset_applied() {
    let terrain = SwitchTerrain {
        available: Cell::new(true),
        height_cm: 100.0
    };
    let start = Vector3::new(0.0, 0.0, 600.0);
    let mut nav = nav_at(start).with_terrain_source(&terrain);
    let mut vehicle = vehicle_at(start);

    nav.set_segment(
        Vector3::new(0.0, 0.0, 500.0), Vector3::new(1000.0, 0.0, 500.0), true
    ).unwrap();
    assert!(nav.is_terrain_alt());
    assert!((nav.target_pos_cm()[2] - 600.0).abs() < EPS);

    for _ in 0..100 {
        tick(&mut nav, &mut vehicle).unwrap();
        assert!((nav.target_pos_cm()[2] - 600.0).abs() < EPS);
    }
}

#[test]
fn test_terrain_failure_changes_nothing() {
    let terrain = SwitchTerrain {
        available: Cell::new(false),
        height_cm: 100.0
    };
    let start = Vector3::new(0.0, 0.0, 600.0);
    let mut nav = nav_at(start).with_terrain_source(&terrain);
    let mut vehicle = vehicle_at(start);
    let origin = Vector3::new(0.0, 0.0, 500.0);
    let dest = Vector3::new(1000.0, 0.0, 500.0);

    // Can't set a terrain segment without terrain
    assert!(matches!(
        nav.set_segment(origin, dest, true),
        Err(WpNavError::AltitudeUnresolved(_, _))
    ));
    assert_eq!(nav.guidance_state(), GuidanceState::Idle);
    assert!(nav.origin().is_none());

    terrain.available.set(true);
    nav.set_segment(origin, dest, true).unwrap();
    for _ in 0..100 {
        tick(&mut nav, &mut vehicle).unwrap();
    }

    let output = nav.output();
    let progress = nav.report().progress_cm;
    let captured = *nav.vehicle();
    let dist_cm = nav.distance_to_destination_cm();
    let bearing_rad = nav.bearing_to_destination_rad();
    let stopping_point = nav.stopping_point();
    terrain.available.set(false);

    // A vehicle somewhere else entirely, which must not be taken in
    let moved = VehicleState {
        position_cm: Vector3::new(-400.0, 300.0, 900.0),
        velocity_cms: Vector3::new(-200.0, 100.0, 0.0),
        yaw_rad: 2.0
    };
    for _ in 0..10 {
        assert!(nav.advance(&input(moved)).is_err());
    }
    assert_eq!(nav.output(), output);
    assert_eq!(nav.target_pos_cm(), output.target_pos_cm);
    assert_eq!(nav.report().progress_cm, progress);
    assert_eq!(*nav.vehicle(), captured);
    assert_eq!(nav.distance_to_destination_cm(), dist_cm);
    assert_eq!(nav.bearing_to_destination_rad(), bearing_rad);
    assert_eq!(nav.stopping_point(), stopping_point);

    // Recovers when the terrain comes back
    terrain.available.set(true);
    tick(&mut nav, &mut vehicle).unwrap();
    assert!(nav.report().progress_cm > progress);

    // Same again with the source removed rather than out of data
    let progress = nav.report().progress_cm;
    nav.set_terrain_source(None);
    assert!(matches!(
        nav.advance(&input(moved)),
        Err(WpNavError::AltitudeUnresolved(_, _))
    ));
    assert_eq!(nav.report().progress_cm, progress);

    nav.set_terrain_source(Some(&terrain));
    tick(&mut nav, &mut vehicle).unwrap();
    assert!(nav.report().progress_cm > progress);
}

#[test]
fn test_rangefinder_terrain() {
    let mut nav = WpNav::new(Params {
        rangefinder_use: true,
        rangefinder_filt_hz: 0.0,
        ..Default::default()
    });
    let inputs = InputData {
        dt_s: DT_S,
        vehicle: vehicle_at(Vector3::new(0.0, 0.0, 1000.0)),
        rangefinder: RangefinderReading {
            available: true,
            healthy: true,
            alt_cm: 800.0
        }
    };
    nav.capture_inputs(&inputs);
    nav.init_segments();

    nav.set_segment(Vector3::new(0.0, 0.0, 800.0), Vector3::new(1000.0, 0.0, 800.0), true)
        .unwrap();
    nav.advance(&inputs).unwrap();
    assert!((nav.target_pos_cm()[2] - 1000.0).abs() < EPS);

    let unhealthy = InputData {
        rangefinder: RangefinderReading {
            healthy: false,
            ..inputs.rangefinder
        },
        ..inputs
    };
    assert!(nav.advance(&unhealthy).is_err());
}

// ---------------------------------------------------------------------------
// SPLINES
// ---------------------------------------------------------------------------

#[test]
fn test_spline_to_stop() {
    let origin = Vector3::zeros();
    let dest = Vector3::new(1000.0, 1000.0, 0.0);
    let mut nav = nav_at(origin);
    let mut vehicle = vehicle_at(origin);

    nav.set_spline_segment(origin, dest, false, true, SplineEnd::Stop).unwrap();
    assert_eq!(nav.segment_kind(), Some(SegmentKind::Spline));
    assert!(!nav.is_fast_waypoint());

    let mut last_time = 0.0;
    let mut last_progress = 0.0;
    for _ in 0..3000 {
        tick(&mut nav, &mut vehicle).unwrap();
        let report = nav.report();

        assert!(report.spline_time >= last_time);
        assert!(report.spline_time <= 1.0);
        assert!(report.progress_cm >= last_progress);
        assert!(nav.target_vel_cms().norm() < 505.0);

        last_time = report.spline_time;
        last_progress = report.progress_cm;
    }

    assert_eq!(last_time, 1.0);
    assert!((nav.target_pos_cm() - dest).norm() < EPS);
    assert!(nav.reached_destination());
    assert_eq!(nav.guidance_state(), GuidanceState::Arrived);
}

#[test]
fn test_spline_to_spline_continuity() {
    let a = Vector3::zeros();
    let b = Vector3::new(1000.0, 0.0, 0.0);
    let c = Vector3::new(2000.0, 1000.0, 0.0);
    let mut nav = nav_at(a);
    let mut vehicle = vehicle_at(a);

    nav.set_spline_segment(a, b, false, true, SplineEnd::Spline(c)).unwrap();
    assert!(nav.is_fast_waypoint());

    let mut ticks = 0;
    while !nav.waypoint_completed() && ticks < 5000 {
        tick(&mut nav, &mut vehicle).unwrap();
        ticks += 1;
        assert!(!nav.report().slowing_down);
    }
    assert!(nav.waypoint_completed());
    let first_dest_vel = nav.spline.unwrap().destination_vel;
    assert!((first_dest_vel - (c - a)).norm() < EPS);

    nav.set_spline_segment(b, c, false, false, SplineEnd::Stop).unwrap();
    assert!(nav.reached_previous_wpt());
    assert!(!nav.is_fast_waypoint());
    assert!((nav.spline.unwrap().origin_vel - first_dest_vel).norm() < EPS);
}

#[test]
fn test_straight_to_spline_continuity() {
    let a = Vector3::zeros();
    let b = Vector3::new(1000.0, 0.0, 0.0);
    let c = Vector3::new(2000.0, 1000.0, 0.0);
    let mut nav = nav_at(a);
    let mut vehicle = vehicle_at(a);

    nav.set_segment(a, b, false).unwrap();
    nav.set_fast_waypoint(true);
    while !nav.waypoint_completed() {
        tick(&mut nav, &mut vehicle).unwrap();
    }

    nav.set_spline_segment(b, c, false, false, SplineEnd::Stop).unwrap();
    let spline = nav.spline.unwrap();
    assert!((spline.origin_vel - (b - a)).norm() < EPS);
    assert!(spline.vel_scaler_cms > 0.0);

    // Stopped start ignores the previous segment
    nav.set_spline_segment(b, c, false, true, SplineEnd::Stop).unwrap();
    let spline = nav.spline.unwrap();
    assert!((spline.origin_vel - (c - b) * SPLINE_NOMINAL_DT_S).norm() < EPS);
    assert_eq!(spline.vel_scaler_cms, 0.0);
}

#[test]
fn test_spline_boundary_velocities_scaled() {
    let a = Vector3::zeros();
    let b = Vector3::new(100.0, 0.0, 0.0);
    let mut nav = nav_at(a);

    // The next segment is far away, so the end velocity is much larger than
    // the segment
    nav.set_spline_segment(a, b, false, true, SplineEnd::Straight(Vector3::new(100.0, 5000.0, 0.0)))
        .unwrap();
    let spline = nav.spline.unwrap();
    let sum = spline.origin_vel.norm() + spline.destination_vel.norm();
    assert!((sum - SPLINE_VEL_SUM_MAX_RATIO * 100.0).abs() < EPS);
}

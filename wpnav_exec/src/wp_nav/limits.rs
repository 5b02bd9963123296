//! # Track limits
//!
//! The speed, acceleration and leash of the intermediate target along a
//! track are all derived from the horizontal and vertical limits. The
//! horizontal and vertical shares of the track direction are each limited
//! separately and the tighter of the two wins.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;

// Internal
use super::{
    params::{
        self, Params, WP_ACCEL_MAX_CMSS, WP_ACCEL_MIN_CMSS, WP_SPEED_MAX_CMS, WP_SPEED_MIN_CMS,
        WP_SPEED_Z_MAX_CMS, WP_SPEED_Z_MIN_CMS
    },
    VehicleState
};
use util::maths::{norm_xy, safe_sqrt};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Direction components smaller than this are treated as zero.
const DIRECTION_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The speeds and accelerations currently in use.
///
/// These start from the parameter defaults but can be changed at runtime
/// through the `WpNav::set_*` functions without touching the parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedLimits {
    /// Horizontal speed currently in use, ramps towards `desired_speed_xy_cms`
    pub speed_xy_cms: f64,

    /// Horizontal speed requested by the last `set_speed_xy` call
    pub desired_speed_xy_cms: f64,

    pub speed_up_cms: f64,

    /// Always positive
    pub speed_down_cms: f64,

    pub accel_xy_cmss: f64,
    pub accel_z_cmss: f64
}

/// Limits of the intermediate target along the current track direction.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TrackLimits {
    /// Acceleration along the track
    pub accel_cmss: f64,

    /// Cruise speed along the track
    pub speed_cms: f64,

    /// Maximum speed that still allows stopping at the end of the track
    pub speed_max_cms: f64,

    /// Maximum distance the target may lead the vehicle along the track
    pub leash_cm: f64,

    pub leash_xy_cm: f64,
    pub leash_up_cm: f64,
    pub leash_down_cm: f64,

    /// Remaining distance at which the target starts slowing for a regular
    /// waypoint
    pub slow_down_dist_cm: f64
}

/// Speed profile used when approaching the end of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlowDownProfile {
    pub speed_cms: f64,
    pub accel_cmss: f64,
    pub min_speed_cms: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SpeedLimits {
    /// Build the limits from the parameter defaults.
    pub fn from_params(params: &Params) -> Self {
        Self {
            speed_xy_cms: params.wp_speed_cms,
            desired_speed_xy_cms: params.wp_speed_cms,
            speed_up_cms: params.wp_speed_up_cms,
            speed_down_cms: params.wp_speed_down_cms,
            accel_xy_cmss: params.wp_accel_cmss,
            accel_z_cmss: params.wp_accel_z_cmss
        }
    }

    /// Set the requested horizontal speed. The speed in use will ramp towards
    /// it on calls to `ramp_speed_xy`.
    pub fn set_desired_speed_xy(&mut self, speed_cms: f64) {
        self.desired_speed_xy_cms = params::within(
            "speed_xy", speed_cms, WP_SPEED_MIN_CMS, WP_SPEED_MAX_CMS);
    }

    pub fn set_speed_up(&mut self, speed_cms: f64) {
        self.speed_up_cms = params::within(
            "speed_up", speed_cms, WP_SPEED_Z_MIN_CMS, WP_SPEED_Z_MAX_CMS);
    }

    pub fn set_speed_down(&mut self, speed_cms: f64) {
        self.speed_down_cms = params::within(
            "speed_down", speed_cms.abs(), WP_SPEED_Z_MIN_CMS, WP_SPEED_Z_MAX_CMS);
    }

    pub fn set_accel(&mut self, accel_xy_cmss: f64, accel_z_cmss: f64) {
        self.accel_xy_cmss = params::within(
            "accel_xy", accel_xy_cmss, WP_ACCEL_MIN_CMSS, WP_ACCEL_MAX_CMSS);
        self.accel_z_cmss = params::within(
            "accel_z", accel_z_cmss, WP_ACCEL_MIN_CMSS, WP_ACCEL_MAX_CMSS);
    }

    /// Move the horizontal speed in use towards the requested speed at the
    /// horizontal acceleration.
    ///
    /// Returns `true` if the speed in use changed.
    pub fn ramp_speed_xy(&mut self, dt_s: f64) -> bool {
        let err = self.desired_speed_xy_cms - self.speed_xy_cms;
        if err == 0.0 || dt_s <= 0.0 {
            return false
        }

        let step = self.accel_xy_cmss * dt_s;
        self.speed_xy_cms = if err.abs() <= step {
            self.desired_speed_xy_cms
        }
        else {
            self.speed_xy_cms + step.copysign(err)
        };

        true
    }
}

impl TrackLimits {
    /// Calculate the limits along the unit direction `unit` for a track of
    /// length `length_cm`.
    ///
    /// A zero direction gives zero speed and acceleration with the minimum
    /// leash.
    pub fn calculate(
        unit: &Vector3<f64>,
        length_cm: f64,
        speeds: &SpeedLimits,
        params: &Params
    ) -> Self {
        let leash_min = params.leash_length_min_cm;

        let leash_xy_cm = calc_leash_length(
            speeds.speed_xy_cms, speeds.accel_xy_cmss, params.pos_xy_kp, leash_min);
        let leash_up_cm = calc_leash_length(
            speeds.speed_up_cms, speeds.accel_z_cmss, params.pos_z_kp, leash_min);
        let leash_down_cm = calc_leash_length(
            speeds.speed_down_cms, speeds.accel_z_cmss, params.pos_z_kp, leash_min);

        // Climbing uses the up limits, everything else the down limits
        let (speed_z_cms, leash_z_cm) = if unit[2] >= 0.0 {
            (speeds.speed_up_cms, leash_up_cm)
        }
        else {
            (speeds.speed_down_cms, leash_down_cm)
        };

        let u_xy = norm_xy(unit);
        let u_z = unit[2].abs();

        let (accel_cmss, speed_cms, leash_cm) = match (
            u_xy > DIRECTION_EPSILON,
            u_z > DIRECTION_EPSILON
        ) {
            (false, false) => (0.0, 0.0, leash_min),
            (true, false) => (
                speeds.accel_xy_cmss / u_xy,
                speeds.speed_xy_cms / u_xy,
                leash_xy_cm / u_xy
            ),
            (false, true) => (
                speeds.accel_z_cmss / u_z,
                speed_z_cms / u_z,
                leash_z_cm / u_z
            ),
            (true, true) => (
                (speeds.accel_xy_cmss / u_xy).min(speeds.accel_z_cmss / u_z),
                (speeds.speed_xy_cms / u_xy).min(speed_z_cms / u_z),
                (leash_xy_cm / u_xy).min(leash_z_cm / u_z)
            )
        };

        let slow_down_dist_cm = SlowDownProfile {
            speed_cms,
            accel_cmss,
            min_speed_cms: params.track_speed_min_cms
        }.start_distance_cm();

        Self {
            accel_cmss,
            speed_cms,
            speed_max_cms: max_speed_over_track(speed_cms, accel_cmss, length_cm),
            leash_cm,
            leash_xy_cm,
            leash_up_cm,
            leash_down_cm,
            slow_down_dist_cm
        }
    }

    /// The vertical leash to use for an error in the given vertical
    /// direction.
    pub fn leash_z_cm(&self, err_z_cm: f64) -> f64 {
        if err_z_cm >= 0.0 {
            self.leash_up_cm
        }
        else {
            self.leash_down_cm
        }
    }
}

impl SlowDownProfile {
    /// Remaining distance at which slowing must begin to stop from full speed
    /// at the profile's deceleration.
    pub fn start_distance_cm(&self) -> f64 {
        if self.accel_cmss <= 0.0 {
            return 0.0
        }
        self.speed_cms.powi(2) / (2.0 * self.accel_cmss)
    }

    /// Maximum speed with `remaining_cm` left to travel.
    ///
    /// Never below the profile's minimum speed so the target keeps creeping
    /// towards the destination.
    pub fn speed_at(&self, remaining_cm: f64) -> f64 {
        let v = self.speed_cms.min(safe_sqrt(2.0 * self.accel_cmss * remaining_cm));
        v.max(self.min_speed_cms)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculate the leash length for a given speed and acceleration.
///
/// Below the linear velocity `accel / kp` the position controller responds
/// linearly, above it the square root controller takes over. The result
/// is never less than `leash_min_cm`. A non-positive gain gives the minimum.
pub fn calc_leash_length(speed_cms: f64, accel_cmss: f64, kp: f64, leash_min_cm: f64) -> f64 {
    if accel_cmss <= 0.0 || kp <= 0.0 {
        return leash_min_cm
    }

    let leash_cm = if speed_cms <= accel_cmss / kp {
        speed_cms / kp
    }
    else {
        accel_cmss / (2.0 * kp * kp) + speed_cms * speed_cms / (2.0 * accel_cmss)
    };

    leash_cm.max(leash_min_cm)
}

/// Maximum speed on a track of `length_cm` that allows accelerating from
/// and stopping at the ends at `accel_cmss`.
pub fn max_speed_over_track(speed_cms: f64, accel_cmss: f64, length_cm: f64) -> f64 {
    speed_cms.min(safe_sqrt(2.0 * accel_cmss * length_cm)).max(0.0)
}

/// Calculate the point at which the vehicle would stop if it began
/// decelerating now, no further than a leash from its current position.
pub fn stopping_point(
    vehicle: &VehicleState,
    speeds: &SpeedLimits,
    params: &Params
) -> Vector3<f64> {
    let pos = vehicle.position_cm;
    let vel = vehicle.velocity_cms;

    // Horizontal
    let vel_xy = norm_xy(&vel);
    let (dx, dy) = if vel_xy > 0.0 {
        let leash_xy = calc_leash_length(
            speeds.speed_xy_cms,
            speeds.accel_xy_cmss,
            params.pos_xy_kp,
            params.leash_length_min_cm
        );
        let dist = stopping_distance(vel_xy, speeds.accel_xy_cmss, params.pos_xy_kp)
            .min(leash_xy);
        (dist * vel[0] / vel_xy, dist * vel[1] / vel_xy)
    }
    else {
        (0.0, 0.0)
    };

    // Vertical
    let vel_z = vel[2];
    let leash_z = if vel_z >= 0.0 {
        calc_leash_length(
            speeds.speed_up_cms, speeds.accel_z_cmss, params.pos_z_kp, params.leash_length_min_cm)
    }
    else {
        calc_leash_length(
            speeds.speed_down_cms, speeds.accel_z_cmss, params.pos_z_kp, params.leash_length_min_cm)
    };
    let dz = stopping_distance(vel_z.abs(), speeds.accel_z_cmss, params.pos_z_kp)
        .min(leash_z)
        .copysign(vel_z);

    Vector3::new(pos[0] + dx, pos[1] + dy, pos[2] + dz)
}

/// Distance the position controller needs to stop from `speed_cms`.
fn stopping_distance(speed_cms: f64, accel_cmss: f64, kp: f64) -> f64 {
    if speed_cms <= 0.0 {
        return 0.0
    }
    if accel_cmss <= 0.0 {
        return 0.0
    }
    if kp <= 0.0 {
        return speed_cms * speed_cms / (2.0 * accel_cmss)
    }

    let linear_velocity = accel_cmss / kp;
    if speed_cms < linear_velocity {
        speed_cms / kp
    }
    else {
        let linear_distance = accel_cmss / (2.0 * kp * kp);
        linear_distance + speed_cms * speed_cms / (2.0 * accel_cmss)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_leash_length() {
        // Linear region
        assert!((calc_leash_length(50.0, 100.0, 1.0, 10.0) - 50.0).abs() < EPS);

        // Square root region: 100/2 + 500^2/200
        assert!((calc_leash_length(500.0, 100.0, 1.0, 100.0) - 1300.0).abs() < EPS);

        // Minimum
        assert_eq!(calc_leash_length(50.0, 100.0, 1.0, 100.0), 100.0);

        // Non-positive gain
        assert_eq!(calc_leash_length(500.0, 100.0, 0.0, 100.0), 100.0);
        assert_eq!(calc_leash_length(500.0, 100.0, -1.0, 100.0), 100.0);
    }

    #[test]
    fn test_leash_is_monotonic_in_speed() {
        let mut last = 0.0;
        for i in 0..200 {
            let leash = calc_leash_length(i as f64 * 5.0, 100.0, 1.0, 100.0);
            assert!(leash >= last);
            assert!(leash >= 100.0);
            last = leash;
        }
    }

    #[test]
    fn test_horizontal_track_limits() {
        let params = Params::default();
        let speeds = SpeedLimits::from_params(&params);
        let limits = TrackLimits::calculate(&Vector3::x(), 1000.0, &speeds, &params);

        assert!((limits.speed_cms - 500.0).abs() < EPS);
        assert!((limits.accel_cmss - 100.0).abs() < EPS);
        assert!((limits.leash_cm - 1300.0).abs() < EPS);
        assert!((limits.slow_down_dist_cm - 1250.0).abs() < EPS);
        assert!((limits.speed_max_cms - 500.0).abs() < EPS);
    }

    #[test]
    fn test_diagonal_track_limits_use_tighter_share() {
        let params = Params::default();
        let speeds = SpeedLimits::from_params(&params);

        let up = Vector3::new(1.0, 0.0, 1.0).normalize();
        let limits = TrackLimits::calculate(&up, 1000.0, &speeds, &params);
        let share = std::f64::consts::FRAC_1_SQRT_2;

        // Climb speed 250 is the tighter limit
        assert!((limits.speed_cms - 250.0 / share).abs() < 1e-6);
        assert!((limits.accel_cmss - 100.0 / share).abs() < 1e-6);

        // Descending uses the down speed
        let down = Vector3::new(1.0, 0.0, -1.0).normalize();
        let limits = TrackLimits::calculate(&down, 1000.0, &speeds, &params);
        assert!((limits.speed_cms - 150.0 / share).abs() < 1e-6);
    }

    #[test]
    fn test_zero_direction_limits() {
        let params = Params::default();
        let speeds = SpeedLimits::from_params(&params);
        let limits = TrackLimits::calculate(&Vector3::zeros(), 0.0, &speeds, &params);

        assert_eq!(limits.speed_cms, 0.0);
        assert_eq!(limits.accel_cmss, 0.0);
        assert_eq!(limits.speed_max_cms, 0.0);
        assert_eq!(limits.leash_cm, params.leash_length_min_cm);
    }

    #[test]
    fn test_short_track_caps_speed() {
        let params = Params::default();
        let speeds = SpeedLimits::from_params(&params);
        let limits = TrackLimits::calculate(&Vector3::x(), 200.0, &speeds, &params);

        assert!((limits.speed_max_cms - 200.0).abs() < EPS);
    }

    #[test]
    fn test_slow_down_profile() {
        let profile = SlowDownProfile {
            speed_cms: 500.0,
            accel_cmss: 100.0,
            min_speed_cms: 50.0
        };

        assert!((profile.start_distance_cm() - 1250.0).abs() < EPS);
        assert!((profile.speed_at(2000.0) - 500.0).abs() < EPS);
        assert!((profile.speed_at(800.0) - 400.0).abs() < EPS);
        assert!((profile.speed_at(0.0) - 50.0).abs() < EPS);

        // Non-increasing as the remaining distance shrinks
        let mut last = f64::MAX;
        for i in (0..=1250).rev() {
            let v = profile.speed_at(i as f64);
            assert!(v <= last);
            last = v;
        }
    }

    #[test]
    fn test_speed_ramp() {
        let params = Params::default();
        let mut speeds = SpeedLimits::from_params(&params);

        speeds.set_desired_speed_xy(300.0);
        assert!(speeds.ramp_speed_xy(1.0));
        assert!((speeds.speed_xy_cms - 400.0).abs() < EPS);
        assert!(speeds.ramp_speed_xy(1.5));
        assert!((speeds.speed_xy_cms - 300.0).abs() < EPS);
        assert!(!speeds.ramp_speed_xy(1.0));

        // Clamped to the minimum
        speeds.set_desired_speed_xy(1.0);
        assert_eq!(speeds.desired_speed_xy_cms, WP_SPEED_MIN_CMS);

        // Non-finite requests never reach the limits
        speeds.set_desired_speed_xy(f64::INFINITY);
        assert_eq!(speeds.desired_speed_xy_cms, WP_SPEED_MAX_CMS);
        speeds.set_speed_up(f64::NAN);
        assert_eq!(speeds.speed_up_cms, WP_SPEED_Z_MIN_CMS);
        speeds.set_speed_down(f64::NEG_INFINITY);
        assert_eq!(speeds.speed_down_cms, WP_SPEED_Z_MAX_CMS);
        speeds.set_accel(f64::INFINITY, f64::NAN);
        assert_eq!(speeds.accel_xy_cmss, WP_ACCEL_MAX_CMSS);
        assert_eq!(speeds.accel_z_cmss, WP_ACCEL_MIN_CMSS);
    }

    #[test]
    fn test_stopping_point() {
        let params = Params::default();
        let speeds = SpeedLimits::from_params(&params);

        let stopped = VehicleState {
            position_cm: Vector3::new(10.0, 20.0, 30.0),
            ..Default::default()
        };
        assert_eq!(stopping_point(&stopped, &speeds, &params), stopped.position_cm);

        // 50 cm/s is in the linear region, stops in 50 cm
        let moving = VehicleState {
            velocity_cms: Vector3::new(0.0, 50.0, 0.0),
            ..Default::default()
        };
        let stop = stopping_point(&moving, &speeds, &params);
        assert!((stop[1] - 50.0).abs() < EPS);
        assert!(stop[0].abs() < EPS);

        // Capped at the horizontal leash
        let fast = VehicleState {
            velocity_cms: Vector3::new(2000.0, 0.0, 0.0),
            ..Default::default()
        };
        let stop = stopping_point(&fast, &speeds, &params);
        assert!((stop[0] - 1300.0).abs() < EPS);
    }
}

//! Waypoint navigation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Range of the horizontal speed between waypoints.
pub const WP_SPEED_MIN_CMS: f64 = 20.0;
pub const WP_SPEED_MAX_CMS: f64 = 2000.0;

/// Range of the climb or descent speed between waypoints.
pub const WP_SPEED_Z_MIN_CMS: f64 = 10.0;
pub const WP_SPEED_Z_MAX_CMS: f64 = 1000.0;

/// Range of the waypoint radius.
pub const WP_RADIUS_MIN_CM: f64 = 5.0;
pub const WP_RADIUS_MAX_CM: f64 = 1000.0;

/// Range of the horizontal and vertical acceleration.
pub const WP_ACCEL_MIN_CMSS: f64 = 50.0;
pub const WP_ACCEL_MAX_CMSS: f64 = 500.0;

/// Lower bound on the configurable minimum leash length.
pub const LEASH_LENGTH_FLOOR_CM: f64 = 1.0;

/// Upper bound on the remaining distance parameters.
pub const DISTANCE_PARAM_MAX_CM: f64 = 10_000.0;

/// Upper bound on the position controller gains.
pub const POS_KP_MAX: f64 = 100.0;

/// Upper bound on the rangefinder filter cutoff.
pub const RANGEFINDER_FILT_MAX_HZ: f64 = 50.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for waypoint navigation
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Params {

    /// Default horizontal speed between waypoints
    pub wp_speed_cms: f64,

    /// Default climb speed
    pub wp_speed_up_cms: f64,

    /// Default descent speed (always positive)
    pub wp_speed_down_cms: f64,

    /// Distance from a waypoint within which the waypoint has been reached
    pub wp_radius_cm: f64,

    /// Horizontal acceleration during missions
    pub wp_accel_cmss: f64,

    /// Vertical acceleration during missions
    pub wp_accel_z_cmss: f64,

    /// Minimum speed along track of the intermediate target as it slows down
    /// before the destination
    pub track_speed_min_cms: f64,

    /// Minimum leash length
    pub leash_length_min_cm: f64,

    /// Horizontal position controller proportional gain, used to size the
    /// leashes
    pub pos_xy_kp: f64,

    /// Vertical position controller proportional gain
    pub pos_z_kp: f64,

    /// Distance before a fast waypoint at which it is considered complete,
    /// capped by the track leash. Larger values start the turn sooner.
    pub fast_wp_radius_cm: f64,

    /// Overshoot of the destination allowed for fast waypoints
    pub fast_overshoot_max_cm: f64,

    /// Minimum horizontal track length for the yaw target to be updated on a
    /// fast waypoint
    pub yaw_dist_min_fast_cm: f64,

    /// Minimum horizontal track length for the yaw target to be updated on a
    /// regular waypoint
    pub yaw_dist_min_reg_cm: f64,

    /// The target must be at least this far from the vehicle for the yaw
    /// target to point at it...
    pub yaw_leash_len_min_cm: f64,

    /// ...or this fraction of the horizontal leash, whichever is smaller
    pub yaw_leash_pct_min: f64,

    /// Use the rangefinder for terrain following when the terrain source has
    /// no data
    pub rangefinder_use: bool,

    /// Cutoff frequency of the rangefinder terrain offset filter, zero
    /// disables filtering
    pub rangefinder_filt_hz: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            wp_speed_cms: 500.0,
            wp_speed_up_cms: 250.0,
            wp_speed_down_cms: 150.0,
            wp_radius_cm: 200.0,
            wp_accel_cmss: 100.0,
            wp_accel_z_cmss: 100.0,
            track_speed_min_cms: 50.0,
            leash_length_min_cm: 100.0,
            pos_xy_kp: 1.0,
            pos_z_kp: 1.0,
            fast_wp_radius_cm: 225.0,
            fast_overshoot_max_cm: 20.0,
            yaw_dist_min_fast_cm: 50.0,
            yaw_dist_min_reg_cm: 200.0,
            yaw_leash_len_min_cm: 200.0,
            yaw_leash_pct_min: 0.134,
            rangefinder_use: false,
            rangefinder_filt_hz: 0.25
        }
    }
}

impl Params {
    /// Return a copy of these parameters with every value clamped into its
    /// valid range.
    ///
    /// Parameters can be written from outside the control loop, so they are
    /// never trusted. Each clamp is logged.
    pub fn sanitise(&self) -> Self {
        let mut p = *self;

        p.wp_speed_cms = within(
            "wp_speed_cms", p.wp_speed_cms, WP_SPEED_MIN_CMS, WP_SPEED_MAX_CMS);
        p.wp_speed_up_cms = within(
            "wp_speed_up_cms", p.wp_speed_up_cms, WP_SPEED_Z_MIN_CMS, WP_SPEED_Z_MAX_CMS);
        p.wp_speed_down_cms = within(
            "wp_speed_down_cms", p.wp_speed_down_cms.abs(), WP_SPEED_Z_MIN_CMS, WP_SPEED_Z_MAX_CMS);
        p.wp_radius_cm = within("wp_radius_cm", p.wp_radius_cm, WP_RADIUS_MIN_CM, WP_RADIUS_MAX_CM);
        p.wp_accel_cmss = within(
            "wp_accel_cmss", p.wp_accel_cmss, WP_ACCEL_MIN_CMSS, WP_ACCEL_MAX_CMSS);
        p.wp_accel_z_cmss = within(
            "wp_accel_z_cmss", p.wp_accel_z_cmss, WP_ACCEL_MIN_CMSS, WP_ACCEL_MAX_CMSS);
        p.track_speed_min_cms = within(
            "track_speed_min_cms", p.track_speed_min_cms, 0.0, WP_SPEED_MAX_CMS);
        p.leash_length_min_cm = within(
            "leash_length_min_cm", p.leash_length_min_cm, LEASH_LENGTH_FLOOR_CM, DISTANCE_PARAM_MAX_CM);
        p.fast_wp_radius_cm = within(
            "fast_wp_radius_cm", p.fast_wp_radius_cm, 0.0, DISTANCE_PARAM_MAX_CM);
        p.fast_overshoot_max_cm = within(
            "fast_overshoot_max_cm", p.fast_overshoot_max_cm, 0.0, DISTANCE_PARAM_MAX_CM);
        p.yaw_dist_min_fast_cm = within(
            "yaw_dist_min_fast_cm", p.yaw_dist_min_fast_cm, 0.0, DISTANCE_PARAM_MAX_CM);
        p.yaw_dist_min_reg_cm = within(
            "yaw_dist_min_reg_cm", p.yaw_dist_min_reg_cm, 0.0, DISTANCE_PARAM_MAX_CM);
        p.yaw_leash_len_min_cm = within(
            "yaw_leash_len_min_cm", p.yaw_leash_len_min_cm, 0.0, DISTANCE_PARAM_MAX_CM);
        p.yaw_leash_pct_min = within("yaw_leash_pct_min", p.yaw_leash_pct_min, 0.0, 1.0);
        p.rangefinder_filt_hz = within(
            "rangefinder_filt_hz", p.rangefinder_filt_hz, 0.0, RANGEFINDER_FILT_MAX_HZ);

        // Gains of zero or less are kept, the leash calculation falls back to
        // the minimum leash for them
        p.pos_xy_kp = kp_within("pos_xy_kp", p.pos_xy_kp);
        p.pos_z_kp = kp_within("pos_z_kp", p.pos_z_kp);

        p
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp `value` into `[min, max]`, logging if it had to be changed.
///
/// NaN and negative infinity become `min`, positive infinity becomes `max`.
pub(crate) fn within(name: &str, value: f64, min: f64, max: f64) -> f64 {
    let clamped = if value.is_nan() {
        min
    }
    else {
        value.max(min).min(max)
    };

    if clamped != value {
        warn!("Parameter {} = {} is outside [{}, {}], using {}", name, value, min, max, clamped);
    }

    clamped
}

/// Gains may be zero or negative but must be finite.
fn kp_within(name: &str, value: f64) -> f64 {
    if value.is_nan() {
        warn!("Parameter {} is NaN, using 0", name);
        0.0
    }
    else {
        within(name, value, f64::MIN, POS_KP_MAX)
    }
}

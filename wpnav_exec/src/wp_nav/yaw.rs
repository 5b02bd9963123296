//! Yaw target selection

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;

// Internal
use super::Params;
use util::maths::{heading_of, norm_xy};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Yaw the vehicle should point in while following a segment.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct YawTarget {
    yaw_rad: f64,

    /// No yaw has been calculated for the current segment yet
    is_set: bool
}

/// Geometry needed to update the yaw target for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct YawUpdate {
    /// Horizontal length of the track
    pub track_length_xy_cm: f64,

    /// Horizontal leash length
    pub leash_xy_cm: f64,

    /// Heading to use when the leash is too short to point at the target,
    /// `None` to leave the yaw unchanged in that case
    pub track_heading_rad: Option<f64>,

    /// Vector from the vehicle to the intermediate target
    pub vehicle_to_target_cm: Vector3<f64>,

    pub fast_waypoint: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl YawTarget {
    /// The yaw target, or `fallback_rad` (usually the vehicle's own yaw) if no
    /// target has been set since the last segment started.
    pub fn get(&self, fallback_rad: f64) -> f64 {
        if self.is_set {
            self.yaw_rad
        }
        else {
            fallback_rad
        }
    }

    pub fn is_set(&self) -> bool {
        self.is_set
    }

    pub fn set(&mut self, yaw_rad: f64) {
        self.yaw_rad = yaw_rad;
        self.is_set = true;
    }

    pub fn reset(&mut self) {
        self.is_set = false;
    }

    /// Minimum horizontal track length for the yaw to be updated.
    pub fn min_track_length_cm(params: &Params, fast_waypoint: bool) -> f64 {
        if fast_waypoint {
            params.yaw_dist_min_fast_cm
        }
        else {
            params.yaw_dist_min_reg_cm
        }
    }

    /// Update the yaw target.
    ///
    /// Short tracks leave the yaw frozen. With a leash shorter than the
    /// minimum track length the yaw follows the track heading, otherwise it
    /// points at the intermediate target once it is far enough from the
    /// vehicle.
    pub fn update(&mut self, upd: &YawUpdate, params: &Params) {
        let min_length_cm = Self::min_track_length_cm(params, upd.fast_waypoint);

        if upd.track_length_xy_cm < min_length_cm {
            return
        }

        if upd.leash_xy_cm < min_length_cm {
            if let Some(heading) = upd.track_heading_rad {
                self.set(heading);
            }
            return
        }

        let dist_cm = norm_xy(&upd.vehicle_to_target_cm);
        let min_dist_cm = params.yaw_leash_len_min_cm
            .min(upd.leash_xy_cm * params.yaw_leash_pct_min);

        if dist_cm > min_dist_cm {
            self.set(heading_of(upd.vehicle_to_target_cm[0], upd.vehicle_to_target_cm[1]));
        }
    }
}

//! Straight segment tracking

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector3;

// Internal
use super::{
    limits::SlowDownProfile,
    yaw::YawUpdate,
    Segment, WpNav
};
use util::maths::{norm_xy, safe_sqrt};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> WpNav<'a> {
    /// Move the target along a straight segment.
    ///
    /// The target's distance along the track only ever increases. It is
    /// limited by the speed profile and by the leash, which is measured from
    /// the vehicle's projection onto the track.
    pub(crate) fn advance_straight(&mut self, seg: &Segment, dt_s: f64, terr_offset_cm: f64) {
        if self.limits_stale {
            self.update_track_limits();
        }
        let track = self.track;
        let params = self.params;
        let fast = self.flags.fast_waypoint;

        // Vehicle position in the segment's frame
        let curr_pos = self.vehicle.position_cm - Vector3::new(0.0, 0.0, terr_offset_cm);
        let curr_delta = curr_pos - seg.origin_cm;

        // Project the vehicle onto the track
        let track_covered_cm = curr_delta.dot(&seg.unit);
        let track_error = curr_delta - seg.unit * track_covered_cm;
        let track_error_xy_cm = norm_xy(&track_error);
        let track_error_z_cm = track_error[2].abs();

        // Scale the errors up to the track leash and use the worse of the two
        let leash_z_cm = track.leash_z_cm(track_error[2]);
        let track_error_max_cm = (track.leash_cm * track_error_z_cm / leash_z_cm)
            .max(track.leash_cm * track_error_xy_cm / track.leash_xy_cm);

        let leash_slack_cm = if track.leash_cm > track_error_max_cm {
            safe_sqrt(track.leash_cm.powi(2) - track_error_max_cm.powi(2))
        }
        else {
            0.0
        };
        let track_desired_max_cm = track_covered_cm + leash_slack_cm;

        let mut track_desired_cm = self.target.track_desired_cm;
        let reached_leash_limit = track_desired_cm > track_desired_max_cm;
        self.report.leash_limited = reached_leash_limit;

        // ---- TARGET SPEED ----

        let mut limited_speed_cms = self.target.limited_speed_cms;
        let speed_along_track_cms = self.vehicle.velocity_cms.dot(&seg.unit);
        let linear_velocity_cms = if params.pos_xy_kp > 0.0 {
            track.accel_cmss / params.pos_xy_kp
        }
        else {
            track.speed_cms
        };

        if speed_along_track_cms < -linear_velocity_cms {
            // Vehicle is going backwards, hold the target
            limited_speed_cms = 0.0;
        }
        else {
            if dt_s > 0.0 && !reached_leash_limit {
                limited_speed_cms += track.accel_cmss * dt_s;
            }
            limited_speed_cms = limited_speed_cms.min(track.speed_max_cms).max(0.0);

            if !fast {
                let remaining_cm = seg.length_cm - track_desired_cm;
                if !self.flags.slowing_down && remaining_cm <= track.slow_down_dist_cm {
                    self.flags.slowing_down = true;
                    debug!("Slowing for destination, {:.1} cm remaining", remaining_cm);
                }

                if self.flags.slowing_down {
                    let profile = SlowDownProfile {
                        speed_cms: track.speed_cms,
                        accel_cmss: track.accel_cmss,
                        min_speed_cms: params.track_speed_min_cms
                    };
                    limited_speed_cms = limited_speed_cms.min(profile.speed_at(remaining_cm));
                }
            }

            // Keep the target close to the vehicle's speed in the linear
            // region of the controller
            if speed_along_track_cms.abs() < linear_velocity_cms {
                limited_speed_cms = limited_speed_cms
                    .min(speed_along_track_cms + linear_velocity_cms)
                    .max(speed_along_track_cms - linear_velocity_cms);
            }
        }

        // ---- TARGET PROGRESS ----

        if !reached_leash_limit {
            track_desired_cm += limited_speed_cms * dt_s;

            if track_desired_cm > track_desired_max_cm {
                track_desired_cm = track_desired_max_cm;
                limited_speed_cms = (limited_speed_cms - track.accel_cmss * dt_s).max(0.0);
            }
        }

        let track_end_cm = if fast {
            seg.length_cm + params.fast_overshoot_max_cm
        }
        else {
            seg.length_cm
        };
        // Never move backwards, even if the waypoint stopped being fast
        track_desired_cm = track_desired_cm
            .min(track_end_cm.max(self.target.track_desired_cm))
            .max(0.0);

        let at_end = track_desired_cm >= track_end_cm;

        self.target.pos_cm = seg.origin_cm + seg.unit * track_desired_cm;
        self.target.vel_cms = if at_end {
            Vector3::zeros()
        }
        else {
            seg.unit * limited_speed_cms
        };
        self.target.track_desired_cm = track_desired_cm;
        self.target.limited_speed_cms = limited_speed_cms;
        self.target.crosstrack_error_cm = track_error_xy_cm;
        self.target.terr_offset_cm = terr_offset_cm;

        // ---- COMPLETION ----

        let dist_to_dest_cm = (seg.destination_cm - curr_pos).norm();
        self.check_completion(dist_to_dest_cm, track_desired_cm, seg.length_cm);

        // ---- YAW ----

        let upd = YawUpdate {
            track_length_xy_cm: seg.length_xy_cm,
            leash_xy_cm: track.leash_xy_cm,
            track_heading_rad: Some(seg.heading_rad()),
            vehicle_to_target_cm: self.target.pos_cm - curr_pos,
            fast_waypoint: fast
        };
        self.yaw.update(&upd, &params);
    }
}

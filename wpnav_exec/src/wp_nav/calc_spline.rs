//! Spline segment tracking

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
use util::maths::{heading_of, norm_xy};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Change in the unit tangent above which the track limits are recalculated.
const TANGENT_CHANGE_MIN: f64 = 1e-3;

/// Curve derivatives shorter than this are treated as zero.
const DERIVATIVE_MIN: f64 = 1e-6;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> WpNav<'a> {
    /// Move the target along a spline segment.
    ///
    /// The speed of the target along the curve (the velocity scaler) is
    /// limited by the leash slack and the slow-down profile, then converted
    /// into a rate of change of the spline parameter.
    pub(crate) fn advance_spline(&mut self, seg: &Segment, dt_s: f64, terr_offset_cm: f64) {
        let mut sp = match self.spline {
            Some(sp) => sp,
            None => return
        };
        let fast = self.flags.fast_waypoint;
        let curr_pos = self.vehicle.position_cm - Vector3::new(0.0, 0.0, terr_offset_cm);

        if sp.time < 1.0 {
            let pos = sp.curve.position(sp.time);
            let deriv = sp.curve.velocity(sp.time);
            let deriv_len = deriv.norm();

            // Limits follow the tangent
            if deriv_len > DERIVATIVE_MIN {
                let unit = deriv / deriv_len;
                if (unit - self.track_unit).norm() > TANGENT_CHANGE_MIN {
                    self.track_unit = unit;
                    self.limits_stale = true;
                }
            }
            if self.limits_stale {
                self.update_track_limits();
            }
            let track = self.track;

            // Leash slack from the distance between the vehicle and the target
            let track_error = curr_pos - pos;
            let track_error_xy_cm = norm_xy(&track_error);
            let track_error_z_cm = track_error[2].abs();
            let leash_z_cm = track.leash_z_cm(track_error[2]);
            let leash_slack_cm = (track.leash_cm * (leash_z_cm - track_error_z_cm) / leash_z_cm)
                .min(track.leash_cm * (track.leash_xy_cm - track_error_xy_cm) / track.leash_xy_cm)
                .max(0.0);
            self.report.leash_limited = leash_slack_cm <= 0.0;

            let mut vel_limit_cms = self.speeds.speed_xy_cms;
            if dt_s > 0.0 {
                vel_limit_cms = vel_limit_cms.min(leash_slack_cm / dt_s);
            }

            let profile = SlowDownProfile {
                speed_cms: self.speeds.speed_xy_cms,
                accel_cmss: self.speeds.accel_xy_cmss,
                min_speed_cms: self.params.track_speed_min_cms
            };
            let remaining_cm = (seg.destination_cm - pos).norm();

            if !fast && remaining_cm < profile.start_distance_cm() {
                if !self.flags.slowing_down {
                    self.flags.slowing_down = true;
                    debug!("Slowing for destination, {:.1} cm remaining", remaining_cm);
                }
                sp.vel_scaler_cms = (sp.vel_scaler_cms + self.speeds.accel_xy_cmss * dt_s)
                    .min(profile.speed_at(remaining_cm));
            }
            else if sp.vel_scaler_cms < vel_limit_cms {
                sp.vel_scaler_cms += self.speeds.accel_xy_cmss * dt_s;
            }
            sp.vel_scaler_cms = sp.vel_scaler_cms.min(vel_limit_cms).max(0.0);

            // Keep the previous scale where the curve is stationary
            if deriv_len > DERIVATIVE_MIN {
                sp.time_scale = sp.vel_scaler_cms / deriv_len;
            }

            let raw_time = sp.time + sp.time_scale * dt_s;
            let new_time = raw_time.min(1.0);
            sp.time_overrun = (raw_time - 1.0).max(0.0);

            let new_pos = sp.curve.position(new_time);
            sp.arc_progress_cm += (new_pos - pos).norm();
            sp.time = new_time;
            if new_time >= 1.0 {
                sp.arc_progress_cm = sp.arc_progress_cm.max(sp.arc_length_cm);
            }

            self.target.pos_cm = new_pos;
            self.target.vel_cms = sp.curve.velocity(new_time) * sp.time_scale;
            self.target.crosstrack_error_cm = track_error_xy_cm;
        }
        else if !fast {
            // Holding at the destination
            self.target.vel_cms = Vector3::zeros();
        }
        self.target.terr_offset_cm = terr_offset_cm;
        self.spline = Some(sp);

        // ---- COMPLETION ----

        let dist_to_dest_cm = (seg.destination_cm - curr_pos).norm();
        self.check_completion(dist_to_dest_cm, sp.arc_progress_cm, sp.arc_length_cm);

        // ---- YAW ----

        let vel = self.target.vel_cms;
        let upd = YawUpdate {
            track_length_xy_cm: seg.length_xy_cm,
            leash_xy_cm: self.track.leash_xy_cm,
            track_heading_rad: if norm_xy(&vel) > 0.0 {
                Some(heading_of(vel[0], vel[1]))
            }
            else {
                None
            },
            vehicle_to_target_cm: self.target.pos_cm - curr_pos,
            fast_waypoint: fast
        };
        self.yaw.update(&upd, &self.params);
    }
}

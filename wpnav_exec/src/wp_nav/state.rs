//! Waypoint navigation module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::{
    limits::{self, SpeedLimits, TrackLimits},
    spline::HermiteSpline,
    yaw::YawTarget,
    AltFrame, AltFrameResolver, GuidanceFlags, GuidanceState, Params,
    RangefinderReading, Segment, SegmentKind, SplineEnd, TerrainSource, WpNavError,
    SPLINE_ARC_LENGTH_STEPS, SPLINE_NOMINAL_DT_S, SPLINE_TIME_OVERRUN_MAX,
    SPLINE_VEL_SUM_MAX_RATIO
};
use util::{
    archive::{Archived, Archiver},
    maths::{bearing_rad, norm_xy},
    module::State,
    params,
    session::{self, Session}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Waypoint navigation module state.
///
/// The terrain source, if any, is borrowed for the lifetime of the module.
pub struct WpNav<'a> {
    pub(crate) params: Params,

    /// Speeds and accelerations currently in use
    pub(crate) speeds: SpeedLimits,

    terrain: Option<&'a dyn TerrainSource>,
    alt_resolver: AltFrameResolver,

    /// Vehicle state captured at the start of the last cycle
    pub(crate) vehicle: VehicleState,

    /// Rangefinder reading captured at the start of the last cycle
    rangefinder: RangefinderReading,

    pub(crate) segment: Option<Segment>,
    pub(crate) spline: Option<SplineProgress>,

    /// Direction the track limits are calculated along. Follows the tangent
    /// of spline segments.
    pub(crate) track_unit: Vector3<f64>,
    pub(crate) track: TrackLimits,

    /// The track limits must be recalculated before they are next used
    pub(crate) limits_stale: bool,

    pub(crate) target: TargetState,
    pub(crate) yaw: YawTarget,

    pub(crate) flags: GuidanceFlags,
    state: GuidanceState,

    output: OutputData,
    arch_output: Archiver,

    pub(crate) report: StatusReport,
    arch_report: Archiver
}

/// State of the vehicle, as given by the state estimator.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct VehicleState {
    /// Position relative to the EKF origin (NEU)
    pub position_cm: Vector3<f64>,

    pub velocity_cms: Vector3<f64>,

    pub yaw_rad: f64
}

/// Input data to waypoint navigation, captured once at the start of each
/// cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Time since the previous cycle
    pub dt_s: f64,

    pub vehicle: VehicleState,

    pub rangefinder: RangefinderReading
}

/// Targets for the position and attitude controllers.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OutputData {
    /// Intermediate target position relative to the EKF origin
    pub target_pos_cm: Vector3<f64>,

    /// Intermediate target velocity, the controller's feed forward
    pub target_vel_cms: Vector3<f64>,

    pub yaw_rad: f64,

    /// First cycle on a new segment, the feed forward should be ignored
    pub new_destination: bool
}

/// The status report containing progress and monitoring quantities.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub time_s: f64,

    pub state: GuidanceState,

    /// Horizontal distance from the vehicle to the track
    pub crosstrack_error_cm: f64,

    /// Distance covered by the target along the track
    pub progress_cm: f64,

    /// Length of the track, the arc length for splines
    pub track_length_cm: f64,

    /// Horizontal distance from the vehicle to the destination
    pub dist_to_dest_cm: f64,

    pub bearing_to_dest_rad: f64,

    /// Spline parameter, zero for straight segments
    pub spline_time: f64,

    pub reached_destination: bool,
    pub waypoint_completed: bool,
    pub slowing_down: bool,
    pub fast_waypoint: bool,

    /// The target was held back by the leash this cycle
    pub leash_limited: bool,

    /// The track limits were recalculated this cycle
    pub limits_recalculated: bool
}

/// Intermediate target state.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TargetState {
    /// Position in the segment's altitude frame
    pub pos_cm: Vector3<f64>,

    pub vel_cms: Vector3<f64>,

    /// Distance along a straight track
    pub track_desired_cm: f64,

    /// Speed the target may move along a straight track
    pub limited_speed_cms: f64,

    pub crosstrack_error_cm: f64,

    /// Terrain offset applied to the position on the last cycle
    pub terr_offset_cm: f64
}

/// Progress along a spline segment.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplineProgress {
    pub curve: HermiteSpline,

    /// Boundary velocities, derivatives with respect to the spline parameter
    pub origin_vel: Vector3<f64>,
    pub destination_vel: Vector3<f64>,

    /// Spline parameter in [0, 1]
    pub time: f64,

    /// How far the parameter would have gone past 1
    pub time_overrun: f64,

    /// Rate of change of the spline parameter per second divided by the
    /// speed along the curve
    pub time_scale: f64,

    /// Speed of the target along the curve
    pub vel_scaler_cms: f64,

    pub arc_length_cm: f64,

    /// Accumulated length of the target's motion along the curve
    pub arc_progress_cm: f64
}

/// Flat record of the output for archiving.
#[derive(Serialize)]
struct OutputRecord {
    time_s: f64,
    target_x_cm: f64,
    target_y_cm: f64,
    target_z_cm: f64,
    target_vel_x_cms: f64,
    target_vel_y_cms: f64,
    target_vel_z_cms: f64,
    yaw_rad: f64,
    new_destination: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Default for WpNav<'a> {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl<'a> State for WpNav<'a> {
    type InitData = &'static str;
    type InitError = WpNavError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = WpNavError;

    /// Initialise the WpNav module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, session: Option<&Session>)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data)
            .map_err(WpNavError::ParamLoadError)?;
        self.set_params(params);
        self.init_segments();

        if let Some(session) = session {
            self.arch_report = Archiver::from_path(session, "wp_nav/status_report.csv")
                .map_err(|e| WpNavError::ArchiveInitError(e.to_string()))?;
            self.arch_output = Archiver::from_path(session, "wp_nav/output.csv")
                .map_err(|e| WpNavError::ArchiveInitError(e.to_string()))?;
        }

        Ok(())
    }

    /// Advance the target by one cycle.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.advance(input_data)?;

        Ok((self.output, self.report))
    }
}

impl<'a> Archived for WpNav<'a> {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let o = &self.output;
        let record = OutputRecord {
            time_s: self.report.time_s,
            target_x_cm: o.target_pos_cm[0],
            target_y_cm: o.target_pos_cm[1],
            target_z_cm: o.target_pos_cm[2],
            target_vel_x_cms: o.target_vel_cms[0],
            target_vel_y_cms: o.target_vel_cms[1],
            target_vel_z_cms: o.target_vel_cms[2],
            yaw_rad: o.yaw_rad,
            new_destination: o.new_destination
        };

        self.arch_output.serialise(record)?;
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl<'a> WpNav<'a> {
    /// Create a new module with the given parameters and no terrain source.
    pub fn new(params: Params) -> Self {
        let params = params.sanitise();

        Self {
            params,
            speeds: SpeedLimits::from_params(&params),
            terrain: None,
            alt_resolver: AltFrameResolver::default(),
            vehicle: VehicleState::default(),
            rangefinder: RangefinderReading::default(),
            segment: None,
            spline: None,
            track_unit: Vector3::zeros(),
            track: TrackLimits::default(),
            limits_stale: true,
            target: TargetState::default(),
            yaw: YawTarget::default(),
            flags: GuidanceFlags::default(),
            state: GuidanceState::Idle,
            output: OutputData::default(),
            arch_output: Archiver::default(),
            report: StatusReport::default(),
            arch_report: Archiver::default()
        }
    }

    /// Use the given terrain source for terrain relative segments.
    pub fn with_terrain_source(mut self, terrain: &'a dyn TerrainSource) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn set_terrain_source(&mut self, terrain: Option<&'a dyn TerrainSource>) {
        self.terrain = terrain;
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replace the parameters.
    ///
    /// The new parameters are sanitised and the accelerations in use are
    /// updated from them. Speeds in use are left alone.
    pub fn set_params(&mut self, params: Params) {
        self.params = params.sanitise();
        self.speeds.set_accel(self.params.wp_accel_cmss, self.params.wp_accel_z_cmss);
        self.limits_stale = true;
    }

    /// Store the vehicle state and rangefinder reading for use by the next
    /// segment change. `advance` does this itself.
    pub fn capture_inputs(&mut self, input: &InputData) {
        self.vehicle = input.vehicle;
        self.rangefinder = input.rangefinder;
    }

    /// Initialise the straight and spline controllers before use by a new
    /// flight mode.
    ///
    /// Speeds go back to the parameter defaults, all flags are cleared and
    /// the target is put on the vehicle.
    pub fn init_segments(&mut self) {
        self.speeds = SpeedLimits::from_params(&self.params);
        self.segment = None;
        self.spline = None;
        self.track_unit = Vector3::zeros();
        self.track = TrackLimits::default();
        self.limits_stale = true;
        self.alt_resolver.reset();
        self.yaw.reset();
        self.flags = GuidanceFlags::default();
        self.state = GuidanceState::Idle;

        self.target = TargetState {
            pos_cm: self.vehicle.position_cm,
            ..Default::default()
        };
        self.output = OutputData {
            target_pos_cm: self.vehicle.position_cm,
            yaw_rad: self.vehicle.yaw_rad,
            ..Default::default()
        };

        debug!("WpNav initialised");
    }

    /// Set a new straight segment.
    ///
    /// Positions are relative to the EKF origin, or to the terrain if
    /// `terrain_alt` is set. Fails without changing anything if the
    /// terrain height is needed and cannot be found.
    pub fn set_segment(
        &mut self,
        origin_cm: Vector3<f64>,
        destination_cm: Vector3<f64>,
        terrain_alt: bool
    ) -> Result<(), WpNavError> {
        let frame = AltFrame::from_terrain_alt(terrain_alt);
        let terr_offset_cm = self.resolve_terrain_offset(frame, 0.0)?;

        let seg = Segment::new(origin_cm, destination_cm, frame, SegmentKind::Straight);
        self.begin_segment(seg, None, terr_offset_cm);

        // Start the target at the vehicle's current speed along the track
        let speed_along_track = self.vehicle.velocity_cms.dot(&seg.unit);
        self.target.limited_speed_cms = speed_along_track
            .max(0.0)
            .min(self.track.speed_max_cms);

        debug!(
            "New straight segment {:?} -> {:?} ({:?}), length {:.1} cm",
            origin_cm.as_slice(), destination_cm.as_slice(), frame, seg.length_cm
        );

        Ok(())
    }

    /// Set a new straight segment to `destination_cm`.
    ///
    /// The segment starts from the current target if a segment is active,
    /// otherwise from the vehicle's stopping point.
    pub fn set_destination(
        &mut self,
        destination_cm: Vector3<f64>,
        terrain_alt: bool
    ) -> Result<(), WpNavError> {
        let origin_cm = self.next_origin_cm(terrain_alt)?;
        self.set_segment(origin_cm, destination_cm, terrain_alt)
    }

    /// Set a new spline segment.
    ///
    /// `stopped_at_start` forces the spline to start from rest. Otherwise the
    /// starting velocity continues the previous segment, if it was
    /// completed. `end` gives what follows the destination and so the
    /// velocity there, and whether it is a fast waypoint.
    pub fn set_spline_segment(
        &mut self,
        origin_cm: Vector3<f64>,
        destination_cm: Vector3<f64>,
        terrain_alt: bool,
        stopped_at_start: bool,
        end: SplineEnd
    ) -> Result<(), WpNavError> {
        let frame = AltFrame::from_terrain_alt(terrain_alt);
        let terr_offset_cm = self.resolve_terrain_offset(frame, 0.0)?;

        let delta = destination_cm - origin_cm;
        let prev_completed = self.state != GuidanceState::Idle
            && self.flags.waypoint_completed;

        let mut time = 0.0;
        let mut vel_scaler_cms = 0.0;

        let origin_vel = if stopped_at_start || !prev_completed {
            delta * SPLINE_NOMINAL_DT_S
        }
        else {
            match (self.segment, self.spline) {
                (Some(prev), Some(prev_spline)) if prev.kind == SegmentKind::Spline => {
                    if prev_spline.time_overrun < SPLINE_TIME_OVERRUN_MAX {
                        time = prev_spline.time_overrun;
                    }
                    vel_scaler_cms = prev_spline.vel_scaler_cms;
                    prev_spline.destination_vel
                },
                (Some(prev), _) => {
                    vel_scaler_cms = self.target.vel_cms.norm();
                    prev.destination_cm - prev.origin_cm
                },
                (None, _) => delta * SPLINE_NOMINAL_DT_S
            }
        };

        let (destination_vel, fast_waypoint) = match end {
            SplineEnd::Stop => (delta * SPLINE_NOMINAL_DT_S, false),
            SplineEnd::Straight(next_cm) => (next_cm - destination_cm, true),
            SplineEnd::Spline(next_cm) => (next_cm - origin_cm, true)
        };

        // Large boundary velocities make the curve loop, scale them down
        let vel_sum = origin_vel.norm() + destination_vel.norm();
        let vel_sum_max = SPLINE_VEL_SUM_MAX_RATIO * delta.norm();
        let (origin_vel, destination_vel) = if vel_sum > vel_sum_max && vel_sum > 0.0 {
            let scale = vel_sum_max / vel_sum;
            (origin_vel * scale, destination_vel * scale)
        }
        else {
            (origin_vel, destination_vel)
        };

        let curve = HermiteSpline::new(&origin_cm, &destination_cm, &origin_vel, &destination_vel);
        let spline = SplineProgress {
            curve,
            origin_vel,
            destination_vel,
            time,
            time_overrun: 0.0,
            time_scale: 0.0,
            vel_scaler_cms,
            arc_length_cm: curve.arc_length_estimate(SPLINE_ARC_LENGTH_STEPS),
            arc_progress_cm: 0.0
        };

        let seg = Segment::new(origin_cm, destination_cm, frame, SegmentKind::Spline);
        self.begin_segment(seg, Some(spline), terr_offset_cm);
        self.flags.fast_waypoint = fast_waypoint;
        self.target.pos_cm = curve.position(time);
        self.output.target_pos_cm = self.target_pos_cm();

        debug!(
            "New spline segment {:?} -> {:?} ({:?}), arc length {:.1} cm, end {:?}",
            origin_cm.as_slice(), destination_cm.as_slice(), frame,
            spline.arc_length_cm, end
        );

        Ok(())
    }

    /// Set a new spline segment to `destination_cm`, starting from the current
    /// target if a segment is active or the vehicle's stopping point if not.
    pub fn set_spline_destination(
        &mut self,
        destination_cm: Vector3<f64>,
        terrain_alt: bool,
        stopped_at_start: bool,
        end: SplineEnd
    ) -> Result<(), WpNavError> {
        let origin_cm = self.next_origin_cm(terrain_alt)?;
        self.set_spline_segment(origin_cm, destination_cm, terrain_alt, stopped_at_start, end)
    }

    /// Advance the intermediate target by one cycle.
    ///
    /// Fails without changing anything, including the captured vehicle state,
    /// if the segment is terrain relative and the terrain height cannot be
    /// found. Does nothing while idle.
    pub fn advance(&mut self, input: &InputData) -> Result<(), WpNavError> {
        let dt_s = if input.dt_s.is_finite() {
            input.dt_s.max(0.0)
        }
        else {
            0.0
        };

        let seg = match self.segment {
            Some(s) if self.state != GuidanceState::Idle => s,
            _ => {
                self.capture_inputs(input);
                self.report = StatusReport {
                    time_s: session::get_elapsed_seconds(),
                    state: GuidanceState::Idle,
                    ..Default::default()
                };
                self.output.new_destination = false;
                return Ok(())
            }
        };

        // The new snapshot is only kept once the altitude is resolved
        let terr_offset_cm = self.resolve_terrain_offset_at(
            seg.frame, &input.vehicle.position_cm, &input.rangefinder, dt_s)?;
        self.capture_inputs(input);

        self.report = StatusReport::default();

        if self.speeds.ramp_speed_xy(dt_s) {
            self.limits_stale = true;
        }

        match seg.kind {
            SegmentKind::Straight => self.advance_straight(&seg, dt_s, terr_offset_cm),
            SegmentKind::Spline => self.advance_spline(&seg, dt_s, terr_offset_cm)
        }

        self.state = self.state.next(&self.flags);

        self.output = OutputData {
            target_pos_cm: self.target_pos_cm(),
            target_vel_cms: self.target.vel_cms,
            yaw_rad: self.yaw(),
            new_destination: self.flags.new_destination
        };
        self.flags.new_destination = false;

        self.fill_report(&seg);

        trace!(
            "WpNav target: {:?}, vel: {:?}, yaw: {:.3}",
            self.output.target_pos_cm.as_slice(),
            self.output.target_vel_cms.as_slice(),
            self.output.yaw_rad
        );

        Ok(())
    }

    /// Move the origin and destination so the target starts on the vehicle.
    ///
    /// Does nothing once the target has started moving along the segment.
    pub fn shift_origin_to_current_pos(&mut self) {
        let mut seg = match self.segment {
            Some(s) => s,
            None => return
        };

        let started = match self.spline {
            Some(sp) => sp.time > 0.0,
            None => self.target.track_desired_cm > 0.0
        };
        if started {
            return
        }

        let offset_cm = self.vehicle.position_cm - self.target_pos_cm();
        seg.shift(&offset_cm);
        self.segment = Some(seg);
        self.target.pos_cm += offset_cm;

        if let Some(sp) = self.spline.as_mut() {
            sp.curve = HermiteSpline::new(
                &seg.origin_cm, &seg.destination_cm, &sp.origin_vel, &sp.destination_vel);
        }

        // Suppress the feed forward step
        self.flags.new_destination = true;

        debug!("Segment shifted by {:?} to start at the vehicle", offset_cm.as_slice());
    }

    /// Point at which the vehicle would stop if it started decelerating
    /// now, relative to the EKF origin.
    pub fn stopping_point(&self) -> Vector3<f64> {
        limits::stopping_point(&self.vehicle, &self.speeds, &self.params)
    }

    // ---- CONFIGURATION ----

    /// Request a new horizontal speed. The speed in use ramps to it at the
    /// horizontal acceleration.
    pub fn set_speed_xy(&mut self, speed_cms: f64) {
        self.speeds.set_desired_speed_xy(speed_cms);
    }

    pub fn set_speed_up(&mut self, speed_cms: f64) {
        self.speeds.set_speed_up(speed_cms);
        self.limits_stale = true;
    }

    pub fn set_speed_down(&mut self, speed_cms: f64) {
        self.speeds.set_speed_down(speed_cms);
        self.limits_stale = true;
    }

    pub fn set_accel(&mut self, accel_xy_cmss: f64, accel_z_cmss: f64) {
        self.speeds.set_accel(accel_xy_cmss, accel_z_cmss);
        self.limits_stale = true;
    }

    /// Make the current segment's destination a fast waypoint, or not.
    pub fn set_fast_waypoint(&mut self, fast: bool) {
        self.flags.fast_waypoint = fast;
        self.limits_stale = true;
    }

    pub fn set_do_cmds_before_next_nav(&mut self, do_cmds: bool) {
        self.flags.do_cmds_before_next_nav = do_cmds;
    }

    pub fn reset_reached_previous_wpt(&mut self) {
        self.flags.reached_previous_wpt = false;
    }

    // ---- ACCESSORS ----

    pub fn output(&self) -> OutputData {
        self.output
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    /// Intermediate target position relative to the EKF origin.
    pub fn target_pos_cm(&self) -> Vector3<f64> {
        self.target.pos_cm + Vector3::new(0.0, 0.0, self.target.terr_offset_cm)
    }

    pub fn target_vel_cms(&self) -> Vector3<f64> {
        self.target.vel_cms
    }

    /// Yaw target, or the vehicle's yaw if none has been set on this
    /// segment.
    pub fn yaw(&self) -> f64 {
        self.yaw.get(self.vehicle.yaw_rad)
    }

    /// Vehicle state captured on the last cycle.
    pub fn vehicle(&self) -> &VehicleState {
        &self.vehicle
    }

    /// Vehicle position in the current segment's altitude frame, using the
    /// terrain offset of the last cycle.
    pub fn vehicle_pos_in_segment_frame_cm(&self) -> Vector3<f64> {
        self.vehicle.position_cm - Vector3::new(0.0, 0.0, self.target.terr_offset_cm)
    }

    pub fn crosstrack_error_cm(&self) -> f64 {
        self.target.crosstrack_error_cm
    }

    /// Horizontal distance from the vehicle to the destination.
    pub fn distance_to_destination_cm(&self) -> f64 {
        match self.segment {
            Some(seg) => norm_xy(&(seg.destination_cm - self.vehicle.position_cm)),
            None => 0.0
        }
    }

    /// Bearing from the vehicle to the destination.
    pub fn bearing_to_destination_rad(&self) -> f64 {
        match self.segment {
            Some(seg) => bearing_rad(&self.vehicle.position_cm, &seg.destination_cm),
            None => 0.0
        }
    }

    pub fn reached_destination(&self) -> bool {
        self.flags.reached_destination
    }

    /// The vehicle is horizontally within the waypoint radius of the
    /// destination.
    pub fn reached_destination_xy(&self) -> bool {
        self.segment.is_some()
            && self.distance_to_destination_cm() < self.params.wp_radius_cm
    }

    pub fn waypoint_completed(&self) -> bool {
        self.flags.waypoint_completed
    }

    pub fn reached_previous_wpt(&self) -> bool {
        self.flags.reached_previous_wpt
    }

    pub fn do_cmds_before_next_nav(&self) -> bool {
        self.flags.do_cmds_before_next_nav
    }

    pub fn is_fast_waypoint(&self) -> bool {
        self.flags.fast_waypoint
    }

    pub fn is_new_destination(&self) -> bool {
        self.flags.new_destination
    }

    pub fn origin(&self) -> Option<Vector3<f64>> {
        self.segment.map(|s| s.origin_cm)
    }

    pub fn destination(&self) -> Option<Vector3<f64>> {
        self.segment.map(|s| s.destination_cm)
    }

    pub fn is_terrain_alt(&self) -> bool {
        self.segment.map(|s| s.frame.is_terrain()).unwrap_or(false)
    }

    pub fn segment_kind(&self) -> Option<SegmentKind> {
        self.segment.map(|s| s.kind)
    }

    pub fn guidance_state(&self) -> GuidanceState {
        self.state
    }

    pub fn track_limits(&self) -> TrackLimits {
        self.track
    }

    // ---- INTERNALS ----

    /// Recalculate the track limits along `track_unit`.
    pub(crate) fn update_track_limits(&mut self) {
        let length_cm = match (self.segment, self.spline) {
            (Some(seg), None) => seg.length_cm,
            (_, Some(sp)) => sp.arc_length_cm,
            (None, None) => 0.0
        };

        self.track = TrackLimits::calculate(&self.track_unit, length_cm, &self.speeds, &self.params);
        self.limits_stale = false;
        self.report.limits_recalculated = true;

        trace!(
            "Track limits: speed {:.1} cm/s, accel {:.1} cm/s/s, leash {:.1} cm",
            self.track.speed_cms, self.track.accel_cmss, self.track.leash_cm
        );
    }

    /// Update the completion flags from the vehicle's distance to the
    /// destination and the target's progress along the track.
    pub(crate) fn check_completion(
        &mut self,
        dist_to_dest_cm: f64,
        progress_cm: f64,
        length_cm: f64
    ) {
        if !self.flags.reached_destination && dist_to_dest_cm < self.params.wp_radius_cm {
            self.flags.arrive();
            info!("Reached destination ({:.1} cm away)", dist_to_dest_cm);
        }

        if self.flags.fast_waypoint && !self.flags.waypoint_completed {
            let bound_cm = length_cm - self.params.fast_wp_radius_cm.min(self.track.leash_cm);
            if progress_cm >= bound_cm {
                self.flags.waypoint_completed = true;
                debug!("Fast waypoint completed at {:.1} cm along the track", progress_cm);
            }
        }
    }

    /// Terrain offset for the given frame at the captured vehicle position.
    fn resolve_terrain_offset(&mut self, frame: AltFrame, dt_s: f64) -> Result<f64, WpNavError> {
        let position_cm = self.vehicle.position_cm;
        let rangefinder = self.rangefinder;
        self.resolve_terrain_offset_at(frame, &position_cm, &rangefinder, dt_s)
    }

    /// Terrain offset for the given frame at `position_cm`.
    fn resolve_terrain_offset_at(
        &mut self,
        frame: AltFrame,
        position_cm: &Vector3<f64>,
        rangefinder: &RangefinderReading,
        dt_s: f64
    ) -> Result<f64, WpNavError> {
        match frame {
            AltFrame::AboveOrigin => Ok(0.0),
            AltFrame::AboveTerrain => self.alt_resolver.terrain_offset_cm(
                self.terrain,
                rangefinder,
                position_cm,
                dt_s,
                &self.params
            )
        }
    }

    /// Start point for a segment set by destination only, in the frame
    /// given by `terrain_alt`.
    fn next_origin_cm(&mut self, terrain_alt: bool) -> Result<Vector3<f64>, WpNavError> {
        let start_cm = if self.state != GuidanceState::Idle && self.segment.is_some() {
            self.target_pos_cm()
        }
        else {
            self.stopping_point()
        };

        let frame = AltFrame::from_terrain_alt(terrain_alt);
        let offset_cm = self.resolve_terrain_offset(frame, 0.0)?;

        Ok(start_cm - Vector3::new(0.0, 0.0, offset_cm))
    }

    /// Common setup for a new segment of either kind.
    fn begin_segment(
        &mut self,
        seg: Segment,
        spline: Option<SplineProgress>,
        terr_offset_cm: f64
    ) {
        self.flags.start_segment(self.state != GuidanceState::Idle && self.segment.is_some());

        self.segment = Some(seg);
        self.spline = spline;

        // Splines track the tangent at the start, falling back to the chord
        self.track_unit = spline
            .map(|sp| sp.curve.velocity(sp.time))
            .and_then(|v| v.try_normalize(f64::EPSILON))
            .unwrap_or(seg.unit);
        self.update_track_limits();

        self.target = TargetState {
            pos_cm: seg.origin_cm,
            terr_offset_cm,
            ..Default::default()
        };

        self.yaw.reset();
        if seg.length_xy_cm >= YawTarget::min_track_length_cm(&self.params, false) {
            self.yaw.set(seg.heading_rad());
        }

        self.state = GuidanceState::Tracking;

        if seg.is_degenerate() {
            warn!(
                "Segment origin and destination are the same point {:?}, treating as arrived",
                seg.destination_cm.as_slice()
            );
            self.flags.arrive();
            self.state = GuidanceState::Arrived;
        }

        self.output = OutputData {
            target_pos_cm: self.target_pos_cm(),
            target_vel_cms: Vector3::zeros(),
            yaw_rad: self.yaw(),
            new_destination: true
        };
    }

    fn fill_report(&mut self, seg: &Segment) {
        let (progress_cm, track_length_cm, spline_time) = match self.spline {
            Some(sp) => (sp.arc_progress_cm, sp.arc_length_cm, sp.time),
            None => (self.target.track_desired_cm, seg.length_cm, 0.0)
        };

        self.report = StatusReport {
            time_s: session::get_elapsed_seconds(),
            state: self.state,
            crosstrack_error_cm: self.target.crosstrack_error_cm,
            progress_cm,
            track_length_cm,
            dist_to_dest_cm: self.distance_to_destination_cm(),
            bearing_to_dest_rad: self.bearing_to_destination_rad(),
            spline_time,
            reached_destination: self.flags.reached_destination,
            waypoint_completed: self.flags.waypoint_completed,
            slowing_down: self.flags.slowing_down,
            fast_waypoint: self.flags.fast_waypoint,
            ..self.report
        };
    }
}

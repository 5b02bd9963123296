//! # Tank failsafe
//!
//! When the spray tank runs dry during an automatic mission the vehicle is
//! braked. If it was part way through the spraying legs a resume point is
//! inserted into the mission at the vehicle's position, so that the mission
//! can be picked up from the same place after a refill.
//!
//! The mission, sprayer and flight mode are owned elsewhere and reached
//! through the traits below.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Internal
use crate::wp_nav::{AltFrame, WpNav};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Access to the stored mission.
pub trait MissionStore {
    /// Index of the previous navigation command that had a waypoint, if any.
    fn prev_nav_index(&self) -> Option<usize>;

    /// Index of the navigation command currently being executed.
    fn current_nav_index(&self) -> usize;

    fn num_commands(&self) -> usize;

    fn num_commands_max(&self) -> usize;

    /// Insert a resume point before the command at `index`.
    fn insert_resume_point(&mut self, index: usize, point: &ResumePoint)
        -> Result<(), FailsafeError>;
}

pub trait Sprayer {
    fn spraying(&self) -> bool;

    fn run(&mut self, enable: bool, ignore_heading: bool);
}

pub trait ModeSwitch {
    fn mode(&self) -> FlightMode;

    fn is_taking_off(&self) -> bool;

    fn is_landing(&self) -> bool;

    fn set_mode(&mut self, mode: FlightMode);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the tank failsafe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TankFailsafeParams {
    /// A tank sensor is fitted
    pub enabled: bool,

    /// Time after boot before the failsafe can trigger, so the sensor can
    /// settle
    pub boot_delay_s: f64,

    /// Commands up to and including this index are the takeoff sequence, no
    /// resume point is inserted while in them
    pub takeoff_cmd_index_max: usize
}

/// A point to resume the mission from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResumePoint {
    /// Vehicle position in the altitude frame of the interrupted segment
    pub position_cm: Vector3<f64>,

    pub frame: AltFrame,

    /// The sprayer was running when the tank ran dry
    pub was_spraying: bool
}

/// Watches the tank sensor for the tank running dry.
#[derive(Debug, Clone)]
pub struct TankFailsafe {
    params: TankFailsafeParams,

    /// Level at the last update, `None` before the first reading
    last_level: Option<TankLevel>,

    in_boot_delay: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightMode {
    Auto,
    Brake,
    Guided,
    Loiter,
    Rtl,
    Land
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankLevel {
    Full,
    Empty
}

/// What the failsafe did on an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailsafeAction {
    None,

    /// Switched to brake without changing the mission
    Brake,

    /// Switched to brake and inserted a resume point at the given mission
    /// index
    BrakeAndResume {
        index: usize,
        point: ResumePoint
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FailsafeError {
    #[error("The mission rejected the resume point: {0}")]
    InsertRejected(String)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TankFailsafeParams {
    fn default() -> Self {
        Self {
            enabled: true,
            boot_delay_s: 20.0,
            takeoff_cmd_index_max: 3
        }
    }
}

impl TankLevel {
    /// Level from the sensor pin, which is high when the tank is full.
    pub fn from_pin(high: bool) -> Self {
        if high {
            TankLevel::Full
        }
        else {
            TankLevel::Empty
        }
    }
}

impl TankFailsafe {
    pub fn new(params: TankFailsafeParams) -> Self {
        Self {
            params,
            last_level: None,
            in_boot_delay: true
        }
    }

    /// Update with the latest tank level.
    ///
    /// The failsafe triggers on the tank going from full to empty while
    /// flying an automatic mission outside of takeoff and landing.
    pub fn update(
        &mut self,
        level: TankLevel,
        time_since_boot_s: f64,
        nav: &WpNav,
        mission: &mut dyn MissionStore,
        sprayer: &mut dyn Sprayer,
        modes: &mut dyn ModeSwitch
    ) -> Result<FailsafeAction, FailsafeError> {
        if !self.params.enabled {
            return Ok(FailsafeAction::None)
        }

        let ran_dry = self.last_level == Some(TankLevel::Full) && level == TankLevel::Empty;
        self.last_level = Some(level);

        if !ran_dry {
            return Ok(FailsafeAction::None)
        }

        if self.in_boot_delay && time_since_boot_s > self.params.boot_delay_s {
            self.in_boot_delay = false;
        }

        if self.in_boot_delay
            || modes.mode() != FlightMode::Auto
            || modes.is_taking_off()
            || modes.is_landing()
        {
            info!("Tank empty, no failsafe action in the current state");
            return Ok(FailsafeAction::None)
        }

        self.brake_and_insert_resume_point(nav, mission, sprayer, modes)
    }

    fn brake_and_insert_resume_point(
        &mut self,
        nav: &WpNav,
        mission: &mut dyn MissionStore,
        sprayer: &mut dyn Sprayer,
        modes: &mut dyn ModeSwitch
    ) -> Result<FailsafeAction, FailsafeError> {
        // Captured before anything stops the sprayer
        let was_spraying = sprayer.spraying();
        let prev_nav_index = mission.prev_nav_index();

        warn!("Tank empty, braking");
        modes.set_mode(FlightMode::Brake);

        if !nav.reached_previous_wpt() {
            info!("No waypoint reached yet, no resume point needed");
            return Ok(FailsafeAction::Brake)
        }

        match prev_nav_index {
            Some(i) if i > self.params.takeoff_cmd_index_max => (),
            _ => {
                info!("Still in the takeoff commands, no resume point needed");
                return Ok(FailsafeAction::Brake)
            }
        }

        if mission.num_commands() >= mission.num_commands_max() {
            warn!("Mission is full, cannot insert a resume point");
            return Ok(FailsafeAction::Brake)
        }

        let index = mission.current_nav_index();
        let frame = if nav.is_terrain_alt() {
            AltFrame::AboveTerrain
        }
        else {
            AltFrame::AboveOrigin
        };
        let point = ResumePoint {
            position_cm: nav.vehicle_pos_in_segment_frame_cm(),
            frame,
            was_spraying
        };

        mission.insert_resume_point(index, &point)?;
        sprayer.run(false, false);

        info!(
            "Resume point inserted at index {} ({:?}, spraying: {})",
            index, point.position_cm.as_slice(), was_spraying
        );

        Ok(FailsafeAction::BrakeAndResume { index, point })
    }
}

//! Waypoint navigation executable parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    failsafe::TankFailsafeParams,
    mission::Leg,
    sim::{SimTerrainParams, SimVehicleParams}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the executable itself, the module parameters live in their
/// own files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WpNavExecParams {
    /// Target period of one cycle
    pub cycle_period_s: f64,

    /// Sleep to keep cycles in step with wall clock time, otherwise run as
    /// fast as possible
    pub real_time: bool,

    /// The executable stops after this much simulated time
    pub max_duration_s: f64,

    pub start_position_cm: [f64; 3],

    /// Maximum number of legs, including inserted resume points
    pub max_mission_legs: usize,

    /// Simulated time at which the tank runs dry, `None` for never
    #[serde(default)]
    pub tank_empty_at_s: Option<f64>,

    #[serde(default)]
    pub vehicle: SimVehicleParams,

    #[serde(default)]
    pub terrain: SimTerrainParams,

    #[serde(default)]
    pub tank_failsafe: TankFailsafeParams,

    pub legs: Vec<Leg>
}

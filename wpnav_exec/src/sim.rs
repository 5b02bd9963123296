//! # Simulation
//!
//! A point mass vehicle and synthetic terrain, enough to fly missions through
//! waypoint navigation without hardware.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

// Internal
use crate::wp_nav::{OutputData, RangefinderReading, TerrainSource, VehicleState};
use util::maths::{map_pi_to_2pi, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimVehicleParams {
    /// Time constant of the position lag
    pub time_const_s: f64,

    pub speed_max_cms: f64,

    pub yaw_rate_max_rads: f64,

    /// Rangefinder readings outside this range are unhealthy
    pub rangefinder_min_cm: f64,
    pub rangefinder_max_cm: f64
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimTerrainParams {
    pub amplitude_cm: f64,
    pub wavelength_cm: f64,

    /// Terrain data is only available within this distance of the origin,
    /// `None` for everywhere
    pub data_radius_cm: Option<f64>
}

/// A point mass which chases the navigation target with a first order lag
/// plus the target's velocity as feed forward.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    params: SimVehicleParams,
    state: VehicleState
}

/// Rolling sinusoidal terrain.
#[derive(Debug, Clone)]
pub struct SimTerrain {
    params: SimTerrainParams
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimVehicleParams {
    fn default() -> Self {
        Self {
            time_const_s: 0.5,
            speed_max_cms: 1000.0,
            yaw_rate_max_rads: 1.0,
            rangefinder_min_cm: 20.0,
            rangefinder_max_cm: 4000.0
        }
    }
}

impl Default for SimTerrainParams {
    fn default() -> Self {
        Self {
            amplitude_cm: 200.0,
            wavelength_cm: 5000.0,
            data_radius_cm: None
        }
    }
}

impl SimVehicle {
    pub fn new(params: SimVehicleParams, position_cm: Vector3<f64>) -> Self {
        Self {
            params,
            state: VehicleState {
                position_cm,
                ..Default::default()
            }
        }
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    /// Move towards the navigation target for one cycle.
    pub fn step(&mut self, dt_s: f64, target: &OutputData) {
        if dt_s <= 0.0 {
            return
        }

        let pos_error = target.target_pos_cm - self.state.position_cm;
        let mut vel = if self.params.time_const_s > 0.0 {
            target.target_vel_cms + pos_error / self.params.time_const_s
        }
        else {
            pos_error / dt_s
        };

        let speed = vel.norm();
        if speed > self.params.speed_max_cms {
            vel *= self.params.speed_max_cms / speed;
        }

        self.state.velocity_cms = vel;
        self.state.position_cm += vel * dt_s;

        // Turn towards the target yaw at the maximum rate
        let yaw_err = wrap_pi(target.yaw_rad - self.state.yaw_rad);
        let max_step = self.params.yaw_rate_max_rads * dt_s;
        self.state.yaw_rad = map_pi_to_2pi(
            wrap_pi(self.state.yaw_rad + yaw_err.max(-max_step).min(max_step))
        );
    }

    /// Rangefinder reading over the given terrain.
    pub fn rangefinder(&self, terrain: &SimTerrain) -> RangefinderReading {
        let xy = self.state.position_cm.xy();
        let alt_cm = self.state.position_cm[2] - terrain.true_height_cm(&xy);

        RangefinderReading {
            available: true,
            healthy: alt_cm >= self.params.rangefinder_min_cm
                && alt_cm <= self.params.rangefinder_max_cm,
            alt_cm
        }
    }
}

impl SimTerrain {
    pub fn new(params: SimTerrainParams) -> Self {
        Self { params }
    }

    /// Terrain height everywhere, whether or not it is in the data.
    pub fn true_height_cm(&self, xy_cm: &Vector2<f64>) -> f64 {
        if self.params.wavelength_cm <= 0.0 {
            return 0.0
        }

        let k = std::f64::consts::TAU / self.params.wavelength_cm;
        self.params.amplitude_cm * (k * xy_cm[0]).sin() * (k * xy_cm[1]).cos()
    }
}

impl TerrainSource for SimTerrain {
    fn terrain_height_cm(&self, xy_cm: &Vector2<f64>) -> Option<f64> {
        match self.params.data_radius_cm {
            Some(r) if xy_cm.norm() > r => None,
            _ => Some(self.true_height_cm(xy_cm))
        }
    }
}

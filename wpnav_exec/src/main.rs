//! Main waypoint navigation executable entry point.
//!
//! # Architecture
//!
//! The executable flies a mission of legs over simulated terrain:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Input acquisition from the simulated vehicle
//!         - Waypoint navigation processing
//!         - Mission sequencing
//!         - Tank failsafe processing
//!         - Archiving
//!         - Simulated vehicle step
//!
//! # Modules
//!
//! All cyclic modules (e.g. `wp_nav`) shall provide a public struct
//! implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use wpnav_lib::{
    failsafe::{FailsafeAction, FlightMode, ModeSwitch, Sprayer, TankFailsafe, TankLevel},
    mission::Mission,
    params::WpNavExecParams,
    sim::{SimTerrain, SimVehicle},
    wp_nav::{InputData, OutputData, WpNav}
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::WrapErr};
use log::{info, warn};
use nalgebra::Vector3;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Speed below which a braking vehicle is considered stopped.
const STOPPED_SPEED_CMS: f64 = 1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ExecSprayer {
    running: bool
}

struct ExecModes {
    mode: FlightMode
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Sprayer for ExecSprayer {
    fn spraying(&self) -> bool {
        self.running
    }

    fn run(&mut self, enable: bool, _ignore_heading: bool) {
        if enable != self.running {
            info!("Sprayer {}", if enable { "on" } else { "off" });
        }
        self.running = enable;
    }
}

impl ModeSwitch for ExecModes {
    fn mode(&self) -> FlightMode {
        self.mode
    }

    fn is_taking_off(&self) -> bool {
        false
    }

    fn is_landing(&self) -> bool {
        false
    }

    fn set_mode(&mut self, mode: FlightMode) {
        info!("Mode change {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session = Session::new(
        "wpnav_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Waypoint Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: WpNavExecParams = util::params::load(
        "wpnav_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    if let Err(e) = session.snapshot_params(&["wpnav_exec.toml", "wp_nav.toml"]) {
        warn!("Parameters not saved to the session: {}", e);
    }

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let terrain = SimTerrain::new(exec_params.terrain);
    let mut vehicle = SimVehicle::new(
        exec_params.vehicle,
        Vector3::from(exec_params.start_position_cm)
    );

    let mut wp_nav = WpNav::default().with_terrain_source(&terrain);
    wp_nav.init("wp_nav.toml", Some(&session))
        .wrap_err("Failed to initialise WpNav")?;
    wp_nav.capture_inputs(&InputData {
        dt_s: 0.0,
        vehicle: vehicle.state(),
        rangefinder: vehicle.rangefinder(&terrain)
    });
    info!("WpNav init complete");

    let mut mission = Mission::new(exec_params.legs.clone(), exec_params.max_mission_legs);
    let mut tank_failsafe = TankFailsafe::new(exec_params.tank_failsafe);
    let mut sprayer = ExecSprayer::default();
    let mut modes = ExecModes { mode: FlightMode::Auto };

    if !mission.start_next(&mut wp_nav).wrap_err("Failed to start the mission")? {
        warn!("Mission has no legs, nothing to do");
        return Ok(())
    }
    sprayer.run(mission.current_leg().map_or(false, |l| l.spray), false);

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let dt_s = exec_params.cycle_period_s;
    let mut sim_time_s = 0.0;
    let mut output = wp_nav.output();
    let mut brake_target_cm: Option<Vector3<f64>> = None;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        let input = InputData {
            dt_s,
            vehicle: vehicle.state(),
            rangefinder: vehicle.rangefinder(&terrain)
        };

        // ---- GUIDANCE ----

        match modes.mode() {
            FlightMode::Auto => {
                match wp_nav.proc(&input) {
                    Ok((o, _)) => output = o,
                    Err(e) => warn!("WpNav error, holding the last target: {}", e)
                }

                if wp_nav.waypoint_completed() {
                    match mission.start_next(&mut wp_nav) {
                        Ok(true) => sprayer.run(
                            mission.current_leg().map_or(false, |l| l.spray),
                            false
                        ),
                        Ok(false) => {
                            info!("Mission complete at {:.2} s", sim_time_s);
                            break
                        },
                        Err(e) => warn!("Cannot start the next leg yet: {}", e)
                    }
                }
            },
            _ => {
                // Brake to the stopping point captured on entry
                let target = *brake_target_cm.get_or_insert_with(|| wp_nav.stopping_point());
                output = OutputData {
                    target_pos_cm: target,
                    target_vel_cms: Vector3::zeros(),
                    yaw_rad: input.vehicle.yaw_rad,
                    new_destination: false
                };

                if input.vehicle.velocity_cms.norm() < STOPPED_SPEED_CMS {
                    info!("Vehicle stopped at {:?}", input.vehicle.position_cm.as_slice());
                    break
                }
            }
        }

        // ---- FAILSAFE ----

        let tank_empty = matches!(exec_params.tank_empty_at_s, Some(t) if sim_time_s >= t);
        match tank_failsafe.update(
            TankLevel::from_pin(!tank_empty),
            sim_time_s,
            &wp_nav,
            &mut mission,
            &mut sprayer,
            &mut modes
        ) {
            Ok(FailsafeAction::BrakeAndResume { index, .. }) =>
                info!("Mission will resume from leg {}", index + 1),
            Ok(_) => (),
            Err(e) => warn!("Tank failsafe error: {}", e)
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = wp_nav.write() {
            warn!("Failed to archive WpNav: {}", e);
        }

        // ---- SIMULATION ----

        vehicle.step(dt_s, &output);
        sim_time_s += dt_s;

        if sim_time_s >= exec_params.max_duration_s {
            warn!("Maximum duration of {:.1} s reached, stopping", exec_params.max_duration_s);
            break
        }

        // ---- CYCLE MANAGEMENT ----

        if !exec_params.real_time {
            continue
        }

        // Get the end time of the cycle
        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(dt_s).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - dt_s
            )
        }
    }

    info!("End of execution");

    Ok(())
}

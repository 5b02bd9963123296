//! # Waypoint navigation library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to
//! access items defined inside the waypoint navigation crate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Waypoint navigation - moves an intermediate target along straight and
/// spline segments between waypoints
pub mod wp_nav;

/// Tank failsafe - brakes and records where to resume when the tank runs dry
pub mod failsafe;

/// Mission - sequences legs onto waypoint navigation
pub mod mission;

/// Executable parameters
pub mod params;

/// Simulation - point mass vehicle and synthetic terrain
pub mod sim;

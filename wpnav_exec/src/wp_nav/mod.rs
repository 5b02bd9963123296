//! # Waypoint navigation module
//!
//! Waypoint navigation moves an intermediate target from the origin of a
//! segment towards its destination, which the position controller then
//! chases. The target is kept no further than a leash ahead of the vehicle,
//! so a vehicle that falls behind is never asked for more than its
//! controller can give.
//!
//! Segments are either straight or cubic Hermite splines. Straight segments
//! track a scalar distance along the line from origin to destination, with
//! a speed profile that accelerates at the track acceleration and slows for
//! the destination so the target stops on it. Splines advance a curve
//! parameter `t` from 0 to 1, scaled every cycle so the target moves at the
//! desired speed along the curve. The boundary velocities of a spline come
//! from the neighbouring segments, so a string of splines and straights
//! joins smoothly.
//!
//! Altitudes are either above the EKF origin or above the terrain. Terrain
//! relative segments need the height of the terrain every cycle, from a
//! `TerrainSource` or from the rangefinder. If neither can provide it the
//! cycle fails with `WpNavError::AltitudeUnresolved` and nothing is changed.
//!
//! A fast waypoint is one the vehicle does not stop at. It is complete once
//! the target is close enough to the destination for the next segment to
//! take over, rather than when the vehicle reaches it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod alt_frame;
mod calc_spline;
mod calc_straight;
pub mod flags;
pub mod limits;
pub mod params;
pub mod segment;
pub mod spline;
pub mod state;
pub mod yaw;

#[cfg(test)]
mod test;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use alt_frame::*;
pub use flags::*;
pub use limits::{SpeedLimits, TrackLimits};
pub use params::Params;
pub use segment::*;
pub use state::*;
use util::params::LoadError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tick period assumed when sizing the boundary velocities of a spline that
/// starts or ends stopped.
pub const SPLINE_NOMINAL_DT_S: f64 = 0.01;

/// Number of chords summed to estimate the length of a spline.
pub const SPLINE_ARC_LENGTH_STEPS: usize = 32;

/// Spline time overrun of the previous segment is carried into the next
/// spline only if it is less than this.
pub const SPLINE_TIME_OVERRUN_MAX: f64 = 0.1;

/// Maximum ratio of the sum of the boundary velocities of a spline to the
/// distance between its ends.
pub const SPLINE_VEL_SUM_MAX_RATIO: f64 = 4.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur in waypoint navigation.
#[derive(Debug, thiserror::Error)]
pub enum WpNavError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Could not open the archive: {0}")]
    ArchiveInitError(String),

    /// The segment is terrain relative but neither the terrain source nor the
    /// rangefinder could give the terrain height at the given horizontal
    /// position.
    #[error("Cannot resolve the terrain altitude at ({0:.1}, {1:.1}) cm")]
    AltitudeUnresolved(f64, f64)
}

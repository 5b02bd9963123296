//! Guidance flags and the guidance state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Persistent flags describing progress along the current segment.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GuidanceFlags {
    /// The vehicle is within the waypoint radius of the destination.
    /// Latches until the next segment.
    pub reached_destination: bool,

    /// The destination was reached, or for a fast waypoint the target is
    /// close enough to the end that the next segment can be started.
    pub waypoint_completed: bool,

    /// The segment replaced by the current one was completed when it was
    /// replaced.
    pub reached_previous_wpt: bool,

    /// The target has started slowing for the destination.
    pub slowing_down: bool,

    /// Set on a new segment and cleared after the first cycle on it, so
    /// controllers can ignore the feed forward step.
    pub new_destination: bool,

    /// The vehicle should not stop at the destination.
    pub fast_waypoint: bool,

    /// Commands are to be run between this segment and the next, so
    /// the next segment starts from a stop.
    pub do_cmds_before_next_nav: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Overall guidance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GuidanceState {
    /// No segment is set
    Idle,

    /// Moving the target along the segment
    Tracking,

    /// The target is slowing for the destination
    Slowing,

    /// The destination has been reached
    Arrived
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GuidanceFlags {
    /// Update the flags for the start of a new segment.
    ///
    /// `replacing_segment` should be true if a segment was active when the
    /// new one was set.
    pub fn start_segment(&mut self, replacing_segment: bool) {
        *self = Self {
            reached_previous_wpt: replacing_segment && self.waypoint_completed,
            new_destination: true,
            do_cmds_before_next_nav: self.do_cmds_before_next_nav,
            ..Self::default()
        };
    }

    /// Mark the destination as reached.
    pub fn arrive(&mut self) {
        self.reached_destination = true;
        self.waypoint_completed = true;
    }
}

impl Default for GuidanceState {
    fn default() -> Self {
        GuidanceState::Idle
    }
}

impl GuidanceState {
    /// Work out the state after a cycle with the given flags, logging any
    /// change.
    pub fn next(self, flags: &GuidanceFlags) -> Self {
        let next = match self {
            GuidanceState::Idle => GuidanceState::Idle,
            GuidanceState::Arrived => GuidanceState::Arrived,
            GuidanceState::Tracking | GuidanceState::Slowing => {
                if flags.reached_destination {
                    GuidanceState::Arrived
                }
                else if flags.slowing_down {
                    GuidanceState::Slowing
                }
                else {
                    GuidanceState::Tracking
                }
            }
        };

        if next != self {
            info!("Guidance state {:?} -> {:?}", self, next);
        }

        next
    }
}

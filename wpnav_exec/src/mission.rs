//! # Mission
//!
//! An ordered list of navigation legs, started one after another on the
//! waypoint navigation module as each waypoint is completed.
//!
//! Leg indices are the mission's navigation command indices, so the failsafe
//! can insert resume points into the list.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Internal
use crate::failsafe::{FailsafeError, MissionStore, ResumePoint};
use crate::wp_nav::{SplineEnd, WpNav, WpNavError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single leg of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub kind: LegKind,

    pub destination_cm: [f64; 3],

    /// Destination altitude is above terrain rather than the origin
    #[serde(default)]
    pub terrain_alt: bool,

    /// Pass through the destination without stopping
    #[serde(default)]
    pub fast: bool,

    /// Run the sprayer along this leg
    #[serde(default)]
    pub spray: bool
}

#[derive(Debug, Clone)]
pub struct Mission {
    legs: Vec<Leg>,

    /// Index of the leg being flown, `None` before the mission starts
    current: Option<usize>,

    /// Index of the last leg which was completed
    prev: Option<usize>,

    max_legs: usize
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    Straight,
    Spline
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Leg {
    pub fn destination(&self) -> Vector3<f64> {
        Vector3::from(self.destination_cm)
    }
}

impl Mission {
    pub fn new(legs: Vec<Leg>, max_legs: usize) -> Self {
        Self {
            legs,
            current: None,
            prev: None,
            max_legs
        }
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn current_leg(&self) -> Option<&Leg> {
        self.current.and_then(|i| self.legs.get(i))
    }

    /// Start the next leg on the navigation module.
    ///
    /// Returns `Ok(false)` once there are no more legs to fly. If the leg
    /// cannot be started the mission does not advance, so the call can be
    /// retried.
    pub fn start_next(&mut self, nav: &mut WpNav) -> Result<bool, WpNavError> {
        let next = self.current.map_or(0, |i| i + 1);

        let leg = match self.legs.get(next) {
            Some(l) => *l,
            None => {
                if let Some(i) = self.current.take() {
                    self.prev = Some(i);
                }
                return Ok(false)
            }
        };

        match leg.kind {
            LegKind::Straight => {
                nav.set_destination(leg.destination(), leg.terrain_alt)?;
                nav.set_fast_waypoint(leg.fast);
            },
            LegKind::Spline => {
                // Only carry speed in if the previous leg was flown through
                let stopped_at_start = match self.current_leg() {
                    Some(prev) => !prev.fast,
                    None => true
                };
                nav.set_spline_destination(
                    leg.destination(),
                    leg.terrain_alt,
                    stopped_at_start,
                    self.spline_end(next)
                )?;
            }
        }

        if let Some(i) = self.current {
            self.prev = Some(i);
        }
        self.current = Some(next);

        info!(
            "Starting leg {} of {}: {:?} to {:?}",
            next + 1, self.legs.len(), leg.kind, leg.destination_cm
        );

        Ok(true)
    }

    /// What follows the spline leg at `index`.
    fn spline_end(&self, index: usize) -> SplineEnd {
        let leg = match self.legs.get(index) {
            Some(l) => l,
            None => return SplineEnd::Stop
        };

        if !leg.fast {
            return SplineEnd::Stop
        }

        match self.legs.get(index + 1) {
            Some(n) if n.kind == LegKind::Straight => SplineEnd::Straight(n.destination()),
            Some(n) => SplineEnd::Spline(n.destination()),
            None => SplineEnd::Stop
        }
    }
}

impl MissionStore for Mission {
    fn prev_nav_index(&self) -> Option<usize> {
        self.prev
    }

    fn current_nav_index(&self) -> usize {
        self.current.unwrap_or(0)
    }

    fn num_commands(&self) -> usize {
        self.legs.len()
    }

    fn num_commands_max(&self) -> usize {
        self.max_legs
    }

    /// Insert the resume point as a straight leg, shifting the leg at `index`
    /// and those after it along by one.
    ///
    /// The leg being flown moves with the shift, so once it is interrupted
    /// the mission restarts from the resume point.
    fn insert_resume_point(&mut self, index: usize, point: &ResumePoint)
        -> Result<(), FailsafeError>
    {
        if index > self.legs.len() {
            return Err(FailsafeError::InsertRejected(format!(
                "index {} is past the end of the {} leg mission",
                index, self.legs.len()
            )))
        }
        if self.legs.len() >= self.max_legs {
            return Err(FailsafeError::InsertRejected("mission is full".into()))
        }

        self.legs.insert(index, Leg {
            kind: LegKind::Straight,
            destination_cm: [point.position_cm[0], point.position_cm[1], point.position_cm[2]],
            terrain_alt: point.frame.is_terrain(),
            fast: false,
            spray: point.was_spraying
        });

        // Resume by flying to the inserted leg next
        self.current = index.checked_sub(1);

        debug!("Mission now has {} legs", self.legs.len());

        Ok(())
    }
}

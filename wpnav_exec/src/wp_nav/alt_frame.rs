//! # Altitude frames
//!
//! Segment endpoints are either relative to the EKF origin or relative to the
//! terrain below the vehicle. Terrain-relative segments need the height of the
//! terrain (relative to the origin) every cycle, which comes from an external
//! terrain source or, failing that, from the rangefinder.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::{Vector2, Vector3};
use serde::Serialize;

// Internal
use super::{Params, WpNavError};
use util::maths::low_pass_alpha;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of terrain heights, for example a terrain database.
pub trait TerrainSource {
    /// Height of the terrain above the EKF origin at the given horizontal
    /// position, or `None` if the source has no data there.
    fn terrain_height_cm(&self, xy_cm: &Vector2<f64>) -> Option<f64>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single rangefinder sample.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RangefinderReading {
    /// A rangefinder is fitted and enabled
    pub available: bool,

    /// The reading is within range and fresh
    pub healthy: bool,

    /// Altitude above the terrain directly below the vehicle
    pub alt_cm: f64
}

/// Works out the terrain offset for terrain-relative segments.
#[derive(Debug, Default, Clone, Copy)]
pub struct AltFrameResolver {
    /// Filtered rangefinder terrain offset, `None` when the filter needs to
    /// be reseeded.
    rangefinder_offset_cm: Option<f64>,

    /// Last resolution failed, used to only warn on the first failure.
    failed: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Frame in which a segment's altitudes are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AltFrame {
    /// Altitudes are above the EKF origin
    AboveOrigin,

    /// Altitudes are above the terrain below the vehicle
    AboveTerrain
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AltFrame {
    pub fn from_terrain_alt(terrain_alt: bool) -> Self {
        if terrain_alt {
            AltFrame::AboveTerrain
        }
        else {
            AltFrame::AboveOrigin
        }
    }

    pub fn is_terrain(&self) -> bool {
        *self == AltFrame::AboveTerrain
    }
}

impl Default for AltFrame {
    fn default() -> Self {
        AltFrame::AboveOrigin
    }
}

impl AltFrameResolver {
    /// Height of the terrain under the vehicle relative to the EKF origin.
    ///
    /// The terrain source is tried first. If it has no data and the
    /// rangefinder is enabled and healthy the rangefinder gives the offset
    /// instead, low pass filtered at `rangefinder_filt_hz`. A `dt_s` of zero
    /// reseeds the filter with the raw value.
    pub fn terrain_offset_cm(
        &mut self,
        terrain: Option<&dyn TerrainSource>,
        rangefinder: &RangefinderReading,
        position_cm: &Vector3<f64>,
        dt_s: f64,
        params: &Params
    ) -> Result<f64, WpNavError> {
        let xy = Vector2::new(position_cm[0], position_cm[1]);

        if let Some(height_cm) = terrain.and_then(|t| t.terrain_height_cm(&xy)) {
            self.rangefinder_offset_cm = None;
            self.resolved();
            return Ok(height_cm)
        }

        if params.rangefinder_use && rangefinder.available && rangefinder.healthy {
            let raw_cm = position_cm[2] - rangefinder.alt_cm;
            let alpha = low_pass_alpha(dt_s, params.rangefinder_filt_hz);

            let filt_cm = match self.rangefinder_offset_cm {
                Some(prev) => prev + alpha * (raw_cm - prev),
                None => raw_cm
            };
            self.rangefinder_offset_cm = Some(filt_cm);
            self.resolved();
            return Ok(filt_cm)
        }

        self.rangefinder_offset_cm = None;
        if !self.failed {
            warn!(
                "Cannot resolve terrain altitude at ({:.1}, {:.1}) cm",
                xy[0], xy[1]
            );
            self.failed = true;
        }

        Err(WpNavError::AltitudeUnresolved(xy[0], xy[1]))
    }

    /// Forget the filter state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn resolved(&mut self) {
        if self.failed {
            debug!("Terrain altitude resolved again");
            self.failed = false;
        }
    }
}

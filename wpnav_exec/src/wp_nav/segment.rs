//! Segment definitions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::AltFrame;
use util::maths::{bearing_rad, norm_xy};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Segments shorter than this are treated as a single point.
pub const SEGMENT_LENGTH_MIN_CM: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A segment between two waypoints, with positions in the segment's altitude
/// frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub origin_cm: Vector3<f64>,
    pub destination_cm: Vector3<f64>,
    pub frame: AltFrame,
    pub kind: SegmentKind,

    /// Unit vector from origin to destination, zero for a degenerate
    /// segment
    pub unit: Vector3<f64>,

    /// Straight line length from origin to destination
    pub length_cm: f64,

    pub length_xy_cm: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentKind {
    Straight,
    Spline
}

/// What follows the end of a spline segment, which sets the velocity at its
/// destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplineEnd {
    /// The vehicle stops at the destination
    Stop,

    /// A straight segment to the given destination follows
    Straight(Vector3<f64>),

    /// A spline segment to the given destination follows
    Spline(Vector3<f64>)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Segment {
    pub fn new(
        origin_cm: Vector3<f64>,
        destination_cm: Vector3<f64>,
        frame: AltFrame,
        kind: SegmentKind
    ) -> Self {
        let delta = destination_cm - origin_cm;
        let length_cm = delta.norm();

        let unit = if length_cm >= SEGMENT_LENGTH_MIN_CM {
            delta / length_cm
        }
        else {
            Vector3::zeros()
        };

        Self {
            origin_cm,
            destination_cm,
            frame,
            kind,
            unit,
            length_cm,
            length_xy_cm: norm_xy(&delta)
        }
    }

    /// Origin and destination are the same point.
    pub fn is_degenerate(&self) -> bool {
        self.length_cm < SEGMENT_LENGTH_MIN_CM
    }

    /// Heading from the origin to the destination.
    pub fn heading_rad(&self) -> f64 {
        bearing_rad(&self.origin_cm, &self.destination_cm)
    }

    /// Move both ends of the segment by `offset_cm`.
    pub fn shift(&mut self, offset_cm: &Vector3<f64>) {
        self.origin_cm += offset_cm;
        self.destination_cm += offset_cm;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_geometry() {
        let seg = Segment::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(300.0, 400.0, 1200.0),
            AltFrame::AboveOrigin,
            SegmentKind::Straight
        );

        assert_eq!(seg.length_cm, 1300.0);
        assert_eq!(seg.length_xy_cm, 500.0);
        assert!((seg.unit.norm() - 1.0).abs() < 1e-12);
        assert!(!seg.is_degenerate());
    }

    #[test]
    fn test_degenerate() {
        let p = Vector3::new(5.0, 5.0, 5.0);
        let seg = Segment::new(p, p, AltFrame::AboveOrigin, SegmentKind::Straight);

        assert!(seg.is_degenerate());
        assert_eq!(seg.unit, Vector3::zeros());
    }
}

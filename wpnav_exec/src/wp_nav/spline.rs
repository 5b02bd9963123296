//! # Hermite splines
//!
//! A cubic Hermite spline joins an origin and a destination with given
//! boundary velocities. The curve is parameterised by `t` in `[0, 1]`; the
//! velocities passed in are derivatives with respect to `t`, not time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cubic Hermite spline in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HermiteSpline {
    coeffs: [Vector3<f64>; 4]
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HermiteSpline {
    pub fn new(
        origin: &Vector3<f64>,
        destination: &Vector3<f64>,
        origin_vel: &Vector3<f64>,
        destination_vel: &Vector3<f64>
    ) -> Self {
        let (o, d) = (*origin, *destination);
        let (v0, v1) = (*origin_vel, *destination_vel);

        Self {
            coeffs: [
                o,
                v0,
                o * -3.0 - v0 * 2.0 + d * 3.0 - v1,
                o * 2.0 + v0 - d * 2.0 + v1
            ]
        }
    }

    /// Position at parameter `t`.
    pub fn position(&self, t: f64) -> Vector3<f64> {
        let c = &self.coeffs;
        c[0] + c[1] * t + c[2] * t.powi(2) + c[3] * t.powi(3)
    }

    /// Derivative of the position with respect to `t`.
    pub fn velocity(&self, t: f64) -> Vector3<f64> {
        let c = &self.coeffs;
        c[1] + c[2] * (2.0 * t) + c[3] * (3.0 * t.powi(2))
    }

    /// Estimate the length of the curve by summing `steps` chords.
    pub fn arc_length_estimate(&self, steps: usize) -> f64 {
        let steps = steps.max(1);
        let mut length = 0.0;
        let mut prev = self.position(0.0);

        for i in 1..=steps {
            let p = self.position(i as f64 / steps as f64);
            length += (p - prev).norm();
            prev = p;
        }

        length
    }
}

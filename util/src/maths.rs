//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use num_traits::Float;

/// A full turn in radians, `acos(-1)` being pi.
fn tau<T: Float>() -> T {
    (-T::one()).acos() * (T::one() + T::one())
}

/// Square root which returns zero for negative (or NaN) inputs rather than
/// NaN.
pub fn safe_sqrt<T>(value: T) -> T
where
    T: Float
{
    let ret = value.sqrt();

    if ret.is_nan() {
        T::zero()
    }
    else {
        ret
    }
}

/// Wrap an angle into the range [-pi, pi].
pub fn wrap_pi(angle: f64) -> f64 {
    angle.sin().atan2(angle.cos())
}

/// Map a value in the range [-pi, pi] to [0, 2pi]
pub fn map_pi_to_2pi<T>(value: T) -> T 
where
    T: Float
{
    let tau_t: T = tau();

    if value < T::zero() {
        return tau_t + value;
    }
    else {
        return value;
    }
}

/// Horizontal bearing from one NEU point to another, in radians in the range
/// [0, 2pi], measured from north (+x) towards east (+y).
pub fn bearing_rad(from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
    heading_of(to[0] - from[0], to[1] - from[1])
}

/// Heading of the horizontal vector (north, east) in the range [0, 2pi].
pub fn heading_of(north: f64, east: f64) -> f64 {
    map_pi_to_2pi(east.atan2(north))
}

/// Horizontal (xy) length of a vector.
pub fn norm_xy(vec: &Vector3<f64>) -> f64 {
    (vec[0] * vec[0] + vec[1] * vec[1]).sqrt()
}

/// Smoothing factor for a first order low pass filter with the given cutoff
/// frequency, sampled every `dt_s` seconds.
///
/// A non-positive cutoff disables the filter (factor of 1).
pub fn low_pass_alpha<T>(dt_s: T, cutoff_hz: T) -> T
where
    T: Float
{
    if cutoff_hz <= T::zero() || dt_s <= T::zero() {
        return T::one();
    }

    let tau_t: T = tau();
    let rc = T::one() / (tau_t * cutoff_hz);

    dt_s / (dt_s + rc)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_pi() {
        use std::f64::consts::{PI, TAU};

        assert!((wrap_pi(1.0) - 1.0).abs() < 1e-12);
        assert!((wrap_pi(TAU - 1.0) + 1.0).abs() < 1e-12);
        assert!((wrap_pi(-TAU - 0.5) + 0.5).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI).abs() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_safe_sqrt() {
        assert_eq!(safe_sqrt(4f64), 2f64);
        assert_eq!(safe_sqrt(-4f64), 0f64);
        assert_eq!(safe_sqrt(f64::NAN), 0f64);
    }

    #[test]
    fn test_bearing() {
        use std::f64::consts::{FRAC_PI_2, PI};

        let origin = Vector3::new(0.0, 0.0, 0.0);

        assert!((bearing_rad(&origin, &Vector3::new(100.0, 0.0, 50.0)) - 0.0).abs() < 1e-12);
        assert!((bearing_rad(&origin, &Vector3::new(0.0, 100.0, 0.0)) - FRAC_PI_2).abs() < 1e-12);
        assert!((bearing_rad(&origin, &Vector3::new(-100.0, 0.0, 0.0)) - PI).abs() < 1e-12);
        assert!((bearing_rad(&origin, &Vector3::new(0.0, -100.0, 0.0)) - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_low_pass_alpha() {
        assert_eq!(low_pass_alpha(0.01, 0.0), 1.0);
        assert_eq!(low_pass_alpha(0.0, 0.25), 1.0);

        let alpha = low_pass_alpha(0.01, 0.25);
        assert!(alpha > 0.0 && alpha < 0.02);
    }
}

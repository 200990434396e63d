//! Numeric helpers centralizing clamps, rounding, and safe casts.

use num_traits::cast::cast;

/// Clamp `value` into the range spanned by `min` and `max`, mapping NaN to
/// the lower bound.
///
/// Never panics: inverted bounds are swapped and a NaN bound is ignored.
/// Returns `0.0` only when every input is NaN.
#[must_use]
pub fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    let (lo, hi) = if min > max { (max, min) } else { (min, max) };
    let value = if value.is_nan() { lo } else { value };
    // f64::max/min return the non-NaN operand.
    let clamped = value.max(lo).min(hi);
    if clamped.is_nan() { 0.0 } else { clamped }
}

/// Round to `precision` decimal places.
#[must_use]
pub fn round_to(value: f64, precision: i32) -> f64 {
    let base = 10f64.powi(precision);
    (value * base).round() / base
}

/// Floor a f64 into a usize, returning 0 for negative or non-finite values.
#[must_use]
pub fn floor_f64_to_usize(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f64, usize>(value.floor()).unwrap_or(usize::MAX)
}

/// Round a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    cast::<f64, i64>(value.round()).unwrap_or(if value > 0.0 { i64::MAX } else { i64::MIN })
}

/// Convert a usize count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_maps_nan_to_lower_bound() {
        assert!((clamp_finite(f64::NAN, 0.5, 3.0) - 0.5).abs() < f64::EPSILON);
        assert!((clamp_finite(10.0, 0.5, 3.0) - 3.0).abs() < f64::EPSILON);
        assert!((clamp_finite(-1.0, 0.0, 100.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn clamp_tolerates_inverted_and_nan_bounds() {
        assert!((clamp_finite(0.5, 1.0, -1.0) - 0.5).abs() < f64::EPSILON);
        assert!((clamp_finite(5.0, 1.0, -1.0) - 1.0).abs() < f64::EPSILON);
        assert!((clamp_finite(f64::NAN, 1.0, -1.0) + 1.0).abs() < f64::EPSILON);
        assert!((clamp_finite(7.0, f64::NAN, 3.0) - 3.0).abs() < f64::EPSILON);
        assert!((clamp_finite(-7.0, 0.0, f64::NAN)).abs() < f64::EPSILON);
        assert!((clamp_finite(2.0, f64::NAN, f64::NAN) - 2.0).abs() < f64::EPSILON);
        assert!(clamp_finite(f64::NAN, f64::NAN, f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn round_to_one_decimal() {
        assert!((round_to(12.345, 1) - 12.3).abs() < 1e-9);
        assert!((round_to(12.35, 1) - 12.4).abs() < 1e-9);
        assert!((round_to(7.0, 1) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn floor_to_usize_handles_edges() {
        assert_eq!(floor_f64_to_usize(2.9), 2);
        assert_eq!(floor_f64_to_usize(-3.0), 0);
        assert_eq!(floor_f64_to_usize(f64::NAN), 0);
        assert_eq!(floor_f64_to_usize(f64::INFINITY), 0);
    }

    #[test]
    fn round_to_i64_is_saturating() {
        assert_eq!(round_f64_to_i64(70.5), 71);
        assert_eq!(round_f64_to_i64(f64::NAN), 0);
        assert_eq!(round_f64_to_i64(1e300), i64::MAX);
    }
}

//! Fixed-point helpers for power arithmetic.
//!
//! Per-channel powers arrive as decimal values already divided by the
//! datapoint's scale (e.g. 0.1 W). Summing them as `f64` leaks binary
//! representation error into published values (`79.8 - 37.1` is
//! `42.699999999999996`), so sums are taken back on the integer grid first.

/// Quantize `x` to an integer count of `1/scale` units, rounding to nearest
/// and clamping to the `i64` range. Non-finite values (NaN/±Inf) map to 0.
#[inline]
pub fn quantize(x: f64, scale: i64) -> i64 {
    if !x.is_finite() {
        return 0;
    }
    clamp_to_i64((x * scale.max(1) as f64).round())
}

/// Sum two decimal values on the `1/scale` grid: scale both operands, add,
/// round to the nearest integer, divide back.
#[inline]
pub fn sum_at_scale(a: f64, b: f64, scale: i64) -> f64 {
    let scale = scale.max(1);
    if !a.is_finite() || !b.is_finite() {
        return (quantize(a, scale).saturating_add(quantize(b, scale))) as f64 / scale as f64;
    }
    let s = scale as f64;
    clamp_to_i64((a * s + b * s).round()) as f64 / s
}

#[inline]
fn clamp_to_i64(v: f64) -> i64 {
    if v >= i64::MAX as f64 {
        i64::MAX
    } else if v <= i64::MIN as f64 {
        i64::MIN
    } else {
        v as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_is_exact_at_tenths() {
        assert_eq!(sum_at_scale(79.8, -37.1, 10), 42.7);
        assert_ne!(79.8 + -37.1, 42.7);
    }

    #[test]
    fn sum_handles_signs_and_zero() {
        assert_eq!(sum_at_scale(0.0, 0.0, 10), 0.0);
        assert_eq!(sum_at_scale(-0.1, -0.2, 10), -0.3);
        assert_eq!(sum_at_scale(1234.5, 0.5, 10), 1235.0);
    }

    #[test]
    fn quantize_clamps_and_zeroes_non_finite() {
        assert_eq!(quantize(f64::NAN, 10), 0);
        assert_eq!(quantize(f64::INFINITY, 10), 0);
        assert_eq!(quantize(1e300, 10), i64::MAX);
        assert_eq!(quantize(-1e300, 10), i64::MIN);
        assert_eq!(quantize(0.05, 10), 1);
    }

    #[test]
    fn non_positive_scale_is_treated_as_one() {
        assert_eq!(sum_at_scale(1.4, 1.4, 0), 3.0);
    }
}

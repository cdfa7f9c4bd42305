use crate::EpkeError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, EpkeError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(EpkeError::NonFinite { what, value: v })
    }
}

/// Significant digits written for time values.
pub const TIME_DIGITS: usize = 6;

/// Significant digits written for power, reactivity and concentrations.
pub const STATE_DIGITS: usize = 12;

/// Round `v` to `digits` significant decimal digits.
///
/// Non-finite values and zero pass through untouched. `digits` is clamped to
/// `1..=17`, the range that is meaningful for an `f64`.
pub fn round_significant(v: Real, digits: usize) -> Real {
    if !v.is_finite() || v == 0.0 {
        return v;
    }
    let digits = digits.clamp(1, 17);
    // Scientific formatting rounds the mantissa exactly once.
    format!("{:.*e}", digits - 1, v).parse().unwrap_or(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn round_significant_time_and_state() {
        assert_eq!(round_significant(0.123_456_789, TIME_DIGITS), 0.123457);
        assert_eq!(round_significant(1234.567_89, TIME_DIGITS), 1234.57);
        assert_eq!(
            round_significant(1.034_900_023_416_068_1, STATE_DIGITS),
            1.034_900_023_42
        );
        assert_eq!(round_significant(-9.053_073_024_368_39e-5, 4), -9.053e-5);
    }

    #[test]
    fn round_significant_passthrough() {
        assert_eq!(round_significant(0.0, 6), 0.0);
        assert!(round_significant(Real::NAN, 6).is_nan());
        assert_eq!(round_significant(Real::INFINITY, 6), Real::INFINITY);
    }
}

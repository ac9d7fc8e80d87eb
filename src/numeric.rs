#![allow(clippy::approx_constant)]
//! Floating point helpers built on the approx crate. Compartment values are fractions of the
//! population, so all comparisons here are absolute.

use approx::AbsDiffEq;

/// Slack allowed when checking that compartment fractions stay inside the unit simplex.
pub const COMPARTMENT_TOLERANCE: f64 = 1e-9;

/// Compares if two floats are close via `approx::abs_diff_eq` using a maximum absolute difference
/// (epsilon) of `acc`.
#[must_use]
pub fn almost_eq(a: f64, b: f64, acc: f64) -> bool {
    if a.is_infinite() && b.is_infinite() {
        return a == b;
    }
    a.abs_diff_eq(&b, acc)
}

/// Returns true if `value` lies in `[0, 1]` up to `acc`.
#[must_use]
pub fn is_fraction(value: f64, acc: f64) -> bool {
    value.is_finite() && value >= -acc && value <= 1.0 + acc
}

/// Asserts that two floats are within `acc` of each other.
#[macro_export]
macro_rules! assert_almost_eq {
    ($a:expr, $b:expr, $acc:expr) => {{
        let (a, b, acc) = ($a, $b, $acc);
        assert!(
            $crate::numeric::almost_eq(a, b, acc),
            "assertion failed: `{} ≈ {}` (tolerance {})",
            a,
            b,
            acc
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn almost_eq_within_tolerance() {
        assert!(almost_eq(1.0, 1.0 + 0.5e-11, 1e-10));
    }

    #[test]
    fn almost_eq_outside_tolerance() {
        assert!(!almost_eq(1.0, 1.0 + 2e-10, 1e-10));
    }

    #[test]
    fn almost_eq_infinities() {
        assert!(almost_eq(f64::INFINITY, f64::INFINITY, 1e-10));
        assert!(!almost_eq(f64::INFINITY, f64::NEG_INFINITY, 1e-10));
    }

    #[test]
    fn fraction_bounds() {
        assert!(is_fraction(0.0, COMPARTMENT_TOLERANCE));
        assert!(is_fraction(1.0, COMPARTMENT_TOLERANCE));
        assert!(is_fraction(-1e-12, COMPARTMENT_TOLERANCE));
        assert!(!is_fraction(-1e-6, COMPARTMENT_TOLERANCE));
        assert!(!is_fraction(1.0 + 1e-6, COMPARTMENT_TOLERANCE));
        assert!(!is_fraction(f64::NAN, COMPARTMENT_TOLERANCE));
    }

    #[test]
    fn assert_almost_eq_macro_passes() {
        assert_almost_eq!(3.14159265, 3.14159264, 1e-7);
    }
}

//! Floating-point comparison in units of machine epsilon.

use ql_core::Real;

const DEFAULT_ULPS: u32 = 42;

/// `a` and `b` agree to within `n` relative machine epsilons of *both*
/// magnitudes.  Against zero the test is absolute, on `(n·ε)²`.
#[inline]
pub fn close_n(a: Real, b: Real, n: u32) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let tolerance = n as Real * Real::EPSILON;
    if a * b == 0.0 {
        return diff < tolerance * tolerance;
    }
    diff <= tolerance * a.abs() && diff <= tolerance * b.abs()
}

/// [`close_n`] with the default tolerance of 42 ulps.
#[inline]
pub fn close(a: Real, b: Real) -> bool {
    close_n(a, b, DEFAULT_ULPS)
}

/// Like [`close_n`] but satisfied relative to *either* magnitude.
#[inline]
pub fn close_enough_n(a: Real, b: Real, n: u32) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let tolerance = n as Real * Real::EPSILON;
    if a * b == 0.0 {
        return diff < tolerance * tolerance;
    }
    diff <= tolerance * a.abs() || diff <= tolerance * b.abs()
}

/// [`close_enough_n`] with the default tolerance of 42 ulps.
#[inline]
pub fn close_enough(a: Real, b: Real) -> bool {
    close_enough_n(a, b, DEFAULT_ULPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_tolerance() {
        assert!(close(1.0, 1.0 + 10.0 * Real::EPSILON));
        assert!(!close(1.0, 1.0 + 1e-12));
        assert!(close(1e20, 1e20 * (1.0 + 5.0 * Real::EPSILON)));
    }

    #[test]
    fn zero_is_compared_absolutely() {
        assert!(close(0.0, 1e-30));
        assert!(!close(0.0, 1e-20));
    }

    #[test]
    fn close_enough_is_looser() {
        // tolerance 2^-21: within it relative to b but not to a
        let n = 1 << 31;
        let (a, b) = (1.0 - Real::powi(2.0, -21), 1.0);
        assert!(!close_n(a, b, n));
        assert!(close_enough_n(a, b, n));
        assert!(!close(1.0, 1.0 + 50.0 * Real::EPSILON));
        assert!(!close_enough(1.0, 1.0 + 50.0 * Real::EPSILON));
    }
}

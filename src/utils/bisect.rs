//! Bisection root search tolerant of flat zero regions.
//!
//! The delta functions of the discrete Poisson models are piecewise constant in
//! places and can be exactly zero across whole sub-intervals. Ordinary root
//! finders either stall on such plateaus or return an arbitrary point inside
//! them. The search here always keeps the sign of `f(a)` on the `a` side of the
//! bracket, so it returns the plateau edge nearest to the starting point `a`.

use crate::config::Tolerance;
use crate::error::{Result, UnifiedCiError};

/// Three-valued sign, with zero as its own class.
fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Bisection search for a root of `f` in the interval spanned by `a` and `b`.
///
/// If there is a sub-interval where `f(x) == 0`, the edge nearest to `a` is
/// returned. Extra arguments of `f` are captured by the closure.
///
/// # Arguments
///
/// * `f` - Scalar function to search
/// * `a`, `b` - Initial bracket; `f(a)` and `f(b)` must have different signs
/// * `tolerance` - Convergence is assumed once `|a - b| <= xtol` or `|f(a) - f(b)| <= ftol`
///
/// # Returns
///
/// * The final bracket edge on the `a` side
pub fn bisect<F>(mut f: F, a: f64, b: f64, tolerance: Tolerance) -> Result<f64>
where
    F: FnMut(f64) -> f64,
{
    try_bisect(|x| Ok(f(x)), a, b, tolerance)
}

/// Bisection search for a fallible scalar function.
///
/// Behaves like [`bisect`], but propagates the first error returned by `f`.
pub fn try_bisect<F>(mut f: F, a: f64, b: f64, tolerance: Tolerance) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    let mut a = a;
    let mut b = b;
    let mut fa = f(a)?;
    let mut fb = f(b)?;

    if fa.is_nan() || fb.is_nan() || sign(fa) == sign(fb) {
        return Err(UnifiedCiError::InvalidBracket { a, fa, b, fb });
    }

    while (a - b).abs() > tolerance.xtol && (fa - fb).abs() > tolerance.ftol {
        let t = 0.5 * (a + b);
        // Bracket can no longer be split in floating point.
        if t == a || t == b {
            break;
        }

        let ft = f(t)?;
        if sign(ft) == sign(fa) {
            a = t;
            fa = ft;
        } else {
            b = t;
            fb = ft;
        }
    }

    Ok(a)
}

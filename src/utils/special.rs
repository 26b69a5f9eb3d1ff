//! Distribution functions used by the critical value constructions.
//!
//! Thin wrappers over the special functions in `statrs`. The chi-squared
//! distribution with one degree of freedom is expressed through the error
//! function directly, which keeps its quantile exact instead of relying on a
//! generic numerical inversion.

use std::f64::consts::SQRT_2;

use statrs::function::erf::{erf, erf_inv, erfc};
use statrs::function::gamma::{gamma_lr, ln_gamma};

use crate::error::{Result, UnifiedCiError};

/// Hard cap on the count support searched by [`poisson_minor_isf`].
const MAX_POISSON_SUPPORT: u64 = 10_000_000;

/// Poisson probability mass `P(N = k)` for expectation `mu`.
pub fn poisson_pmf(k: u64, mu: f64) -> f64 {
    if mu == 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    let k = k as f64;
    (k * mu.ln() - ln_gamma(k + 1.0) - mu).exp()
}

/// Poisson upper tail probability `SF(n) = P(N > n)`.
pub fn poisson_sf(n: u64, mu: f64) -> f64 {
    if mu == 0.0 {
        return 0.0;
    }
    gamma_lr(n as f64 + 1.0, mu)
}

/// Poisson "minor" inverse survival function.
///
/// Returns the smallest count `n` whose upper tail probability `P(N > n)` is
/// less than or equal to `q_upper`.
pub fn poisson_minor_isf(q_upper: f64, mu: f64) -> Result<u64> {
    if !(q_upper > 0.0) {
        return Err(UnifiedCiError::InvalidParameter(format!(
            "upper tail probability must be positive, got {}",
            q_upper
        )));
    }

    // The tail below the mean never satisfies a small bound; start there.
    let start = mu.floor() as u64;
    let mut n = if poisson_sf(start, mu) > q_upper { start } else { 0 };
    while poisson_sf(n, mu) > q_upper {
        n += 1;
        if n > MAX_POISSON_SUPPORT {
            return Err(UnifiedCiError::ComputationError(format!(
                "no Poisson quantile for tail {} below {} (mu={})",
                q_upper, MAX_POISSON_SUPPORT, mu
            )));
        }
    }
    Ok(n)
}

/// Normal cumulative distribution function.
pub fn normal_cdf(x: f64, mu: f64, sigma: f64) -> f64 {
    0.5 * erfc(-(x - mu) / (sigma * SQRT_2))
}

/// Cumulative distribution function of chi-squared with one degree of freedom.
pub fn chi2_1_cdf(l: f64) -> f64 {
    if l <= 0.0 {
        return 0.0;
    }
    erf((0.5 * l).sqrt())
}

/// Quantile function of chi-squared with one degree of freedom.
pub fn chi2_1_ppf(p: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&p) {
        return Err(UnifiedCiError::InvalidProbability(p));
    }
    let z = SQRT_2 * erf_inv(p);
    Ok(z * z)
}

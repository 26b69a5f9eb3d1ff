//! Statistical models with unified confidence intervals.
//!
//! Each model provides the same set of operations: a positive-constrained best
//! fit, the likelihood ratio of a trial value, its critical value at a given
//! confidence level, and the interval limits assembled from those.
//!
//! - [`gaussian`]: mean of a Gaussian with *known* variance, constrained to `mu >= 0`
//! - [`poisson`]: Poisson signal with *known* background
//! - [`hybrid`]: Poisson signal with *unknown* background, estimated from a
//!   companion region by hybrid resampling

pub mod gaussian;
pub mod hybrid;
pub mod poisson;

// Re-export the models
pub use gaussian::{GaussianDelta, SimpleGaussian};
pub use hybrid::{HybridDelta, HybridPoisson};
pub use poisson::{PoissonDelta, RankedOutcome, SimplePoisson};

use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::error::{Result, UnifiedCiError};

/// `ln((num / den)^k)`, defined as 0 for `k == 0` even when the ratio is not finite.
pub(crate) fn ln_ratio_pow(num: f64, den: f64, k: u64) -> f64 {
    if k == 0 {
        0.0
    } else {
        k as f64 * (num.ln() - den.ln())
    }
}

/// Draw one Poisson count with expectation `mu`.
pub(crate) fn sample_poisson<R>(mu: f64, rng: &mut R) -> Result<u64>
where
    R: Rng + ?Sized,
{
    if mu == 0.0 {
        return Ok(0);
    }
    let poisson =
        Poisson::new(mu).map_err(|e| UnifiedCiError::Distribution(format!("Poisson({}): {}", mu, e)))?;
    let k: f64 = poisson.sample(rng);
    Ok(k as u64)
}

/// Draw `size` Poisson counts with expectation `mu`.
pub(crate) fn sample_poisson_n<R>(mu: f64, size: usize, rng: &mut R) -> Result<Vec<u64>>
where
    R: Rng + ?Sized,
{
    if mu == 0.0 {
        return Ok(vec![0; size]);
    }
    let poisson =
        Poisson::new(mu).map_err(|e| UnifiedCiError::Distribution(format!("Poisson({}): {}", mu, e)))?;
    Ok((0..size)
        .map(|_| {
            let k: f64 = poisson.sample(rng);
            k as u64
        })
        .collect())
}

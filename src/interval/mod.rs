//! # Interval Assembly
//!
//! Every model reduces a measurement to a *delta function* of the trial signal
//! value `theta`: positive where `theta` is accepted at the requested confidence
//! level, negative where it is rejected. The limits of the unified confidence
//! interval are the sign changes of this function.
//!
//! The search has the same shape for all models:
//!
//! 1. Start at the positive-constrained best fit.
//! 2. Lower limit: zero if the best fit is zero or zero itself is accepted;
//!    otherwise bisect from the best fit towards zero, so that plateaus of the
//!    discrete models resolve to their inner edge.
//! 3. Upper limit: widen a bracket above the best fit until the delta function
//!    rejects, then bisect inside it.
//!
//! Monte Carlo delta functions widen the upper bracket at the cheaper
//! [`IntervalConfig::coarse_mc`] precision and bisect at their full precision.
//! If the coarse bracket does not straddle the limit at full precision, the
//! bracket is grown again from the best fit at full precision.

mod cache;

pub use cache::DeltaCache;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::IntervalConfig;
use crate::error::{Result, UnifiedCiError};
use crate::utils::try_bisect;

/// A confidence interval for the signal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower limit
    pub lower: f64,

    /// Upper limit
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Create a new interval.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Returns true if `theta` lies inside the closed interval.
    pub fn contains(&self, theta: f64) -> bool {
        self.lower <= theta && theta <= self.upper
    }

    /// Width of the interval.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Returns true if this interval lies inside `other`.
    pub fn is_within(&self, other: &ConfidenceInterval) -> bool {
        other.lower <= self.lower && self.upper <= other.upper
    }
}

impl From<ConfidenceInterval> for (f64, f64) {
    fn from(ci: ConfidenceInterval) -> Self {
        (ci.lower, ci.upper)
    }
}

/// The "likelihood ratio versus critical value" function of one measurement.
///
/// Implementations are positive for accepted trial values. The bracket methods
/// have defaults suited to Poisson rates; models with a natural scale override
/// them.
pub trait DeltaFunction {
    /// The positive-constrained best-fit signal value.
    fn best_fit(&self) -> f64;

    /// Evaluate the delta function at `theta`.
    fn delta(&mut self, theta: f64) -> Result<f64>;

    /// Monte Carlo precision of the critical values, used as part of the cache key.
    ///
    /// Zero for exactly computed critical values.
    fn precision(&self) -> usize {
        0
    }

    /// Evaluate the delta function at `theta` with `precision` toy experiments.
    ///
    /// Exact delta functions ignore the precision.
    fn delta_at(&mut self, theta: f64, _precision: usize) -> Result<f64> {
        self.delta(theta)
    }

    /// Whether the upper bracket growth should continue past a trial value with this delta.
    fn accepts(&self, delta: f64) -> bool {
        delta > 0.0
    }

    /// Initial bracket `(u, v)` for the upper limit search.
    fn initial_upper_bracket(&self) -> (f64, f64) {
        let u = self.best_fit();
        (u, f64::max(1.0, 2.0 * u))
    }

    /// Next bracket after `v` turned out to be accepted.
    fn widen_upper_bracket(&self, _u: f64, v: f64) -> (f64, f64) {
        (v, 2.0 * v)
    }
}

/// Evaluate `delta` at `theta` through the cache.
pub fn cached_delta<D>(delta: &mut D, cache: &mut DeltaCache, theta: f64) -> Result<f64>
where
    D: DeltaFunction + ?Sized,
{
    let precision = delta.precision();
    cache.get_or_try_insert_with(theta, precision, || delta.delta(theta))
}

/// Evaluate `delta` at `theta` with the given precision through the cache.
pub fn cached_delta_at<D>(delta: &mut D, cache: &mut DeltaCache, theta: f64, precision: usize) -> Result<f64>
where
    D: DeltaFunction + ?Sized,
{
    if precision >= delta.precision() {
        return cached_delta(delta, cache, theta);
    }
    cache.get_or_try_insert_with(theta, precision, || delta.delta_at(theta, precision))
}

/// Precision used to widen the upper bracket of `delta`.
pub fn coarse_precision<D>(delta: &D, config: &IntervalConfig) -> usize
where
    D: DeltaFunction + ?Sized,
{
    let full = delta.precision();
    if config.coarse_mc == 0 {
        full
    } else {
        full.min(config.coarse_mc)
    }
}

/// Calculate the lower limit of the confidence interval.
///
/// # Arguments
///
/// * `delta` - The delta function of the measurement
/// * `cache` - Cache shared by the searches of one interval computation
/// * `config` - Bisection tolerances
pub fn lower_limit<D>(delta: &mut D, cache: &mut DeltaCache, config: &IntervalConfig) -> Result<f64>
where
    D: DeltaFunction + ?Sized,
{
    let best = delta.best_fit();
    if best == 0.0 || cached_delta(delta, cache, 0.0)? >= 0.0 {
        return Ok(0.0);
    }

    // Bisect from the best fit so a zero plateau yields its inner edge.
    try_bisect(|t| cached_delta(delta, cache, t), best, 0.0, config.tolerance)
}

/// Calculate the upper limit of the confidence interval.
///
/// # Arguments
///
/// * `delta` - The delta function of the measurement
/// * `cache` - Cache shared by the searches of one interval computation
/// * `config` - Bisection tolerances, growth iteration cap and coarse precision
pub fn upper_limit<D>(delta: &mut D, cache: &mut DeltaCache, config: &IntervalConfig) -> Result<f64>
where
    D: DeltaFunction + ?Sized,
{
    let coarse = coarse_precision(delta, config);
    let (u, v) = grow_upper_bracket(delta, cache, config)?;
    match try_bisect(|t| cached_delta(delta, cache, t), u, v, config.tolerance) {
        Err(UnifiedCiError::InvalidBracket { .. }) if coarse < delta.precision() => {
            debug!(u, v, coarse, "coarse bracket rejected at full precision");
            let (u, v) = regrow_upper_bracket(delta, cache, config, v)?;
            try_bisect(|t| cached_delta(delta, cache, t), u, v, config.tolerance)
        }
        result => result,
    }
}

/// Widen the upper bracket until its right edge is rejected.
///
/// Trial values are evaluated at [`coarse_precision`]. Fails with
/// [`UnifiedCiError::BoundSearchExhausted`] after `config.max_growth_steps`
/// widenings.
pub fn grow_upper_bracket<D>(
    delta: &mut D,
    cache: &mut DeltaCache,
    config: &IntervalConfig,
) -> Result<(f64, f64)>
where
    D: DeltaFunction + ?Sized,
{
    let precision = coarse_precision(delta, config);
    let (mut u, mut v) = delta.initial_upper_bracket();
    let mut steps = 0;

    loop {
        let value = cached_delta_at(delta, cache, v, precision)?;
        if !delta.accepts(value) {
            break;
        }
        if steps >= config.max_growth_steps || !v.is_finite() {
            return Err(UnifiedCiError::BoundSearchExhausted { steps, last: v });
        }
        let (next_u, next_v) = delta.widen_upper_bracket(u, v);
        u = next_u;
        v = next_v;
        steps += 1;
    }

    debug!(u, v, steps, precision, "upper limit bracket found");
    Ok((u, v))
}

/// Grow the right edge from `v` at full precision, keeping the best fit as the left edge.
fn regrow_upper_bracket<D>(
    delta: &mut D,
    cache: &mut DeltaCache,
    config: &IntervalConfig,
    v: f64,
) -> Result<(f64, f64)>
where
    D: DeltaFunction + ?Sized,
{
    let u = delta.best_fit();
    let mut v = v;
    let mut steps = 0;

    loop {
        let value = cached_delta(delta, cache, v)?;
        if !delta.accepts(value) {
            break;
        }
        if steps >= config.max_growth_steps || !v.is_finite() {
            return Err(UnifiedCiError::BoundSearchExhausted { steps, last: v });
        }
        v = delta.widen_upper_bracket(u, v).1;
        steps += 1;
    }

    debug!(u, v, steps, "upper limit bracket regrown");
    Ok((u, v))
}

/// Calculate both limits, sharing one cache between the two searches.
pub fn confidence_interval<D>(delta: &mut D, config: &IntervalConfig) -> Result<ConfidenceInterval>
where
    D: DeltaFunction + ?Sized,
{
    let mut cache = DeltaCache::new();
    let lower = lower_limit(delta, &mut cache, config)?;
    let upper = upper_limit(delta, &mut cache, config)?;
    debug!(
        lower,
        upper,
        evaluations = cache.len(),
        cache_hits = cache.hits(),
        "confidence interval assembled"
    );
    Ok(ConfidenceInterval::new(lower, upper))
}

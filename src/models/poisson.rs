//! Poisson unified confidence intervals with *known* background.
//!
//! Estimates confidence intervals for the expectation value `theta` of a
//! Poisson distributed signal on top of a known background rate `b`, using
//! critical values for the likelihood ratio.
//!
//! The critical value is constructed exactly: the outcomes of
//! `Poisson(b + theta)` are ranked by their likelihood ratio and the least
//! likely ones are excluded until the excluded probability would exceed
//! `alpha`. The discreteness of the counts makes the resulting delta function
//! piecewise constant, so the interval search relies on plateau-aware bisection.

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ln_ratio_pow, sample_poisson_n};
use crate::config::{DegeneracyPolicy, IntervalConfig};
use crate::error::{self, Result, UnifiedCiError};
use crate::interval::{self, ConfidenceInterval, DeltaCache, DeltaFunction};
use crate::utils::conservative_quantile;
use crate::utils::special::{poisson_minor_isf, poisson_pmf, poisson_sf};

/// The positive-confined best fit for the Poisson signal parameter.
pub fn fit_theta(n: u64, b: f64) -> f64 {
    f64::max(0.0, n as f64 - b)
}

/// Tail mass, relative to `alpha`, below which the truncated support stops growing.
const TAIL_EPSILON: f64 = 1e-12;

/// The likelihood ratio of signal value `t` for background `b` and measurement `n`.
///
/// Evaluated in log space, so large counts underflow to zero instead of
/// turning into `0 * inf`.
pub fn likelihood_ratio(n: u64, b: f64, t: f64) -> f64 {
    let t_fit = fit_theta(n, b);
    (ln_ratio_pow(t + b, t_fit + b, n) + t_fit - t).exp()
}

/// One entry of the likelihood ratio ranking of the count support.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedOutcome {
    /// The observed count, or the last explicit count for the tail entry
    pub count: u64,

    /// Probability mass of the outcome
    pub probability: f64,

    /// Likelihood ratio of the outcome
    pub likelihood_ratio: f64,

    /// Whether this entry aggregates all counts above `count`
    pub tail: bool,
}

/// Rank the outcomes of `Poisson(b + t)` by ascending likelihood ratio.
///
/// The support is truncated at `n_max`, chosen so that the tail probability
/// `P(N > n_max)` is below `min(alpha, P(N = 0))`, floored at a tiny fraction
/// of `alpha` so that a vanishing `P(N = 0)` cannot stall the search. The tail
/// is kept as one aggregate entry represented by the count `n_max + 1`, and
/// `n_max` keeps growing until that entry ranks below every explicit count or
/// its mass becomes negligible.
///
/// # Arguments
///
/// * `b` - Background rate
/// * `t` - Signal rate
/// * `alpha` - Significance level
///
/// # Returns
///
/// * The outcomes sorted by likelihood ratio, least likely first
pub fn ranked_outcomes(b: f64, t: f64, alpha: f64) -> Result<Vec<RankedOutcome>> {
    error::check_non_negative("b", b)?;
    error::check_non_negative("theta", t)?;
    error::check_alpha(alpha)?;

    let mu = b + t;
    if mu == 0.0 {
        // Every measurement is zero.
        return Ok(vec![RankedOutcome {
            count: 0,
            probability: 1.0,
            likelihood_ratio: 1.0,
            tail: false,
        }]);
    }

    let p_thresh = f64::max(f64::min(alpha, poisson_pmf(0, mu)), alpha * TAIL_EPSILON);
    let mut n_max = poisson_minor_isf(p_thresh, mu)? + 1;

    let outcome = |n: u64| RankedOutcome {
        count: n,
        probability: poisson_pmf(n, mu),
        likelihood_ratio: likelihood_ratio(n, b, t),
        tail: false,
    };
    let mut outcomes = Vec::with_capacity(n_max as usize + 2);
    outcomes.extend((0..=n_max).map(&outcome));

    // Above the mode the ratios fall with the count, so the tail ratio bounds
    // every count it stands for once it drops below the explicit ones.
    let mut lowest = outcomes
        .iter()
        .map(|o| o.likelihood_ratio)
        .fold(f64::INFINITY, f64::min);
    while likelihood_ratio(n_max + 1, b, t) > lowest && poisson_sf(n_max, mu) > alpha * TAIL_EPSILON {
        n_max += 1;
        let next = outcome(n_max);
        lowest = lowest.min(next.likelihood_ratio);
        outcomes.push(next);
    }

    outcomes.insert(
        0,
        RankedOutcome {
            count: n_max,
            probability: poisson_sf(n_max, mu),
            likelihood_ratio: likelihood_ratio(n_max + 1, b, t),
            tail: true,
        },
    );

    // Stable sort keeps the tail first among equal ratios.
    outcomes.sort_by(|x, y| x.likelihood_ratio.total_cmp(&y.likelihood_ratio));
    Ok(outcomes)
}

/// Calculate the critical likelihood ratio value.
///
/// The critical value is defined by `Prob{L < L_crit; t} <= alpha`.
pub fn critical_value(b: f64, t: f64, alpha: f64) -> Result<f64> {
    critical_value_with(b, t, alpha, DegeneracyPolicy::default())
}

/// Calculate the critical likelihood ratio value with an explicit degeneracy policy.
///
/// Probability is accumulated along the ranking until it reaches `alpha`; the
/// critical value is the likelihood ratio of the outcome ranked just before.
/// If the very first outcome already reaches `alpha` there is nothing to back
/// up to, and `policy` decides between accepting every outcome (slight
/// overcoverage) and [`UnifiedCiError::RankingInvariant`]. Accepting returns
/// the largest value strictly below the first ratio, so the delta of that
/// outcome stays positive.
pub fn critical_value_with(b: f64, t: f64, alpha: f64, policy: DegeneracyPolicy) -> Result<f64> {
    let outcomes = ranked_outcomes(b, t, alpha)?;
    if b + t == 0.0 {
        // Nothing can be excluded; only the count zero is accepted.
        return Ok(1.0);
    }
    critical_from_ranking(&outcomes, b, t, alpha, policy)
}

fn critical_from_ranking(
    outcomes: &[RankedOutcome],
    b: f64,
    t: f64,
    alpha: f64,
    policy: DegeneracyPolicy,
) -> Result<f64> {
    let mut p_cum = 0.0;
    for (i, outcome) in outcomes.iter().enumerate() {
        p_cum += outcome.probability;
        if p_cum >= alpha {
            if i > 0 {
                return Ok(outcomes[i - 1].likelihood_ratio);
            }
            return match policy {
                DegeneracyPolicy::AcceptOvercoverage => {
                    warn!(
                        b,
                        theta = t,
                        alpha,
                        "first ranked outcome exceeds alpha, accepting overcoverage"
                    );
                    Ok(next_below(outcome.likelihood_ratio))
                }
                DegeneracyPolicy::Fail => Err(UnifiedCiError::RankingInvariant { b, theta: t, alpha }),
            };
        }
    }

    Err(UnifiedCiError::ComputationError(format!(
        "ranked probability {} never reached alpha={} (b={} theta={})",
        p_cum, alpha, b, t
    )))
}

/// The largest float strictly below a positive finite `x`.
fn next_below(x: f64) -> f64 {
    if x > 0.0 && x.is_finite() {
        f64::from_bits(x.to_bits() - 1)
    } else {
        x
    }
}

/// Estimate the critical value by Monte Carlo sampling.
///
/// Draws `n_mc` counts from `Poisson(b + t)` and takes the conservative upper
/// quantile of their likelihood ratios. Useful to cross-check [`critical_value`].
pub fn critical_value_mc<R>(b: f64, t: f64, alpha: f64, n_mc: usize, rng: &mut R) -> Result<f64>
where
    R: Rng + ?Sized,
{
    error::check_non_negative("b", b)?;
    error::check_non_negative("theta", t)?;
    error::check_alpha(alpha)?;

    let counts = sample_poisson_n(b + t, n_mc, rng)?;
    let ratios: Array1<f64> = counts.iter().map(|&n| likelihood_ratio(n, b, t)).collect();
    Ok(conservative_quantile(&ratios, -alpha)?.0)
}

/// Delta function `likelihood_ratio(t) - critical_value(t)` of one count.
#[derive(Debug, Clone)]
pub struct PoissonDelta {
    n: u64,
    b: f64,
    alpha: f64,
    policy: DegeneracyPolicy,
}

impl PoissonDelta {
    /// Create the delta function for count `n` over background `b`.
    pub fn new(n: u64, b: f64, clvl: f64, policy: DegeneracyPolicy) -> Result<Self> {
        error::check_non_negative("b", b)?;
        let alpha = error::significance(clvl)?;
        Ok(Self { n, b, alpha, policy })
    }
}

impl DeltaFunction for PoissonDelta {
    fn best_fit(&self) -> f64 {
        fit_theta(self.n, self.b)
    }

    fn delta(&mut self, t: f64) -> Result<f64> {
        let cv = critical_value_with(self.b, t, self.alpha, self.policy)?;
        Ok(likelihood_ratio(self.n, self.b, t) - cv)
    }

    // Zero plateaus belong to the acceptance region.
    fn accepts(&self, delta: f64) -> bool {
        delta >= 0.0
    }
}

/// Unified confidence intervals for a Poisson signal with known background.
#[derive(Debug, Clone)]
pub struct SimplePoisson {
    /// Background rate
    pub b: f64,

    /// Search configuration
    pub config: IntervalConfig,
}

impl SimplePoisson {
    /// Create a new model with the default configuration.
    pub fn new(b: f64) -> Result<Self> {
        error::check_non_negative("b", b)?;
        Ok(Self {
            b,
            config: IntervalConfig::default(),
        })
    }

    /// Replace the search configuration.
    pub fn with_config(mut self, config: IntervalConfig) -> Self {
        self.config = config;
        self
    }

    /// The delta function of count `n` at confidence level `clvl`.
    pub fn delta_function(&self, n: u64, clvl: f64) -> Result<PoissonDelta> {
        PoissonDelta::new(n, self.b, clvl, self.config.degeneracy)
    }

    /// Lower limit of the confidence interval for count `n`.
    pub fn lower_limit(&self, n: u64, clvl: f64) -> Result<f64> {
        let mut delta = self.delta_function(n, clvl)?;
        interval::lower_limit(&mut delta, &mut DeltaCache::new(), &self.config)
    }

    /// Upper limit of the confidence interval for count `n`.
    pub fn upper_limit(&self, n: u64, clvl: f64) -> Result<f64> {
        let mut delta = self.delta_function(n, clvl)?;
        interval::upper_limit(&mut delta, &mut DeltaCache::new(), &self.config)
    }

    /// Confidence interval for count `n`.
    pub fn confidence_interval(&self, n: u64, clvl: f64) -> Result<ConfidenceInterval> {
        let mut delta = self.delta_function(n, clvl)?;
        interval::confidence_interval(&mut delta, &self.config)
    }
}

/// Calculate the lower limit for count `n` over background `b`.
pub fn lower_limit(n: u64, b: f64, clvl: f64) -> Result<f64> {
    SimplePoisson::new(b)?.lower_limit(n, clvl)
}

/// Calculate the upper limit for count `n` over background `b`.
pub fn upper_limit(n: u64, b: f64, clvl: f64) -> Result<f64> {
    SimplePoisson::new(b)?.upper_limit(n, clvl)
}

/// Calculate the confidence interval for count `n` over background `b`.
///
/// # Examples
///
/// ```
/// use unified_ci::models::poisson;
///
/// let ci = poisson::confidence_interval(0, 0.5, 0.9).unwrap();
/// assert_eq!(ci.lower, 0.0);
/// assert_eq!(ci.upper, 2.265625);
/// ```
pub fn confidence_interval(n: u64, b: f64, clvl: f64) -> Result<ConfidenceInterval> {
    SimplePoisson::new(b)?.confidence_interval(n, clvl)
}

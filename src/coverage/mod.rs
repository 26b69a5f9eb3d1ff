//! # Coverage Studies
//!
//! The coverage of a confidence interval construction is the probability that
//! the interval contains the true parameter value. Unified intervals should
//! cover at least the nominal confidence level for every true value.
//!
//! This module estimates coverage by simulation for all three models, computes
//! it exactly for the known-background Poisson model, and runs coverage sweeps
//! over parameter grids (see [`table`]). The [`sensitivity`] of the
//! known-background intervals is computed the same exact way.
//!
//! Interval searches that fail for a single simulated measurement (for example
//! an exhausted bound search) are counted as failed trials and do not abort
//! the study.

pub mod sensitivity;
pub mod table;

pub use sensitivity::{poisson_sensitivity, poisson_sensitivity_with, sensitivity_curve, Sensitivity};
pub use table::{parse_values, CoverageRow, CoverageTable, GridAxis};

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RandomSource;
use crate::error::{self, Result, UnifiedCiError};
use crate::interval::ConfidenceInterval;
use crate::models::{sample_poisson, HybridPoisson, SimpleGaussian, SimplePoisson};
use crate::utils::special::{poisson_minor_isf, poisson_pmf};

/// Probability mass left out when summing the exact coverage.
pub(crate) const EXACT_COVERAGE_TAIL: f64 = 1e-10;

/// Outcome of a simulated coverage study at one parameter point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Nominal confidence level
    pub target: f64,

    /// Number of simulated measurements
    pub trials: usize,

    /// Number of intervals containing the true value
    pub covered: usize,

    /// Number of measurements whose interval search failed
    pub failed: usize,
}

impl CoverageResult {
    /// Observed coverage fraction; failed trials count as not covered.
    pub fn fraction(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.covered as f64 / self.trials as f64
    }

    /// Binomial standard deviation of the fraction at the nominal level.
    pub fn binomial_uncertainty(&self) -> f64 {
        if self.trials == 0 {
            return f64::INFINITY;
        }
        (self.target * (1.0 - self.target) / self.trials as f64).sqrt()
    }

    /// Returns true if the observed fraction is not below the target by more
    /// than `n_sigma` binomial standard deviations.
    pub fn is_consistent(&self, n_sigma: f64) -> bool {
        self.fraction() >= self.target - n_sigma * self.binomial_uncertainty()
    }
}

/// Exact coverage of the known-background Poisson intervals at one parameter point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExactCoverage {
    /// Nominal confidence level
    pub target: f64,

    /// Probability that the interval contains the true value
    pub coverage: f64,

    /// Number of counts whose interval search failed
    pub failed: usize,

    /// Probability mass of the failed counts, counted as not covered
    pub failed_probability: f64,
}

impl ExactCoverage {
    /// Returns true if the coverage reaches the nominal level.
    pub fn is_conservative(&self) -> bool {
        self.coverage >= self.target
    }
}

/// Run `trials` simulated measurements and count how often `interval` covers `truth`.
fn run_trials<F>(target: f64, trials: usize, truth: f64, mut interval: F) -> Result<CoverageResult>
where
    F: FnMut() -> Result<ConfidenceInterval>,
{
    let mut result = CoverageResult {
        target,
        trials,
        covered: 0,
        failed: 0,
    };

    for _ in 0..trials {
        match interval() {
            Ok(ci) => {
                if ci.contains(truth) {
                    result.covered += 1;
                }
            }
            Err(e) if e.is_point_failure() => {
                warn!(error = %e, "interval search failed for simulated measurement");
                result.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        truth,
        target,
        covered = result.covered,
        failed = result.failed,
        trials,
        "coverage point done"
    );
    Ok(result)
}

/// Estimate the coverage of the known-background Poisson intervals by simulation.
///
/// # Arguments
///
/// * `theta` - True signal rate
/// * `b` - Known background rate
/// * `clvl` - Confidence level
/// * `trials` - Number of simulated measurements
/// * `rng` - Random source for the measurements
pub fn simulate_poisson_coverage<R>(
    theta: f64,
    b: f64,
    clvl: f64,
    trials: usize,
    rng: &mut R,
) -> Result<CoverageResult>
where
    R: Rng + ?Sized,
{
    error::check_non_negative("theta", theta)?;
    error::significance(clvl)?;
    let model = SimplePoisson::new(b)?;

    run_trials(clvl, trials, theta, || {
        let n = sample_poisson(theta + b, &mut *rng)?;
        model.confidence_interval(n, clvl)
    })
}

/// Estimate the coverage of the Gaussian intervals by simulation.
pub fn simulate_gaussian_coverage<R>(
    mu: f64,
    sigma: f64,
    clvl: f64,
    trials: usize,
    rng: &mut R,
) -> Result<CoverageResult>
where
    R: Rng + ?Sized,
{
    error::check_non_negative("mu", mu)?;
    error::significance(clvl)?;
    let model = SimpleGaussian::new(sigma)?;
    let normal = Normal::new(mu, sigma)
        .map_err(|e| UnifiedCiError::Distribution(format!("Normal({}, {}): {}", mu, sigma, e)))?;

    run_trials(clvl, trials, mu, || {
        let x = normal.sample(&mut *rng);
        model.confidence_interval(x, clvl)
    })
}

/// Estimate the coverage of the hybrid resampling intervals by simulation.
///
/// Each simulated measurement draws `n ~ Poisson(theta + b)` and
/// `m ~ Poisson(gamma * b)`; its critical values use `n_mc` toy experiments
/// from the same random source.
pub fn simulate_hybrid_coverage<R>(
    theta: f64,
    b: f64,
    gamma: f64,
    clvl: f64,
    trials: usize,
    n_mc: usize,
    rng: &mut R,
) -> Result<CoverageResult>
where
    R: Rng + ?Sized,
{
    error::check_non_negative("theta", theta)?;
    error::check_non_negative("b", b)?;
    error::significance(clvl)?;
    let model = HybridPoisson::new(gamma, n_mc)?;

    run_trials(clvl, trials, theta, || {
        let n = sample_poisson(theta + b, &mut *rng)?;
        let m = sample_poisson(gamma * b, &mut *rng)?;
        model.confidence_interval(n, m, clvl, &mut *rng)
    })
}

/// Exact coverage of the known-background Poisson intervals.
///
/// Sums the probability of every count whose interval contains `theta`. Counts
/// are enumerated until less than `1e-10` probability remains.
pub fn exact_poisson_coverage(theta: f64, b: f64, clvl: f64) -> Result<ExactCoverage> {
    exact_poisson_coverage_with(&SimplePoisson::new(b)?, theta, clvl)
}

/// Exact coverage of the intervals built by `model`.
///
/// A count whose interval search fails is logged and recorded in
/// [`ExactCoverage::failed`]; its probability is not counted as covered.
pub fn exact_poisson_coverage_with(model: &SimplePoisson, theta: f64, clvl: f64) -> Result<ExactCoverage> {
    error::check_non_negative("theta", theta)?;
    error::significance(clvl)?;
    let mu = theta + model.b;
    let n_end = if mu == 0.0 {
        0
    } else {
        poisson_minor_isf(EXACT_COVERAGE_TAIL, mu)?
    };

    let mut result = ExactCoverage {
        target: clvl,
        coverage: 0.0,
        failed: 0,
        failed_probability: 0.0,
    };
    for n in 0..=n_end {
        match model.confidence_interval(n, clvl) {
            Ok(ci) => {
                if ci.contains(theta) {
                    result.coverage += poisson_pmf(n, mu);
                }
            }
            Err(e) if e.is_point_failure() => {
                warn!(n, theta, b = model.b, error = %e, "interval search failed for count");
                result.failed += 1;
                result.failed_probability += poisson_pmf(n, mu);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(result)
}

/// Coverage sweep for the known-background Poisson model.
///
/// Every combination of `thetas`, `bs` and `cls` is simulated with `ntest`
/// measurements. Point `i` of the grid draws from `source.stream(i)`.
pub fn poisson_sweep(
    thetas: &[f64],
    bs: &[f64],
    cls: &[f64],
    ntest: usize,
    source: RandomSource,
) -> Result<CoverageTable> {
    let mut table = CoverageTable::new(
        vec![GridAxis::new("theta", thetas), GridAxis::new("b", bs)],
        cls,
        ntest,
    );

    let mut index = 0;
    for &theta in thetas {
        for &b in bs {
            for &cl in cls {
                let mut rng = source.stream(index).rng();
                let result = simulate_poisson_coverage(theta, b, cl, ntest, &mut rng)?;
                table.push(vec![theta, b], &result);
                index += 1;
            }
        }
    }
    Ok(table)
}

/// Coverage sweep for the Gaussian model.
pub fn gaussian_sweep(
    mus: &[f64],
    sigmas: &[f64],
    cls: &[f64],
    ntest: usize,
    source: RandomSource,
) -> Result<CoverageTable> {
    let mut table = CoverageTable::new(
        vec![GridAxis::new("mu", mus), GridAxis::new("sigma", sigmas)],
        cls,
        ntest,
    );

    let mut index = 0;
    for &mu in mus {
        for &sigma in sigmas {
            for &cl in cls {
                let mut rng = source.stream(index).rng();
                let result = simulate_gaussian_coverage(mu, sigma, cl, ntest, &mut rng)?;
                table.push(vec![mu, sigma], &result);
                index += 1;
            }
        }
    }
    Ok(table)
}

/// Coverage sweep for the hybrid resampling model.
pub fn hybrid_sweep(
    thetas: &[f64],
    bs: &[f64],
    gammas: &[f64],
    cls: &[f64],
    ntest: usize,
    n_mc: usize,
    source: RandomSource,
) -> Result<CoverageTable> {
    let mut table = CoverageTable::new(
        vec![
            GridAxis::new("theta", thetas),
            GridAxis::new("b", bs),
            GridAxis::new("gamma", gammas),
        ],
        cls,
        ntest,
    );

    let mut index = 0;
    for &theta in thetas {
        for &b in bs {
            for &gamma in gammas {
                for &cl in cls {
                    let mut rng = source.stream(index).rng();
                    let result =
                        simulate_hybrid_coverage(theta, b, gamma, cl, ntest, n_mc, &mut rng)?;
                    table.push(vec![theta, b, gamma], &result);
                    index += 1;
                }
            }
        }
    }
    Ok(table)
}

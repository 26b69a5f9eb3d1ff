//! Gaussian unified confidence intervals with *known* variance.
//!
//! Estimates confidence intervals for the mean `mu >= 0` of a Gaussian
//! distributed observable with known standard deviation, using critical values
//! for `lambda = -2 ln(Lambda)`, where `Lambda` is the likelihood ratio against
//! the positive-constrained best fit.
//!
//! Unlike the Poisson models, the sampling distribution of `lambda` is known
//! in closed form: a chi-squared(1) part for measurements above zero, and a
//! shifted normal tail for measurements pushed to the boundary.

use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::warn;

use crate::config::{DegeneracyPolicy, IntervalConfig};
use crate::error::{self, Result, UnifiedCiError};
use crate::interval::{self, ConfidenceInterval, DeltaCache, DeltaFunction};
use crate::utils::special::{chi2_1_cdf, chi2_1_ppf, normal_cdf};
use crate::utils::{conservative_quantile, try_bisect};

/// The positive-confined best fit for the expectation value.
pub fn fit_mu(x: f64) -> f64 {
    x.max(0.0)
}

/// Calculate `lambda = -2 ln(Lambda)` for the trial mean `mu_test` and measurement `x`.
///
/// The standard deviation is taken as the unit of both arguments.
pub fn neg_2_log_likelihood_ratio(mu_test: f64, x: f64) -> f64 {
    if x > 0.0 {
        (x - mu_test).powi(2)
    } else {
        mu_test * (mu_test - 2.0 * x)
    }
}

/// Cumulative distribution of `lambda = -2 ln(Lambda)` under the mean `mu > 0`.
///
/// # Arguments
///
/// * `l` - The `lambda` value at which to evaluate the CDF
/// * `mu` - The tested expectation value, strictly positive
/// * `sigma` - The standard deviation of the distribution
///
/// # Returns
///
/// * The probability `Prob(lambda < l)`
pub fn neg_2_log_likelihood_ratio_cdf(l: f64, mu: f64, sigma: f64) -> f64 {
    let p_lz = normal_cdf(0.0, mu, sigma);
    let p_gz = 1.0 - p_lz;

    let l_crit = mu * mu / (sigma * sigma);
    let nu = chi2_1_cdf(l_crit);

    let p_plus = if l < l_crit {
        p_gz * 2.0 * chi2_1_cdf(l) / (1.0 + nu)
    } else {
        p_gz * (chi2_1_cdf(l) + nu) / (1.0 + nu)
    };

    let tau = 0.5 * sigma * sigma / mu * (l_crit - l);
    let p_minus = if tau < 0.0 {
        p_lz - normal_cdf(tau, mu, sigma)
    } else {
        0.0
    };

    p_plus + p_minus
}

/// Critical value of `lambda` at significance `alpha`, with default settings.
pub fn critical_value(mu_test: f64, sigma: f64, alpha: f64) -> Result<f64> {
    critical_value_with(mu_test, sigma, alpha, &IntervalConfig::gaussian())
}

/// Critical value of `lambda = -2 ln(Lambda)` for the trial mean `mu_test`.
///
/// For `mu_test > 0` the critical value solves `CDF(l) = 1 - alpha`. The bracket
/// grows by decades from `[0, 10]` until it contains the solution.
///
/// At the boundary `mu_test == 0` only measurements above zero contribute, so the
/// chi-squared(1) quantile is taken at `1 - alpha / P(x > 0)`. When that argument
/// is not positive the critical value degenerates to zero, which the configured
/// [`DegeneracyPolicy`] either accepts with a warning or reports as an error.
pub fn critical_value_with(
    mu_test: f64,
    sigma: f64,
    alpha: f64,
    config: &IntervalConfig,
) -> Result<f64> {
    error::check_non_negative("mu_test", mu_test)?;
    error::check_positive("sigma", sigma)?;
    error::check_alpha(alpha)?;

    if mu_test > 0.0 {
        let target = |l: f64| 1.0 - alpha - neg_2_log_likelihood_ratio_cdf(l, mu_test, sigma);

        if target(0.0) < 0.0 {
            return Err(UnifiedCiError::ComputationError(format!(
                "1 - alpha - CDF(0) is negative for mu={} sigma={} alpha={}",
                mu_test, sigma, alpha
            )));
        }

        let mut b = 10.0;
        let mut steps = 0;
        while target(b) > 0.0 {
            if steps >= config.max_growth_steps {
                return Err(UnifiedCiError::BoundSearchExhausted { steps, last: b });
            }
            b *= 10.0;
            steps += 1;
        }

        try_bisect(|l| Ok(target(l)), 0.0, b, config.tolerance)
    } else {
        let p_gz = 1.0 - normal_cdf(0.0, mu_test, sigma);
        let argument = 1.0 - alpha / p_gz;
        if argument > 0.0 {
            chi2_1_ppf(argument)
        } else {
            match config.degeneracy {
                DegeneracyPolicy::AcceptOvercoverage => {
                    warn!(
                        sigma,
                        alpha, argument, "questionable boundary critical value, using 0"
                    );
                    Ok(0.0)
                }
                DegeneracyPolicy::Fail => Err(UnifiedCiError::DegenerateBoundary {
                    sigma,
                    alpha,
                    argument,
                }),
            }
        }
    }
}

/// Estimate the critical value of `lambda` by Monte Carlo sampling.
///
/// Draws `n_mc` measurements from `Normal(mu_test, sigma)` and takes the
/// conservative `1 - alpha` quantile of their `lambda` values. Useful to
/// cross-check the closed-form distribution behind [`critical_value`].
pub fn critical_value_mc<R>(mu_test: f64, sigma: f64, alpha: f64, n_mc: usize, rng: &mut R) -> Result<f64>
where
    R: Rng + ?Sized,
{
    error::check_non_negative("mu_test", mu_test)?;
    error::check_positive("sigma", sigma)?;
    error::check_alpha(alpha)?;

    let normal = Normal::new(mu_test, sigma)
        .map_err(|e| UnifiedCiError::Distribution(format!("Normal({}, {}): {}", mu_test, sigma, e)))?;
    let lambdas: Array1<f64> = (0..n_mc)
        .map(|_| neg_2_log_likelihood_ratio(mu_test / sigma, normal.sample(&mut *rng) / sigma))
        .collect();
    Ok(conservative_quantile(&lambdas, 1.0 - alpha)?.0)
}

/// Delta function `critical_value(mu) - lambda(mu)` of one Gaussian measurement.
#[derive(Debug, Clone)]
pub struct GaussianDelta {
    x: f64,
    sigma: f64,
    alpha: f64,
    config: IntervalConfig,
}

impl GaussianDelta {
    /// Create the delta function for measurement `x` at confidence level `clvl`.
    pub fn new(x: f64, sigma: f64, clvl: f64, config: IntervalConfig) -> Result<Self> {
        if !x.is_finite() {
            return Err(UnifiedCiError::InvalidParameter(format!(
                "measurement must be finite, got {}",
                x
            )));
        }
        error::check_positive("sigma", sigma)?;
        let alpha = error::significance(clvl)?;
        Ok(Self {
            x,
            sigma,
            alpha,
            config,
        })
    }
}

impl DeltaFunction for GaussianDelta {
    fn best_fit(&self) -> f64 {
        fit_mu(self.x)
    }

    fn delta(&mut self, mu: f64) -> Result<f64> {
        let l = neg_2_log_likelihood_ratio(mu / self.sigma, self.x / self.sigma);
        Ok(critical_value_with(mu, self.sigma, self.alpha, &self.config)? - l)
    }

    fn initial_upper_bracket(&self) -> (f64, f64) {
        let best = self.best_fit();
        (best, best + self.sigma)
    }

    fn widen_upper_bracket(&self, _u: f64, v: f64) -> (f64, f64) {
        let best = self.best_fit();
        (v, best + 2.0 * (v - best))
    }
}

/// Unified confidence intervals for a positive Gaussian mean with known sigma.
#[derive(Debug, Clone)]
pub struct SimpleGaussian {
    /// Standard deviation of the measurement
    pub sigma: f64,

    /// Search configuration
    pub config: IntervalConfig,
}

impl SimpleGaussian {
    /// Create a new model with the default Gaussian configuration.
    pub fn new(sigma: f64) -> Result<Self> {
        error::check_positive("sigma", sigma)?;
        Ok(Self {
            sigma,
            config: IntervalConfig::gaussian(),
        })
    }

    /// Replace the search configuration.
    pub fn with_config(mut self, config: IntervalConfig) -> Self {
        self.config = config;
        self
    }

    /// The delta function of measurement `x` at confidence level `clvl`.
    pub fn delta_function(&self, x: f64, clvl: f64) -> Result<GaussianDelta> {
        GaussianDelta::new(x, self.sigma, clvl, self.config)
    }

    /// Lower limit of the confidence interval for measurement `x`.
    pub fn lower_limit(&self, x: f64, clvl: f64) -> Result<f64> {
        let mut delta = self.delta_function(x, clvl)?;
        interval::lower_limit(&mut delta, &mut DeltaCache::new(), &self.config)
    }

    /// Upper limit of the confidence interval for measurement `x`.
    pub fn upper_limit(&self, x: f64, clvl: f64) -> Result<f64> {
        let mut delta = self.delta_function(x, clvl)?;
        interval::upper_limit(&mut delta, &mut DeltaCache::new(), &self.config)
    }

    /// Confidence interval for measurement `x`.
    pub fn confidence_interval(&self, x: f64, clvl: f64) -> Result<ConfidenceInterval> {
        let mut delta = self.delta_function(x, clvl)?;
        interval::confidence_interval(&mut delta, &self.config)
    }
}

/// Calculate the lower limit for measurement `x` with standard deviation `sigma`.
pub fn lower_limit(x: f64, sigma: f64, clvl: f64) -> Result<f64> {
    SimpleGaussian::new(sigma)?.lower_limit(x, clvl)
}

/// Calculate the upper limit for measurement `x` with standard deviation `sigma`.
pub fn upper_limit(x: f64, sigma: f64, clvl: f64) -> Result<f64> {
    SimpleGaussian::new(sigma)?.upper_limit(x, clvl)
}

/// Calculate the confidence interval for measurement `x` with standard deviation `sigma`.
pub fn confidence_interval(x: f64, sigma: f64, clvl: f64) -> Result<ConfidenceInterval> {
    SimpleGaussian::new(sigma)?.confidence_interval(x, clvl)
}

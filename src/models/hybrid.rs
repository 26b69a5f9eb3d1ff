//! Poisson unified confidence intervals with *unknown* background.
//!
//! The signal region counts `n ~ Poisson(theta + b)` while a companion
//! background region counts `m ~ Poisson(gamma * b)`. The background rate `b`
//! is a nuisance parameter fitted jointly with the signal.
//!
//! Without a closed form for the sampling distribution of the profile
//! likelihood ratio, the critical value is estimated by hybrid resampling
//! (Sen, Walker and Woodroofe, Stat. Sinica 19 (2009) 301-314): toy
//! experiments are drawn with the background fixed at its local fit for the
//! tested `theta`, and a conservative quantile of their likelihood ratios is
//! taken.

use ndarray::Array1;
use rand::Rng;

use super::{ln_ratio_pow, sample_poisson_n};
use crate::config::IntervalConfig;
use crate::error::{self, Result, UnifiedCiError};
use crate::interval::{self, ConfidenceInterval, DeltaCache, DeltaFunction};
use crate::utils::conservative_quantile;

/// Global fit of the signal parameter, `max(n - m / gamma, 0)`.
pub fn global_fit_theta(n: u64, m: u64, gamma: f64) -> f64 {
    f64::max(0.0, n as f64 - m as f64 / gamma)
}

/// Global fit of the background rate parameter.
pub fn global_fit_b(n: u64, m: u64, gamma: f64) -> f64 {
    (m as f64 + n as f64 - global_fit_theta(n, m, gamma)) / (1.0 + gamma)
}

/// Local fit of the background rate for a given signal rate `theta`.
///
/// This is the positive root of the quadratic profile likelihood condition.
pub fn local_fit_b(n: u64, m: u64, theta: f64, gamma: f64) -> f64 {
    let (n, m) = (n as f64, m as f64);
    let g1 = 1.0 + gamma;
    let s = m + n - g1 * theta;
    (s + (s * s + 4.0 * g1 * m * theta).sqrt()) / (2.0 * g1)
}

/// The profile likelihood ratio of signal rate `theta` for counts `n` and `m`.
pub fn likelihood_ratio(n: u64, m: u64, theta: f64, gamma: f64) -> f64 {
    let bh = global_fit_b(n, m, gamma);
    let th = global_fit_theta(n, m, gamma);
    let bhh = local_fit_b(n, m, theta, gamma);

    let ln_ratio = ln_ratio_pow(bhh, bh, m)
        + ln_ratio_pow(theta + bhh, th + bh, n)
        + (n as f64 + m as f64 - (1.0 + gamma) * bhh - theta);
    ln_ratio.exp()
}

fn check_model(gamma: f64, n_mc: usize) -> Result<()> {
    error::check_positive("gamma", gamma)?;
    if n_mc == 0 {
        return Err(UnifiedCiError::InvalidParameter(
            "number of Monte Carlo experiments must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Calculate the critical likelihood ratio value using hybrid resampling.
///
/// # Arguments
///
/// * `n` - Number of counts in the signal region
/// * `m` - Number of counts in the background region
/// * `theta` - The tested signal rate
/// * `gamma` - The ratio of background to signal region
/// * `clvl` - The target confidence level
/// * `n_mc` - The number of toy experiments
/// * `rng` - Random source for the toy experiments
///
/// # Returns
///
/// * The conservative upper `1 - clvl` quantile of the toy likelihood ratios
pub fn critical_value<R>(
    n: u64,
    m: u64,
    theta: f64,
    gamma: f64,
    clvl: f64,
    n_mc: usize,
    rng: &mut R,
) -> Result<f64>
where
    R: Rng + ?Sized,
{
    check_model(gamma, n_mc)?;
    error::check_non_negative("theta", theta)?;
    let alpha = error::significance(clvl)?;

    let bhh = local_fit_b(n, m, theta, gamma);
    let ns = sample_poisson_n(theta + bhh, n_mc, rng)?;
    let ms = sample_poisson_n(gamma * bhh, n_mc, rng)?;

    let ratios: Array1<f64> = ns
        .iter()
        .zip(ms.iter())
        .map(|(&ni, &mi)| likelihood_ratio(ni, mi, theta, gamma))
        .collect();
    Ok(conservative_quantile(&ratios, -alpha)?.0)
}

/// Delta function of one signal/background count pair.
///
/// Borrows the random source for the lifetime of the interval computation;
/// each new trial value draws fresh toy experiments. The upper bracket is
/// widened with [`IntervalConfig::coarse_mc`] experiments per trial value.
pub struct HybridDelta<'r, R: Rng + ?Sized> {
    n: u64,
    m: u64,
    gamma: f64,
    clvl: f64,
    n_mc: usize,
    rng: &'r mut R,
}

impl<'r, R: Rng + ?Sized> HybridDelta<'r, R> {
    /// Create the delta function for counts `n` and `m`.
    pub fn new(n: u64, m: u64, gamma: f64, clvl: f64, n_mc: usize, rng: &'r mut R) -> Result<Self> {
        check_model(gamma, n_mc)?;
        error::significance(clvl)?;
        Ok(Self {
            n,
            m,
            gamma,
            clvl,
            n_mc,
            rng,
        })
    }
}

impl<'r, R: Rng + ?Sized> DeltaFunction for HybridDelta<'r, R> {
    fn best_fit(&self) -> f64 {
        global_fit_theta(self.n, self.m, self.gamma)
    }

    fn delta(&mut self, theta: f64) -> Result<f64> {
        self.delta_at(theta, self.n_mc)
    }

    fn precision(&self) -> usize {
        self.n_mc
    }

    fn delta_at(&mut self, theta: f64, precision: usize) -> Result<f64> {
        let cv = critical_value(
            self.n,
            self.m,
            theta,
            self.gamma,
            self.clvl,
            precision,
            &mut *self.rng,
        )?;
        Ok(likelihood_ratio(self.n, self.m, theta, self.gamma) - cv)
    }
}

/// Unified confidence intervals for a Poisson signal with unknown background.
#[derive(Debug, Clone)]
pub struct HybridPoisson {
    /// Ratio of the background region to the signal region
    pub gamma: f64,

    /// Number of toy experiments per critical value
    pub n_mc: usize,

    /// Search configuration
    pub config: IntervalConfig,
}

impl HybridPoisson {
    /// Create a new model with the default configuration.
    pub fn new(gamma: f64, n_mc: usize) -> Result<Self> {
        check_model(gamma, n_mc)?;
        Ok(Self {
            gamma,
            n_mc,
            config: IntervalConfig::default(),
        })
    }

    /// Replace the search configuration.
    pub fn with_config(mut self, config: IntervalConfig) -> Self {
        self.config = config;
        self
    }

    /// The delta function of counts `n` and `m` at confidence level `clvl`.
    pub fn delta_function<'r, R>(
        &self,
        n: u64,
        m: u64,
        clvl: f64,
        rng: &'r mut R,
    ) -> Result<HybridDelta<'r, R>>
    where
        R: Rng + ?Sized,
    {
        HybridDelta::new(n, m, self.gamma, clvl, self.n_mc, rng)
    }

    /// Lower limit of the confidence interval for counts `n` and `m`.
    pub fn lower_limit<R>(&self, n: u64, m: u64, clvl: f64, rng: &mut R) -> Result<f64>
    where
        R: Rng + ?Sized,
    {
        let mut delta = self.delta_function(n, m, clvl, rng)?;
        interval::lower_limit(&mut delta, &mut DeltaCache::new(), &self.config)
    }

    /// Upper limit of the confidence interval for counts `n` and `m`.
    pub fn upper_limit<R>(&self, n: u64, m: u64, clvl: f64, rng: &mut R) -> Result<f64>
    where
        R: Rng + ?Sized,
    {
        let mut delta = self.delta_function(n, m, clvl, rng)?;
        interval::upper_limit(&mut delta, &mut DeltaCache::new(), &self.config)
    }

    /// Confidence interval for counts `n` and `m`.
    pub fn confidence_interval<R>(
        &self,
        n: u64,
        m: u64,
        clvl: f64,
        rng: &mut R,
    ) -> Result<ConfidenceInterval>
    where
        R: Rng + ?Sized,
    {
        let mut delta = self.delta_function(n, m, clvl, rng)?;
        interval::confidence_interval(&mut delta, &self.config)
    }
}

/// Calculate the unified confidence interval for a signal with unknown background.
///
/// # Examples
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use unified_ci::models::hybrid;
///
/// let mut rng = StdRng::seed_from_u64(1);
/// let ci = hybrid::confidence_interval(8, 6, 2.0, 0.6827, 500, &mut rng).unwrap();
/// assert!(ci.lower > 0.0 && ci.upper > ci.lower);
/// ```
pub fn confidence_interval<R>(
    n: u64,
    m: u64,
    gamma: f64,
    clvl: f64,
    n_mc: usize,
    rng: &mut R,
) -> Result<ConfidenceInterval>
where
    R: Rng + ?Sized,
{
    HybridPoisson::new(gamma, n_mc)?.confidence_interval(n, m, clvl, rng)
}

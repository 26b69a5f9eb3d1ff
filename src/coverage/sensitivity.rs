//! Sensitivity of the known-background Poisson intervals.
//!
//! The sensitivity is the average upper limit an experiment expecting only
//! background would report. It summarizes how well an experiment can exclude
//! signals without being biased by a particular downward fluctuation.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::EXACT_COVERAGE_TAIL;
use crate::error::Result;
use crate::models::SimplePoisson;
use crate::utils::special::{poisson_minor_isf, poisson_pmf};

/// Average upper limit at one background rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    /// Known background rate
    pub b: f64,

    /// Confidence level of the upper limits
    pub cl: f64,

    /// Expected upper limit when no signal is present
    pub average_upper_limit: f64,

    /// Number of counts whose upper limit search failed
    #[serde(default)]
    pub failed: usize,

    /// Probability mass of the failed counts, left out of the average
    #[serde(default)]
    pub failed_probability: f64,
}

/// Exact average upper limit for background-only experiments.
///
/// Sums `P(n | b) * upper_limit(n, b)` over counts until less than `1e-10`
/// probability remains.
pub fn poisson_sensitivity(b: f64, clvl: f64) -> Result<Sensitivity> {
    poisson_sensitivity_with(&SimplePoisson::new(b)?, clvl)
}

/// Exact average upper limit of the intervals built by `model`.
///
/// Counts whose upper limit search fails are skipped with a warning and
/// recorded in [`Sensitivity::failed`].
pub fn poisson_sensitivity_with(model: &SimplePoisson, clvl: f64) -> Result<Sensitivity> {
    let b = model.b;
    let n_end = if b == 0.0 {
        0
    } else {
        poisson_minor_isf(EXACT_COVERAGE_TAIL, b)?
    };

    let mut sensitivity = Sensitivity {
        b,
        cl: clvl,
        average_upper_limit: 0.0,
        failed: 0,
        failed_probability: 0.0,
    };
    for n in 0..=n_end {
        match model.upper_limit(n, clvl) {
            Ok(upper) => sensitivity.average_upper_limit += poisson_pmf(n, b) * upper,
            Err(e) if e.is_point_failure() => {
                warn!(n, b, error = %e, "upper limit search failed for count");
                sensitivity.failed += 1;
                sensitivity.failed_probability += poisson_pmf(n, b);
            }
            Err(e) => return Err(e),
        }
    }
    debug!(
        b,
        clvl,
        n_end,
        average = sensitivity.average_upper_limit,
        failed = sensitivity.failed,
        "sensitivity computed"
    );
    Ok(sensitivity)
}

/// Sensitivity for every background rate in `bs`.
pub fn sensitivity_curve(bs: &[f64], clvl: f64) -> Result<Vec<Sensitivity>> {
    bs.iter().map(|&b| poisson_sensitivity(b, clvl)).collect()
}

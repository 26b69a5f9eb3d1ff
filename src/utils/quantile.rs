//! Conservative quantiles of empirical samples.
//!
//! A conservative lower quantile guarantees the lower tail frequency
//! `Pr{x_i <= q} >= p`. A conservative upper quantile, requested with a negative
//! probability, guarantees the upper tail frequency `Pr{x_i >= q} >= 1 - |p|`.

use ndarray::{ArrayBase, Data, Dimension};

use crate::error::{Result, UnifiedCiError};

/// Distinct sample values with their cumulative relative frequencies.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalDistribution {
    /// Distinct values in ascending order.
    pub values: Vec<f64>,

    /// Relative frequency of all sample values `<=` the matching distinct value.
    pub cumulative: Vec<f64>,
}

impl EmpiricalDistribution {
    /// Builds the empirical distribution of a non-empty sample.
    pub fn from_sample(sample: &[f64]) -> Result<Self> {
        if sample.is_empty() {
            return Err(UnifiedCiError::EmptySample);
        }
        if sample.iter().any(|x| x.is_nan()) {
            return Err(UnifiedCiError::ComputationError(
                "data sample contains NaN".to_string(),
            ));
        }

        let mut sorted = sample.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let size = sorted.len() as f64;
        let mut values: Vec<f64> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for x in sorted {
            match values.last() {
                Some(&last) if last == x => {
                    if let Some(count) = counts.last_mut() {
                        *count += 1;
                    }
                }
                _ => {
                    values.push(x);
                    counts.push(1);
                }
            }
        }

        let mut cumulative = Vec::with_capacity(counts.len());
        let mut acc = 0.0;
        for count in counts {
            acc += count as f64 / size;
            cumulative.push(acc);
        }

        Ok(Self { values, cumulative })
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no distinct values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Conservative quantile for probability `p`; see [`conservative_quantile`].
    pub fn quantile(&self, p: f64) -> Result<f64> {
        if !(p.abs() <= 1.0) {
            return Err(UnifiedCiError::InvalidProbability(p));
        }
        let target = p.abs();
        let last = self.cumulative.len() - 1;

        // Rounding can leave the final cumulative frequency just below 1.
        let mut i = self
            .cumulative
            .iter()
            .position(|&c| c >= target)
            .unwrap_or(last);

        if p < 0.0 && self.cumulative[i] != target {
            // Step back one rank; below the smallest value nothing is left to exclude.
            i = i.saturating_sub(1);
        }

        Ok(self.values[i])
    }
}

/// Calculate upper/lower tail conservative quantiles.
///
/// # Arguments
///
/// * `sample` - The data sample, which must be one-dimensional and non-empty
/// * `p` - The target probability `0 <= |p| <= 1`; if `p < 0` the conservative
///   upper quantile is returned
///
/// # Returns
///
/// * The quantile value and the number of distinct values in the sample
pub fn conservative_quantile<S, D>(sample: &ArrayBase<S, D>, p: f64) -> Result<(f64, usize)>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if !(p.abs() <= 1.0) {
        return Err(UnifiedCiError::InvalidProbability(p));
    }
    if sample.ndim() != 1 {
        return Err(UnifiedCiError::InvalidShape {
            ndim: sample.ndim(),
        });
    }

    let values: Vec<f64> = sample.iter().copied().collect();
    let distribution = EmpiricalDistribution::from_sample(&values)?;
    let q = distribution.quantile(p)?;
    Ok((q, distribution.len()))
}

/// Conservative quantiles for several probabilities from one sample.
pub fn conservative_quantiles<S, D>(sample: &ArrayBase<S, D>, ps: &[f64]) -> Result<(Vec<f64>, usize)>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if sample.ndim() != 1 {
        return Err(UnifiedCiError::InvalidShape {
            ndim: sample.ndim(),
        });
    }

    let values: Vec<f64> = sample.iter().copied().collect();
    let distribution = EmpiricalDistribution::from_sample(&values)?;
    let quantiles = ps
        .iter()
        .map(|&p| distribution.quantile(p))
        .collect::<Result<Vec<f64>>>()?;
    Ok((quantiles, distribution.len()))
}

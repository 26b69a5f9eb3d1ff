//! Memoization of delta function values within one interval computation.

use std::collections::HashMap;

use crate::error::Result;

/// Cache of delta function values keyed by trial value and Monte Carlo precision.
///
/// A cache belongs to a single confidence interval computation; both limit
/// searches of that computation share it, and it is dropped afterwards.
#[derive(Debug, Default, Clone)]
pub struct DeltaCache {
    values: HashMap<(u64, usize), f64>,
    hits: usize,
}

impl DeltaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(theta: f64, precision: usize) -> (u64, usize) {
        // -0.0 and 0.0 are the same trial value.
        let theta = if theta == 0.0 { 0.0 } else { theta };
        (theta.to_bits(), precision)
    }

    /// Look up a cached value.
    pub fn get(&self, theta: f64, precision: usize) -> Option<f64> {
        self.values.get(&Self::key(theta, precision)).copied()
    }

    /// Return the cached value, or compute and store it.
    ///
    /// Errors from `compute` are returned unchanged and nothing is stored.
    pub fn get_or_try_insert_with<F>(&mut self, theta: f64, precision: usize, compute: F) -> Result<f64>
    where
        F: FnOnce() -> Result<f64>,
    {
        let key = Self::key(theta, precision);
        if let Some(&value) = self.values.get(&key) {
            self.hits += 1;
            return Ok(value);
        }
        let value = compute()?;
        self.values.insert(key, value);
        Ok(value)
    }

    /// Number of distinct evaluations stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing has been evaluated yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }
}

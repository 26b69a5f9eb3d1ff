//! Configuration options for the interval searches.
//!
//! This module defines the tolerances used by the bisection search, the
//! iteration cap of the bracket growth searches, the policy applied when a
//! critical value can only be obtained in a degenerate way, and the random
//! source of Monte Carlo based computations.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Convergence tolerances for the bisection search.
///
/// Bisection stops as soon as *either* the bracket width drops to `xtol` or the
/// function values at both bracket edges differ by at most `ftol`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Absolute tolerance on the bracket width. Default: 1e-2
    pub xtol: f64,

    /// Absolute tolerance on the function value difference. Default: 1e-6
    pub ftol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            xtol: 1e-2,
            ftol: 1e-6,
        }
    }
}

impl Tolerance {
    /// Creates a new set of tolerances.
    pub fn new(xtol: f64, ftol: f64) -> Self {
        Self { xtol, ftol }
    }

    /// Tolerances for continuous target functions, converging on the bracket width alone.
    pub fn fine() -> Self {
        Self {
            xtol: 1e-12,
            ftol: 0.0,
        }
    }
}

/// What to do when a critical value can only be obtained in a degenerate way.
///
/// This covers the exact Poisson ranking whose first candidate already exceeds
/// `alpha`, and the Gaussian boundary quantile with a non-positive argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegeneracyPolicy {
    /// Log a warning and continue with a value that overcovers slightly.
    AcceptOvercoverage,

    /// Return an error to the caller.
    Fail,
}

impl Default for DegeneracyPolicy {
    fn default() -> Self {
        DegeneracyPolicy::AcceptOvercoverage
    }
}

/// Configuration options for a confidence interval computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalConfig {
    /// Tolerances for bisecting the delta function. Default: `Tolerance::default()`
    pub tolerance: Tolerance,

    /// Maximum number of bracket doublings before giving up. Default: 64
    pub max_growth_steps: usize,

    /// Policy for degenerate critical values. Default: AcceptOvercoverage
    pub degeneracy: DegeneracyPolicy,

    /// Toy experiments per critical value while widening the upper bracket of
    /// Monte Carlo models; 0 widens at full precision. Default: 1000
    pub coarse_mc: usize,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            max_growth_steps: 64,
            degeneracy: DegeneracyPolicy::default(),
            coarse_mc: 1000,
        }
    }
}

impl IntervalConfig {
    /// Creates a configuration with the given tolerances and default remaining options.
    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// Configuration for the continuous Gaussian model.
    pub fn gaussian() -> Self {
        Self::with_tolerance(Tolerance::fine())
    }
}

/// Where Monte Carlo computations take their random numbers from.
///
/// Sweeps hand every worker its own generator; a fixed seed makes the results
/// reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandomSource {
    /// Deterministic generator from a fixed seed
    Seeded(u64),

    /// Generator seeded from operating system entropy
    Entropy,
}

impl Default for RandomSource {
    fn default() -> Self {
        RandomSource::Entropy
    }
}

impl RandomSource {
    /// Create the generator.
    pub fn rng(&self) -> StdRng {
        match *self {
            RandomSource::Seeded(seed) => StdRng::seed_from_u64(seed),
            RandomSource::Entropy => StdRng::from_entropy(),
        }
    }

    /// Derive the source of the `index`-th independent stream.
    ///
    /// Seeded sources give each stream a distinct seed; entropy stays entropy.
    pub fn stream(&self, index: u64) -> RandomSource {
        match *self {
            RandomSource::Seeded(seed) => {
                RandomSource::Seeded(seed.wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
            }
            RandomSource::Entropy => RandomSource::Entropy,
        }
    }
}

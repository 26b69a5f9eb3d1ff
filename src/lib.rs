//! # unified-ci
//!
//! `unified-ci` computes unified (Feldman-Cousins) confidence intervals from
//! likelihood ratio ordering, for three models:
//!
//! - The mean of a Gaussian with known variance, constrained to be non-negative
//! - A Poisson signal on top of a known background
//! - A Poisson signal with an unknown background, estimated from a companion
//!   region by hybrid resampling
//!
//! The library provides:
//! - A plateau-aware bisection search and conservative empirical quantiles
//! - Exact, analytic and Monte Carlo critical values of the likelihood ratio
//! - Interval assembly with a bounded bracket growth search
//! - Coverage studies by simulation, exact summation and parameter sweeps,
//!   and the average upper limit (sensitivity) of background-only experiments
//!
//! ## Basic Usage
//!
//! ```
//! use unified_ci::models::{gaussian, poisson};
//!
//! // Poisson count 0 over a background of 0.5 at 90% confidence.
//! let ci = poisson::confidence_interval(0, 0.5, 0.9).unwrap();
//! assert_eq!(ci.lower, 0.0);
//! assert!(ci.upper > 2.2 && ci.upper < 2.3);
//!
//! // Gaussian measurement 1.7 sigma above zero.
//! let ci = gaussian::confidence_interval(1.7, 1.0, 0.9).unwrap();
//! assert!((ci.lower - 0.38).abs() < 0.005);
//! ```

// Public modules
pub mod config;
pub mod error;
pub mod utils;

// Interval search
pub mod interval;

// Statistical models
pub mod models;

// Coverage studies
pub mod coverage;

// Re-exports for convenience
pub use config::{DegeneracyPolicy, IntervalConfig, RandomSource, Tolerance};
pub use error::{Result, UnifiedCiError};
pub use interval::{ConfidenceInterval, DeltaCache, DeltaFunction};
pub use models::{HybridPoisson, SimpleGaussian, SimplePoisson};
pub use utils::{bisect, conservative_quantile};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

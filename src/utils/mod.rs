//! Common tools for interval estimation.

pub mod bisect;
pub mod quantile;
pub mod special;

// Re-export commonly used utilities
pub use bisect::{bisect, try_bisect};
pub use quantile::{conservative_quantile, conservative_quantiles, EmpiricalDistribution};

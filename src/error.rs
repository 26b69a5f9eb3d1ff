use thiserror::Error;

/// Error types for the unified-ci library.
#[derive(Error, Debug)]
pub enum UnifiedCiError {
    /// The bisection bracket does not enclose a sign change.
    #[error("f(a) and f(b) must have opposite sign: f({a})={fa}  f({b})={fb}")]
    InvalidBracket { a: f64, fa: f64, b: f64, fb: f64 },

    /// A quantile probability outside `[-1, 1]`.
    #[error("Invalid probability: |{0}| must be between 0 and 1")]
    InvalidProbability(f64),

    /// A data sample that is not one-dimensional.
    #[error("Data sample must be 1-dim, got {ndim} dimensions")]
    InvalidShape { ndim: usize },

    /// A data sample without any values.
    #[error("Data sample is empty")]
    EmptySample,

    /// The first ranked outcome already carries more than `alpha` probability.
    #[error(
        "Critical value ranking failed for b={b} theta={theta} alpha={alpha}: \
         first ranked outcome exceeds alpha"
    )]
    RankingInvariant { b: f64, theta: f64, alpha: f64 },

    /// The chi-squared quantile argument at the parameter boundary is not positive.
    #[error("Boundary critical value is degenerate for sigma={sigma} alpha={alpha}: quantile argument {argument}")]
    DegenerateBoundary { sigma: f64, alpha: f64, argument: f64 },

    /// A growth search did not reach a sign change within its iteration cap.
    #[error("Bound search exhausted after {steps} steps (last trial value {last})")]
    BoundSearchExhausted { steps: usize, last: f64 },

    /// Error for invalid parameter values.
    #[error("Invalid parameter value: {0}")]
    InvalidParameter(String),

    /// Error while evaluating a probability distribution.
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// Error during computational operations.
    #[error("Computation error: {0}")]
    ComputationError(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl UnifiedCiError {
    /// Returns true if the error only concerns a single parameter point.
    ///
    /// Sweeps over many measurements record these as failed points and keep going.
    pub fn is_point_failure(&self) -> bool {
        matches!(
            self,
            UnifiedCiError::BoundSearchExhausted { .. }
                | UnifiedCiError::RankingInvariant { .. }
                | UnifiedCiError::DegenerateBoundary { .. }
                | UnifiedCiError::InvalidBracket { .. }
        )
    }
}

/// Result type alias for unified-ci operations.
pub type Result<T> = std::result::Result<T, UnifiedCiError>;

/// Validates a confidence level and returns the matching significance `1 - clvl`.
pub(crate) fn significance(clvl: f64) -> Result<f64> {
    if !(clvl > 0.0 && clvl < 1.0) {
        return Err(UnifiedCiError::InvalidParameter(format!(
            "confidence level must be in (0, 1), got {}",
            clvl
        )));
    }
    Ok(1.0 - clvl)
}

/// Validates a significance level `alpha`.
pub(crate) fn check_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(UnifiedCiError::InvalidParameter(format!(
            "significance must be in (0, 1), got {}",
            alpha
        )));
    }
    Ok(())
}

/// Validates a finite, non-negative rate or count-like parameter.
pub(crate) fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(UnifiedCiError::InvalidParameter(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates a finite, strictly positive parameter.
pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(UnifiedCiError::InvalidParameter(format!(
            "{} must be finite and positive, got {}",
            name, value
        )));
    }
    Ok(())
}

//! Error types for the analytics engine
//!
//! Only invalid configuration and upstream failures are errors. Too little
//! history is reported through `insufficient_data` markers on the results.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by analyzers and the engine facade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// The requested time range is empty or inverted
    #[error("invalid time range: start {start} must be before end {end}")]
    InvalidRange {
        /// Inclusive range start
        start: DateTime<Utc>,
        /// Exclusive range end
        end: DateTime<Utc>,
    },

    /// Risk factor weights do not sum to 1.0
    #[error("risk factor weights must sum to 1.0 (got {sum:.6})")]
    InvalidWeights {
        /// Actual sum of the configured weights
        sum: f64,
    },

    /// A threshold or parameter is outside its allowed range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The data source failed; surfaced to the caller unchanged
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl AnalyticsError {
    /// True for errors caused by caller-supplied configuration or ranges
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, AnalyticsError::Upstream(_))
    }
}

/// Result type alias for analytics operations
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Fail with `InvalidConfig` unless `value` lies in `[min, max]`
pub(crate) fn ensure_within(name: &str, value: f64, min: f64, max: f64) -> AnalyticsResult<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidConfig(format!(
            "{} must be within [{}, {}] (got {})",
            name, min, max, value
        )))
    }
}

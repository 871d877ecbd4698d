//! Error types for pgquill-check

use thiserror::Error;

/// Result type for pgquill-check operations.
pub type CheckResult<T> = Result<T, CheckError>;

/// Error type for pgquill-check operations.
#[derive(Debug, Error)]
pub enum CheckError {
    /// A custom scanner pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl CheckError {
    /// Create an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        CheckError::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }
}

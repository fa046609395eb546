//! Error types for the matching core.
//!
//! Only malformed input is an error. A source track without an accepted
//! candidate is reported as `None` by the matcher, never as `Err`.

use thiserror::Error;

/// Errors raised while building tracks or match configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// A textual duration that is not `minutes:seconds` with two integer parts.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Tunables outside their allowed range.
    #[error("invalid match configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for the matching core
pub type MatchResult<T> = Result<T, MatchError>;

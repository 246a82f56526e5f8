//! Refinement loop error types

use thiserror::Error;

use crate::domain::ScoreError;

/// Errors that end an ideation run
///
/// Running out of iterations without a passing idea is not an error; the
/// loop returns its best candidate with `passed = false` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefineError {
    #[error("Idea generator failed: {0}")]
    Generator(String),

    #[error("Idea evaluator failed: {0}")]
    Evaluator(String),

    #[error("Generator returned no candidates in iteration {iteration}")]
    NoCandidates { iteration: u32 },

    #[error("Invalid score for '{title}': {source}")]
    InvalidScore {
        title: String,
        #[source]
        source: ScoreError,
    },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Refinement cancelled")]
    Cancelled,
}

impl RefineError {
    /// Whether the error came from collaborator output rather than the call itself
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, RefineError::NoCandidates { .. } | RefineError::InvalidScore { .. })
    }
}

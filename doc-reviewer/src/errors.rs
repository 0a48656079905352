//! Crate-wide error hierarchy for doc-reviewer.
//!
//! Only the review pipeline can fail as a whole, and only when no chunk could
//! be reviewed. Everything on the interactive path (resolve, map, locate)
//! reports failure as a value, never as an error.

use std::time::Duration;

use ai_llm_service::AiLlmError;
use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type ReviewResult<T> = Result<T, Error>;

/// Root error type for the doc-reviewer crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Every completion call of the run failed; there is nothing to show.
    #[error("review unavailable: all {chunks} request(s) failed (last error: {})", last_error.as_deref().unwrap_or("n/a"))]
    ReviewUnavailable {
        /// Number of requests attempted (1 for a single-pass review).
        chunks: usize,
        /// Rendered last failure, if any.
        last_error: Option<String>,
    },

    /// A completion failure that is not absorbed by the chunk loop (summary path).
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Failure of one call to the completion service.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider/transport failure reported by `ai-llm-service`.
    #[error(transparent)]
    Provider(#[from] AiLlmError),

    /// The call did not finish within the configured request timeout.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered, but with blank text.
    #[error("completion returned empty text")]
    EmptyResponse,

    /// Any other backend-specific failure.
    #[error("completion unavailable: {0}")]
    Unavailable(String),
}

impl CompletionError {
    /// Whether another attempt could succeed. Provider failures defer to
    /// [`AiLlmError::is_transient`]; rejected credentials or a bad endpoint do not
    /// heal by retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Provider(e) => e.is_transient(),
            CompletionError::Timeout(_)
            | CompletionError::EmptyResponse
            | CompletionError::Unavailable(_) => true,
        }
    }
}

/// Rejections from the recursive chunking routine; the chunker falls back to
/// paragraph packing when it sees one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk budget must be greater than zero")]
    ZeroBudget,

    #[error("overlap ({overlap} tokens) must be smaller than the chunk budget ({max} tokens)")]
    OverlapTooLarge { overlap: usize, max: usize },
}

/// Configuration errors for the review pipeline.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    #[error("{field} is out of range: {detail}")]
    OutOfRange {
        field: &'static str,
        detail: &'static str,
    },

    #[error("invalid value in {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

//! Error taxonomy for the query pipeline
//!
//! Capability implementations report the domain variants (`Model`,
//! `Retrieval`, `CacheUnavailable`). The orchestrator catches those at each
//! stage boundary and maps them to `UpstreamFailure`/`UpstreamTimeout`
//! annotated with the stage, so raw upstream messages never reach callers.

use thiserror::Error;

use crate::query::Stage;

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Request validation failed: empty query, unknown language code,
    /// oversize history. Never retried.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// Declared language is incompatible with the detected language.
    /// The payload is the user-facing message.
    #[error("{0}")]
    LanguageMismatch(String),

    /// The classifier declined the query (off-topic or harmful).
    /// The payload is the canned user-facing explanation.
    #[error("{0}")]
    Refusal(String),

    /// A model capability call failed (classifier, generator, scorer).
    #[error("model error: {0}")]
    Model(String),

    /// A retrieval capability call failed (embedder, index, reranker).
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// A stage exceeded its wall-clock budget.
    #[error("{stage} stage timed out")]
    UpstreamTimeout { stage: Stage },

    /// A capability failed inside a stage.
    #[error("{stage} stage failed: {message}")]
    UpstreamFailure { stage: Stage, message: String },

    /// Cache read/write failed. Logged, never surfaced.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The request was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,

    /// Logic invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Annotate a capability error with the stage it occurred in.
    ///
    /// Errors that already carry request-shaping semantics (refusals,
    /// mismatches, cancellation) pass through unchanged.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            Error::Model(message) | Error::Retrieval(message) | Error::CacheUnavailable(message) => {
                Error::UpstreamFailure { stage, message }
            }
            other => other,
        }
    }

    /// Whether a caller may retry the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamTimeout { .. }
                | Error::UpstreamFailure { .. }
                | Error::Model(_)
                | Error::Retrieval(_)
        )
    }

    /// The stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::UpstreamTimeout { stage } | Error::UpstreamFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Human-readable explanation suitable for the `response` field of an
    /// error result. Upstream detail is collapsed so credentials or prompt
    /// text can never leak through.
    pub fn user_message(&self) -> String {
        match self {
            Error::InputInvalid(msg) => msg.clone(),
            Error::LanguageMismatch(msg) => msg.clone(),
            Error::Refusal(msg) => msg.clone(),
            Error::Cancelled => "cancelled".to_string(),
            Error::UpstreamTimeout { stage } => {
                format!("The request timed out while {}. Please try again.", stage.gerund())
            }
            Error::UpstreamFailure { stage, .. } => {
                format!("Something went wrong while {}. Please try again.", stage.gerund())
            }
            Error::Model(_) | Error::Retrieval(_) | Error::CacheUnavailable(_) | Error::Internal(_) => {
                "Something went wrong while processing your question. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_annotation() {
        let err = Error::Model("connection refused".to_string()).at_stage(Stage::Generate);
        match err {
            Error::UpstreamFailure { stage, message } => {
                assert_eq!(stage, Stage::Generate);
                assert_eq!(message, "connection refused");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_refusal_passes_through_annotation() {
        let err = Error::Refusal("no".to_string()).at_stage(Stage::Classify);
        assert!(matches!(err, Error::Refusal(_)));
    }

    #[test]
    fn test_retryability() {
        assert!(Error::UpstreamTimeout { stage: Stage::Retrieve }.is_retryable());
        assert!(!Error::InputInvalid("empty".to_string()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(!Error::Refusal("off-topic".to_string()).is_retryable());
    }

    #[test]
    fn test_user_message_hides_upstream_detail() {
        let err = Error::UpstreamFailure {
            stage: Stage::Generate,
            message: "api key sk-secret rejected".to_string(),
        };
        assert!(!err.user_message().contains("sk-secret"));
    }
}

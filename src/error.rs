//! Error types for cqa-rs.
//!
//! Split into the query-pipeline taxonomy ([`AgentError`]) and the push
//! transport's delivery errors ([`ChannelError`]). Transport errors are
//! non-fatal to a running query and never cross the caller boundary.

use std::time::Duration;

use thiserror::Error;

/// Convenience result alias for pipeline operations.
pub type Result<T, E = AgentError> = std::result::Result<T, E>;

/// Errors produced by the query pipeline.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The comparison fetch failed or returned an empty table.
    #[error("comparison unavailable: {reason}")]
    DatasetUnavailable {
        /// Why the dataset could not be used.
        reason: String,
    },

    /// The requested strategy tag is outside the supported set.
    #[error("unsupported agent variant: {tag:?} (expected 'tabular' or 'structured')")]
    UnsupportedVariant {
        /// The tag as supplied by the caller.
        tag: String,
    },

    /// The reasoning session failed before producing an answer.
    ///
    /// Terminal for the query; the coordinator never retries.
    #[error("reasoning failed: {cause}")]
    ReasoningFailure {
        /// Underlying backend, parse, or loop failure.
        cause: String,
    },

    /// A bounded session exceeded its wall-clock execution budget.
    #[error("execution budget of {budget:?} exceeded")]
    ExecutionTimeout {
        /// The budget that was exhausted.
        budget: Duration,
    },

    /// API request failure from an LLM provider.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error description.
        message: String,
        /// HTTP status code, when the provider reported one.
        status: Option<u16>,
    },

    /// The model's output could not be interpreted.
    #[error("failed to parse model output: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The raw content that failed to parse.
        content: String,
    },

    /// The step loop hit its iteration limit without a final answer.
    #[error("reasoning loop exceeded {max_steps} steps")]
    StepLimitExceeded {
        /// The configured limit.
        max_steps: usize,
    },

    /// A tool call failed during execution.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Name of the tool that failed.
        name: String,
        /// Failure description.
        message: String,
    },

    /// No API key was configured for the provider.
    #[error("API key not configured (set OPENAI_API_KEY or CQA_API_KEY)")]
    ApiKeyMissing,

    /// Unknown provider name in configuration.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// The configured provider name.
        name: String,
    },
}

impl AgentError {
    /// Folds internal variants into the caller-facing taxonomy.
    ///
    /// Backend, parse, tool, and step-limit errors all surface as
    /// [`AgentError::ReasoningFailure`]; the caller-facing variants pass
    /// through unchanged.
    #[must_use]
    pub fn into_failure(self) -> Self {
        match self {
            e @ (Self::DatasetUnavailable { .. }
            | Self::UnsupportedVariant { .. }
            | Self::ReasoningFailure { .. }
            | Self::ExecutionTimeout { .. }) => e,
            other => Self::ReasoningFailure {
                cause: other.to_string(),
            },
        }
    }
}

/// Errors from the push-delivery transport.
///
/// These mark a failed push, not a failed query: the producer abandons
/// further delivery and keeps reasoning.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No channel registered under the given id.
    #[error("channel '{id}' not found")]
    NotFound {
        /// The requested channel id.
        id: String,
    },

    /// The channel's consumer has gone away.
    #[error("channel '{id}' closed")]
    Closed {
        /// The channel id.
        id: String,
    },

    /// The channel did not accept the frame within the send timeout.
    #[error("send to channel '{id}' timed out")]
    SendTimeout {
        /// The channel id.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_failure_folds_internal_variants() {
        let err = AgentError::ApiRequest {
            message: "503 from upstream".to_string(),
            status: Some(503),
        };
        let folded = err.into_failure();
        assert!(matches!(folded, AgentError::ReasoningFailure { .. }));
        assert!(folded.to_string().contains("503 from upstream"));
    }

    #[test]
    fn test_into_failure_preserves_terminal_variants() {
        let err = AgentError::ExecutionTimeout {
            budget: Duration::from_secs(1),
        };
        assert!(matches!(
            err.into_failure(),
            AgentError::ExecutionTimeout { .. }
        ));

        let err = AgentError::DatasetUnavailable {
            reason: "empty".to_string(),
        };
        assert!(matches!(
            err.into_failure(),
            AgentError::DatasetUnavailable { .. }
        ));
    }

    #[test]
    fn test_display_messages() {
        let err = AgentError::UnsupportedVariant {
            tag: "graph".to_string(),
        };
        assert!(err.to_string().contains("graph"));

        let err = ChannelError::NotFound {
            id: "chan-1".to_string(),
        };
        assert_eq!(err.to_string(), "channel 'chan-1' not found");
    }
}

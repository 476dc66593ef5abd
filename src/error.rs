//! Error types for the LLM access layer.

use thiserror::Error;

/// A single recorded provider failure, kept for the aggregate
/// chain-exhaustion report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFailure {
    /// Name of the provider that failed (e.g. "gemini").
    pub provider: String,

    /// Truncated failure reason.
    pub error: String,
}

impl std::fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

fn join_failures(failures: &[ChainFailure]) -> String {
    if failures.is_empty() {
        return "no provider was available".to_string();
    }
    failures
        .iter()
        .map(ChainFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type for llmrelay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (no credentials, unreadable config file, etc.).
    /// Fatal at construction time, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// A provider signalled quota exhaustion for the key in use. Converted
    /// into a key cooldown at the adapter boundary.
    #[error("rate limited by '{provider}'{}", .retry_after.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited {
        provider: String,
        retry_after: Option<u64>,
    },

    /// A single adapter call failed for a non-quota reason (network error,
    /// vendor 5xx, malformed payload). The chain records this and moves on.
    #[error("provider '{provider}' call failed: {message}")]
    Provider { provider: String, message: String },

    /// Response body could not be decoded.
    #[error("response error: {0}")]
    Response(String),

    /// The request (or the whole chain call) exceeded its deadline.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Every adapter in the chain was skipped or failed.
    #[error("all LLM providers failed: {}", join_failures(.failures))]
    ChainExhausted { failures: Vec<ChainFailure> },
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout(err.to_string())
        } else if err.is_connect() {
            RelayError::Provider {
                provider: "unknown".to_string(),
                message: format!("connection failed: {err}"),
            }
        } else if err.is_decode() {
            RelayError::Response(format!("failed to decode response: {err}"))
        } else {
            RelayError::Provider {
                provider: "unknown".to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Response(format!("JSON parsing error: {err}"))
    }
}

/// Result type alias for llmrelay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_exhausted_lists_every_failure() {
        let err = RelayError::ChainExhausted {
            failures: vec![
                ChainFailure {
                    provider: "gemini".to_string(),
                    error: "429 quota exceeded".to_string(),
                },
                ChainFailure {
                    provider: "groq".to_string(),
                    error: "connection refused".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("gemini"));
        assert!(msg.contains("groq"));
        assert!(msg.contains("429 quota exceeded"));
    }

    #[test]
    fn test_chain_exhausted_with_no_attempts() {
        let err = RelayError::ChainExhausted { failures: vec![] };
        assert!(err.to_string().contains("no provider was available"));
    }

    #[test]
    fn test_rate_limited_display() {
        let err = RelayError::RateLimited {
            provider: "gemini".to_string(),
            retry_after: Some(30),
        };
        assert_eq!(err.to_string(), "rate limited by 'gemini', retry after 30s");

        let err = RelayError::RateLimited {
            provider: "gemini".to_string(),
            retry_after: None,
        };
        assert_eq!(err.to_string(), "rate limited by 'gemini'");
    }
}

//! LLM Providers
//!
//! The provider adapter trait, the concrete vendor adapters, and the
//! fallback chain that tries them in priority order.

pub mod chain;
pub mod gemini;
pub mod groq;

use crate::client::HttpClient;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub use chain::{ProviderChain, ProviderStatus};
pub use gemini::GeminiProvider;
pub use groq::GroqProvider;

/// A successful generation from some provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// The text payload.
    pub text: String,

    /// Provider that produced it.
    pub provider: String,

    /// Model identifier used for the call.
    pub model: String,

    /// Total tokens reported by the vendor, when available.
    pub tokens_used: u64,
}

/// One LLM vendor behind a uniform generate contract.
///
/// An adapter issues exactly one vendor call per `generate`; retrying across
/// keys or vendors is the chain's responsibility, which keeps the retry
/// boundary visible at the chain level.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stable identifier ("gemini", "groq").
    fn name(&self) -> &str;

    /// Whether the adapter has at least one usable credential right now.
    fn is_available(&self) -> bool;

    /// Generate text for an opaque prompt.
    async fn generate(&self, prompt: &str) -> Result<Generation>;
}

/// Assemble the provider chain from configuration, in priority order:
/// Gemini (primary, multi-key) then Groq (fallback).
///
/// Fails with a configuration error when no provider has credentials.
pub fn build_chain(config: &RelayConfig) -> Result<ProviderChain> {
    let http = HttpClient::new()?;
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

    if let Some(gemini) = &config.gemini {
        if !gemini.api_keys.is_empty() {
            providers.push(Arc::new(GeminiProvider::new(
                gemini.api_keys.clone(),
                gemini.model.clone(),
                config.strategy,
                std::time::Duration::from_secs(config.max_cooldown_wait_secs),
                http.clone(),
            )?));
        }
    }

    if let Some(groq) = &config.groq {
        if !groq.api_key.is_empty() {
            providers.push(Arc::new(GroqProvider::new(
                groq.api_key.clone(),
                groq.model.clone(),
                http.clone(),
            )));
        }
    }

    if providers.is_empty() {
        return Err(RelayError::Config(
            "no LLM provider credentials configured. Set GEMINI_API_KEY(S) or GROQ_API_KEY"
                .to_string(),
        ));
    }

    Ok(ProviderChain::new(providers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeminiSettings, GroqSettings};

    #[test]
    fn test_build_chain_requires_credentials() {
        let err = build_chain(&RelayConfig::default()).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn test_build_chain_priority_order() {
        let config = RelayConfig {
            gemini: Some(GeminiSettings {
                api_keys: vec!["gk1".to_string(), "gk2".to_string()],
                model: GeminiSettings::default_model(),
            }),
            groq: Some(GroqSettings {
                api_key: "qk".to_string(),
                model: GroqSettings::default_model(),
            }),
            ..Default::default()
        };

        let chain = build_chain(&config).unwrap();
        let status = chain.status();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].name, "gemini");
        assert_eq!(status[1].name, "groq");
        assert!(status.iter().all(|s| s.available));
    }

    #[test]
    fn test_build_chain_groq_only() {
        let config = RelayConfig {
            groq: Some(GroqSettings {
                api_key: "qk".to_string(),
                model: GroqSettings::default_model(),
            }),
            ..Default::default()
        };

        let chain = build_chain(&config).unwrap();
        assert_eq!(chain.status().len(), 1);
        assert_eq!(chain.status()[0].name, "groq");
    }
}

//! Provider Chain
//!
//! Ordered fallback over the configured adapters. The chain is not a load
//! balancer: while the primary provider stays healthy every call goes to
//! it, so output style stays consistent and the fallback provider is held
//! in reserve purely for availability.

use crate::client::http::truncate;
use crate::error::{ChainFailure, RelayError, Result};
use crate::providers::{Generation, LlmProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cap on recorded failure messages in the aggregate error.
const ERROR_TRUNCATE_LEN: usize = 100;

/// Availability snapshot of one chain member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
}

/// Ordered fallback chain of provider adapters. Priority is list order;
/// the first adapter is the primary.
pub struct ProviderChain {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    /// Generate text, trying each adapter in priority order.
    ///
    /// Unavailable adapters are skipped without a call; the first success
    /// short-circuits. Fails only when every adapter was skipped or failed,
    /// with an aggregate error naming each recorded failure.
    pub async fn generate(&self, prompt: &str) -> Result<Generation> {
        let mut failures: Vec<ChainFailure> = Vec::new();

        for provider in &self.providers {
            if !provider.is_available() {
                debug!(provider = provider.name(), "skipping unavailable provider");
                continue;
            }

            match provider.generate(prompt).await {
                Ok(generation) => {
                    debug!(
                        provider = provider.name(),
                        tokens = generation.tokens_used,
                        "generation succeeded"
                    );
                    return Ok(generation);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "provider failed, trying next");
                    failures.push(ChainFailure {
                        provider: provider.name().to_string(),
                        error: truncate(&e.to_string(), ERROR_TRUNCATE_LEN).to_string(),
                    });
                }
            }
        }

        Err(RelayError::ChainExhausted { failures })
    }

    /// Generate with a caller-supplied deadline for the whole chain call.
    ///
    /// A timed-out call is cancelled cooperatively and reported as a
    /// failure; callers treat it like chain exhaustion and must not see
    /// partial results.
    pub async fn generate_with_timeout(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<Generation> {
        match tokio::time::timeout(timeout, self.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout(format!(
                "chain call exceeded {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Availability snapshot for operational tooling.
    pub fn status(&self) -> Vec<ProviderStatus> {
        self.providers
            .iter()
            .map(|p| ProviderStatus {
                name: p.name().to_string(),
                available: p.is_available(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

//! Gemini Provider
//!
//! Primary provider. Supports multiple API keys through an owned key pool;
//! a quota signal from the vendor cools the key that was used and the
//! failure propagates to the chain.

use crate::client::HttpClient;
use crate::config::RotationStrategy;
use crate::error::{RelayError, Result};
use crate::keys::{KeyPool, KeyStatus, RATE_LIMIT_COOLDOWN};
use crate::providers::{Generation, LlmProvider};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,

    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

/// Google Gemini adapter with key rotation.
pub struct GeminiProvider {
    pool: KeyPool,
    model: String,
    base_url: String,
    http: HttpClient,
}

impl GeminiProvider {
    /// `max_wait` bounds how long one selection may park when every key is
    /// cooled down.
    pub fn new(
        api_keys: Vec<String>,
        model: String,
        strategy: RotationStrategy,
        max_wait: Duration,
        http: HttpClient,
    ) -> Result<Self> {
        Ok(Self {
            pool: KeyPool::with_max_wait(api_keys, strategy, max_wait)?,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    /// Point the adapter at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-key diagnostics for operational tooling.
    pub fn key_status(&self) -> Vec<KeyStatus> {
        self.pool.key_status()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_available(&self) -> bool {
        self.pool.has_available()
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        // Key selection and the network call are separate steps; the pool
        // lock is never held while the request is in flight.
        let credential = self.pool.select().await;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&credential)
                .map_err(|e| RelayError::Config(format!("invalid Gemini API key: {e}")))?,
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response: GenerateContentResponse = match self
            .http
            .post_json(&self.endpoint(), &body, headers, self.name())
            .await
        {
            Ok(response) => response,
            Err(RelayError::RateLimited { retry_after, .. }) => {
                self.pool.mark_rate_limited(&credential, RATE_LIMIT_COOLDOWN);
                return Err(RelayError::Provider {
                    provider: self.name().to_string(),
                    message: match retry_after {
                        Some(secs) => format!("quota exhausted, retry after {secs}s"),
                        None => "quota exhausted for current key".to_string(),
                    },
                });
            }
            Err(e) => return Err(e),
        };

        let text: String = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RelayError::Provider {
                provider: self.name().to_string(),
                message: "response contained no candidate text".to_string(),
            });
        }

        Ok(Generation {
            text,
            provider: self.name().to_string(),
            model: self.model.clone(),
            tokens_used: response
                .usage_metadata
                .and_then(|u| u.total_token_count)
                .unwrap_or(0),
        })
    }
}

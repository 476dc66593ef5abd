//! HTTP Client
//!
//! Thin async wrapper around reqwest shared by the provider adapters.
//! Classifies vendor rate-limit responses; never retries on its own —
//! fallback policy lives in the provider chain.

use crate::error::{RelayError, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Default per-request timeout. Callers with tighter deadlines wrap the
/// chain call in their own timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Shared HTTP client for vendor calls.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with the default timeouts.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| RelayError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// `headers` carries the vendor's auth header; `provider` names the
    /// caller for error attribution.
    pub async fn post_json<T, R>(
        &self,
        url: &str,
        body: &T,
        headers: HeaderMap,
        provider: &str,
    ) -> Result<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let mut all_headers = HeaderMap::new();
        all_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            if let Some(name) = name {
                all_headers.insert(name, value);
            }
        }

        let response = self
            .client
            .post(url)
            .headers(all_headers)
            .json(body)
            .send()
            .await
            .map_err(|e| attribute(e, provider))?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());

        if status.is_success() {
            let text = response.text().await.map_err(|e| attribute(e, provider))?;
            return serde_json::from_str(&text).map_err(|e| {
                RelayError::Response(format!(
                    "failed to parse {provider} response: {e}. Body: {}",
                    truncate(&text, 500)
                ))
            });
        }

        let body_text = response.text().await.unwrap_or_default();

        if is_rate_limit_error(status.as_u16(), &body_text) {
            return Err(RelayError::RateLimited {
                provider: provider.to_string(),
                retry_after,
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RelayError::Provider {
                provider: provider.to_string(),
                message: format!("authentication failed ({status}): {body_text}"),
            });
        }

        Err(RelayError::Provider {
            provider: provider.to_string(),
            message: format!("request failed with status {status}: {body_text}"),
        })
    }
}

/// Attach the provider name to transport errors.
fn attribute(err: reqwest::Error, provider: &str) -> RelayError {
    match RelayError::from(err) {
        RelayError::Provider { message, .. } => RelayError::Provider {
            provider: provider.to_string(),
            message,
        },
        other => other,
    }
}

/// Parse a `Retry-After: <seconds>` header when present.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Cut `s` to at most `max` bytes, backing up to a char boundary so
/// multi-byte text never panics the error path.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Detect whether a response indicates quota exhaustion.
///
/// HTTP 429, plus the message patterns some vendors return on 400/403
/// (Gemini reports `RESOURCE_EXHAUSTED` in the body).
pub fn is_rate_limit_error(status: u16, body: &str) -> bool {
    if status == 429 {
        return true;
    }

    let lower = body.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("too many requests")
        || lower.contains("quota exceeded")
        || lower.contains("resource_exhausted")
        || lower.contains("resourceexhausted")
}

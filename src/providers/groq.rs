//! Groq Provider
//!
//! Fallback provider. Single credential, OpenAI-compatible chat completions.

use crate::client::HttpClient;
use crate::error::{RelayError, Result};
use crate::providers::{Generation, LlmProvider};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

/// Groq adapter for fast fallback inference.
pub struct GroqProvider {
    api_key: String,
    model: String,
    base_url: String,
    http: HttpClient,
}

impl GroqProvider {
    pub fn new(api_key: String, model: String, http: HttpClient) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    /// Point the adapter at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| RelayError::Config(format!("invalid Groq API key: {e}")))?,
        );

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            max_tokens: 2048,
        };

        let response: ChatCompletionResponse = match self
            .http
            .post_json(&self.endpoint(), &body, headers, self.name())
            .await
        {
            Ok(response) => response,
            // Single credential: nothing to rotate onto, so a quota signal
            // is just a recorded failure for the chain.
            Err(RelayError::RateLimited { retry_after, .. }) => {
                return Err(RelayError::Provider {
                    provider: self.name().to_string(),
                    message: match retry_after {
                        Some(secs) => format!("rate limited, retry after {secs}s"),
                        None => "rate limited".to_string(),
                    },
                });
            }
            Err(e) => return Err(e),
        };

        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RelayError::Provider {
                provider: self.name().to_string(),
                message: "response contained no message content".to_string(),
            });
        }

        Ok(Generation {
            text,
            provider: self.name().to_string(),
            model: self.model.clone(),
            tokens_used: response
                .usage
                .and_then(|u| u.total_tokens)
                .unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(key: &str, base_url: &str) -> GroqProvider {
        GroqProvider::new(
            key.to_string(),
            "llama-3.3-70b-versatile".to_string(),
            HttpClient::new().unwrap(),
        )
        .with_base_url(base_url)
    }

    #[test]
    fn test_availability_tracks_credential() {
        let with_key = provider("qk", "http://localhost");
        assert!(with_key.is_available());

        let without_key = provider("", "http://localhost");
        assert!(!without_key.is_available());
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer qk")
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{ "message": { "role": "assistant", "content": "result" } }],
                    "usage": { "total_tokens": 12 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = provider("qk", &server.url());
        let generation = provider.generate("prompt").await.unwrap();

        assert_eq!(generation.text, "result");
        assert_eq!(generation.provider, "groq");
        assert_eq!(generation.model, "llama-3.3-70b-versatile");
        assert_eq!(generation.tokens_used, 12);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_becomes_provider_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("retry-after", "20")
            .with_body(r#"{"error": "rate limit exceeded"}"#)
            .create_async()
            .await;

        let provider = provider("qk", &server.url());
        let err = provider.generate("prompt").await.unwrap_err();

        match err {
            RelayError::Provider { provider, message } => {
                assert_eq!(provider, "groq");
                assert!(message.contains("retry after 20s"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

//! llmrelay - Multi-provider LLM access layer
//!
//! Key rotation, rate-limit cooldowns and ordered provider fallback for
//! LLM-backed review agents. Gemini is the primary provider (with a
//! rotating key pool), Groq the fallback; the chain tries them in order
//! and surfaces an aggregate error only when every provider fails.
//!
//! The chain is an explicit value: build it once from configuration and
//! share it with `Arc`. There is no hidden global client.
//!
//! ```no_run
//! use std::sync::Arc;
//! use llmrelay::{build_chain, RelayConfig, ReviewAgent, ReviewRole};
//!
//! # async fn run() -> llmrelay::Result<()> {
//! let config = RelayConfig::from_env();
//! let chain = Arc::new(build_chain(&config)?);
//!
//! let agent = ReviewAgent::new(ReviewRole::Security, chain.clone());
//! let review = agent.review_file("app.py", "import os", "").await;
//! println!("{}", review.summary);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod providers;
pub mod review;

pub use config::{GeminiSettings, GroqSettings, RelayConfig, RotationStrategy};
pub use error::{ChainFailure, RelayError, Result};
pub use keys::{KeyPool, KeyStatus};
pub use providers::{
    build_chain, GeminiProvider, Generation, GroqProvider, LlmProvider, ProviderChain,
    ProviderStatus,
};
pub use review::{FileReview, Issue, ReviewAgent, ReviewRole, Severity, SourceFile};

//! Configuration Module
//!
//! Provider settings and loading from environment/config file.

pub mod loader;
pub mod provider;

pub use provider::{
    GeminiSettings, GroqSettings, RelayConfig, RotationStrategy, DEFAULT_MAX_COOLDOWN_WAIT_SECS,
};

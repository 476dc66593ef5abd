//! Provider Configuration
//!
//! Settings schema for the LLM providers and the key rotation policy.

use serde::{Deserialize, Serialize};

/// Default maximum time a caller is parked when every key is cooled down.
pub const DEFAULT_MAX_COOLDOWN_WAIT_SECS: u64 = 60;

/// Strategy for rotating API keys within a pool.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// Rotate through keys sequentially.
    #[default]
    RoundRobin,

    /// Uniform pick among the currently usable keys.
    Random,

    /// Pick the usable key with the lowest request count.
    LeastUsed,
}

impl RotationStrategy {
    /// Parse a strategy name as it appears in env/config
    /// ("round_robin", "random", "least_used").
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "round_robin" => Some(Self::RoundRobin),
            "random" => Some(Self::Random),
            "least_used" => Some(Self::LeastUsed),
            _ => None,
        }
    }
}

/// Settings for the Gemini provider (multi-key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSettings {
    /// Ordered credentials. Order is the round-robin reference frame.
    pub api_keys: Vec<String>,

    /// Model identifier.
    #[serde(default = "GeminiSettings::default_model")]
    pub model: String,
}

impl GeminiSettings {
    pub fn default_model() -> String {
        "gemini-2.0-flash".to_string()
    }
}

/// Settings for the Groq provider (single key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqSettings {
    pub api_key: String,

    /// Model identifier.
    #[serde(default = "GroqSettings::default_model")]
    pub model: String,
}

impl GroqSettings {
    pub fn default_model() -> String {
        "llama-3.3-70b-versatile".to_string()
    }
}

/// Root configuration for the access layer.
///
/// Providers are tried in a fixed priority order: Gemini first, Groq as the
/// fallback. A provider with no settings is simply absent from the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq: Option<GroqSettings>,

    /// Key rotation strategy for multi-key pools.
    #[serde(default)]
    pub strategy: RotationStrategy,

    /// Upper bound on the in-selection wait when every key is cooled down.
    #[serde(default = "default_max_wait")]
    pub max_cooldown_wait_secs: u64,
}

fn default_max_wait() -> u64 {
    DEFAULT_MAX_COOLDOWN_WAIT_SECS
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            gemini: None,
            groq: None,
            strategy: RotationStrategy::default(),
            max_cooldown_wait_secs: DEFAULT_MAX_COOLDOWN_WAIT_SECS,
        }
    }
}

impl RelayConfig {
    /// True when no provider has any credential configured.
    pub fn is_empty(&self) -> bool {
        let gemini_empty = self
            .gemini
            .as_ref()
            .map(|g| g.api_keys.is_empty())
            .unwrap_or(true);
        let groq_empty = self
            .groq
            .as_ref()
            .map(|g| g.api_key.is_empty())
            .unwrap_or(true);
        gemini_empty && groq_empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_config() {
        let json = r#"{
            "gemini": { "api_keys": ["k1", "k2"] },
            "groq": { "api_key": "gk", "model": "llama-3.1-8b-instant" },
            "strategy": "least_used"
        }"#;

        let config: RelayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.gemini.as_ref().unwrap().api_keys.len(), 2);
        assert_eq!(
            config.gemini.as_ref().unwrap().model,
            GeminiSettings::default_model()
        );
        assert_eq!(config.groq.as_ref().unwrap().model, "llama-3.1-8b-instant");
        assert_eq!(config.strategy, RotationStrategy::LeastUsed);
        assert_eq!(
            config.max_cooldown_wait_secs,
            DEFAULT_MAX_COOLDOWN_WAIT_SECS
        );
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            RotationStrategy::parse("round_robin"),
            Some(RotationStrategy::RoundRobin)
        );
        assert_eq!(
            RotationStrategy::parse(" random "),
            Some(RotationStrategy::Random)
        );
        assert_eq!(RotationStrategy::parse("lru"), None);
    }

    #[test]
    fn test_default_carries_wait_bound() {
        assert_eq!(
            RelayConfig::default().max_cooldown_wait_secs,
            DEFAULT_MAX_COOLDOWN_WAIT_SECS
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(RelayConfig::default().is_empty());

        let config = RelayConfig {
            gemini: Some(GeminiSettings {
                api_keys: vec![],
                model: GeminiSettings::default_model(),
            }),
            ..Default::default()
        };
        assert!(config.is_empty());

        let config = RelayConfig {
            groq: Some(GroqSettings {
                api_key: "gk".to_string(),
                model: GroqSettings::default_model(),
            }),
            ..Default::default()
        };
        assert!(!config.is_empty());
    }
}

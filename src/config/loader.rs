//! Configuration Loader
//!
//! Loads provider credentials and rotation settings from the environment,
//! optionally layered over a JSON config file.

use crate::config::provider::{GeminiSettings, GroqSettings, RelayConfig, RotationStrategy};
use crate::error::{RelayError, Result};
use std::path::{Path, PathBuf};

impl RelayConfig {
    /// Load configuration from the environment.
    ///
    /// Reads `.env` if present, then:
    /// - `GEMINI_API_KEYS` (comma-separated) and/or `GEMINI_API_KEY`
    /// - `GEMINI_MODEL`
    /// - `GROQ_API_KEY`, `GROQ_MODEL`
    /// - `LLM_KEY_STRATEGY` ("round_robin", "random", "least_used")
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        let mut gemini_keys = split_keys(&std::env::var("GEMINI_API_KEYS").unwrap_or_default());
        if let Ok(single) = std::env::var("GEMINI_API_KEY") {
            let single = single.trim().to_string();
            if !single.is_empty() && !gemini_keys.contains(&single) {
                gemini_keys.push(single);
            }
        }
        if !gemini_keys.is_empty() {
            config.gemini = Some(GeminiSettings {
                api_keys: gemini_keys,
                model: std::env::var("GEMINI_MODEL")
                    .ok()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(GeminiSettings::default_model),
            });
        }

        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            let key = key.trim().to_string();
            if !key.is_empty() {
                config.groq = Some(GroqSettings {
                    api_key: key,
                    model: std::env::var("GROQ_MODEL")
                        .ok()
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(GroqSettings::default_model),
                });
            }
        }

        if let Ok(name) = std::env::var("LLM_KEY_STRATEGY") {
            if let Some(strategy) = RotationStrategy::parse(&name) {
                config.strategy = strategy;
            }
        }

        config
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("failed to read {}: {e}", path.display())))?;

        serde_json::from_str(&content)
            .map_err(|e| RelayError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Load from the first config file found in the default search paths,
    /// then overlay environment values on top.
    ///
    /// Search order: `$LLMRELAY_CONFIG`, `./llmrelay.json`, then
    /// `<config dir>/llmrelay/config.json`.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        for path in Self::config_paths() {
            if path.exists() {
                config = Self::from_file(&path)?;
                break;
            }
        }

        Ok(config.overlaid_with(Self::from_env()))
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(custom) = std::env::var("LLMRELAY_CONFIG") {
            paths.push(PathBuf::from(custom));
        }

        paths.push(PathBuf::from("llmrelay.json"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("llmrelay").join("config.json"));
        }

        paths
    }

    /// Merge `other` over `self`; set fields in `other` win.
    fn overlaid_with(mut self, other: Self) -> Self {
        if other.gemini.is_some() {
            self.gemini = other.gemini;
        }
        if other.groq.is_some() {
            self.groq = other.groq;
        }
        if other.strategy != RotationStrategy::default() {
            self.strategy = other.strategy;
        }
        if other.max_cooldown_wait_secs != crate::config::DEFAULT_MAX_COOLDOWN_WAIT_SECS {
            self.max_cooldown_wait_secs = other.max_cooldown_wait_secs;
        }
        self
    }
}

/// Split a comma-separated credential list, trimming and dropping empties.
pub(crate) fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

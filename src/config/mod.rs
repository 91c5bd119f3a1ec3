//! Application configuration
//!
//! Settings come from an optional TOML file named by `SKILLMATE_CONFIG`, then
//! individual environment variables override it.

pub mod rules;

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::i18n::Language;

pub use rules::{builtin as rules_builtin, RuleSpec, RuleTable};

/// Upper bound for the simulated thinking time
pub const MAX_RESPONSE_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Display language for widget labels
    #[serde(default)]
    pub language: Language,

    /// Simulated response latency window
    #[serde(default)]
    pub delay: ResponseDelay,

    /// Rule table file; the built-in table is used when unset
    #[serde(default)]
    pub rules_path: Option<PathBuf>,

    /// Label overrides file
    #[serde(default)]
    pub labels_path: Option<PathBuf>,

    /// Replaces the built-in greeting
    #[serde(default)]
    pub greeting: Option<String>,

    /// Quick replies offered under the greeting
    #[serde(default = "default_suggestions")]
    pub suggestions: Vec<String>,
}

fn default_suggestions() -> Vec<String> {
    rules_builtin::SUGGESTIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::default(),
            delay: ResponseDelay::default(),
            rules_path: None,
            labels_path: None,
            greeting: None,
            suggestions: default_suggestions(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var("SKILLMATE_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        if let Ok(lang) = env::var("SKILLMATE_LANG") {
            config.language = lang.parse().map_err(ConfigError::Validation)?;
        }
        if let Some(ms) = env_millis("SKILLMATE_DELAY_MIN_MS")? {
            config.delay.min_ms = ms;
        }
        if let Some(ms) = env_millis("SKILLMATE_DELAY_MAX_MS")? {
            config.delay.max_ms = ms;
        }
        if let Ok(path) = env::var("SKILLMATE_RULES") {
            config.rules_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.delay.validate()?;
        if matches!(&self.greeting, Some(g) if g.trim().is_empty()) {
            return Err(ConfigError::Validation("greeting must not be blank".to_string()));
        }
        if self.suggestions.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "suggestions must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured rule table, falling back to the built-in one
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        match &self.rules_path {
            Some(path) => RuleTable::from_file(path),
            None => Ok(RuleTable::builtin()),
        }
    }
}

fn env_millis(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Validation(format!("{key} must be a number of milliseconds"))),
        Err(_) => Ok(None),
    }
}

/// Bounded window the assistant "thinks" for before replying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDelay {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for ResponseDelay {
    fn default() -> Self {
        Self {
            min_ms: 700,
            max_ms: 1200,
        }
    }
}

impl ResponseDelay {
    /// A constant delay, for deterministic tests
    #[cfg(test)]
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    /// The typing indicator must be visible, and the wait must stay short
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_ms == 0 {
            return Err(ConfigError::Validation(
                "delay.min_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_ms < self.min_ms {
            return Err(ConfigError::Validation(format!(
                "delay.max_ms ({}) is below delay.min_ms ({})",
                self.max_ms, self.min_ms
            )));
        }
        if self.max_ms > MAX_RESPONSE_DELAY_MS {
            return Err(ConfigError::Validation(format!(
                "delay.max_ms must not exceed {MAX_RESPONSE_DELAY_MS}"
            )));
        }
        Ok(())
    }

    /// Draw a delay uniformly from the window
    pub fn sample(&self) -> Duration {
        let ms = if self.max_ms > self.min_ms {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        } else {
            self.min_ms
        };
        Duration::from_millis(ms)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

//! Settings loading and validation.
//!
//! Settings come from an optional TOML file with environment variable
//! overrides on top. Validation happens once at startup; a [`ConfigError`]
//! here is fatal and the process must not start accepting traffic.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramSettings {
    /// Bot token from @BotFather
    #[serde(default)]
    pub bot_token: String,
    /// Long-polling timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u32,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationSettings {
    /// Backend API key
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-attempt request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Custom base URL for API-compatible services
    pub base_url: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatSettings {
    /// Utterances kept per conversation (user and assistant turns combined)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Minimum interval between accepted messages per conversation key
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    /// Style samples kept per privileged sender
    #[serde(default = "default_style_capacity")]
    pub style_capacity: usize,
    /// Cap on the rendered persona prefix (chars)
    #[serde(default = "default_persona_max_chars")]
    pub persona_max_chars: usize,
    /// Sender IDs whose messages feed the style corpus
    #[serde(default)]
    pub privileged_senders: Vec<String>,
    /// Optional seed corpus file, one sample per line
    pub style_corpus_path: Option<PathBuf>,
    /// Overall deadline for one generation call, retries included
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,
    /// Whether to send a typing indicator while generating
    #[serde(default = "default_true")]
    pub send_typing_indicator: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            cooldown_secs: default_cooldown(),
            style_capacity: default_style_capacity(),
            persona_max_chars: default_persona_max_chars(),
            privileged_senders: Vec::new(),
            style_corpus_path: None,
            response_timeout_secs: default_response_timeout(),
            send_typing_indicator: default_true(),
        }
    }
}

fn default_poll_timeout() -> u32 {
    30
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_history_capacity() -> usize {
    20
}

fn default_cooldown() -> u64 {
    3
}

fn default_style_capacity() -> usize {
    50
}

fn default_persona_max_chars() -> usize {
    2_000
}

fn default_response_timeout() -> u64 {
    180
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Load settings from an optional TOML file, apply env overrides, then
    /// validate. Missing file is fine; a present but unreadable or malformed
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&content)?
            }
            _ => Self::default(),
        };

        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Environment variables override file values.
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.generation.api_key = key;
        }
        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            self.generation.model = model;
        }
        if let Ok(value) = std::env::var("PARLEY_COOLDOWN_SECS") {
            if let Ok(secs) = value.parse() {
                self.chat.cooldown_secs = secs;
            }
        }
        if let Ok(senders) = std::env::var("PARLEY_PRIVILEGED_SENDERS") {
            self.chat.privileged_senders = senders
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(path) = std::env::var("PARLEY_STYLE_CORPUS") {
            self.chat.style_corpus_path = Some(PathBuf::from(path));
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("telegram.bot_token"));
        }
        if self.generation.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("generation.api_key"));
        }
        if self.chat.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "chat.history_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.chat.style_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "chat.style_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.chat.persona_max_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "chat.persona_max_chars",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

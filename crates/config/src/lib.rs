//! Configuration loading, validation, and secret resolution for FileChat.
//!
//! Settings live in `~/.filechat/config.toml`. The only secret, the
//! completion API key, is read from the secret store `~/.filechat/secrets.toml`
//! (key `OPENAI_API_KEY`), then from the `OPENAI_API_KEY` environment
//! variable, and finally falls back to a placeholder so the UI still starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Key used both in `secrets.toml` and in the environment.
pub const API_KEY_NAME: &str = "OPENAI_API_KEY";

/// Value used when no key is configured anywhere.
pub const PLACEHOLDER_API_KEY: &str = "your-openai-api-key";

/// Default system instruction.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Respond to user queries and analyze uploaded files if provided.";

/// Default sentence appended to the instruction when a topic is selected.
pub const DEFAULT_TOPIC_TEMPLATE: &str =
    "The user has selected the topic \"{topic}\"; focus your answers on it.";

/// The root configuration structure.
///
/// Maps directly to `~/.filechat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Resolved API key. Never read from or written to `config.toml`.
    #[serde(skip)]
    pub api_key: String,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature; omitted from requests when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Completion endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Persona and topic settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_model() -> String {
    "gpt-4o".into()
}
fn default_max_tokens() -> u32 {
    1000
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("provider", &self.provider)
            .field("assistant", &self.assistant)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name used in logs
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP timeout for a single completion call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Fixed persona/behavior instruction
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Appended when a topic is selected; `{topic}` is substituted
    #[serde(default = "default_topic_template")]
    pub topic_template: String,

    /// Topics offered by the UI selector. Empty hides the selector.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}
fn default_topic_template() -> String {
    DEFAULT_TOPIC_TEMPLATE.into()
}
fn default_topics() -> Vec<String> {
    ["General", "Programming", "Science", "Writing", "Travel"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            topic_template: default_topic_template(),
            topics: default_topics(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Largest accepted request body (uploads included)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Live sessions kept before the oldest is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    8501
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
fn default_max_sessions() -> usize {
    1_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_upload_bytes: default_max_upload_bytes(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Contents of the secret store (`secrets.toml`).
#[derive(Default, Clone, Deserialize)]
pub struct Secrets {
    #[serde(rename = "OPENAI_API_KEY", default)]
    pub openai_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Secrets {
    /// Load the secret store. A missing file is an empty store.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No secret store at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Pick the API key: secret store, then environment, then placeholder.
pub fn resolve_api_key(secrets: &Secrets, env_value: Option<String>) -> String {
    let non_blank = |v: &String| !v.trim().is_empty();

    if let Some(key) = secrets.openai_api_key.clone().filter(non_blank) {
        tracing::debug!("API key taken from secret store");
        return key;
    }
    if let Some(key) = env_value.filter(non_blank) {
        tracing::debug!("API key taken from environment");
        return key;
    }

    tracing::warn!("No API key configured, using placeholder; completion calls will fail");
    PLACEHOLDER_API_KEY.into()
}

impl AppConfig {
    /// Load configuration and secrets from the default directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_in(&Self::config_dir())
    }

    /// Load `config.toml` and `secrets.toml` from a given directory.
    pub fn load_in(dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&dir.join("config.toml"))?;
        let secrets = Secrets::load_from(&dir.join("secrets.toml"))?;
        config.api_key = resolve_api_key(&secrets, std::env::var(API_KEY_NAME).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path. Secrets are not touched.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".filechat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than 0".into(),
            ));
        }

        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.base_url must not be empty".into(),
            ));
        }

        if !self.assistant.topic_template.contains("{topic}") {
            return Err(ConfigError::ValidationError(
                "assistant.topic_template must contain {topic}".into(),
            ));
        }

        Ok(())
    }

    /// Whether a real key (not the placeholder) was found.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty() && self.api_key != PLACEHOLDER_API_KEY
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.into(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            provider: ProviderConfig::default(),
            assistant: AssistantConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

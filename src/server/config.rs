use crate::exec_ctx::DEFAULT_MODEL;
#[cfg(feature = "s3")]
use crate::storage::S3Settings;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `MESSAGE_RELAY__COMPLETION__BASE_URL`.
pub const ENV_PREFIX: &str = "MESSAGE_RELAY";

/// Process configuration.
///
/// Read from an optional `message-relay.{toml,yaml,json}` file, then from
/// the environment (a `.env` file is honoured). Every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// `tracing` env-filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub completion: CompletionSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub telegram: TelegramSettings,
}

/// Where the completion service lives and what to send it by default.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionSettings {
    #[serde(default = "default_completion_url")]
    pub base_url: String,
    /// Used when a message carries no token.
    #[serde(default)]
    pub token: String,
    /// Used when a message names no model.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Keep images in process memory. The issued `memory://` URLs cannot be
    /// fetched by the completion service, so this is for local runs only.
    Memory,
    /// S3-compatible object store. Needs a `[storage.s3]` section.
    #[default]
    S3,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub kind: StorageKind,
    #[cfg(feature = "s3")]
    #[serde(default)]
    pub s3: Option<S3Settings>,
}

#[derive(Clone, Deserialize)]
pub struct TelegramSettings {
    /// Bot token. The `/telegram/*` routes answer 503 without one.
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Public base URL of this service; the webhook is registered under it.
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "***"))
            .field("webhook_url", &self.webhook_url)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            log_level: default_log_level(),
            completion: CompletionSettings::default(),
            storage: StorageSettings::default(),
            telegram: TelegramSettings::default(),
        }
    }
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            webhook_url: String::new(),
            api_base: default_telegram_api(),
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: default_completion_url(),
            token: String::new(),
            model: default_model(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load configuration from `.env`, the config file and environment variables.
    pub fn load() -> anyhow::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e.into());
            }
        }

        let config = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("message-relay").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> anyhow::Result<Self> {
        Ok(config.try_deserialize()?)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

impl CompletionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_body_size_mb() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_completion_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_completion_timeout_secs() -> u64 {
    60
}

fn default_telegram_api() -> String {
    crate::telegram::client::DEFAULT_API_BASE.to_string()
}

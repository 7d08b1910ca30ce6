//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::session::RawOrder;

/// Base URL of the hosted MetisAI API
pub const DEFAULT_BASE_URL: &str = "https://api.metisai.ir/api/v1";

/// Root configuration for metis-chat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiSection,
    /// Chat behaviour
    #[serde(default)]
    pub chat: ChatSection,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings stored in `config.json`
///
/// Credentials are kept apart in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds; 0 leaves the transport default
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: 0,
        }
    }
}

/// Chat behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatSection {
    /// Order of untimestamped messages in list/get session payloads
    #[serde(default)]
    pub history_order: RawOrder,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files, relative paths resolve against the config directory
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Days to keep rotated log files
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Also log to stderr
    #[serde(default)]
    pub console: bool,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_retention_days() -> u64 {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            retention_days: default_retention_days(),
            console: false,
            overrides: HashMap::new(),
        }
    }
}

/// Runtime configuration of the API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_key: String,
    pub bot_id: String,
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(
        api_key: impl Into<String>,
        bot_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            bot_id: bot_id.into(),
            base_url: base_url.into(),
        }
    }

    /// Merge the fields present in `update`
    pub fn apply(&mut self, update: ApiConfigUpdate) {
        if let Some(api_key) = update.api_key {
            self.api_key = api_key;
        }
        if let Some(bot_id) = update.bot_id {
            self.bot_id = bot_id;
        }
        if let Some(base_url) = update.base_url {
            self.base_url = base_url;
        }
    }

    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            bot_id: String::new(),
            base_url: default_base_url(),
        }
    }
}

/// Partial update of [`ApiConfig`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfigUpdate {
    pub api_key: Option<String>,
    pub bot_id: Option<String>,
    pub base_url: Option<String>,
}

//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use crate::error::Error;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "METIS_CHAT__";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".metis-chat"))
            .unwrap_or_else(|| PathBuf::from(".metis-chat"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("{} is not valid JSON: {}", config_path.display(), e))
            })?;
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("invalid configuration: {}", e)))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        validate_config(config)?;
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the default credential file inside the config directory
    pub fn credentials_path(&self) -> PathBuf {
        self.config_dir.join("credentials.json")
    }

    /// Resolve the log directory against the config directory
    pub fn log_dir(&self, config: &Config) -> PathBuf {
        let dir = Path::new(&config.logging.dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.config_dir.join(dir)
        }
    }

    fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Overlay `overlay` onto `base`, descending into objects present in both
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_values(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Set `value` at a dotted path, creating intermediate objects
fn set_path(root: &mut Value, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *root = value;
        return;
    };
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        set_path(map.entry(*head).or_insert(Value::Null), rest, value);
    }
}

fn apply_alias_overrides(config: &mut Value) {
    if let Ok(base_url) = std::env::var("METISAI_BASE_URL") {
        set_path(config, &["api", "base_url"], Value::String(base_url));
    }
}

/// `METIS_CHAT__API__TIMEOUT_SECS=30` sets `api.timeout_secs`; values are
/// parsed as JSON and fall back to plain strings.
fn apply_path_overrides(config: &mut Value) {
    for (key, raw) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let suffix = suffix.to_ascii_lowercase();
        let path: Vec<&str> = suffix.split("__").filter(|s| !s.is_empty()).collect();
        if path.is_empty() {
            continue;
        }
        let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
        set_path(config, &path, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RawOrder;
    use crate::testing::{lock_env, EnvVarGuard};
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.api.base_url, "https://api.metisai.ir/api/v1");
        assert_eq!(config.chat.history_order, RawOrder::NewestFirst);
    }

    #[test]
    fn test_save_and_load_config() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.api.base_url = "http://localhost:9000/api/v1".to_string();
        config.chat.history_order = RawOrder::OldestFirst;

        loader.save(&config).unwrap();
        let loaded = loader.load().unwrap();

        assert_eq!(loaded.api.base_url, "http://localhost:9000/api/v1");
        assert_eq!(loaded.chat.history_order, RawOrder::OldestFirst);
    }

    #[test]
    fn test_load_applies_alias_env_override() {
        let _lock = lock_env();
        let _guard = EnvVarGuard::set("METISAI_BASE_URL", "https://staging.example/api");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert_eq!(config.api.base_url, "https://staging.example/api");
    }

    #[test]
    fn test_path_env_overrides_alias_and_file() {
        let _lock = lock_env();
        let _alias_guard = EnvVarGuard::set("METISAI_BASE_URL", "https://alias.example/api");
        let _path_guard = EnvVarGuard::set("METIS_CHAT__API__BASE_URL", "https://path.example/api");
        let _timeout_guard = EnvVarGuard::set("METIS_CHAT__API__TIMEOUT_SECS", "30");
        let _order_guard = EnvVarGuard::set("METIS_CHAT__CHAT__HISTORY_ORDER", "oldest_first");

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"api":{"base_url":"https://file.example/api"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.api.base_url, "https://path.example/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.chat.history_order, RawOrder::OldestFirst);
    }

    #[test]
    fn test_path_env_values_fall_back_to_strings() {
        let _lock = lock_env();
        let _console_guard = EnvVarGuard::set("METIS_CHAT__LOGGING__CONSOLE", "true");
        let _level_guard = EnvVarGuard::set("METIS_CHAT__LOGGING__LEVEL", "debug");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert!(config.logging.console);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_malformed_config_file_is_a_config_error() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.json"), "{ not json").unwrap();

        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("config.json")));
    }

    #[test]
    fn test_mistyped_override_is_a_config_error() {
        let _lock = lock_env();
        let _guard = EnvVarGuard::set("METIS_CHAT__CHAT__HISTORY_ORDER", "sideways");

        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validation_rejects_invalid_base_url() {
        let _lock = lock_env();
        let _guard = EnvVarGuard::set("METIS_CHAT__API__BASE_URL", "localhost");

        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
    }

    #[test]
    fn test_log_dir_resolves_relative_to_config_dir() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = Config::default();

        assert_eq!(loader.log_dir(&config), temp_dir.path().join("logs"));
    }
}

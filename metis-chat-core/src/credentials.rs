//! Persisted API credentials
//!
//! The API key and bot id live in a small durable key-value store under
//! two fixed keys. Missing either key means the client must be configured
//! before it can talk to the backend.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ApiConfigUpdate;
use crate::{Error, Result};

/// Storage key of the API key
pub const API_KEY_KEY: &str = "metisai_api_key";
/// Storage key of the bot id
pub const BOT_ID_KEY: &str = "metisai_bot_id";

/// Minimal durable string key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Key-value store backed by a JSON object file
pub struct FileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            Error::Credentials(format!("{} is not a JSON object of strings: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// In-memory key-value store
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// API key and bot id pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub bot_id: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, bot_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            bot_id: bot_id.into(),
        }
    }

    /// Read both keys; `None` when either is absent or blank
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>> {
        let api_key = non_blank(store.get(API_KEY_KEY)?);
        let bot_id = non_blank(store.get(BOT_ID_KEY)?);
        Ok(match (api_key, bot_id) {
            (Some(api_key), Some(bot_id)) => Some(Self { api_key, bot_id }),
            _ => {
                debug!("Credentials incomplete, configuration required");
                None
            }
        })
    }

    /// Like [`Credentials::load`], with `METISAI_API_KEY` / `METISAI_BOT_ID` taking precedence
    pub fn resolve(store: &dyn KeyValueStore) -> Result<Option<Self>> {
        let api_key = non_blank(std::env::var("METISAI_API_KEY").ok())
            .or(non_blank(store.get(API_KEY_KEY)?));
        let bot_id = non_blank(std::env::var("METISAI_BOT_ID").ok())
            .or(non_blank(store.get(BOT_ID_KEY)?));
        Ok(api_key
            .zip(bot_id)
            .map(|(api_key, bot_id)| Self { api_key, bot_id }))
    }

    /// Write both keys
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        if self.api_key.trim().is_empty() || self.bot_id.trim().is_empty() {
            return Err(Error::Credentials(
                "api key and bot id must both be non-empty".to_string(),
            ));
        }
        store.set(API_KEY_KEY, &self.api_key)?;
        store.set(BOT_ID_KEY, &self.bot_id)?;
        Ok(())
    }

    /// Remove both keys
    pub fn clear(store: &dyn KeyValueStore) -> Result<()> {
        store.remove(API_KEY_KEY)?;
        store.remove(BOT_ID_KEY)
    }

    /// Partial API config update carrying these credentials
    pub fn to_update(&self) -> ApiConfigUpdate {
        ApiConfigUpdate {
            api_key: Some(self.api_key.clone()),
            bot_id: Some(self.bot_id.clone()),
            base_url: None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

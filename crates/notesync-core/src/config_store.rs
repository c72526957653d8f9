//! Key-value storage for the persisted user configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::defaults::CONFIG_KEY;
use crate::error::{Error, Result};
use crate::models::SyncConfig;

/// Minimal get/set storage keyed by string.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Value stored under `key`, or `None`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Load the user configuration; a missing entry yields defaults.
pub async fn load_sync_config(store: &dyn ConfigStore) -> Result<SyncConfig> {
    match store.get(CONFIG_KEY).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(SyncConfig::default()),
    }
}

/// Persist the user configuration.
pub async fn save_sync_config(store: &dyn ConfigStore, config: &SyncConfig) -> Result<()> {
    store.set(CONFIG_KEY, serde_json::to_value(config)?).await
}

/// JSON object on disk, one top-level key per entry.
pub struct JsonFileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => {
                warn!(
                    subsystem = "core",
                    component = "config_store",
                    path = %self.path.display(),
                    "Config file is not a JSON object, ignoring contents"
                );
                Ok(Map::new())
            }
        }
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.write().await;
        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(all))?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", self.path.display(), e)))?;

        debug!(subsystem = "core", component = "config_store", key, "Config entry saved");
        Ok(())
    }
}

/// In-process store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

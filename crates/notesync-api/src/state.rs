//! Shared bridge state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use notesync_core::defaults::{CONFIG_PATH, ENV_CONFIG_PATH};
use notesync_core::{ConfigStore, JsonFileStore, Result};
use notesync_extract::{Extractor, HoverOptions, PageSession};
use notesync_feishu::{FeishuClient, SyncEngine, SyncOptions};

/// Browser tab identifier.
pub type TabId = i64;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: SyncEngine,
    pub extractor: Extractor,
    /// Persisted user configuration.
    pub store: Arc<dyn ConfigStore>,
    /// One page session per open tab.
    pub sessions: Arc<Mutex<HashMap<TabId, PageSession>>>,
}

impl AppState {
    pub fn new(engine: SyncEngine, extractor: Extractor, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            engine,
            extractor,
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build the production state from environment variables.
    pub fn from_env() -> Result<Self> {
        let client = FeishuClient::from_env()?;
        let engine = SyncEngine::new(Arc::new(client)).with_options(SyncOptions::from_env());

        let config_path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| CONFIG_PATH.to_string());
        info!(
            subsystem = "api",
            config_path = %config_path,
            deadline_secs = engine.options().deadline.as_secs(),
            "Bridge state initialized"
        );

        // Snapshots are static, so one look for the hover card is enough.
        let extractor = Extractor::from_env().with_hover_options(HoverOptions {
            timeout: Duration::ZERO,
            ..HoverOptions::default()
        });

        Ok(Self::new(
            engine,
            extractor,
            Arc::new(JsonFileStore::new(config_path)),
        ))
    }
}

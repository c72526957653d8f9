//! Message dispatch for the browser extension.
//!
//! The extension posts `{action, ...}` messages to one endpoint. Each
//! action maps to an extractor, sync-engine or page-session operation and
//! answers with that operation's own JSON shape.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use notesync_core::logging;
use notesync_core::{load_sync_config, save_sync_config, NoteRecord, RecommendLevel, SyncConfig, SyncResponse};
use notesync_extract::{PageContext, PageSession, SnapshotProbe};
use notesync_feishu::UpdateData;

use crate::error::ApiError;
use crate::state::{AppState, TabId};

const CONFIG_SAVED: &str = "配置已保存";

/// One inbound message, discriminated by `action`.
///
/// Sync-engine actions fall back to the persisted configuration when the
/// message carries none.
#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    SyncToFeishu {
        data: NoteRecord,
        #[serde(default)]
        config: Option<SyncConfig>,
        #[serde(default)]
        current_url: String,
    },
    CreateFeishuTable {
        #[serde(default)]
        config: Option<SyncConfig>,
    },
    UpdateFeishuTable {
        #[serde(default)]
        config: Option<SyncConfig>,
        #[serde(default)]
        update_data: UpdateData,
    },
    TestFeishuConnection {
        #[serde(default)]
        config: Option<SyncConfig>,
    },
    ExtractNote {
        url: String,
        html: String,
        #[serde(default)]
        state: BTreeMap<String, Value>,
        #[serde(default)]
        hover_card_html: Option<String>,
        #[serde(default)]
        recommend_level: Option<RecommendLevel>,
    },
    PageNavigated {
        tab_id: TabId,
        url: String,
    },
    InjectionAttempt {
        tab_id: TabId,
    },
    ButtonInjected {
        tab_id: TabId,
    },
    PageClosed {
        tab_id: TabId,
    },
    GetConfig,
    SaveConfig {
        config: SyncConfig,
    },
}

impl Message {
    pub fn action(&self) -> &'static str {
        match self {
            Message::SyncToFeishu { .. } => "syncToFeishu",
            Message::CreateFeishuTable { .. } => "createFeishuTable",
            Message::UpdateFeishuTable { .. } => "updateFeishuTable",
            Message::TestFeishuConnection { .. } => "testFeishuConnection",
            Message::ExtractNote { .. } => "extractNote",
            Message::PageNavigated { .. } => "pageNavigated",
            Message::InjectionAttempt { .. } => "injectionAttempt",
            Message::ButtonInjected { .. } => "buttonInjected",
            Message::PageClosed { .. } => "pageClosed",
            Message::GetConfig => "getConfig",
            Message::SaveConfig { .. } => "saveConfig",
        }
    }
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /api/v1/message`
#[instrument(skip_all, fields(subsystem = "api", component = "dispatch", op = tracing::field::Empty))]
pub async fn dispatch(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let message: Message = serde_json::from_slice(&body)?;
    let action = message.action();
    tracing::Span::current().record(logging::OPERATION, action);

    let start = Instant::now();
    let response = handle(&state, message).await?;
    debug!(action, duration_ms = start.elapsed().as_millis() as u64, "Message handled");
    Ok(response)
}

async fn handle(state: &AppState, message: Message) -> Result<Response, ApiError> {
    match message {
        Message::SyncToFeishu {
            data,
            config,
            current_url,
        } => {
            let config = resolve_config(state, config).await?;
            let response = state.engine.sync(&data, &config, &current_url).await;
            Ok(Json(response).into_response())
        }

        Message::CreateFeishuTable { config } => {
            let config = resolve_config(state, config).await?;
            Ok(Json(state.engine.create_table(&config).await).into_response())
        }

        Message::UpdateFeishuTable { config, update_data } => {
            let config = resolve_config(state, config).await?;
            Ok(Json(state.engine.update_table(&config, &update_data).await).into_response())
        }

        Message::TestFeishuConnection { config } => {
            let config = resolve_config(state, config).await?;
            Ok(Json(state.engine.test_connection(&config).await).into_response())
        }

        Message::ExtractNote {
            url,
            html,
            state: globals,
            hover_card_html,
            recommend_level,
        } => {
            let probe = SnapshotProbe::new(html.clone(), None);
            let mut ctx = PageContext::new(url, html);
            ctx.state = globals;
            ctx.hover_card_html = hover_card_html;

            let mut record = state.extractor.extract_with_probe(ctx, &probe).await;
            if let Some(level) = recommend_level {
                record.recommend_level = level;
            }
            Ok(Json(record).into_response())
        }

        Message::PageNavigated { tab_id, url } => {
            let mut sessions = state.sessions.lock().await;
            let outcome = sessions.entry(tab_id).or_insert_with(PageSession::new).on_navigation(&url);
            Ok(Json(outcome).into_response())
        }

        Message::InjectionAttempt { tab_id } => {
            let mut sessions = state.sessions.lock().await;
            let session = sessions
                .get_mut(&tab_id)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown tab: {}", tab_id)))?;
            let proceed = !session.is_injected() && session.record_attempt();
            Ok(Json(json!({ "proceed": proceed, "attempts": session.attempts() })).into_response())
        }

        Message::ButtonInjected { tab_id } => {
            let mut sessions = state.sessions.lock().await;
            let session = sessions
                .get_mut(&tab_id)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown tab: {}", tab_id)))?;
            session.mark_injected();
            Ok(Json(json!({ "success": true })).into_response())
        }

        Message::PageClosed { tab_id } => {
            let removed = state.sessions.lock().await.remove(&tab_id);
            if let Some(mut session) = removed {
                session.stop();
                info!(tab_id, url = %session.url(), "Tab session closed");
            }
            Ok(Json(json!({ "success": true })).into_response())
        }

        Message::GetConfig => {
            let config = load_sync_config(state.store.as_ref())
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(Json(config).into_response())
        }

        Message::SaveConfig { config } => {
            save_sync_config(state.store.as_ref(), &config)
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            info!(sync_mode = %config.sync_mode, upload_files = config.upload_files, "Configuration saved");
            Ok(Json(SyncResponse::ok(CONFIG_SAVED)).into_response())
        }
    }
}

async fn resolve_config(state: &AppState, config: Option<SyncConfig>) -> Result<SyncConfig, ApiError> {
    match config {
        Some(config) => Ok(config),
        None => load_sync_config(state.store.as_ref())
            .await
            .map_err(|e| ApiError::Internal(e.to_string())),
    }
}

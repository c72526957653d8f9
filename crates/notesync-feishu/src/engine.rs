//! Sync orchestration.
//!
//! One sync runs a fixed, strictly sequential pipeline:
//!
//! ```text
//! Idle -> Authenticated -> DestinationValidated -> SchemaReconciled
//!      -> [AttachmentsUploaded] -> Written
//! ```
//!
//! The first hard failure halts the pipeline and becomes the `error` of the
//! returned [`SyncResponse`]. Attachment upload is best-effort and never
//! halts. The whole run is bounded by [`SyncOptions::deadline`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use notesync_core::defaults::{
    ENV_FIELD_CREATE_DELAY_MS, ENV_SYNC_DEADLINE_SECS, FIELD_CREATE_DELAY_MS, SYNC_DEADLINE_SECS,
};
use notesync_core::{Error, NoteRecord, Result, SyncConfig, SyncMode, SyncResponse};

use crate::destination::{parse_destination, Destination};
use crate::diagnostics::{self, ConnectionReport};
use crate::projection::{build_row, required_columns, row_note_id};
use crate::provision::{self, CreateTableResponse};
use crate::schema::{column, ensure_fields};
use crate::service::TableService;
use crate::types::{Row, UpdateData};

/// Returned when a sync completes.
pub const SYNC_SUCCESS: &str = "数据已成功同步到飞书多维表格";

/// Returned when the credential pair is incomplete.
pub const MISSING_CREDENTIALS: &str = "请先在侧边栏配置飞书应用信息";

/// Returned when the token exchange fails for any reason.
pub const TOKEN_FAILURE: &str = "获取飞书访问令牌失败，请检查App ID和App Secret";

/// Timing knobs for [`SyncEngine`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Upper bound on one complete sync.
    pub deadline: Duration,
    /// Pause after each column creation.
    pub field_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(SYNC_DEADLINE_SECS),
            field_delay: Duration::from_millis(FIELD_CREATE_DELAY_MS),
        }
    }
}

impl SyncOptions {
    pub fn from_env() -> Self {
        Self {
            deadline: Duration::from_secs(
                std::env::var(ENV_SYNC_DEADLINE_SECS)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(SYNC_DEADLINE_SECS),
            ),
            field_delay: Duration::from_millis(
                std::env::var(ENV_FIELD_CREATE_DELAY_MS)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(FIELD_CREATE_DELAY_MS),
            ),
        }
    }
}

/// Pipeline stage most recently reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    Authenticated,
    DestinationValidated,
    SchemaReconciled,
    AttachmentsUploaded,
    Written,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Authenticated => "authenticated",
            Self::DestinationValidated => "destination_validated",
            Self::SchemaReconciled => "schema_reconciled",
            Self::AttachmentsUploaded => "attachments_uploaded",
            Self::Written => "written",
        }
    }
}

/// How the write step touched the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Created { record_id: String },
    Updated { record_id: String },
    Replaced { record_id: String, deleted: usize },
}

/// A halted pipeline: the stage reached and the text shown to the user.
#[derive(Debug)]
struct Halt {
    stage: SyncStage,
    message: String,
}

impl Halt {
    fn at(stage: SyncStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Drives syncs, provisioning and diagnostics against a [`TableService`].
#[derive(Clone)]
pub struct SyncEngine {
    service: Arc<dyn TableService>,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(service: Arc<dyn TableService>) -> Self {
        Self {
            service,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync one record to the configured destination.
    #[instrument(
        skip_all,
        fields(subsystem = "feishu", component = "engine", op = "sync", note_id = %record.id, sync_mode = %config.sync_mode)
    )]
    pub async fn sync(&self, record: &NoteRecord, config: &SyncConfig, current_url: &str) -> SyncResponse {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.options.deadline, self.run(record, config, current_url)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(written)) => {
                info!(duration_ms, success = true, outcome = ?written, "Sync completed");
                SyncResponse::ok(SYNC_SUCCESS)
            }
            Ok(Err(halt)) => {
                error!(duration_ms, stage = halt.stage.as_str(), error = %halt.message, "Sync halted");
                SyncResponse::failed(halt.message)
            }
            Err(_) => {
                error!(duration_ms, "Sync deadline exceeded");
                SyncResponse::failed(format!(
                    "同步超时：超过{}秒未完成，请稍后重试",
                    self.options.deadline.as_secs()
                ))
            }
        }
    }

    async fn run(
        &self,
        record: &NoteRecord,
        config: &SyncConfig,
        current_url: &str,
    ) -> std::result::Result<WriteOutcome, Halt> {
        let mut stage = SyncStage::Idle;

        if !config.has_credentials() {
            return Err(Halt::at(stage, MISSING_CREDENTIALS));
        }
        let dest = parse_destination(&config.table_url).map_err(|e| Halt::at(stage, e.to_string()))?;

        let token = match self.service.authenticate(&config.app_id, &config.app_secret).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Token exchange failed");
                return Err(Halt::at(stage, TOKEN_FAILURE));
            }
        };
        stage = self.advance(stage, SyncStage::Authenticated);

        let metadata = self
            .service
            .app_metadata(&token, &dest.app_token)
            .await
            .map_err(|e| Halt::at(stage, e.to_string()))?;
        info!(
            app_token = dest.app_token_prefix(),
            table_id = %dest.table_id,
            name = %metadata.name,
            revision = metadata.revision,
            "Destination validated"
        );
        if metadata.is_advanced {
            warn!("Destination has advanced permissions enabled; the app must be granted access");
        }
        stage = self.advance(stage, SyncStage::DestinationValidated);

        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut row = build_row(record, &config.sync_fields, current_url, now_ms);

        ensure_fields(
            self.service.as_ref(),
            &token,
            &dest,
            &required_columns(&row),
            self.options.field_delay,
        )
        .await
        .map_err(|e| Halt::at(stage, format!("字段检查失败: {}", e)))?;
        stage = self.advance(stage, SyncStage::SchemaReconciled);

        if config.upload_files && !record.images.is_empty() {
            let file_tokens = self.upload_attachments(&token, &record.images).await;
            if !file_tokens.is_empty() {
                if let Err(e) = ensure_fields(
                    self.service.as_ref(),
                    &token,
                    &dest,
                    &[column::ATTACHMENT.to_string()],
                    self.options.field_delay,
                )
                .await
                {
                    warn!(error = %e, "Attachment column could not be created");
                }
                row.insert(column::ATTACHMENT.into(), json!(file_tokens.join(", ")));
            }
            stage = self.advance(stage, SyncStage::AttachmentsUploaded);
        }

        let written = self
            .write(&token, &dest, &row, config.sync_mode)
            .await
            .map_err(|e| Halt::at(stage, e.to_string()))?;
        self.advance(stage, SyncStage::Written);
        Ok(written)
    }

    fn advance(&self, from: SyncStage, to: SyncStage) -> SyncStage {
        debug!(from = from.as_str(), to = to.as_str(), "Sync stage");
        to
    }

    /// Upload each image in order, skipping any that fail.
    pub async fn upload_attachments(&self, token: &str, image_urls: &[String]) -> Vec<String> {
        let mut file_tokens = Vec::with_capacity(image_urls.len());
        for url in image_urls {
            match self.service.upload_image(token, url).await {
                Ok(file_token) => file_tokens.push(file_token),
                Err(e) => warn!(
                    subsystem = "feishu",
                    component = "engine",
                    op = "upload",
                    url = %url,
                    error = %e,
                    "Attachment skipped"
                ),
            }
        }
        info!(
            subsystem = "feishu",
            component = "engine",
            op = "upload",
            item_count = file_tokens.len(),
            requested = image_urls.len(),
            "Attachments uploaded"
        );
        file_tokens
    }

    /// Write `row` according to `mode`.
    ///
    /// Overwrite deletes every existing row before creating the new one and
    /// is not transactional: a failure after the delete loses the old rows.
    #[instrument(skip(self, token, row), fields(subsystem = "feishu", component = "engine", op = "write", table_id = %dest.table_id))]
    pub async fn write(&self, token: &str, dest: &Destination, row: &Row, mode: SyncMode) -> Result<WriteOutcome> {
        match mode {
            SyncMode::Append => {
                let record_id = self.service.create_record(token, dest, row).await?;
                Ok(WriteOutcome::Created { record_id })
            }
            SyncMode::Merge => {
                let note_id = row_note_id(row)
                    .ok_or_else(|| Error::Internal("projected row has no identifier".into()))?;
                match self
                    .service
                    .search_record(token, dest, column::NOTE_ID, note_id)
                    .await?
                {
                    Some(record_id) => {
                        debug!(note_id, record_id = %record_id, "Updating existing row");
                        self.service.update_record(token, dest, &record_id, row).await?;
                        Ok(WriteOutcome::Updated { record_id })
                    }
                    None => {
                        let record_id = self.service.create_record(token, dest, row).await?;
                        Ok(WriteOutcome::Created { record_id })
                    }
                }
            }
            SyncMode::Overwrite => {
                let existing = self.service.list_record_ids(token, dest).await?;
                if !existing.is_empty() {
                    warn!(item_count = existing.len(), "Deleting every existing row");
                    self.service.batch_delete(token, dest, &existing).await?;
                }
                let record_id = self.service.create_record(token, dest, row).await?;
                Ok(WriteOutcome::Replaced {
                    record_id,
                    deleted: existing.len(),
                })
            }
        }
    }

    /// Run the five-step connection diagnostic.
    pub async fn test_connection(&self, config: &SyncConfig) -> ConnectionReport {
        diagnostics::test_connection(self.service.as_ref(), config).await
    }

    /// Provision a new destination table with the full column set.
    pub async fn create_table(&self, config: &SyncConfig) -> CreateTableResponse {
        provision::create_table(self.service.as_ref(), config, self.options.field_delay).await
    }

    /// Apply metadata changes to the configured destination.
    pub async fn update_table(&self, config: &SyncConfig, update: &UpdateData) -> SyncResponse {
        provision::update_table(self.service.as_ref(), config, update).await
    }
}

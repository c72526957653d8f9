//! # notesync-feishu
//!
//! Sync engine for a bitable destination: authenticate, validate the
//! destination, reconcile its columns, upload attachments and write one
//! [`NoteRecord`](notesync_core::NoteRecord) in append, merge or overwrite
//! mode. Also provisions new destinations and runs connection diagnostics.
//!
//! ```no_run
//! use std::sync::Arc;
//! use notesync_core::{NoteRecord, SyncConfig};
//! use notesync_feishu::{FeishuClient, SyncEngine};
//!
//! # async fn run(record: NoteRecord, config: SyncConfig) -> notesync_core::Result<()> {
//! let engine = SyncEngine::new(Arc::new(FeishuClient::from_env()?));
//! let response = engine.sync(&record, &config, &record.note_url).await;
//! println!("{:?}", response);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod destination;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod projection;
pub mod provision;
pub mod schema;
pub mod service;
pub mod types;

pub use client::{FeishuClient, FeishuConfig};
pub use destination::{parse_destination, Destination};
pub use diagnostics::{ConnectionReport, StepStatus, TableInfo, TestStep};
pub use engine::{SyncEngine, SyncOptions, SyncStage, WriteOutcome};
pub use error::{api_error, map_error_code};
pub use projection::build_row;
pub use provision::{CreateTableResponse, ProvisionedTable};
pub use schema::{column, column_spec, ensure_fields, infer_field_type, ColumnSpec, FieldType, COLUMNS};
pub use service::TableService;
pub use types::{AppMetadata, Row, UpdateData};

//! # notesync-core
//!
//! Core types, parsing helpers, and the error taxonomy shared by the
//! notesync extractor, sync engine, and bridge.

pub mod config_store;
pub mod defaults;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod numbers;
pub mod scoring;
pub mod temporal;

// Re-export commonly used types at crate root
pub use config_store::{load_sync_config, save_sync_config, ConfigStore, JsonFileStore, MemoryStore};
pub use error::{Error, Result};
pub use identity::{derive_note_id, is_note_detail_page, note_id_from_url};
pub use models::*;
pub use numbers::{count_from_json, parse_number};
pub use scoring::{like_follow_ratio, note_score};
pub use temporal::{json_epoch_millis, local_now, local_offset, parse_relative_time, to_epoch_millis};

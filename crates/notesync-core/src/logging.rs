//! Structured logging field name constants for notesync.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A sync step halted the pipeline |
//! | WARN  | Recoverable issue, fallback applied (attachment skipped, time unparsable) |
//! | INFO  | Lifecycle events, completed syncs and provisioning |
//! | DEBUG | Decision points: which resolver produced a field, projected columns |
//! | TRACE | Per-probe iteration |
//!
//! Secrets (app secret, tenant access token) are never logged.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one bridge request.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "extract", "feishu"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "resolver", "hover", "client", "engine", "schema"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "authenticate", "ensure_fields", "write", "extract"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note identifier (merge key).
pub const NOTE_ID: &str = "note_id";

/// Destination app token.
pub const APP_TOKEN: &str = "app_token";

/// Destination sub-table id.
pub const TABLE_ID: &str = "table_id";

/// Semantic field being resolved or column being provisioned.
pub const FIELD: &str = "field";

/// Resolver source that produced a value ("json", "hover", "selector", "scan").
pub const SOURCE: &str = "source";

/// Sync mode in effect.
pub const SYNC_MODE: &str = "sync_mode";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of items touched (fields created, rows deleted, files uploaded).
pub const ITEM_COUNT: &str = "item_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Envelope code returned by the table service.
pub const API_CODE: &str = "api_code";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_distinct() {
        let names = [
            REQUEST_ID, SUBSYSTEM, COMPONENT, OPERATION, NOTE_ID, APP_TOKEN, TABLE_ID, FIELD,
            SOURCE, SYNC_MODE, DURATION_MS, ITEM_COUNT, SUCCESS, ERROR_MSG, API_CODE,
        ];
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}

//! Centralized default constants for notesync.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// TABLE SERVICE
// =============================================================================

/// Base URL of the table service's open API.
pub const FEISHU_BASE_URL: &str = "https://open.feishu.cn/open-apis";

/// Per-request timeout for table-service calls.
pub const FEISHU_TIMEOUT_SECS: u64 = 30;

/// Deadline for one complete sync orchestration.
pub const SYNC_DEADLINE_SECS: u64 = 120;

/// Pause between consecutive field-creation requests (write-rate pacing).
pub const FIELD_CREATE_DELAY_MS: u64 = 200;

/// Sub-table identifier used when the destination URL names none.
pub const DEFAULT_TABLE_ID: &str = "default";

/// Name given to tables provisioned by `createFeishuTable`.
pub const PROVISIONED_APP_NAME: &str = "小红书笔记数据表";

/// Time zone given to tables provisioned by `createFeishuTable`.
pub const PROVISIONED_TIME_ZONE: &str = "Asia/Shanghai";

// =============================================================================
// EXTRACTION
// =============================================================================

/// Placeholder title when no source resolves one.
pub const UNKNOWN_TITLE: &str = "未知标题";

/// Placeholder author when no source resolves one.
pub const UNKNOWN_AUTHOR: &str = "未知作者";

/// Origin used to absolutize relative author links.
pub const SITE_ORIGIN: &str = "https://www.xiaohongshu.com";

/// Hours east of UTC for the page's local calendar ("今天", "昨天", bare dates).
pub const UTC_OFFSET_HOURS: i32 = 8;

/// Maximum time to wait for a lazily rendered hover card.
pub const HOVER_TIMEOUT_MS: u64 = 1500;

/// Poll interval while waiting for a hover card.
pub const HOVER_POLL_MS: u64 = 50;

/// Maximum depth when searching embedded page state for the note object.
pub const STATE_SEARCH_MAX_DEPTH: usize = 15;

/// Maximum array elements inspected per array during the state search.
pub const STATE_SEARCH_MAX_ARRAY: usize = 50;

/// Inline scripts shorter than this are not scanned for page state.
pub const STATE_SCRIPT_MIN_LEN: usize = 100;

/// Identifier length when derived from a base64 digest of title and author.
pub const ID_DIGEST_LEN: usize = 16;

/// Identifier length when derived from the raw title/author concatenation.
pub const ID_RAW_LEN: usize = 20;

// =============================================================================
// PAGE SESSION
// =============================================================================

/// Retries allowed before the session stops trying to attach to a page.
pub const SESSION_MAX_ATTEMPTS: u32 = 5;

// =============================================================================
// SERVER
// =============================================================================

/// Default bridge bind host.
pub const SERVER_HOST: &str = "127.0.0.1";

/// Default bridge port.
pub const SERVER_PORT: u16 = 3017;

/// Storage key holding the persisted user configuration.
pub const CONFIG_KEY: &str = "feishuConfig";

/// Default path of the JSON config store.
pub const CONFIG_PATH: &str = "notesync-config.json";

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_FEISHU_BASE_URL: &str = "FEISHU_BASE_URL";
pub const ENV_FEISHU_TIMEOUT_SECS: &str = "FEISHU_TIMEOUT_SECS";
pub const ENV_SYNC_DEADLINE_SECS: &str = "SYNC_DEADLINE_SECS";
pub const ENV_FIELD_CREATE_DELAY_MS: &str = "FIELD_CREATE_DELAY_MS";
pub const ENV_CONFIG_PATH: &str = "NOTESYNC_CONFIG_PATH";
pub const ENV_UTC_OFFSET_HOURS: &str = "UTC_OFFSET_HOURS";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_lengths() {
        assert!(ID_DIGEST_LEN < ID_RAW_LEN);
    }

    #[test]
    fn test_hover_poll_fits_in_timeout() {
        assert!(HOVER_POLL_MS < HOVER_TIMEOUT_MS);
    }
}

//! Destination table URL validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use notesync_core::defaults::DEFAULT_TABLE_ID;
use notesync_core::{Error, Result};

/// Message returned when no accepted URL shape matches.
pub const INVALID_DESTINATION: &str = "无效的飞书多维表格链接，请检查链接格式";

/// Accepted URL shapes, tried in order.
///
/// The last pattern is address-only and carries no sub-table identifier.
static PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"https://[^.]+\.feishu\.cn/base/([A-Za-z0-9]+).*table=([A-Za-z0-9]+)")
            .expect("static pattern"),
        Regex::new(r"https://[^.]+\.feishu\.cn/sheets/([A-Za-z0-9]+).*table=([A-Za-z0-9]+)")
            .expect("static pattern"),
        Regex::new(r"https://[^.]+\.feishu\.cn/base/([A-Za-z0-9]+)").expect("static pattern"),
    ]
});

/// A validated destination: the app plus one sub-table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub app_token: String,
    pub table_id: String,
}

impl Destination {
    /// The URL named no sub-table and the sentinel is in use.
    pub fn is_default_table(&self) -> bool {
        self.table_id == DEFAULT_TABLE_ID
    }

    /// Shortened app token for logs and diagnostics.
    pub fn app_token_prefix(&self) -> &str {
        match self.app_token.char_indices().nth(8) {
            Some((idx, _)) => &self.app_token[..idx],
            None => &self.app_token,
        }
    }
}

/// Parse a destination table URL.
pub fn parse_destination(url: &str) -> Result<Destination> {
    let url = url.trim();
    PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .map(|caps| Destination {
            app_token: caps[1].to_string(),
            table_id: caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| DEFAULT_TABLE_ID.to_string()),
        })
        .ok_or_else(|| Error::Validation(INVALID_DESTINATION.to_string()))
}

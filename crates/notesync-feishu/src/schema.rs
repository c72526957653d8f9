//! Destination schema: column names, column types, and field reconciliation.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use notesync_core::Result;

use crate::destination::Destination;
use crate::error::with_context;
use crate::service::TableService;

// =============================================================================
// COLUMN NAMES
// =============================================================================

/// Fixed destination column names.
pub mod column {
    pub const NOTE_ID: &str = "笔记ID";
    pub const NOTE_URL: &str = "笔记链接";
    pub const NOTE_TYPE: &str = "笔记类型";
    pub const NOTE_TITLE: &str = "笔记标题";
    pub const NOTE_CONTENT: &str = "笔记内容";
    pub const NOTE_TOPIC: &str = "笔记话题";
    pub const LIKES: &str = "点赞量";
    pub const COLLECTIONS: &str = "收藏量";
    pub const COMMENTS: &str = "评论量";
    pub const SHARES: &str = "分享量";
    pub const PUBLISH_TIME: &str = "发布时间";
    pub const UPDATE_TIME: &str = "更新时间";
    pub const IP_ADDRESS: &str = "IP地址";
    pub const AUTHOR_ID: &str = "博主ID";
    pub const AUTHOR_URL: &str = "博主链接";
    pub const AUTHOR_NAME: &str = "博主昵称";
    pub const AUTHOR_XHS_ID: &str = "小红书号";
    pub const FOLLOWER_COUNT: &str = "粉丝数";
    pub const LIKES_AND_COLLECTIONS: &str = "获赞与收藏";
    pub const AUTHOR_BIO: &str = "博主简介";
    pub const IMAGE_COUNT: &str = "图片数量";
    pub const NOTE_IMAGES: &str = "笔记图片";
    pub const VIDEO_COVER: &str = "视频封面";
    pub const VIDEO_FILE: &str = "视频文件";
    pub const RECOMMEND_LEVEL: &str = "推荐等级";
    pub const NOTE_SCORE: &str = "笔记评分";
    pub const LIKE_FOLLOW_RATIO: &str = "赞粉比";
    pub const SYNC_TIME: &str = "同步时间";
    pub const ATTACHMENT: &str = "附件";
}

// =============================================================================
// COLUMN TYPES
// =============================================================================

/// Destination column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Number,
    SingleSelect,
    MultiSelect,
    DateTime,
    Hyperlink,
}

impl FieldType {
    /// Wire type code.
    pub fn code(self) -> i64 {
        match self {
            Self::Text => 1,
            Self::Number => 2,
            Self::SingleSelect => 3,
            Self::MultiSelect => 4,
            Self::DateTime => 5,
            Self::Hyperlink => 15,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Text),
            2 => Some(Self::Number),
            3 => Some(Self::SingleSelect),
            4 => Some(Self::MultiSelect),
            5 => Some(Self::DateTime),
            15 => Some(Self::Hyperlink),
            _ => None,
        }
    }
}

/// Every column notesync can write, in projection order, with its type.
pub const COLUMNS: &[(&str, FieldType)] = &[
    (column::NOTE_ID, FieldType::Text),
    (column::NOTE_URL, FieldType::Hyperlink),
    (column::NOTE_TYPE, FieldType::SingleSelect),
    (column::NOTE_TITLE, FieldType::Text),
    (column::NOTE_CONTENT, FieldType::Text),
    (column::NOTE_TOPIC, FieldType::MultiSelect),
    (column::LIKES, FieldType::Number),
    (column::COLLECTIONS, FieldType::Number),
    (column::COMMENTS, FieldType::Number),
    (column::SHARES, FieldType::Number),
    (column::PUBLISH_TIME, FieldType::DateTime),
    (column::UPDATE_TIME, FieldType::DateTime),
    (column::IP_ADDRESS, FieldType::Text),
    (column::AUTHOR_ID, FieldType::Text),
    (column::AUTHOR_NAME, FieldType::Text),
    (column::AUTHOR_URL, FieldType::Hyperlink),
    (column::AUTHOR_XHS_ID, FieldType::Text),
    (column::FOLLOWER_COUNT, FieldType::Number),
    (column::LIKES_AND_COLLECTIONS, FieldType::Number),
    (column::AUTHOR_BIO, FieldType::Text),
    (column::IMAGE_COUNT, FieldType::Number),
    (column::NOTE_IMAGES, FieldType::Text),
    (column::VIDEO_COVER, FieldType::Text),
    (column::VIDEO_FILE, FieldType::Text),
    (column::RECOMMEND_LEVEL, FieldType::SingleSelect),
    (column::NOTE_SCORE, FieldType::Number),
    (column::LIKE_FOLLOW_RATIO, FieldType::Number),
    (column::SYNC_TIME, FieldType::DateTime),
    (column::ATTACHMENT, FieldType::Text),
];

/// A column to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub field_type: FieldType,
    pub property: Option<Value>,
}

/// Guess a column type from its human-readable name.
///
/// Only used for names outside [`COLUMNS`].
pub fn infer_field_type(name: &str) -> FieldType {
    if name.contains("时间") {
        FieldType::DateTime
    } else if ["量", "数", "级"].iter().any(|k| name.contains(k)) {
        FieldType::Number
    } else if name.contains("链接") || name.contains("URL") {
        FieldType::Hyperlink
    } else {
        FieldType::Text
    }
}

/// Creation request for `name`: the fixed type when known, else inferred.
///
/// Auto-heal deliberately prefers the `COLUMNS` type over keyword inference,
/// so `推荐等级` is created as a single select rather than a number and
/// `赞粉比` gets the four-decimal formatter. Inference only covers names
/// outside `COLUMNS`.
pub fn column_spec(name: &str) -> ColumnSpec {
    let field_type = COLUMNS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, field_type)| *field_type)
        .unwrap_or_else(|| infer_field_type(name));

    let property = match (name, field_type) {
        (column::LIKE_FOLLOW_RATIO, _) => Some(json!({"formatter": "0.0000"})),
        (_, FieldType::Number) => Some(json!({"formatter": "0"})),
        _ => None,
    };

    ColumnSpec {
        name: name.to_string(),
        field_type,
        property,
    }
}

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Create every column in `required` the destination lacks.
///
/// Existing columns are never re-created. Missing ones are created one at a
/// time with `delay` after each request; the first failure aborts. Returns
/// the number of columns created.
#[instrument(
    skip(service, token, required),
    fields(subsystem = "feishu", component = "schema", op = "ensure_fields", table_id = %dest.table_id)
)]
pub async fn ensure_fields(
    service: &dyn TableService,
    token: &str,
    dest: &Destination,
    required: &[String],
    delay: Duration,
) -> Result<usize> {
    let existing: HashSet<String> = service
        .list_fields(token, dest)
        .await
        .map_err(|e| with_context(e, "获取字段列表失败"))?
        .into_iter()
        .map(|field| field.field_name)
        .collect();

    let mut seen = HashSet::new();
    let missing: Vec<&String> = required
        .iter()
        .filter(|name| !existing.contains(name.as_str()) && seen.insert(name.as_str()))
        .collect();

    if missing.is_empty() {
        debug!(existing = existing.len(), "All required columns present");
        return Ok(0);
    }

    info!(item_count = missing.len(), "Creating missing columns");
    for name in &missing {
        let spec = column_spec(name);
        debug!(field = %spec.name, field_type = spec.field_type.code(), "Creating column");
        if let Err(e) = service.create_field(token, dest, &spec).await {
            warn!(field = %spec.name, error = %e, "Column creation failed");
            return Err(with_context(e, &format!("创建字段 {} 失败", spec.name)));
        }
        tokio::time::sleep(delay).await;
    }

    Ok(missing.len())
}

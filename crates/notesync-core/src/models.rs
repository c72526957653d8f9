//! Domain types shared by the extractor, the sync engine and the bridge.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::defaults::{UNKNOWN_AUTHOR, UNKNOWN_TITLE};
use crate::error::Error;
use crate::numbers::lenient_u64;
use crate::scoring;

// =============================================================================
// NOTE RECORD
// =============================================================================

/// Kind of note, derived from the presence of a video element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteType {
    #[default]
    #[serde(rename = "图文")]
    ImageText,
    #[serde(rename = "视频")]
    Video,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageText => "图文",
            Self::Video => "视频",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-assigned recommendation level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendLevel {
    High,
    #[default]
    Medium,
    Low,
}

impl RecommendLevel {
    /// Display label written into the destination table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "高",
            Self::Medium => "中",
            Self::Low => "低",
        }
    }

    /// Map a 1–5 star rating: 4+ is high, 3 is medium, anything lower is low.
    pub fn from_stars(stars: i64) -> Self {
        match stars {
            s if s >= 4 => Self::High,
            3 => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl std::str::FromStr for RecommendLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "高" => Ok(Self::High),
            "medium" | "中" => Ok(Self::Medium),
            "low" | "低" => Ok(Self::Low),
            other => Err(Error::InvalidInput(format!(
                "Unknown recommend level: {}",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for RecommendLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => Self::from_stars(n.as_i64().unwrap_or(0)),
            Value::String(s) => s.parse().unwrap_or_default(),
            _ => Self::default(),
        })
    }
}

/// Semantic fields the extractor resolves.
///
/// Used to report which fields fell back to their default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteField {
    Title,
    Author,
    AuthorUrl,
    AuthorBio,
    AuthorXhsId,
    Likes,
    Comments,
    Shares,
    Collections,
    FollowerCount,
    LikesAndCollections,
    PublishTime,
    UpdateTime,
    Content,
    Tags,
    Topics,
    Images,
    VideoCover,
}

impl NoteField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::AuthorUrl => "authorUrl",
            Self::AuthorBio => "authorBio",
            Self::AuthorXhsId => "authorXhsId",
            Self::Likes => "likes",
            Self::Comments => "comments",
            Self::Shares => "shares",
            Self::Collections => "collections",
            Self::FollowerCount => "followerCount",
            Self::LikesAndCollections => "likesAndCollections",
            Self::PublishTime => "publishTime",
            Self::UpdateTime => "updateTime",
            Self::Content => "content",
            Self::Tags => "tags",
            Self::Topics => "topics",
            Self::Images => "images",
            Self::VideoCover => "videoCover",
        }
    }
}

impl fmt::Display for NoteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted note.
///
/// Built fresh on every extraction and never persisted locally. Counts use
/// `0` when unresolved; `unresolved` records which fields that applies to so
/// a true zero can be told apart from a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteRecord {
    /// Stable natural key; empty when the sender left derivation to the sync engine.
    pub id: String,
    pub title: String,
    pub author: String,
    pub author_url: String,
    pub author_bio: String,
    pub author_xhs_id: String,

    #[serde(deserialize_with = "lenient_u64")]
    pub likes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub comments: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub shares: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub collections: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub follower_count: u64,
    /// Author total as displayed, e.g. `"1.2万"`.
    #[serde(deserialize_with = "lenient_string")]
    pub likes_and_collections: String,

    /// Epoch milliseconds as a decimal string.
    #[serde(deserialize_with = "lenient_string")]
    pub publish_time: String,
    /// Epoch milliseconds as a decimal string, empty when unknown.
    #[serde(deserialize_with = "lenient_string")]
    pub update_time: String,

    pub content: String,
    pub tags: Vec<String>,
    pub topics: Vec<String>,
    pub images: Vec<String>,
    pub note_type: NoteType,
    pub video_cover: String,
    pub note_url: String,

    pub recommend_level: RecommendLevel,
    pub like_follow_ratio: f64,
    pub note_score: u32,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub unresolved: BTreeSet<NoteField>,
}

impl Default for NoteRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: UNKNOWN_TITLE.to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
            author_url: String::new(),
            author_bio: String::new(),
            author_xhs_id: String::new(),
            likes: 0,
            comments: 0,
            shares: 0,
            collections: 0,
            follower_count: 0,
            likes_and_collections: String::new(),
            publish_time: String::new(),
            update_time: String::new(),
            content: String::new(),
            tags: Vec::new(),
            topics: Vec::new(),
            images: Vec::new(),
            note_type: NoteType::default(),
            video_cover: String::new(),
            note_url: String::new(),
            recommend_level: RecommendLevel::default(),
            like_follow_ratio: 0.0,
            note_score: 0,
            unresolved: BTreeSet::new(),
        }
    }
}

impl NoteRecord {
    /// Recompute `like_follow_ratio` and `note_score` from the raw counts.
    pub fn derive_scores(&mut self) {
        self.like_follow_ratio = scoring::like_follow_ratio(self.likes, self.follower_count);
        self.note_score =
            scoring::note_score(self.likes, self.comments, self.shares, self.follower_count);
    }

    /// Whether `field` fell back to its default during extraction.
    pub fn is_unresolved(&self, field: NoteField) -> bool {
        self.unresolved.contains(&field)
    }
}

/// Accept a string, a number, or null; numbers are rendered in decimal.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        _ => String::new(),
    })
}

// =============================================================================
// SYNC CONFIGURATION
// =============================================================================

/// How a record interacts with pre-existing destination rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Unconditional create.
    #[default]
    Append,
    /// Update the row with the same identifier, else create.
    Merge,
    /// Delete every existing row, then create. Not transactional.
    Overwrite,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Merge => "merge",
            Self::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-column output toggles.
///
/// `note_id` is accepted for wire compatibility but ignored: the identifier
/// column is always projected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncFields {
    pub note_id: bool,
    pub note_url: bool,
    pub note_type: bool,
    pub note_title: bool,
    pub note_content: bool,
    pub note_topic: bool,
    pub likes: bool,
    pub collections: bool,
    pub comments: bool,
    pub shares: bool,
    pub publish_time: bool,
    pub update_time: bool,
    pub ip_address: bool,

    pub author_id: bool,
    pub author_url: bool,
    pub author_name: bool,
    pub author_xhs_id: bool,
    pub follower_count: bool,
    pub likes_and_collections: bool,
    pub author_bio: bool,

    pub image_count: bool,
    pub note_images: bool,
    pub video_cover: bool,
    pub video_file: bool,

    pub recommend_level: bool,
    pub note_score: bool,
    pub like_follow_ratio: bool,
    pub sync_time: bool,
}

impl Default for SyncFields {
    fn default() -> Self {
        Self {
            note_id: true,
            note_url: true,
            note_title: true,
            note_content: true,
            likes: true,
            collections: true,
            comments: true,
            shares: true,
            publish_time: true,
            author_name: true,
            follower_count: true,
            ..Self::none()
        }
    }
}

impl SyncFields {
    /// Every optional column off.
    pub fn none() -> Self {
        Self {
            note_id: false,
            note_url: false,
            note_type: false,
            note_title: false,
            note_content: false,
            note_topic: false,
            likes: false,
            collections: false,
            comments: false,
            shares: false,
            publish_time: false,
            update_time: false,
            ip_address: false,
            author_id: false,
            author_url: false,
            author_name: false,
            author_xhs_id: false,
            follower_count: false,
            likes_and_collections: false,
            author_bio: false,
            image_count: false,
            note_images: false,
            video_cover: false,
            video_file: false,
            recommend_level: false,
            note_score: false,
            like_follow_ratio: false,
            sync_time: false,
        }
    }

    /// Every column on.
    pub fn all() -> Self {
        Self {
            note_id: true,
            note_url: true,
            note_type: true,
            note_title: true,
            note_content: true,
            note_topic: true,
            likes: true,
            collections: true,
            comments: true,
            shares: true,
            publish_time: true,
            update_time: true,
            ip_address: true,
            author_id: true,
            author_url: true,
            author_name: true,
            author_xhs_id: true,
            follower_count: true,
            likes_and_collections: true,
            author_bio: true,
            image_count: true,
            note_images: true,
            video_cover: true,
            video_file: true,
            recommend_level: true,
            note_score: true,
            like_follow_ratio: true,
            sync_time: true,
        }
    }
}

/// User configuration for one destination.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub app_id: String,
    pub app_secret: String,
    pub table_url: String,
    pub sync_mode: SyncMode,
    pub upload_files: bool,
    pub sync_fields: SyncFields,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            table_url: String::new(),
            sync_mode: SyncMode::default(),
            upload_files: false,
            sync_fields: SyncFields::default(),
        }
    }
}

impl SyncConfig {
    /// Both halves of the credential pair are present.
    pub fn has_credentials(&self) -> bool {
        !self.app_id.trim().is_empty() && !self.app_secret.trim().is_empty()
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .field("table_url", &self.table_url)
            .field("sync_mode", &self.sync_mode)
            .field("upload_files", &self.upload_files)
            .field("sync_fields", &self.sync_fields)
            .finish()
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Result shape returned by every public orchestration entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

impl From<Error> for SyncResponse {
    fn from(err: Error) -> Self {
        Self::failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_record_defaults_to_placeholders() {
        let record = NoteRecord::default();
        assert_eq!(record.title, "未知标题");
        assert_eq!(record.author, "未知作者");
        assert_eq!(record.recommend_level, RecommendLevel::Medium);
        assert_eq!(record.note_type, NoteType::ImageText);
    }

    #[test]
    fn test_note_record_lenient_wire_shape() {
        let record: NoteRecord = serde_json::from_value(json!({
            "id": "abc123",
            "title": "T",
            "likes": "100",
            "followerCount": 1000,
            "publishTime": 1700000000000i64,
            "noteType": "视频",
            "recommendLevel": 5
        }))
        .unwrap();

        assert_eq!(record.likes, 100);
        assert_eq!(record.follower_count, 1000);
        assert_eq!(record.publish_time, "1700000000000");
        assert_eq!(record.note_type, NoteType::Video);
        assert_eq!(record.recommend_level, RecommendLevel::High);
        assert_eq!(record.author, "未知作者");
    }

    #[test]
    fn test_note_record_serializes_camel_case() {
        let mut record = NoteRecord {
            follower_count: 10,
            ..Default::default()
        };
        record.unresolved.insert(NoteField::Likes);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["followerCount"], 10);
        assert_eq!(value["noteType"], "图文");
        assert_eq!(value["unresolved"], json!(["likes"]));
    }

    #[test]
    fn test_derive_scores() {
        let mut record = NoteRecord {
            likes: 100,
            follower_count: 1000,
            ..Default::default()
        };
        record.derive_scores();
        assert_eq!(record.like_follow_ratio, 0.1);
        assert!(record.note_score <= 100);
    }

    #[test]
    fn test_recommend_level_parsing() {
        assert_eq!("HIGH".parse::<RecommendLevel>().unwrap(), RecommendLevel::High);
        assert_eq!("低".parse::<RecommendLevel>().unwrap(), RecommendLevel::Low);
        assert!("meh".parse::<RecommendLevel>().is_err());
        assert_eq!(RecommendLevel::from_stars(3), RecommendLevel::Medium);
        assert_eq!(RecommendLevel::from_stars(1), RecommendLevel::Low);
    }

    #[test]
    fn test_sync_config_defaults_from_partial_json() {
        let config: SyncConfig = serde_json::from_value(json!({
            "appId": "cli_x",
            "appSecret": "s3cret",
            "tableUrl": "https://x.feishu.cn/base/AbC?table=tbl1"
        }))
        .unwrap();

        assert_eq!(config.sync_mode, SyncMode::Append);
        assert!(!config.upload_files);
        assert!(config.sync_fields.note_title);
        assert!(!config.sync_fields.author_bio);
        assert!(config.has_credentials());
    }

    #[test]
    fn test_sync_config_debug_redacts_secret() {
        let config = SyncConfig {
            app_secret: "s3cret".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_sync_mode_wire_names() {
        let mode: SyncMode = serde_json::from_value(json!("overwrite")).unwrap();
        assert_eq!(mode, SyncMode::Overwrite);
        assert_eq!(serde_json::to_value(SyncMode::Merge).unwrap(), json!("merge"));
    }

    #[test]
    fn test_sync_response_shape() {
        let ok = serde_json::to_value(SyncResponse::ok("done")).unwrap();
        assert_eq!(ok, json!({"success": true, "message": "done"}));

        let failed: SyncResponse = Error::Validation("bad url".to_string()).into();
        assert_eq!(failed.error.as_deref(), Some("bad url"));
        assert!(!failed.success);
    }
}

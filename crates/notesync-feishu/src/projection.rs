//! Projection of a [`NoteRecord`] onto a destination row.
//!
//! Only toggled-on columns are emitted, except the identifier column which
//! is always present. Hyperlink columns are `{text, link}` objects, counts
//! are integers and times are epoch milliseconds.

use serde_json::{json, Value};
use tracing::debug;

use notesync_core::{
    derive_note_id, like_follow_ratio, note_score, parse_number, NoteRecord, SyncFields,
};

use crate::schema::column;
use crate::types::Row;

/// Link text when a note has no title.
const DEFAULT_NOTE_LINK_TEXT: &str = "小红书笔记";

/// Link text when the author has no name.
const DEFAULT_AUTHOR_LINK_TEXT: &str = "博主主页";

/// Values below this are taken to be epoch seconds rather than milliseconds.
const SECONDS_THRESHOLD: i64 = 100_000_000_000;

/// Build the destination row for `record`.
///
/// `current_url` is the page the sync was triggered from; `now_ms` stamps
/// sync-time columns and replaces unusable timestamps.
pub fn build_row(record: &NoteRecord, fields: &SyncFields, current_url: &str, now_ms: i64) -> Row {
    let mut row = Row::new();

    let id = if record.id.is_empty() {
        derive_note_id(current_url, &record.title, &record.author)
    } else {
        record.id.clone()
    };
    row.insert(column::NOTE_ID.into(), json!(id));

    let note_link = if current_url.is_empty() {
        record.note_url.as_str()
    } else {
        current_url
    };
    if fields.note_url {
        insert_link(&mut row, column::NOTE_URL, &record.title, DEFAULT_NOTE_LINK_TEXT, note_link);
    }
    if fields.note_type {
        row.insert(column::NOTE_TYPE.into(), json!(record.note_type.as_str()));
    }
    if fields.note_title {
        row.insert(column::NOTE_TITLE.into(), json!(record.title));
    }
    if fields.note_content {
        row.insert(column::NOTE_CONTENT.into(), json!(record.content));
    }
    if fields.note_topic {
        let topics = if record.topics.is_empty() {
            &record.tags
        } else {
            &record.topics
        };
        row.insert(column::NOTE_TOPIC.into(), json!(topics));
    }
    if fields.likes {
        row.insert(column::LIKES.into(), json!(record.likes));
    }
    if fields.collections {
        row.insert(column::COLLECTIONS.into(), json!(record.collections));
    }
    if fields.comments {
        row.insert(column::COMMENTS.into(), json!(record.comments));
    }
    if fields.shares {
        row.insert(column::SHARES.into(), json!(record.shares));
    }
    if fields.publish_time {
        row.insert(column::PUBLISH_TIME.into(), json!(epoch_millis_or(&record.publish_time, now_ms)));
    }
    if fields.update_time {
        row.insert(column::UPDATE_TIME.into(), json!(epoch_millis_or(&record.update_time, now_ms)));
    }
    if fields.ip_address {
        row.insert(column::IP_ADDRESS.into(), json!(""));
    }

    if fields.author_id {
        row.insert(column::AUTHOR_ID.into(), json!(author_id(record)));
    }
    if fields.author_url {
        insert_link(&mut row, column::AUTHOR_URL, &record.author, DEFAULT_AUTHOR_LINK_TEXT, &record.author_url);
    }
    if fields.author_name {
        row.insert(column::AUTHOR_NAME.into(), json!(record.author));
    }
    if fields.author_xhs_id {
        row.insert(column::AUTHOR_XHS_ID.into(), json!(record.author_xhs_id));
    }
    if fields.follower_count {
        row.insert(column::FOLLOWER_COUNT.into(), json!(record.follower_count));
    }
    if fields.likes_and_collections {
        row.insert(
            column::LIKES_AND_COLLECTIONS.into(),
            json!(parse_number(&record.likes_and_collections)),
        );
    }
    if fields.author_bio {
        row.insert(column::AUTHOR_BIO.into(), json!(record.author_bio));
    }

    if fields.image_count {
        row.insert(column::IMAGE_COUNT.into(), json!(record.images.len()));
    }
    if fields.note_images {
        row.insert(column::NOTE_IMAGES.into(), json!(record.images.join(", ")));
    }
    if fields.video_cover {
        row.insert(column::VIDEO_COVER.into(), json!(record.video_cover));
    }
    if fields.video_file {
        row.insert(column::VIDEO_FILE.into(), json!(""));
    }

    if fields.recommend_level {
        row.insert(column::RECOMMEND_LEVEL.into(), json!(record.recommend_level.label()));
    }
    // Derived from the counts; whatever scores arrived with the record are ignored.
    if fields.note_score {
        let score = note_score(record.likes, record.comments, record.shares, record.follower_count);
        row.insert(column::NOTE_SCORE.into(), json!(score));
    }
    if fields.like_follow_ratio {
        let ratio = like_follow_ratio(record.likes, record.follower_count);
        row.insert(column::LIKE_FOLLOW_RATIO.into(), json!(ratio));
    }
    if fields.sync_time {
        row.insert(column::SYNC_TIME.into(), json!(now_ms));
    }

    debug!(
        subsystem = "feishu",
        component = "projection",
        note_id = %id,
        columns = row.len(),
        "Projected row"
    );
    row
}

/// Column names of a projected row, in insertion order.
pub fn required_columns(row: &Row) -> Vec<String> {
    row.keys().cloned().collect()
}

/// Hyperlink cells need a target; an empty link is left out of the row.
fn insert_link(row: &mut Row, name: &str, text: &str, default_text: &str, link: &str) {
    if link.trim().is_empty() {
        return;
    }
    let text = if text.trim().is_empty() { default_text } else { text };
    row.insert(name.into(), json!({"text": text, "link": link}));
}

/// Profile id from the author link, else the display name.
fn author_id(record: &NoteRecord) -> &str {
    record
        .author_url
        .split("/user/profile/")
        .nth(1)
        .and_then(|rest| rest.split(['/', '?', '#']).next())
        .filter(|id| !id.is_empty())
        .unwrap_or(record.author.as_str())
}

/// Parse a stored timestamp, scaling seconds to milliseconds.
fn epoch_millis_or(text: &str, fallback: i64) -> i64 {
    match text.trim().parse::<i64>() {
        Ok(value) if value > 0 && value < SECONDS_THRESHOLD => value * 1000,
        Ok(value) if value > 0 => value,
        _ => fallback,
    }
}

/// The identifier cell of a projected row.
pub fn row_note_id(row: &Row) -> Option<&str> {
    row.get(column::NOTE_ID).and_then(Value::as_str)
}

//! Note identity: the stable merge key and note-page recognition.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use crate::defaults::{ID_DIGEST_LEN, ID_RAW_LEN};

static NOTE_ID_IN_URL: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"/explore/([a-f0-9]+)", r"/discovery/item/([a-f0-9]+)"]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
});

static NOTE_PAGE_PATHS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/explore/[a-f0-9]{24}",
        r"/discovery/item/[a-f0-9]+",
        r"/user/profile/[a-f0-9]+/[a-f0-9]+",
        r"/note/[a-f0-9]+",
        r"/notes/[a-f0-9]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static LISTING_PATHS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^/$",
        r"^/home",
        r"^/explore$",
        r"^/search$",
        r"^/user/profile/[a-f0-9]+$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Derive the natural key for a note.
///
/// 1. The note id segment of `url` (`/explore/<hex>` or `/discovery/item/<hex>`).
/// 2. Base64 of `title + "_" + author`, alphanumerics only, first 16 chars.
///    Only possible when every character fits in one byte (Latin-1).
/// 3. `title + "_" + author` with everything except ASCII alphanumerics and
///    CJK ideographs removed, first 20 chars.
///
/// Counts never participate, so re-extracting a page yields the same key.
pub fn derive_note_id(url: &str, title: &str, author: &str) -> String {
    if let Some(id) = note_id_from_url(url) {
        return id;
    }

    let seed = format!("{}_{}", title, author);
    match latin1_digest(&seed) {
        Some(digest) => digest,
        None => seed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(c))
            .take(ID_RAW_LEN)
            .collect(),
    }
}

/// Note id embedded in a page URL, if any.
pub fn note_id_from_url(url: &str) -> Option<String> {
    NOTE_ID_IN_URL
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn latin1_digest(seed: &str) -> Option<String> {
    let bytes: Vec<u8> = seed
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<_>>()?;
    Some(
        STANDARD
            .encode(bytes)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(ID_DIGEST_LEN)
            .collect(),
    )
}

/// Whether `url` points at a single note rather than a feed or profile.
pub fn is_note_detail_page(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(&['?', '#'][..]).next().unwrap_or_default().to_string(),
    };

    let is_note = NOTE_PAGE_PATHS.iter().any(|re| re.is_match(&path));
    let is_listing = LISTING_PATHS.iter().any(|re| re.is_match(&path));
    is_note && !is_listing
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE_URL: &str = "https://www.xiaohongshu.com/explore/64f1a2b3c4d5e6f7a8b9c0d1?xsec_token=abc";

    #[test]
    fn test_id_from_explore_path() {
        assert_eq!(
            derive_note_id(NOTE_URL, "T", "A"),
            "64f1a2b3c4d5e6f7a8b9c0d1"
        );
    }

    #[test]
    fn test_id_from_discovery_path() {
        assert_eq!(
            derive_note_id("https://www.xiaohongshu.com/discovery/item/abc123", "", ""),
            "abc123"
        );
    }

    #[test]
    fn test_id_digest_for_latin_text() {
        // base64("Hello_World") = "SGVsbG9fV29ybGQ="
        assert_eq!(derive_note_id("", "Hello", "World"), "SGVsbG9fV29ybGQ");
    }

    #[test]
    fn test_id_digest_is_truncated() {
        let id = derive_note_id("", "a fairly long title here", "someone");
        assert_eq!(id.len(), ID_DIGEST_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_id_raw_fallback_keeps_cjk() {
        let id = derive_note_id("", "秋天的第一杯奶茶!", "小红");
        assert_eq!(id, "秋天的第一杯奶茶小红");
    }

    #[test]
    fn test_id_is_stable() {
        let a = derive_note_id(NOTE_URL, "Title v1", "A");
        let b = derive_note_id(NOTE_URL, "Title v1", "A");
        assert_eq!(a, b);
        assert_eq!(
            derive_note_id("", "同一个标题", "作者"),
            derive_note_id("", "同一个标题", "作者")
        );
    }

    #[test]
    fn test_note_detail_pages() {
        assert!(is_note_detail_page(NOTE_URL));
        assert!(is_note_detail_page("https://www.xiaohongshu.com/discovery/item/abc"));
        assert!(is_note_detail_page(
            "https://www.xiaohongshu.com/user/profile/5a6b/64f1a2b3"
        ));
    }

    #[test]
    fn test_listing_pages_are_not_note_pages() {
        assert!(!is_note_detail_page("https://www.xiaohongshu.com/"));
        assert!(!is_note_detail_page("https://www.xiaohongshu.com/explore"));
        assert!(!is_note_detail_page("https://www.xiaohongshu.com/user/profile/5a6b"));
        assert!(!is_note_detail_page("https://www.xiaohongshu.com/search_result?keyword=x"));
        // 23 hex chars is not a note id
        assert!(!is_note_detail_page(
            "https://www.xiaohongshu.com/explore/64f1a2b3c4d5e6f7a8b9c0d"
        ));
    }
}

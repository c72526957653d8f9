//! Embedded page-state discovery.
//!
//! Note pages ship their data as a JSON blob: a window global, a JSON
//! script tag, or an assignment inside an inline script. This module finds
//! that blob and then walks it for the object that looks like the note.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use tracing::{debug, trace};

use notesync_core::defaults::{STATE_SCRIPT_MIN_LEN, STATE_SEARCH_MAX_ARRAY, STATE_SEARCH_MAX_DEPTH};

use crate::page::{select_all, PageContext};

/// Window globals that may hold page state, in lookup order.
pub const WINDOW_KEYS: &[&str] = &[
    "__INITIAL_STATE__",
    "__NUXT__",
    "__NEXT_DATA__",
    "initialState",
    "pageData",
    "appData",
    "noteData",
    "userInfo",
    "globalData",
    "reduxStore",
    "store",
    "state",
    "__APOLLO_STATE__",
    "__PRELOADED_STATE__",
];

/// An inline script is only scanned when it contains one of these.
const SCRIPT_MARKERS: &[&str] = &[
    "window.__INITIAL_STATE__",
    "window.initialState",
    "window.__NUXT__",
    "window.__NEXT_DATA__",
    "\"noteId\"",
    "\"likeCount\"",
    "\"commentCount\"",
    "\"shareCount\"",
    "\"collectCount\"",
    "\"interactInfo\"",
    "\"stats\"",
    "\"noteDetail\"",
    "\"userInfo\"",
];

static SCRIPT_PAYLOADS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"window\.__INITIAL_STATE__\s*=\s*(\{.+?\});",
        r"window\.initialState\s*=\s*(\{.+?\});",
        r"window\.__NUXT__\s*=\s*(\{.+?\});",
        r"window\.__NEXT_DATA__\s*=\s*(\{.+?\});",
        r#"(\{.*"noteId".*"likeCount".*\})"#,
        r#"(\{.*"interactInfo".*\})"#,
        r#"(\{.*"stats".*"likeCount".*\})"#,
        r#"(\{.*"noteDetail".*\})"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static TRAILING_COMMA_OBJ: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\}").expect("static pattern"));
static TRAILING_COMMA_ARR: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\]").expect("static pattern"));
static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\{,]\s*)(\w+):").expect("static pattern"));
static UNDEFINED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\s*undefined\b").expect("static pattern"));

/// Keys searched before all others when looking for the note object.
const PRIORITY_KEYS: &[&str] = &[
    "noteDetail",
    "note",
    "item",
    "data",
    "content",
    "detail",
    "info",
    "props",
    "pageProps",
    "initialProps",
    "serverData",
    "hydrationData",
    "noteInfo",
    "itemInfo",
    "feedItem",
    "cardInfo",
];

const ID_KEYS: &[&str] = &["noteId", "id", "note_id", "itemId"];
const TITLE_KEYS: &[&str] = &["title", "desc", "description"];
const COUNT_KEYS: &[&str] = &["likeCount", "commentCount", "shareCount", "collectCount"];
const ENGAGEMENT_KEYS: &[&str] = &["interactInfo", "stats", "engagement", "metrics"];

// =============================================================================
// DISCOVERY
// =============================================================================

/// Locate the page-state root.
///
/// Window globals win, then JSON script tags, then assignments inside
/// inline scripts (with a repair pass for JS-flavoured object literals).
pub fn discover_state(ctx: &PageContext, document: &Html) -> Option<Value> {
    for key in WINDOW_KEYS {
        if let Some(value) = ctx.state.get(*key).filter(|v| v.is_object() || v.is_array()) {
            debug!(subsystem = "extract", component = "state", source = %key, "Page state from window global");
            return Some(value.clone());
        }
    }

    for script in select_all(
        document,
        r#"script[type="application/json"], script[type="application/ld+json"]"#,
    ) {
        let text = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            if value.is_object() || value.is_array() {
                debug!(subsystem = "extract", component = "state", "Page state from JSON script tag");
                return Some(value);
            }
        }
    }

    for script in select_all(document, "script") {
        let text = script.text().collect::<String>();
        if text.len() < STATE_SCRIPT_MIN_LEN || !SCRIPT_MARKERS.iter().any(|m| text.contains(m)) {
            continue;
        }
        if let Some(value) = parse_script_payload(&text) {
            debug!(subsystem = "extract", component = "state", "Page state from inline script");
            return Some(value);
        }
    }

    trace!(subsystem = "extract", component = "state", "No page state found");
    None
}

/// Pull a JSON object out of an inline script body.
pub fn parse_script_payload(script: &str) -> Option<Value> {
    for pattern in SCRIPT_PAYLOADS.iter() {
        let Some(raw) = pattern.captures(script).and_then(|c| c.get(1)) else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<Value>(raw.as_str()) {
            return Some(value);
        }
        if let Ok(value) = serde_json::from_str::<Value>(&repair_json(raw.as_str())) {
            return Some(value);
        }
    }
    None
}

/// Fix the usual differences between a JS object literal and JSON.
pub fn repair_json(raw: &str) -> String {
    let fixed = TRAILING_COMMA_OBJ.replace_all(raw, "}");
    let fixed = TRAILING_COMMA_ARR.replace_all(&fixed, "]");
    let fixed = UNDEFINED_VALUE.replace_all(&fixed, ":null");
    BARE_KEY.replace_all(&fixed, "$1\"$2\":").into_owned()
}

/// Parsed JSON-LD blocks, used as an extra time source.
pub fn json_ld_blocks(document: &Html) -> Vec<Value> {
    select_all(document, r#"script[type="application/ld+json"]"#)
        .iter()
        .filter_map(|s| serde_json::from_str::<Value>(&s.text().collect::<String>()).ok())
        .collect()
}

// =============================================================================
// NOTE OBJECT SEARCH
// =============================================================================

/// Depth-first search for the object that carries the note's data.
///
/// A candidate needs an id or title key plus an engagement key. Priority
/// keys are searched first; arrays are capped.
pub fn find_note_object(root: &Value) -> Option<&Value> {
    search(root, 0)
}

fn search(current: &Value, depth: usize) -> Option<&Value> {
    if depth > STATE_SEARCH_MAX_DEPTH {
        return None;
    }

    match current {
        Value::Object(map) => {
            if looks_like_note(current) {
                return Some(current);
            }
            for key in PRIORITY_KEYS {
                if let Some(child) = map.get(*key).filter(|v| is_container(v)) {
                    if let Some(found) = search(child, depth + 1) {
                        return Some(found);
                    }
                }
            }
            map.iter()
                .filter(|(k, v)| !PRIORITY_KEYS.contains(&k.as_str()) && is_container(v))
                .find_map(|(_, child)| search(child, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .take(STATE_SEARCH_MAX_ARRAY)
            .find_map(|child| search(child, depth + 1)),
        _ => None,
    }
}

fn looks_like_note(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    let has_key = ID_KEYS.iter().chain(TITLE_KEYS).any(|k| map.get(*k).is_some_and(truthy));
    let has_engagement = COUNT_KEYS.iter().any(|k| map.contains_key(*k))
        || ENGAGEMENT_KEYS.iter().any(|k| map.get(*k).is_some_and(truthy));
    has_key && has_engagement
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// JavaScript truthiness.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Follow a dotted path; numeric segments index arrays.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_window_global_wins() {
        let ctx = PageContext::new("u", "<script type=\"application/json\">{\"a\":1}</script>")
            .with_state("__NUXT__", json!({"from": "nuxt"}))
            .with_state("pageData", json!({"from": "page"}));
        let doc = Html::parse_document(&ctx.html);
        assert_eq!(discover_state(&ctx, &doc), Some(json!({"from": "nuxt"})));
    }

    #[test]
    fn test_json_script_tag() {
        let ctx = PageContext::new(
            "u",
            r#"<html><head><script type="application/json">{"note":{"title":"t","likeCount":1}}</script></head></html>"#,
        );
        let doc = Html::parse_document(&ctx.html);
        let state = discover_state(&ctx, &doc).unwrap();
        assert_eq!(state["note"]["likeCount"], 1);
    }

    #[test]
    fn test_inline_script_with_repair() {
        let script = format!(
            "window.__INITIAL_STATE__ = {{note: {{noteId: \"abc\", likeCount: 12, extra: undefined,}}, pad: \"{}\"}};",
            "x".repeat(120)
        );
        let html = format!("<html><body><script>{}</script></body></html>", script);
        let ctx = PageContext::new("u", html);
        let doc = Html::parse_document(&ctx.html);
        let state = discover_state(&ctx, &doc).unwrap();
        assert_eq!(state["note"]["noteId"], "abc");
        assert_eq!(state["note"]["extra"], Value::Null);
    }

    #[test]
    fn test_short_scripts_are_skipped() {
        let html = "<script>window.__INITIAL_STATE__ = {\"a\":1};</script>";
        let ctx = PageContext::new("u", html);
        let doc = Html::parse_document(html);
        assert_eq!(discover_state(&ctx, &doc), None);
    }

    #[test]
    fn test_find_note_prefers_priority_keys() {
        let root = json!({
            "zzz": {"id": "decoy", "stats": {"likeCount": 1}},
            "noteDetail": {"map": {"abc": {"noteId": "abc", "interactInfo": {"likeCount": "10"}}}}
        });
        let note = find_note_object(&root).unwrap();
        assert_eq!(note["noteId"], "abc");
    }

    #[test]
    fn test_find_note_requires_engagement() {
        let root = json!({"note": {"title": "only a title"}});
        assert!(find_note_object(&root).is_none());

        let root = json!({"note": {"title": "t", "likeCount": 0}});
        assert!(find_note_object(&root).is_some());
    }

    #[test]
    fn test_find_note_respects_array_cap() {
        let mut items = vec![json!({}); STATE_SEARCH_MAX_ARRAY];
        items.push(json!({"id": "late", "likeCount": 3}));
        assert!(find_note_object(&json!({ "list": items })).is_none());
    }

    #[test]
    fn test_find_note_depth_limit() {
        let mut value = json!({"id": "deep", "likeCount": 1});
        for _ in 0..20 {
            value = json!({ "wrap": value });
        }
        assert!(find_note_object(&value).is_none());
    }

    #[test]
    fn test_lookup_paths() {
        let root = json!({"data": [{"user": {"name": "n"}}]});
        assert_eq!(lookup(&root, "data.0.user.name"), Some(&json!("n")));
        assert_eq!(lookup(&root, "data.x"), None);
        assert_eq!(lookup(&root, "missing"), None);
    }
}

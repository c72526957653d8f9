//! Declarative value resolvers.
//!
//! Each semantic field owns an ordered list of [`Source`]s. [`Probes`]
//! evaluates one source against a page, and [`first_resolved`] walks the
//! list until a source produces an acceptable value.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;

use notesync_core::{count_from_json, json_epoch_millis, parse_number, parse_relative_time, to_epoch_millis};

use crate::page::{element_text, first_attr, select_all, select_first};
use crate::state::lookup;

/// Text that is just a count, e.g. `"12"`, `"1.2万"`, `"3k"`.
static BARE_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?[万千kKwW]?$").expect("static pattern"));

/// Attributes consulted on time elements before their text.
const TIME_ATTRS: &[&str] = &[
    "data-time",
    "data-publish-time",
    "data-created-at",
    "datetime",
    "title",
];

/// One candidate location for a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Dotted path inside the located note object.
    Note(&'static str),
    /// Dotted path whose first segment names a window global.
    Global(&'static str),
    /// Selector evaluated against the captured hover card.
    HoverCard(&'static str),
    /// First non-empty attribute of a hover-card element.
    HoverAttr {
        css: &'static str,
        attrs: &'static [&'static str],
    },
    /// Selector on the page; element text, else the listed attributes.
    Selector {
        css: &'static str,
        attrs: &'static [&'static str],
    },
    /// First non-empty attribute of a page element; its text is ignored.
    Attr {
        css: &'static str,
        attrs: &'static [&'static str],
    },
    /// Time element: date attributes first, else its text as a display phrase.
    TimeElement(&'static str),
    /// `content` of a `<meta>` tag.
    Meta(&'static str),
    /// First present key in any JSON-LD block.
    JsonLd(&'static [&'static str]),
    /// Any element whose class contains a keyword and whose text is a bare count.
    ClassScan(&'static [&'static str]),
}

impl Source {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Note(_) | Source::Global(_) => "json",
            Source::HoverCard(_) | Source::HoverAttr { .. } => "hover",
            Source::Selector { .. } | Source::Attr { .. } | Source::TimeElement(_) => "selector",
            Source::Meta(_) => "meta",
            Source::JsonLd(_) => "json_ld",
            Source::ClassScan(_) => "scan",
        }
    }
}

/// Shorthand for a text-only selector source.
pub const fn css(css: &'static str) -> Source {
    Source::Selector { css, attrs: &[] }
}

/// What a source yielded before field-specific conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Json(Value),
    Text(String),
    /// Displayed time such as "3天前" or "03-15".
    Phrase(String),
}

/// Evaluate `attempt` over `sources` in order, returning the first success
/// together with the source that produced it.
pub fn first_resolved<'s, S, T>(
    sources: &'s [S],
    mut attempt: impl FnMut(&S) -> Option<T>,
) -> Option<(&'s S, T)> {
    sources
        .iter()
        .find_map(|source| attempt(source).map(|value| (source, value)))
}

/// Read-only view of everything sources can probe.
pub struct Probes<'a> {
    pub note: Option<&'a Value>,
    pub globals: &'a BTreeMap<String, Value>,
    pub document: &'a Html,
    pub hover: Option<&'a Html>,
    pub json_ld: &'a [Value],
}

impl<'a> Probes<'a> {
    /// Raw value at `source`, or `None` when absent or empty.
    pub fn probe(&self, source: &Source) -> Option<Raw> {
        match *source {
            Source::Note(path) => lookup(self.note?, path)
                .filter(|v| !v.is_null())
                .cloned()
                .map(Raw::Json),
            Source::Global(path) => {
                let (root, rest) = path.split_once('.').unwrap_or((path, ""));
                let global = self.globals.get(root)?;
                let value = if rest.is_empty() { global } else { lookup(global, rest)? };
                (!value.is_null()).then(|| Raw::Json(value.clone()))
            }
            Source::HoverCard(css) => {
                let el = select_first(self.hover?, css)?;
                non_empty(element_text(&el)).map(Raw::Text)
            }
            Source::HoverAttr { css, attrs } => {
                let el = select_first(self.hover?, css)?;
                first_attr(&el, attrs).map(Raw::Text)
            }
            Source::Attr { css, attrs } => {
                let el = select_first(self.document, css)?;
                first_attr(&el, attrs).map(Raw::Text)
            }
            Source::Selector { css, attrs } => {
                let el = select_first(self.document, css)?;
                non_empty(element_text(&el))
                    .or_else(|| first_attr(&el, attrs))
                    .map(Raw::Text)
            }
            Source::TimeElement(css) => {
                let el = select_first(self.document, css)?;
                match first_attr(&el, TIME_ATTRS) {
                    Some(attr) => Some(Raw::Text(attr)),
                    None => non_empty(element_text(&el)).map(Raw::Phrase),
                }
            }
            Source::Meta(css) => {
                let el = select_first(self.document, css)?;
                first_attr(&el, &["content"]).map(Raw::Text)
            }
            Source::JsonLd(keys) => self.json_ld.iter().find_map(|block| {
                keys.iter()
                    .filter_map(|k| block.get(*k))
                    .find(|v| !v.is_null())
                    .cloned()
                    .map(Raw::Json)
            }),
            Source::ClassScan(keywords) => self.class_scan(keywords),
        }
    }

    fn class_scan(&self, keywords: &[&str]) -> Option<Raw> {
        select_all(self.document, "[class]").into_iter().find_map(|el| {
            let class = el.value().attr("class")?.to_lowercase();
            if !keywords.iter().any(|k| class.contains(k)) {
                return None;
            }
            let text = element_text(&el);
            (BARE_COUNT.is_match(&text) && parse_number(&text) > 0).then_some(Raw::Text(text))
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

// =============================================================================
// CONVERSIONS
// =============================================================================

/// Non-empty trimmed text. Numbers are rendered; objects and arrays are rejected.
pub fn as_text(raw: Raw) -> Option<String> {
    let text = match raw {
        Raw::Json(Value::String(s)) => s,
        Raw::Json(Value::Number(n)) => n.to_string(),
        Raw::Json(_) => return None,
        Raw::Text(s) | Raw::Phrase(s) => s,
    };
    non_empty(text.trim().to_string())
}

/// Count that is strictly positive; zero means "keep looking".
pub fn as_count(raw: Raw) -> Option<u64> {
    let n = match raw {
        Raw::Json(v) => count_from_json(&v)?,
        Raw::Text(s) | Raw::Phrase(s) => parse_number(&s),
    };
    (n > 0).then_some(n)
}

/// Epoch milliseconds from a machine timestamp or a displayed phrase.
pub fn as_millis(raw: Raw, now: DateTime<FixedOffset>) -> Option<i64> {
    let offset = *now.offset();
    match raw {
        Raw::Json(v) => json_epoch_millis(&v, &offset),
        Raw::Text(s) => to_epoch_millis(&s, &offset),
        Raw::Phrase(s) => Some(parse_relative_time(&s, now) * 1000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notesync_core::local_offset;
    use serde_json::json;

    fn probes<'a>(
        note: Option<&'a Value>,
        globals: &'a BTreeMap<String, Value>,
        document: &'a Html,
        hover: Option<&'a Html>,
    ) -> Probes<'a> {
        Probes {
            note,
            globals,
            document,
            hover,
            json_ld: &[],
        }
    }

    #[test]
    fn test_first_resolved_stops_at_first_success() {
        let sources = [1, 2, 3, 4];
        let mut calls = 0;
        let hit = first_resolved(&sources, |n| {
            calls += 1;
            (*n >= 2).then(|| n * 10)
        });
        assert_eq!(hit, Some((&2, 20)));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_first_resolved_none_when_exhausted() {
        let sources: [u8; 2] = [0, 0];
        assert_eq!(first_resolved(&sources, |_| None::<u8>), None);
    }

    #[test]
    fn test_note_and_global_probes() {
        let note = json!({"interactInfo": {"likeCount": "15"}, "nothing": null});
        let mut globals = BTreeMap::new();
        globals.insert("__NUXT__".to_string(), json!({"data": [{"likeCount": 9}]}));
        let doc = Html::parse_document("");
        let p = probes(Some(&note), &globals, &doc, None);

        assert_eq!(
            p.probe(&Source::Note("interactInfo.likeCount")),
            Some(Raw::Json(json!("15")))
        );
        assert_eq!(p.probe(&Source::Note("nothing")), None);
        assert_eq!(
            p.probe(&Source::Global("__NUXT__.data.0.likeCount")),
            Some(Raw::Json(json!(9)))
        );
        assert_eq!(p.probe(&Source::Global("__INITIAL_STATE__.note")), None);
    }

    #[test]
    fn test_selector_falls_back_to_attributes() {
        let globals = BTreeMap::new();
        let doc = Html::parse_document(r#"<span class="fans" data-fans="2.3万"></span>"#);
        let p = probes(None, &globals, &doc, None);
        let source = Source::Selector {
            css: ".fans",
            attrs: &["data-fans"],
        };
        assert_eq!(p.probe(&source), Some(Raw::Text("2.3万".to_string())));
        assert_eq!(p.probe(&css(".fans")), None);
    }

    #[test]
    fn test_hover_probe_needs_card() {
        let globals = BTreeMap::new();
        let doc = Html::parse_document(r#"<div class="name">page</div>"#);
        let card = Html::parse_fragment(r#"<div class="user-card"><span class="name">card</span></div>"#);

        let without = probes(None, &globals, &doc, None);
        assert_eq!(without.probe(&Source::HoverCard(".name")), None);

        let with = probes(None, &globals, &doc, Some(&card));
        assert_eq!(
            with.probe(&Source::HoverCard(".name")),
            Some(Raw::Text("card".to_string()))
        );
    }

    #[test]
    fn test_attr_sources_ignore_text() {
        let globals = BTreeMap::new();
        let doc = Html::parse_document(r#"<div class="author"><a href="/user/profile/1">Name</a></div>"#);
        let card = Html::parse_fragment(r#"<a class="card-link" href="/user/profile/2">Card</a>"#);
        let p = probes(None, &globals, &doc, Some(&card));

        assert_eq!(
            p.probe(&Source::Attr { css: ".author a", attrs: &["href"] }),
            Some(Raw::Text("/user/profile/1".to_string()))
        );
        assert_eq!(
            p.probe(&Source::HoverAttr { css: "a[href]", attrs: &["href"] }),
            Some(Raw::Text("/user/profile/2".to_string()))
        );
        assert_eq!(p.probe(&Source::Attr { css: ".author", attrs: &["href"] }), None);
    }

    #[test]
    fn test_time_element_prefers_attributes() {
        let globals = BTreeMap::new();
        let doc = Html::parse_document(
            r#"<span class="date" datetime="2024-01-02">3天前</span><span class="time">昨天</span>"#,
        );
        let p = probes(None, &globals, &doc, None);
        assert_eq!(
            p.probe(&Source::TimeElement(".date")),
            Some(Raw::Text("2024-01-02".to_string()))
        );
        assert_eq!(
            p.probe(&Source::TimeElement(".time")),
            Some(Raw::Phrase("昨天".to_string()))
        );
    }

    #[test]
    fn test_class_scan_matches_bare_counts_only() {
        let globals = BTreeMap::new();
        let doc = Html::parse_document(
            r#"<div class="Like-box">点赞 12</div><span class="like-x">0</span><span class="LIKE-n">1.2w</span>"#,
        );
        let p = probes(None, &globals, &doc, None);
        assert_eq!(
            p.probe(&Source::ClassScan(&["like"])),
            Some(Raw::Text("1.2w".to_string()))
        );
        assert_eq!(p.probe(&Source::ClassScan(&["share"])), None);
    }

    #[test]
    fn test_json_ld_probe() {
        let globals = BTreeMap::new();
        let doc = Html::parse_document("");
        let blocks = [json!({"@type": "Article"}), json!({"dateCreated": "2024-01-02"})];
        let p = Probes {
            note: None,
            globals: &globals,
            document: &doc,
            hover: None,
            json_ld: &blocks,
        };
        assert_eq!(
            p.probe(&Source::JsonLd(&["datePublished", "dateCreated"])),
            Some(Raw::Json(json!("2024-01-02")))
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(as_text(Raw::Json(json!("  hi "))), Some("hi".to_string()));
        assert_eq!(as_text(Raw::Json(json!({"name": "x"}))), None);
        assert_eq!(as_text(Raw::Text("   ".to_string())), None);

        assert_eq!(as_count(Raw::Json(json!(0))), None);
        assert_eq!(as_count(Raw::Json(json!("1.2w"))), Some(12000));
        assert_eq!(as_count(Raw::Text("3k".to_string())), Some(3000));

        let now = local_offset(8).timestamp_opt(1_700_000_000, 0).single().unwrap();
        assert_eq!(as_millis(Raw::Json(json!(1_700_000_000)), now), Some(1_700_000_000_000));
        assert_eq!(
            as_millis(Raw::Phrase("1小时前".to_string()), now),
            Some((1_700_000_000 - 3600) * 1000)
        );
        assert_eq!(as_millis(Raw::Text("garbage".to_string()), now), None);
    }
}

//! Body text, tags, topics, images, and note type.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use serde_json::Value;

use notesync_core::NoteType;

use crate::page::{element_text, first_attr, select_all, select_first};
use crate::state::lookup;

const CONTENT_SELECTORS: &[&str] = &[
    ".note-detail-desc",
    ".note-content-text",
    ".note-text",
    r#"[data-testid="note-content"]"#,
    ".content-text",
    ".note-scroller .content",
    "#detail-desc",
];

const TAG_SELECTORS: &[&str] = &[
    ".tag-item",
    ".note-tag",
    ".hashtag",
    r#"[data-testid="tag"]"#,
    ".topic-tag",
    ".tag-list .tag",
    ".note-detail-tag",
    r#"a[href*="/search_result?keyword="]"#,
];

const TOPIC_SELECTORS: &[&str] = &[
    ".note-detail-topic .topic-item",
    ".topic-list .topic",
    ".hashtag-list .hashtag",
    ".note-topic .topic",
    ".topic-container .topic",
    r#"[data-testid="topic"]"#,
    ".topic",
    ".hashtag",
    r#"a[href*="/search_result?keyword="]"#,
    r#"a[href*="/topic/"]"#,
    r#".tag-item[href*="/search_result"]"#,
];

const IMAGE_SELECTORS: &[&str] = &[
    ".note-slider img",
    ".swiper-slide img",
    ".note-detail-image img",
    ".media-container img",
    ".carousel img",
];

const IMAGE_JSON_KEYS: &[&str] = &["urlDefault", "url", "urlPre", "infoList.0.url"];

static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([^\s#]+)").expect("static pattern"));
static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n\s*\n").expect("static pattern"));

// =============================================================================
// CONTENT
// =============================================================================

/// Note body with paragraph and line structure preserved.
///
/// `<br>` becomes a newline, a closing `</p>` a blank line, and an opening
/// `<div>` a newline. Runs of three or more newlines collapse to one blank line.
pub fn extract_content(document: &Html, note: Option<&Value>) -> Option<String> {
    for css in CONTENT_SELECTORS {
        let Some(el) = select_first(document, css) else {
            continue;
        };
        let mut out = String::new();
        render_block_text(&el, &mut out);
        let text = normalize_blank_lines(&out);
        if !text.is_empty() {
            return Some(text);
        }
        let flat = element_text(&el);
        if !flat.is_empty() {
            return Some(flat);
        }
    }

    note.and_then(|n| lookup(n, "desc"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn render_block_text(el: &ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            // Source indentation between block elements.
            Node::Text(text) if text.contains('\n') && text.trim().is_empty() => {}
            Node::Text(text) => out.push_str(&text.replace('\u{a0}', " ")),
            Node::Element(element) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                match element.name() {
                    "br" => out.push('\n'),
                    "p" => {
                        render_block_text(&child_el, out);
                        out.push_str("\n\n");
                    }
                    "div" => {
                        out.push('\n');
                        render_block_text(&child_el, out);
                    }
                    "script" | "style" => {}
                    _ => render_block_text(&child_el, out),
                }
            }
            _ => {}
        }
    }
}

fn normalize_blank_lines(text: &str) -> String {
    EXCESS_BLANK_LINES
        .replace_all(text, "\n\n")
        .trim()
        .to_string()
}

// =============================================================================
// TAGS AND TOPICS
// =============================================================================

/// Where the tag list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOrigin {
    /// Dedicated tag elements on the page.
    Elements,
    /// Hashtags mined from the body text.
    Content,
}

/// Tags from every tag selector, or hashtags in `content` when none exist.
///
/// Tags are deduplicated after stripping a leading `#`.
pub fn extract_tags(document: &Html, content: &str) -> (Vec<String>, TagOrigin) {
    let mut tags = Vec::new();
    for css in TAG_SELECTORS {
        for el in select_all(document, css) {
            push_unique(&mut tags, clean_tag(&element_text(&el)));
        }
    }
    if !tags.is_empty() {
        return (tags, TagOrigin::Elements);
    }

    for caps in HASHTAG.captures_iter(content) {
        if let Some(m) = caps.get(1) {
            push_unique(&mut tags, clean_tag(m.as_str()));
        }
    }
    (tags, TagOrigin::Content)
}

/// Topics from the first topic selector that matches anything.
pub fn extract_topics(document: &Html) -> Vec<String> {
    let mut topics = Vec::new();
    for css in TOPIC_SELECTORS {
        let elements = select_all(document, css);
        if elements.is_empty() {
            continue;
        }
        for el in elements {
            push_unique(&mut topics, clean_tag(&element_text(&el)));
        }
        break;
    }
    topics
}

/// Append tags to the body as a trailing `#a #b` line.
pub fn append_tags(content: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        return content.to_string();
    }
    let line = tags
        .iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ");
    if content.is_empty() {
        line
    } else {
        format!("{}\n\n{}", content, line)
    }
}

fn clean_tag(raw: &str) -> String {
    let tag = raw.trim();
    let tag = tag.strip_prefix('#').unwrap_or(tag);
    let tag = tag.strip_suffix("[话题]#").or_else(|| tag.strip_suffix("[话题]")).unwrap_or(tag);
    tag.trim().to_string()
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !item.is_empty() && !list.contains(&item) {
        list.push(item);
    }
}

// =============================================================================
// MEDIA
// =============================================================================

/// Note image URLs, deduplicated, embedded state first.
pub fn extract_images(document: &Html, note: Option<&Value>) -> Vec<String> {
    let mut images = Vec::new();

    if let Some(list) = note.and_then(|n| lookup(n, "imageList")).and_then(Value::as_array) {
        for item in list {
            let url = IMAGE_JSON_KEYS
                .iter()
                .filter_map(|k| lookup(item, k))
                .find_map(Value::as_str);
            if let Some(url) = url.and_then(absolute_media_url) {
                push_unique(&mut images, url);
            }
        }
    }

    if images.is_empty() {
        for css in IMAGE_SELECTORS {
            for el in select_all(document, css) {
                if let Some(url) = first_attr(&el, &["src", "data-src"]).as_deref().and_then(absolute_media_url) {
                    push_unique(&mut images, url);
                }
            }
        }
    }

    if images.is_empty() {
        if let Some(url) = select_first(document, r#"meta[property="og:image"]"#)
            .and_then(|el| first_attr(&el, &["content"]))
            .as_deref()
            .and_then(absolute_media_url)
        {
            images.push(url);
        }
    }

    images
}

fn absolute_media_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else if let Some(rest) = url.strip_prefix("//") {
        Some(format!("https://{}", rest))
    } else {
        None
    }
}

/// Video when the page has a player or the state says so.
pub fn detect_note_type(document: &Html, note: Option<&Value>) -> NoteType {
    let state_says_video = note
        .and_then(|n| lookup(n, "type"))
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("video"));
    if state_says_video
        || select_first(document, "video").is_some()
        || select_first(document, ".video-container").is_some()
    {
        NoteType::Video
    } else {
        NoteType::ImageText
    }
}

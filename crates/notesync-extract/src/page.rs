//! Page snapshots and DOM query helpers.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// Everything the extractor may read about one page view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageContext {
    /// Current page URL.
    pub url: String,
    /// Serialized DOM (`document.documentElement.outerHTML`).
    pub html: String,
    /// Window-global state objects captured by the page script, keyed by global name.
    pub state: BTreeMap<String, Value>,
    /// Markup of the lazily rendered author card, once it appeared.
    pub hover_card_html: Option<String>,
    /// Reference time for relative phrases; the wall clock when absent.
    #[serde(skip)]
    pub now: Option<DateTime<FixedOffset>>,
}

impl PageContext {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }

    pub fn with_hover_card(mut self, html: impl Into<String>) -> Self {
        self.hover_card_html = Some(html.into());
        self
    }

    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Parse a CSS selector, treating invalid selectors as "no match".
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            trace!(subsystem = "extract", component = "page", css, error = ?e, "Selector rejected");
            None
        }
    }
}

/// First element matching `css` in document order.
pub fn select_first<'a>(html: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    html.select(&sel).next()
}

/// All elements matching `css` in document order.
pub fn select_all<'a>(html: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => html.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// Concatenated, trimmed text of an element (`textContent`).
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// First non-empty attribute among `attrs`.
pub fn first_attr(el: &ElementRef<'_>, attrs: &[&str]) -> Option<String> {
    attrs
        .iter()
        .filter_map(|name| el.value().attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

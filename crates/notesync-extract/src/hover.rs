//! Hover-card capture.
//!
//! The author card renders lazily after a pointer-enter on the author
//! block. Capturing it is an async step: trigger, then poll until the card
//! shows up or the timeout passes. The captured markup is handed to the
//! synchronous extractor through [`PageContext::hover_card_html`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use notesync_core::defaults::{HOVER_POLL_MS, HOVER_TIMEOUT_MS};
use notesync_core::Result;

use crate::page::{select_first, PageContext};

/// Elements that open the author card on pointer-enter, in priority order.
pub const HOVER_TRIGGERS: &[&str] = &[
    ".author-container",
    ".user-info",
    ".author-wrapper",
    ".user-avatar",
    ".author-avatar",
    ".user-name",
    ".author-name",
    ".nickname",
    r#"[data-testid="author"]"#,
    ".profile-link",
];

/// Selectors that identify a rendered card.
pub const HOVER_CARDS: &[&str] = &[
    ".hover-card",
    ".user-hover-card",
    ".author-hover",
    ".popup-card",
    ".tooltip",
    ".user-card",
    ".author-card",
];

/// Bounds for one hover capture.
#[derive(Debug, Clone, Copy)]
pub struct HoverOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for HoverOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(HOVER_TIMEOUT_MS),
            poll_interval: Duration::from_millis(HOVER_POLL_MS),
        }
    }
}

/// A live page that can be hovered.
#[async_trait]
pub trait HoverProbe: Send + Sync {
    /// Dispatch pointer-enter on the first element matching `selector`.
    /// Returns `false` when no such element exists.
    async fn trigger(&self, selector: &str) -> Result<bool>;

    /// Markup of the card if it has rendered.
    async fn card_html(&self) -> Result<Option<String>>;
}

/// Poll `check` every `interval` until it yields a value or `timeout` elapses.
///
/// `check` runs at least once, even with a zero timeout.
pub async fn poll_until<T, F, Fut>(mut check: F, timeout: Duration, interval: Duration) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = check().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Trigger the first available author element and wait for its card.
///
/// Errors from the probe are logged and treated as "no card".
pub async fn capture_hover_card(probe: &dyn HoverProbe, options: HoverOptions) -> Option<String> {
    let mut triggered = None;
    for selector in HOVER_TRIGGERS {
        match probe.trigger(selector).await {
            Ok(true) => {
                triggered = Some(*selector);
                break;
            }
            Ok(false) => continue,
            Err(e) => {
                warn!(subsystem = "extract", component = "hover", selector, error = %e, "Hover trigger failed");
                return None;
            }
        }
    }
    let trigger = triggered?;

    let card = poll_until(
        || async {
            match probe.card_html().await {
                Ok(html) => html.filter(|h| !h.trim().is_empty()),
                Err(e) => {
                    trace!(subsystem = "extract", component = "hover", error = %e, "Card poll failed");
                    None
                }
            }
        },
        options.timeout,
        options.poll_interval,
    )
    .await;

    match &card {
        Some(_) => debug!(subsystem = "extract", component = "hover", trigger, "Hover card captured"),
        None => debug!(
            subsystem = "extract",
            component = "hover",
            trigger,
            timeout_ms = options.timeout.as_millis() as u64,
            "Hover card did not appear"
        ),
    }
    card
}

/// Fill `ctx.hover_card_html` from `probe` unless it is already set.
pub async fn attach_hover_card(ctx: &mut PageContext, probe: &dyn HoverProbe, options: HoverOptions) {
    if ctx.hover_card_html.is_some() {
        return;
    }
    ctx.hover_card_html = capture_hover_card(probe, options).await;
}

/// Probe over a static snapshot.
///
/// Triggers succeed when the snapshot contains the trigger element; the
/// card is whichever known card element the snapshot (or a separately
/// captured card) contains.
#[derive(Debug, Clone)]
pub struct SnapshotProbe {
    page_html: String,
    card_html: Option<String>,
}

impl SnapshotProbe {
    pub fn new(page_html: impl Into<String>, card_html: Option<String>) -> Self {
        Self {
            page_html: page_html.into(),
            card_html,
        }
    }
}

#[async_trait]
impl HoverProbe for SnapshotProbe {
    async fn trigger(&self, selector: &str) -> Result<bool> {
        let doc = Html::parse_document(&self.page_html);
        Ok(select_first(&doc, selector).is_some())
    }

    async fn card_html(&self) -> Result<Option<String>> {
        if let Some(card) = &self.card_html {
            return Ok(Some(card.clone()));
        }
        let doc = Html::parse_document(&self.page_html);
        Ok(HOVER_CARDS
            .iter()
            .find_map(|css| select_first(&doc, css))
            .map(|el| el.html()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Card appears after `ready_after` polls.
    struct DelayedCard {
        has_trigger: bool,
        ready_after: usize,
        polls: AtomicUsize,
    }

    #[async_trait]
    impl HoverProbe for DelayedCard {
        async fn trigger(&self, selector: &str) -> Result<bool> {
            Ok(self.has_trigger && selector == ".user-info")
        }

        async fn card_html(&self) -> Result<Option<String>> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((n >= self.ready_after).then(|| "<div class=\"user-card\">ok</div>".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_when_ready() {
        let probe = DelayedCard {
            has_trigger: true,
            ready_after: 5,
            polls: AtomicUsize::new(0),
        };
        let started = Instant::now();
        let card = capture_hover_card(&probe, HoverOptions::default()).await;

        assert!(card.unwrap().contains("ok"));
        assert_eq!(probe.polls.load(Ordering::SeqCst), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(4 * HOVER_POLL_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_gives_up_at_timeout() {
        let probe = DelayedCard {
            has_trigger: true,
            ready_after: usize::MAX,
            polls: AtomicUsize::new(0),
        };
        let started = Instant::now();
        let card = capture_hover_card(&probe, HoverOptions::default()).await;

        assert!(card.is_none());
        assert_eq!(started.elapsed(), Duration::from_millis(HOVER_TIMEOUT_MS));
        let expected_polls = (HOVER_TIMEOUT_MS / HOVER_POLL_MS) as usize + 1;
        assert_eq!(probe.polls.load(Ordering::SeqCst), expected_polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_trigger_means_no_wait() {
        let probe = DelayedCard {
            has_trigger: false,
            ready_after: 1,
            polls: AtomicUsize::new(0),
        };
        let started = Instant::now();
        assert!(capture_hover_card(&probe, HoverOptions::default()).await.is_none());
        assert_eq!(probe.polls.load(Ordering::SeqCst), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_timeout_still_checks_once() {
        let hit = poll_until(|| async { Some(7) }, Duration::ZERO, Duration::from_millis(10)).await;
        assert_eq!(hit, Some(7));
    }

    #[tokio::test]
    async fn test_snapshot_probe_finds_card_in_page() {
        let probe = SnapshotProbe::new(
            r#"<div class="author-container"><span class="name">A</span></div>
               <div class="user-card"><span class="name">Card</span></div>"#,
            None,
        );
        let mut ctx = PageContext::new("u", "");
        attach_hover_card(&mut ctx, &probe, HoverOptions::default()).await;
        assert!(ctx.hover_card_html.unwrap().contains("Card"));
    }

    #[tokio::test]
    async fn test_attach_keeps_existing_card() {
        let probe = SnapshotProbe::new("<div class=\"user-info\"></div>", Some("<b>new</b>".to_string()));
        let mut ctx = PageContext::new("u", "").with_hover_card("<b>old</b>");
        attach_hover_card(&mut ctx, &probe, HoverOptions::default()).await;
        assert_eq!(ctx.hover_card_html.as_deref(), Some("<b>old</b>"));
    }
}

//! Per-tab page session.
//!
//! Tracks the URL-change watcher, whether the sync button has been
//! injected on the current page, and how many injection attempts have been
//! made since the last navigation. One session per tab; the owner drives it
//! with navigation events and drops it when the tab closes.

use serde::Serialize;
use tracing::{debug, info};

use notesync_core::defaults::SESSION_MAX_ATTEMPTS;
use notesync_core::is_note_detail_page;

/// Lifecycle state of a [`PageSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Watching,
    Stopped,
}

/// What the caller should do after a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationOutcome {
    pub is_note_page: bool,
    pub should_inject: bool,
}

#[derive(Debug, Clone)]
pub struct PageSession {
    state: SessionState,
    url: String,
    injected: bool,
    attempts: u32,
    max_attempts: u32,
}

impl Default for PageSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSession {
    pub fn new() -> Self {
        Self::with_max_attempts(SESSION_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            state: SessionState::Idle,
            url: String::new(),
            injected: false,
            attempts: 0,
            max_attempts,
        }
    }

    /// Begin watching `url`. Restarting a stopped session is allowed.
    pub fn start(&mut self, url: &str) -> NavigationOutcome {
        self.state = SessionState::Watching;
        info!(subsystem = "extract", component = "session", url, "Page session started");
        self.enter(url)
    }

    /// Stop watching. Later navigation events are ignored until `start`.
    pub fn stop(&mut self) {
        if self.state != SessionState::Stopped {
            info!(subsystem = "extract", component = "session", url = %self.url, "Page session stopped");
        }
        self.state = SessionState::Stopped;
        self.injected = false;
        self.attempts = 0;
    }

    /// React to a URL change.
    ///
    /// A changed URL resets the injected marker and the attempt counter.
    /// A repeated URL keeps them, so a re-fired event does not re-inject.
    pub fn on_navigation(&mut self, url: &str) -> NavigationOutcome {
        match self.state {
            SessionState::Idle => self.start(url),
            SessionState::Stopped => NavigationOutcome {
                is_note_page: is_note_detail_page(url),
                should_inject: false,
            },
            SessionState::Watching if url == self.url => self.outcome(),
            SessionState::Watching => {
                debug!(subsystem = "extract", component = "session", from = %self.url, to = url, "Navigation");
                self.enter(url)
            }
        }
    }

    /// Record that the button now exists on the current page.
    pub fn mark_injected(&mut self) {
        self.injected = true;
    }

    /// Count one injection attempt. Returns `false` once the budget is spent.
    pub fn record_attempt(&mut self) -> bool {
        if self.attempts >= self.max_attempts {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_injected(&self) -> bool {
        self.injected
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_note_page(&self) -> bool {
        is_note_detail_page(&self.url)
    }

    fn enter(&mut self, url: &str) -> NavigationOutcome {
        self.url = url.to_string();
        self.injected = false;
        self.attempts = 0;
        self.outcome()
    }

    fn outcome(&self) -> NavigationOutcome {
        let is_note_page = self.is_note_page();
        NavigationOutcome {
            is_note_page,
            should_inject: self.state == SessionState::Watching
                && is_note_page
                && !self.injected
                && self.attempts < self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = "https://www.xiaohongshu.com/explore/64a1b2c3d4e5f60718293a4b";
    const OTHER_NOTE: &str = "https://www.xiaohongshu.com/explore/0123456789abcdef01234567";
    const HOME: &str = "https://www.xiaohongshu.com/explore";

    #[test]
    fn test_first_navigation_starts_session() {
        let mut session = PageSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        let outcome = session.on_navigation(NOTE);
        assert_eq!(session.state(), SessionState::Watching);
        assert!(outcome.is_note_page);
        assert!(outcome.should_inject);
    }

    #[test]
    fn test_listing_pages_do_not_inject() {
        let mut session = PageSession::new();
        let outcome = session.start(HOME);
        assert!(!outcome.is_note_page);
        assert!(!outcome.should_inject);
    }

    #[test]
    fn test_injected_marker_resets_on_url_change() {
        let mut session = PageSession::new();
        session.start(NOTE);
        session.mark_injected();
        assert!(!session.on_navigation(NOTE).should_inject);

        let outcome = session.on_navigation(OTHER_NOTE);
        assert!(outcome.should_inject);
        assert!(!session.is_injected());
    }

    #[test]
    fn test_attempt_budget() {
        let mut session = PageSession::with_max_attempts(2);
        session.start(NOTE);
        assert!(session.record_attempt());
        assert!(session.record_attempt());
        assert!(!session.record_attempt());
        assert!(!session.on_navigation(NOTE).should_inject);

        session.on_navigation(OTHER_NOTE);
        assert_eq!(session.attempts(), 0);
        assert!(session.record_attempt());
    }

    #[test]
    fn test_stopped_session_ignores_navigation() {
        let mut session = PageSession::new();
        session.start(NOTE);
        session.stop();
        let outcome = session.on_navigation(OTHER_NOTE);
        assert!(outcome.is_note_page);
        assert!(!outcome.should_inject);
        assert_eq!(session.url(), NOTE);

        assert!(session.start(OTHER_NOTE).should_inject);
    }
}

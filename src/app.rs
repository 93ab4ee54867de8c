//! Application state.
//!
//! [`App`] owns the feed registry handle, the selected tab and the status
//! line.  It never performs I/O itself: feed data is read through
//! [`crate::cache::FeedCache::get`] at draw time, and a manual refresh is only
//! *requested* here and carried out by the main loop.

use crate::cache::{FeedChange, FeedEvent};
use crate::feeds::Feeds;

/// Dashboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Market,
    Futures,
    Mining,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Market, Tab::Futures, Tab::Mining];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Market => "Market",
            Tab::Futures => "Futures",
            Tab::Mining => "Mining",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn previous(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

pub struct App {
    pub feeds: Feeds,
    pub tab: Tab,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last feed event, rendered in the status bar.
    pub status: String,
    refresh_requested: bool,
}

impl App {
    pub fn new(feeds: Feeds) -> Self {
        Self {
            feeds,
            tab: Tab::Market,
            quit: false,
            status: "Starting…".into(),
            refresh_requested: false,
        }
    }

    /// Update the status line from a cache notification.
    pub fn apply_event(&mut self, event: &FeedEvent) {
        self.status = match &event.change {
            FeedChange::Updated => format!("Updated {}", event.feed),
            FeedChange::Failed(e) => format!("{}: {e}", event.feed),
        };
    }

    // -- navigation ----------------------------------------------------------

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
    }

    pub fn previous_tab(&mut self) {
        self.tab = self.tab.previous();
    }

    /// Jump to the tab at `index`; out-of-range indexes are ignored.
    pub fn select_tab(&mut self, index: usize) {
        if let Some(tab) = Tab::ALL.get(index) {
            self.tab = *tab;
        }
    }

    // -- refresh control -----------------------------------------------------

    /// Ask the main loop to force-refresh every feed.
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
        self.status = "Refreshing all feeds…".into();
    }

    /// Returns `true` once per [`request_refresh`](Self::request_refresh).
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    /// Pause or resume the refresh timers.  Must run inside the runtime.
    pub fn toggle_auto_refresh(&mut self) {
        if self.feeds.is_auto_refreshing() {
            self.feeds.stop_all();
            self.status = "Auto refresh paused".into();
        } else {
            self.feeds.start_all();
            self.status = "Auto refresh resumed".into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::tests::MockSource;
    use crate::config::Config;
    use crate::error::FetchError;
    use crate::source::FeedId;

    fn app() -> App {
        App::new(Feeds::new(&Config::default(), MockSource::new(Duration::ZERO)))
    }

    #[test]
    fn new_app_starts_on_market_tab() {
        let app = app();
        assert_eq!(app.tab, Tab::Market);
        assert!(!app.quit);
    }

    #[test]
    fn tabs_wrap_both_ways() {
        let mut app = app();
        app.previous_tab();
        assert_eq!(app.tab, Tab::Mining);
        app.next_tab();
        assert_eq!(app.tab, Tab::Market);
        app.next_tab();
        assert_eq!(app.tab, Tab::Futures);
    }

    #[test]
    fn select_tab_ignores_out_of_range() {
        let mut app = app();
        app.select_tab(2);
        assert_eq!(app.tab, Tab::Mining);
        app.select_tab(9);
        assert_eq!(app.tab, Tab::Mining);
    }

    #[test]
    fn refresh_request_is_taken_once() {
        let mut app = app();
        assert!(!app.take_refresh_request());
        app.request_refresh();
        assert!(app.take_refresh_request());
        assert!(!app.take_refresh_request());
    }

    #[test]
    fn status_reflects_events() {
        let mut app = app();
        app.apply_event(&FeedEvent {
            feed: FeedId::FearGreed,
            change: FeedChange::Updated,
        });
        assert_eq!(app.status, "Updated Fear & Greed");

        app.apply_event(&FeedEvent {
            feed: FeedId::Hashrate,
            change: FeedChange::Failed(FetchError::HttpStatus(429)),
        });
        assert_eq!(app.status, "Hashrate: HTTP status 429");
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_auto_refresh_pauses_and_resumes() {
        let mut app = app();
        app.toggle_auto_refresh();
        assert!(app.feeds.is_auto_refreshing());
        app.toggle_auto_refresh();
        assert!(!app.feeds.is_auto_refreshing());
        assert_eq!(app.status, "Auto refresh paused");
    }
}

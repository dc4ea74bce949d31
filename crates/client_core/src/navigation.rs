//! Bounded page history.
//!
//! The tip of the history is always the active page. A new navigation first cuts
//! everything after the earliest entry of the current page, so returning to a page
//! already in history collapses the loop. Back pops the tip and never re-pushes.

use shared::domain::PageId;
use tracing::debug;

pub const MAX_HISTORY: usize = 10;

/// Label shown on the back affordance regardless of the previous page.
pub const BACK_LABEL: &str = "Back";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationSnapshot {
    pub current: PageId,
    pub history: Vec<PageId>,
    pub back_enabled: bool,
    pub back_label: &'static str,
}

/// Result of a navigation request, consumed by the page hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEntered {
    pub page: PageId,
    pub previous: PageId,
    /// The entered page renders derived data and must be recomputed.
    pub refresh_derived: bool,
}

#[derive(Debug, Clone)]
pub struct NavigationController {
    history: Vec<PageId>,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationController {
    pub fn new() -> Self {
        Self {
            history: vec![PageId::Home],
        }
    }

    pub fn current(&self) -> PageId {
        // history is never empty
        self.history.last().copied().unwrap_or(PageId::Home)
    }

    pub fn history(&self) -> &[PageId] {
        &self.history
    }

    pub fn navigate_to(&mut self, page: PageId) -> PageEntered {
        let previous = self.current();
        if previous != page {
            if let Some(index) = self.history.iter().position(|entry| *entry == previous) {
                self.history.truncate(index + 1);
            }
            self.history.push(page);
            if self.history.len() > MAX_HISTORY {
                let excess = self.history.len() - MAX_HISTORY;
                self.history.drain(..excess);
            }
        }
        debug!(from = %previous, to = %page, depth = self.history.len(), "navigate");
        PageEntered {
            page,
            previous,
            refresh_derived: page.shows_derived_data(),
        }
    }

    /// Parses a page id coming from the presentation layer; unknown ids are no-ops.
    pub fn navigate_to_named(&mut self, name: &str) -> Option<PageEntered> {
        match name.parse::<PageId>() {
            Ok(page) => Some(self.navigate_to(page)),
            Err(err) => {
                debug!(%err, "ignoring navigation to unknown page");
                None
            }
        }
    }

    pub fn navigate_back(&mut self) -> Option<PageEntered> {
        if self.history.len() <= 1 {
            return None;
        }
        let previous = self.history.pop().unwrap_or(PageId::Home);
        let page = self.current();
        debug!(from = %previous, to = %page, depth = self.history.len(), "navigate back");
        Some(PageEntered {
            page,
            previous,
            refresh_derived: page.shows_derived_data(),
        })
    }

    pub fn previous_page(&self) -> Option<PageId> {
        self.history.iter().rev().nth(1).copied()
    }

    pub fn can_go_back(&self) -> bool {
        self.history.len() > 1 && self.current() != PageId::Home
    }

    // The previous page's display name is available through `previous_page`, but the
    // label stays constant.
    pub fn back_label(&self) -> &'static str {
        BACK_LABEL
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            current: self.current(),
            history: self.history.clone(),
            back_enabled: self.can_go_back(),
            back_label: self.back_label(),
        }
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;

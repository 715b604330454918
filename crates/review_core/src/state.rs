use std::collections::HashSet;
use std::fmt;

use crate::{DedupKey, Effect, Review};

/// Pages beyond this are never requested unless the caller asks for more.
pub const DEFAULT_MAX_PAGES: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Fetching(u32),
    /// Page `page` yielded `records` review blocks; settles immediately.
    Extracted { page: u32, records: usize },
    Done,
    Aborted,
}

impl PageState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PageState::Done | PageState::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    PageLimit,
    NotFound,
    Redirected,
    FetchFailed,
    Cancelled,
    DeadlineReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::EmptyPage => "empty page",
            StopReason::PageLimit => "page limit reached",
            StopReason::NotFound => "page not found",
            StopReason::Redirected => "redirected past the last page",
            StopReason::FetchFailed => "fetch retries exhausted",
            StopReason::Cancelled => "cancelled",
            StopReason::DeadlineReached => "run time budget exhausted",
        };
        f.write_str(text)
    }
}

/// Accumulated reviews of one run, in page order then in-page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSet {
    pub reviews: Vec<Review>,
    /// False when the run aborted; `reviews` then holds everything gathered before.
    pub complete: bool,
    pub stop_reason: Option<StopReason>,
    pub pages_fetched: u32,
    pub dropped_records: usize,
    pub duplicate_records: usize,
    pub warnings: Vec<String>,
}

/// Pagination controller state. Only `update` moves it forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    pub(crate) page: PageState,
    pub(crate) max_pages: u32,
    pub(crate) reviews: Vec<Review>,
    pub(crate) seen: HashSet<DedupKey>,
    pub(crate) pages_fetched: u32,
    pub(crate) dropped_records: usize,
    pub(crate) duplicate_records: usize,
    pub(crate) stop_reason: Option<StopReason>,
    pub(crate) warnings: Vec<String>,
}

impl CrawlState {
    /// Fresh controller in `Fetching(1)`, with the effect requesting page 1.
    pub fn start(max_pages: u32) -> (Self, Vec<Effect>) {
        let state = Self {
            page: PageState::Fetching(1),
            max_pages: max_pages.max(1),
            reviews: Vec::new(),
            seen: HashSet::new(),
            pages_fetched: 0,
            dropped_records: 0,
            duplicate_records: 0,
            stop_reason: None,
            warnings: Vec::new(),
        };
        (state, vec![Effect::FetchPage { page: 1 }])
    }

    pub fn page_state(&self) -> PageState {
        self.page
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn is_finished(&self) -> bool {
        self.page.is_terminal()
    }

    pub fn into_review_set(self) -> ReviewSet {
        ReviewSet {
            complete: self.page == PageState::Done,
            reviews: self.reviews,
            stop_reason: self.stop_reason,
            pages_fetched: self.pages_fetched,
            dropped_records: self.dropped_records,
            duplicate_records: self.duplicate_records,
            warnings: self.warnings,
        }
    }
}

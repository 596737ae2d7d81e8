//! Result session: the frozen snapshot of the last search, its sort order and
//! the pagination cursor over it.
//!
//! The session never talks to the network. Callers open a search with
//! [`ResultSession::begin_search`], run the request, and hand the outcome back
//! with the ticket they were given. Tickets are numbered so a response that
//! lands after a newer search was issued is discarded instead of overwriting
//! fresher results.

use crate::records::ImageRecord;
use crate::sort::{sort_records, SortOrder};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::ops::Range;

/// Number of cards per page
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Empty,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub page_size: usize,
    pub page_index: usize,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            page_index: 0,
        }
    }
}

impl PaginationCursor {
    /// End (exclusive) of everything rendered up to and including the current page
    pub fn rendered_end(&self, len: usize) -> usize {
        ((self.page_index + 1) * self.page_size).min(len)
    }

    /// Range of the current page alone
    pub fn page_range(&self, len: usize) -> Range<usize> {
        let start = (self.page_index * self.page_size).min(len);
        start..self.rendered_end(len)
    }

    pub fn can_advance(&self, len: usize) -> bool {
        (self.page_index + 1) * self.page_size < len
    }
}

/// Ordered results of one search call, plus the order they were last sorted by
#[derive(Debug, Clone)]
pub struct ResultSnapshot {
    records: Vec<ImageRecord>,
    order: SortOrder,
}

impl ResultSnapshot {
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Clear everything rendered, then draw the range
    Replace,
    /// Draw the range after what is already rendered
    Append,
}

/// What the gallery should draw next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub mode: RenderMode,
    pub range: Range<usize>,
    /// Whether records remain past the end of this plan
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Installed(RenderPlan),
    /// A newer search was issued before this one completed
    Stale,
}

pub struct ResultSession {
    state: SessionState,
    state_before_loading: SessionState,
    snapshot: Option<ResultSnapshot>,
    cursor: PaginationCursor,
    order: SortOrder,
    last_query: String,
    issued: u64,
    rng: StdRng,
}

impl Default for ResultSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSession {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic shuffles, for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: SessionState::Empty,
            state_before_loading: SessionState::Empty,
            snapshot: None,
            cursor: PaginationCursor::default(),
            order: SortOrder::default(),
            last_query: String::new(),
            issued: 0,
            rng,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&ResultSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.cursor
    }

    pub fn sort_order(&self) -> SortOrder {
        self.order
    }

    /// Query of the most recently issued search
    pub fn last_query(&self) -> &str {
        &self.last_query
    }

    fn len(&self) -> usize {
        self.snapshot.as_ref().map_or(0, ResultSnapshot::len)
    }

    pub fn find(&self, path: &str) -> Option<&ImageRecord> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.records.iter().find(|r| r.path == path))
    }

    /// Records covered by a plan produced by this session
    pub fn records_for(&self, plan: &RenderPlan) -> &[ImageRecord] {
        match &self.snapshot {
            Some(snapshot) => {
                let end = plan.range.end.min(snapshot.len());
                let start = plan.range.start.min(end);
                &snapshot.records[start..end]
            }
            None => &[],
        }
    }

    /// Full render of everything up to the current page. Calling it twice
    /// without a transition in between yields the same plan.
    pub fn current_plan(&self) -> RenderPlan {
        let len = self.len();
        let end = self.cursor.rendered_end(len);
        RenderPlan {
            mode: RenderMode::Replace,
            range: 0..end,
            has_more: end < len,
        }
    }

    /// Enter Loading and hand out the ticket the response must be returned with
    pub fn begin_search(&mut self, query: &str) -> SearchTicket {
        if self.state != SessionState::Loading {
            self.state_before_loading = self.state;
        }
        self.state = SessionState::Loading;
        self.issued += 1;
        self.last_query = query.to_string();
        log::debug!("[Search] #{} issued for {:?}", self.issued, query);
        SearchTicket { seq: self.issued }
    }

    fn is_current(&self, ticket: SearchTicket) -> bool {
        ticket.seq == self.issued
    }

    /// Install a response as the new snapshot: page 0, current sort re-applied
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        mut records: Vec<ImageRecord>,
    ) -> SearchOutcome {
        if !self.is_current(ticket) {
            log::info!(
                "[Search] Dropping stale response #{} (latest is #{})",
                ticket.seq,
                self.issued
            );
            return SearchOutcome::Stale;
        }

        sort_records(&mut records, self.order, &mut self.rng);
        self.snapshot = Some(ResultSnapshot {
            records,
            order: self.order,
        });
        self.cursor.page_index = 0;
        self.state = SessionState::Ready;
        SearchOutcome::Installed(self.current_plan())
    }

    /// The request failed: leave the snapshot alone and drop back to the
    /// state before Loading. Returns false for a stale ticket.
    pub fn fail_search(&mut self, ticket: SearchTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.state = self.state_before_loading;
        true
    }

    /// Re-order the existing snapshot without re-querying. Selecting
    /// `Random` again reshuffles. Returns None when there is nothing to draw.
    pub fn apply_sort(&mut self, order: SortOrder) -> Option<RenderPlan> {
        self.order = order;
        self.cursor.page_index = 0;
        let snapshot = self.snapshot.as_mut()?;
        sort_records(&mut snapshot.records, order, &mut self.rng);
        snapshot.order = order;
        Some(self.current_plan())
    }

    /// Reveal the next page. None (and no state change) when it would run
    /// past the end of the snapshot.
    pub fn load_more(&mut self) -> Option<RenderPlan> {
        let len = self.len();
        if self.snapshot.is_none() || !self.cursor.can_advance(len) {
            return None;
        }
        self.cursor.page_index += 1;
        let range = self.cursor.page_range(len);
        Some(RenderPlan {
            mode: RenderMode::Append,
            has_more: range.end < len,
            range,
        })
    }
}

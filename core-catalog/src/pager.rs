//! Cursor pagination over the album listing.
//!
//! [`AlbumPager`] keeps one filter's worth of album list state and supports
//! two navigation styles over the same cursor stream:
//!
//! - **Append** ([`AlbumPager::load_more`]): infinite scroll, items accumulate.
//! - **Paged** ([`AlbumPager::load_next`] / [`AlbumPager::load_prev`]): items
//!   are replaced and the cursors of earlier pages are kept on a back stack.
//!
//! The pager never fetches page 1 of a filter itself. The caller fetches it
//! and hands it over through [`AlbumPager::new`] or
//! [`AlbumPager::reset_filter`].
//!
//! Only one fetch is in flight at a time. A response that arrives after the
//! filter changed is discarded, detected through a generation counter that
//! every filter reset bumps.

use crate::api::CatalogApi;
use crate::error::Result;
use crate::index::AlbumIndex;
use crate::models::{Album, AlbumId, Cursor, GenreId};
use crate::query::{AlbumPage, AlbumQuery};
use core_runtime::config::{AlbumSort, CoreConfig, MAX_PER_PAGE};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    /// The response was applied. `count` is the number of albums appended
    /// (append mode) or now displayed (paged mode).
    Applied { count: usize },
    /// A guard prevented the fetch; nothing happened.
    Skipped(SkipReason),
    /// The response arrived after a filter change and was dropped.
    Discarded,
}

impl PageLoad {
    pub fn is_applied(&self) -> bool {
        matches!(self, PageLoad::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch has not completed yet
    InFlight,
    /// The server reported no further results
    Exhausted,
    /// More results were announced without a cursor to reach them
    NoCursor,
    /// `load_prev` on the first page
    AtFirstPage,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::InFlight => "fetch already in flight",
            SkipReason::Exhausted => "no more results",
            SkipReason::NoCursor => "no next cursor",
            SkipReason::AtFirstPage => "already at first page",
        };
        f.write_str(reason)
    }
}

/// Serializable view of the pager for hosts that render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerSnapshot {
    pub filter: Option<GenreId>,
    pub album_ids: Vec<AlbumId>,
    pub has_more: bool,
    pub next_cursor: Option<Cursor>,
    pub current_cursor: Option<Cursor>,
    pub page_number: usize,
    pub is_loading: bool,
    pub is_exhausted: bool,
    pub per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Append,
    Next,
    Prev,
}

/// A fetch the pager committed to before suspending.
struct Ticket {
    generation: u64,
    filter: Option<GenreId>,
    cursor: Option<Cursor>,
    query: AlbumQuery,
}

/// Undoes the commit of a fetch whose future is dropped before it resumes.
///
/// Clears `in_flight` and, for a `load_prev`, puts the popped cursor back on
/// the back stack. A filter reset since the commit already did both.
struct FetchGuard<'a> {
    state: &'a Mutex<PagerState>,
    generation: u64,
    restore: Option<Option<Cursor>>,
    armed: bool,
}

impl FetchGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if state.generation != self.generation {
            return;
        }
        state.in_flight = false;
        if let Some(cursor) = self.restore {
            state.back_stack.push(cursor);
        }
        debug!(cursor = ?self.restore.flatten(), "Album page fetch cancelled");
    }
}

#[derive(Debug)]
struct PagerState {
    filter: Option<GenreId>,
    items: Vec<Album>,
    has_more: bool,
    next_cursor: Option<Cursor>,
    /// Cursor that produced the page on display; `None` for page 1
    current_cursor: Option<Cursor>,
    /// Cursors of the pages before the current one, oldest first
    back_stack: Vec<Option<Cursor>>,
    in_flight: bool,
    generation: u64,
    per_page: u32,
}

impl PagerState {
    fn adopt_baseline(&mut self, filter: Option<GenreId>, page: AlbumPage, configured: u32) {
        self.filter = filter;
        self.per_page = effective_per_page(page.per_page, configured);
        self.items = page.albums;
        self.has_more = page.has_more;
        self.next_cursor = page.next_cursor;
        self.current_cursor = None;
        self.back_stack.clear();
        self.in_flight = false;
    }
}

/// The server may clamp the page size; follow it when it reports a sane one.
fn effective_per_page(reported: Option<u32>, configured: u32) -> u32 {
    match reported {
        Some(n) if (1..=MAX_PER_PAGE).contains(&n) => n,
        _ => configured,
    }
}

/// Paginated album list for one genre filter at a time.
pub struct AlbumPager {
    api: Arc<dyn CatalogApi>,
    configured_per_page: u32,
    sort: Option<AlbumSort>,
    index: Option<Arc<AlbumIndex>>,
    events: Option<EventBus>,
    state: Mutex<PagerState>,
}

impl AlbumPager {
    /// Create a pager from an already fetched first page.
    pub fn new(
        api: Arc<dyn CatalogApi>,
        per_page: u32,
        filter: Option<GenreId>,
        initial: AlbumPage,
    ) -> Self {
        let mut state = PagerState {
            filter: None,
            items: Vec::new(),
            has_more: false,
            next_cursor: None,
            current_cursor: None,
            back_stack: Vec::new(),
            in_flight: false,
            generation: 0,
            per_page,
        };
        state.adopt_baseline(filter, initial, per_page);

        Self {
            api,
            configured_per_page: per_page,
            sort: None,
            index: None,
            events: None,
            state: Mutex::new(state),
        }
    }

    /// Create a pager using the page size and sort order from `config`.
    pub fn from_config(
        api: Arc<dyn CatalogApi>,
        config: &CoreConfig,
        filter: Option<GenreId>,
        initial: AlbumPage,
    ) -> Self {
        Self::new(api, config.albums_per_page, filter, initial).with_sort(config.album_sort.clone())
    }

    pub fn with_sort(mut self, sort: Option<AlbumSort>) -> Self {
        self.sort = sort;
        self
    }

    /// Register every applied page into `index`, starting with the current items.
    pub fn with_index(mut self, index: Arc<AlbumIndex>) -> Self {
        index.register(self.state.lock().items.iter());
        self.index = Some(index);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Append the next page to the current items.
    pub async fn load_more(&self) -> Result<PageLoad> {
        match self.begin_forward() {
            Ok(ticket) => self.complete(ticket, Direction::Append).await,
            Err(reason) => Ok(self.skipped("load_more", reason)),
        }
    }

    /// Replace the current items with the next page.
    pub async fn load_next(&self) -> Result<PageLoad> {
        match self.begin_forward() {
            Ok(ticket) => self.complete(ticket, Direction::Next).await,
            Err(reason) => Ok(self.skipped("load_next", reason)),
        }
    }

    /// Replace the current items with the previous page.
    ///
    /// On failure, or when the returned future is dropped before the
    /// response arrives, the back stack is left exactly as it was.
    pub async fn load_prev(&self) -> Result<PageLoad> {
        match self.begin_prev() {
            Ok(ticket) => self.complete(ticket, Direction::Prev).await,
            Err(reason) => Ok(self.skipped("load_prev", reason)),
        }
    }

    /// Switch to a new filter using its already fetched first page.
    ///
    /// Any fetch still in flight for the previous filter is discarded when it
    /// returns.
    pub fn reset_filter(&self, filter: Option<GenreId>, initial: AlbumPage) {
        let (item_count, has_more) = {
            let mut state = self.state.lock();
            state.generation = state.generation.wrapping_add(1);
            state.adopt_baseline(filter, initial, self.configured_per_page);
            if let Some(index) = &self.index {
                index.register(state.items.iter());
            }
            (state.items.len(), state.has_more)
        };

        info!(
            genre = ?filter,
            item_count,
            has_more,
            "Album filter changed"
        );
        self.emit(CatalogEvent::FilterChanged {
            genre_id: filter.map(GenreId::get),
            item_count,
            has_more,
        });
    }

    fn begin_forward(&self) -> std::result::Result<Ticket, SkipReason> {
        let mut state = self.state.lock();
        if state.in_flight {
            return Err(SkipReason::InFlight);
        }
        if !state.has_more {
            return Err(SkipReason::Exhausted);
        }
        let Some(cursor) = state.next_cursor else {
            return Err(SkipReason::NoCursor);
        };

        state.in_flight = true;
        Ok(self.ticket(&state, Some(cursor)))
    }

    fn begin_prev(&self) -> std::result::Result<Ticket, SkipReason> {
        let mut state = self.state.lock();
        if state.in_flight {
            return Err(SkipReason::InFlight);
        }
        let Some(target) = state.back_stack.pop() else {
            return Err(SkipReason::AtFirstPage);
        };

        state.in_flight = true;
        Ok(self.ticket(&state, target))
    }

    fn ticket(&self, state: &PagerState, cursor: Option<Cursor>) -> Ticket {
        Ticket {
            generation: state.generation,
            filter: state.filter,
            cursor,
            query: AlbumQuery::new(state.per_page)
                .genre(state.filter)
                .after(cursor)
                .sort(self.sort.clone()),
        }
    }

    async fn complete(&self, ticket: Ticket, direction: Direction) -> Result<PageLoad> {
        let mut guard = FetchGuard {
            state: &self.state,
            generation: ticket.generation,
            restore: (direction == Direction::Prev).then_some(ticket.cursor),
            armed: true,
        };
        let result = self.api.list_albums(&ticket.query).await;
        guard.disarm();

        let (outcome, event) = {
            let mut state = self.state.lock();
            if state.generation != ticket.generation {
                (Ok(PageLoad::Discarded), None)
            } else {
                state.in_flight = false;
                match result {
                    Ok(page) => {
                        let (count, event) = self.apply(&mut state, &ticket, direction, page);
                        (Ok(PageLoad::Applied { count }), Some(event))
                    }
                    Err(err) => {
                        if direction == Direction::Prev {
                            state.back_stack.push(ticket.cursor);
                        }
                        let event = CatalogEvent::PageFailed {
                            genre_id: ticket.filter.map(GenreId::get),
                            message: err.to_string(),
                            recoverable: err.is_transient(),
                        };
                        (Err(err), Some(event))
                    }
                }
            }
        };

        match (&outcome, event) {
            (Ok(PageLoad::Discarded), _) => {
                debug!(genre = ?ticket.filter, cursor = ?ticket.cursor, "Discarding stale album page");
                self.emit(CatalogEvent::ResponseDiscarded {
                    genre_id: ticket.filter.map(GenreId::get),
                });
            }
            (Err(err), Some(event)) => {
                warn!(genre = ?ticket.filter, cursor = ?ticket.cursor, error = %err, "Album page failed to load");
                self.emit(event);
            }
            (_, Some(event)) => self.emit(event),
            _ => {}
        }

        outcome
    }

    fn apply(
        &self,
        state: &mut PagerState,
        ticket: &Ticket,
        direction: Direction,
        page: AlbumPage,
    ) -> (usize, CatalogEvent) {
        if let Some(index) = &self.index {
            index.register(page.albums.iter());
        }
        state.has_more = page.has_more;
        state.next_cursor = page.next_cursor;
        let genre_id = ticket.filter.map(GenreId::get);

        match direction {
            Direction::Append => {
                let mut seen: HashSet<AlbumId> = state.items.iter().map(|a| a.id).collect();
                let before = state.items.len();
                state
                    .items
                    .extend(page.albums.into_iter().filter(|album| seen.insert(album.id)));
                let added = state.items.len() - before;

                debug!(added, total = state.items.len(), has_more = state.has_more, "Appended album page");
                (
                    added,
                    CatalogEvent::PageAppended {
                        genre_id,
                        added,
                        total: state.items.len(),
                        has_more: state.has_more,
                    },
                )
            }
            Direction::Next | Direction::Prev => {
                if direction == Direction::Next {
                    let previous = state.current_cursor;
                    state.back_stack.push(previous);
                }
                state.current_cursor = ticket.cursor;
                state.items = page.albums;

                let page_number = state.back_stack.len() + 1;
                debug!(page_number, count = state.items.len(), has_more = state.has_more, "Album page changed");
                (
                    state.items.len(),
                    CatalogEvent::PageChanged {
                        genre_id,
                        page_number,
                        item_count: state.items.len(),
                        has_more: state.has_more,
                    },
                )
            }
        }
    }

    fn skipped(&self, operation: &str, reason: SkipReason) -> PageLoad {
        debug!(operation, %reason, "Skipping album page load");
        PageLoad::Skipped(reason)
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(events) = &self.events {
            // No subscribers is not an error
            let _ = events.emit(CoreEvent::Catalog(event));
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn items(&self) -> Vec<Album> {
        self.state.lock().items.clone()
    }

    pub fn album_ids(&self) -> Vec<AlbumId> {
        self.state.lock().items.iter().map(|a| a.id).collect()
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().has_more
    }

    pub fn next_cursor(&self) -> Option<Cursor> {
        self.state.lock().next_cursor
    }

    pub fn current_cursor(&self) -> Option<Cursor> {
        self.state.lock().current_cursor
    }

    pub fn back_stack(&self) -> Vec<Option<Cursor>> {
        self.state.lock().back_stack.clone()
    }

    /// 1-based page number in paged mode. Always 1 in append mode.
    pub fn page_number(&self) -> usize {
        self.state.lock().back_stack.len() + 1
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight
    }

    pub fn filter(&self) -> Option<GenreId> {
        self.state.lock().filter
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// No more results and something to show.
    pub fn is_exhausted(&self) -> bool {
        let state = self.state.lock();
        !state.has_more && !state.items.is_empty()
    }

    /// Page size used for the next fetch.
    pub fn per_page(&self) -> u32 {
        self.state.lock().per_page
    }

    pub fn snapshot(&self) -> PagerSnapshot {
        let state = self.state.lock();
        PagerSnapshot {
            filter: state.filter,
            album_ids: state.items.iter().map(|a| a.id).collect(),
            has_more: state.has_more,
            next_cursor: state.next_cursor,
            current_cursor: state.current_cursor,
            page_number: state.back_stack.len() + 1,
            is_loading: state.in_flight,
            is_exhausted: !state.has_more && !state.items.is_empty(),
            per_page: state.per_page,
        }
    }
}

impl fmt::Debug for AlbumPager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AlbumPager")
            .field("filter", &state.filter)
            .field("items", &state.items.len())
            .field("has_more", &state.has_more)
            .field("page_number", &(state.back_stack.len() + 1))
            .field("in_flight", &state.in_flight)
            .finish()
    }
}

//! Keyed listing cache and the bookkeeping that decides which fetch result is
//! allowed to reach the screen.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::api::{ApiError, ListParams, NotesPage};
use crate::search::transport_search;

mod page;

pub use page::PageState;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub search: String,
    pub page: u32,
    pub per_page: u32,
}

impl QueryKey {
    pub fn new(committed_search: &str, pages: &PageState) -> Self {
        Self {
            search: committed_search.to_string(),
            page: pages.current(),
            per_page: pages.per_page(),
        }
    }

    pub fn list_params(&self) -> ListParams {
        ListParams {
            search: transport_search(&self.search),
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub key: QueryKey,
    pub generation: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    page: NotesPage,
    fetched_at: Instant,
    generation: u64,
}

#[derive(Debug)]
pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
    generation: u64,
    stale_time: Duration,
    gc_after: Duration,
}

impl QueryCache {
    pub fn new(stale_time: Duration, gc_after: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            generation: 0,
            stale_time,
            gc_after,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &QueryKey) -> Option<&NotesPage> {
        self.entries.get(key).map(|entry| &entry.page)
    }

    pub fn is_fresh(&self, key: &QueryKey, now: Instant) -> bool {
        self.entries.get(key).is_some_and(|entry| {
            entry.generation == self.generation
                && now.saturating_duration_since(entry.fetched_at) < self.stale_time
        })
    }

    pub fn insert(&mut self, key: QueryKey, page: NotesPage, now: Instant) {
        let gc_after = self.gc_after;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.fetched_at) < gc_after);
        self.entries.insert(
            key,
            CacheEntry {
                page,
                fetched_at: now,
                generation: self.generation,
            },
        );
    }

    /// Marks every entry stale. Data stays readable for placeholder display,
    /// but nothing fetched before this call counts as fresh again.
    pub fn invalidate_all(&mut self) {
        self.generation += 1;
        tracing::debug!(generation = self.generation, "listing cache invalidated");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Result for the current key; now on screen.
    Applied,
    /// Current key failed; view switched to the error state.
    Failed(String),
    /// Result for an abandoned key; cached but not shown.
    Cached,
    /// Result predates an invalidation or was superseded.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingView<'a> {
    Loading,
    Failed(&'a str),
    Ready {
        page: &'a NotesPage,
        /// A fetch for the current key is in flight.
        fetching: bool,
        /// `page` belongs to a different key than the current one.
        placeholder: bool,
    },
}

#[derive(Debug)]
pub struct NotesQuery {
    cache: QueryCache,
    current: QueryKey,
    displayed: Option<(QueryKey, NotesPage)>,
    error: Option<String>,
    in_flight: HashMap<QueryKey, FetchTicket>,
    next_id: u64,
}

impl NotesQuery {
    pub fn new(initial: QueryKey, cache: QueryCache) -> Self {
        Self {
            cache,
            current: initial,
            displayed: None,
            error: None,
            in_flight: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn current_key(&self) -> &QueryKey {
        &self.current
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.contains_key(&self.current)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// The page currently on screen, if any.
    pub fn displayed(&self) -> Option<&NotesPage> {
        self.displayed.as_ref().map(|(_, page)| page)
    }

    /// Total pages reported by the last successful fetch of the current key.
    pub fn total_pages(&self) -> Option<u32> {
        match &self.displayed {
            Some((key, page)) if *key == self.current => Some(page.total_pages),
            _ => None,
        }
    }

    pub fn view(&self) -> ListingView<'_> {
        if let Some(message) = &self.error {
            return ListingView::Failed(message);
        }
        match &self.displayed {
            Some((key, page)) => ListingView::Ready {
                page,
                fetching: self.is_fetching(),
                placeholder: *key != self.current,
            },
            None => ListingView::Loading,
        }
    }

    /// Issues a fetch for the current key unless a fresh entry or an
    /// in-flight request already covers it.
    pub fn ensure_fetched(&mut self) -> Option<FetchTicket> {
        self.ensure_fetched_at(Instant::now())
    }

    pub fn ensure_fetched_at(&mut self, now: Instant) -> Option<FetchTicket> {
        if self.cache.is_fresh(&self.current, now) {
            return None;
        }
        if let Some(existing) = self.in_flight.get(&self.current) {
            if existing.generation == self.cache.generation() {
                return None;
            }
        }
        self.next_id += 1;
        let ticket = FetchTicket {
            id: self.next_id,
            key: self.current.clone(),
            generation: self.cache.generation(),
        };
        tracing::debug!(id = ticket.id, key = ?ticket.key, "issuing listing fetch");
        self.in_flight.insert(ticket.key.clone(), ticket.clone());
        Some(ticket)
    }

    pub fn set_key(&mut self, key: QueryKey) -> Option<FetchTicket> {
        self.set_key_at(key, Instant::now())
    }

    pub fn set_key_at(&mut self, key: QueryKey, now: Instant) -> Option<FetchTicket> {
        if key != self.current {
            self.current = key;
            self.error = None;
            if let Some(cached) = self.cache.get(&self.current) {
                self.displayed = Some((self.current.clone(), cached.clone()));
            }
        }
        self.ensure_fetched_at(now)
    }

    pub fn invalidate(&mut self) -> Option<FetchTicket> {
        self.invalidate_at(Instant::now())
    }

    pub fn invalidate_at(&mut self, now: Instant) -> Option<FetchTicket> {
        self.invalidate_cache();
        self.ensure_fetched_at(now)
    }

    /// Invalidates without fetching, for callers about to switch keys.
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate_all();
    }

    pub fn resolve(
        &mut self,
        ticket: &FetchTicket,
        result: Result<NotesPage, ApiError>,
    ) -> Resolution {
        self.resolve_at(ticket, result, Instant::now())
    }

    pub fn resolve_at(
        &mut self,
        ticket: &FetchTicket,
        result: Result<NotesPage, ApiError>,
        now: Instant,
    ) -> Resolution {
        let is_latest = self
            .in_flight
            .get(&ticket.key)
            .is_some_and(|pending| pending.id == ticket.id);
        if is_latest {
            self.in_flight.remove(&ticket.key);
        }
        if !is_latest || ticket.generation != self.cache.generation() {
            tracing::debug!(id = ticket.id, key = ?ticket.key, "discarding outdated listing result");
            return Resolution::Discarded;
        }

        let is_current = ticket.key == self.current;
        match result {
            Ok(page) => {
                self.cache.insert(ticket.key.clone(), page.clone(), now);
                if !is_current {
                    return Resolution::Cached;
                }
                self.error = None;
                self.displayed = Some((ticket.key.clone(), page));
                Resolution::Applied
            }
            Err(err) => {
                tracing::warn!(key = ?ticket.key, error = %err, "listing fetch failed");
                if !is_current {
                    return Resolution::Discarded;
                }
                let message = err.to_string();
                self.error = Some(message.clone());
                self.displayed = None;
                Resolution::Failed(message)
            }
        }
    }
}

use std::time::{Duration, Instant};

use unicode_segmentation::UnicodeSegmentation;

/// Token sent when the committed query is empty; the API rejects an empty
/// `search` parameter but treats a lone space as "match everything".
pub const BLANK_SEARCH: &str = " ";

pub fn transport_search(committed: &str) -> String {
    if committed.is_empty() {
        BLANK_SEARCH.to_string()
    } else {
        committed.to_string()
    }
}

/// Holds at most one pending value and releases it once `delay` has passed
/// without another `schedule`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    since: Instant,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: T) {
        self.schedule_at(value, Instant::now());
    }

    pub fn schedule_at(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending { value, since: now });
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
            .as_ref()
            .map(|pending| pending.since + self.delay)
    }

    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .map(|pending| now.saturating_duration_since(pending.since) >= self.delay)
            .unwrap_or(false);
        if ready {
            self.cancel()
        } else {
            None
        }
    }
}

/// Raw search box text plus the debounced query the listing is keyed on.
#[derive(Debug)]
pub struct SearchController {
    raw_input: String,
    committed: String,
    debouncer: Debouncer<String>,
}

impl SearchController {
    pub fn new(delay: Duration) -> Self {
        Self {
            raw_input: String::new(),
            committed: String::new(),
            debouncer: Debouncer::new(delay),
        }
    }

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn transport_query(&self) -> String {
        transport_search(&self.committed)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn on_input(&mut self, text: &str) {
        self.on_input_at(text, Instant::now());
    }

    pub fn on_input_at(&mut self, text: &str, now: Instant) {
        self.raw_input.clear();
        self.raw_input.push_str(text);
        self.debouncer.schedule_at(self.raw_input.clone(), now);
    }

    pub fn push_char(&mut self, ch: char) {
        let mut next = self.raw_input.clone();
        next.push(ch);
        self.on_input(&next);
    }

    pub fn pop_char(&mut self) -> bool {
        let Some((idx, _)) = self.raw_input.grapheme_indices(true).next_back() else {
            return false;
        };
        let next = self.raw_input[..idx].to_string();
        self.on_input(&next);
        true
    }

    /// Returns the new committed query when the debounce window elapsed and
    /// the value differs from the current one.
    pub fn poll_at(&mut self, now: Instant) -> Option<String> {
        let value = self.debouncer.poll_at(now)?;
        self.commit(value)
    }

    /// Commits the raw input immediately, skipping the remaining window.
    pub fn flush(&mut self) -> Option<String> {
        let value = self
            .debouncer
            .cancel()
            .unwrap_or_else(|| self.raw_input.clone());
        self.commit(value)
    }

    /// Empties the box and commits `""` without waiting for the window.
    pub fn clear(&mut self) -> Option<String> {
        self.debouncer.cancel();
        self.raw_input.clear();
        self.commit(String::new())
    }

    fn commit(&mut self, value: String) -> Option<String> {
        if value == self.committed {
            return None;
        }
        tracing::debug!(query = %value, "search query committed");
        self.committed = value;
        Some(self.committed.clone())
    }
}

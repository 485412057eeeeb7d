use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::form::NoteForm;
use crate::notify::Notifier;
use crate::query::{ListingView, NotesQuery, PageState, QueryCache, QueryKey, Resolution};
use crate::search::SearchController;

use super::modal::{CloseReason, ModalContent, ModalHost};
use super::worker::{Request, Response};

pub const CREATE_SUCCESS: &str = "The note was created successfully!";
pub const CREATE_FAILURE: &str = "An error occurred while creating the note.";
pub const DELETE_SUCCESS: &str = "Note successfully deleted!";
pub const DELETE_FAILURE: &str = "An error occurred while deleting the note.";
pub const LOAD_FAILURE: &str = "Error loading notes!";

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub per_page: u32,
    pub debounce: Duration,
    pub stale_time: Duration,
    pub cache_gc: Duration,
    pub confirm_delete: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CoordinatorOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            per_page: config.listing.per_page,
            debounce: config.search.debounce(),
            stale_time: config.listing.stale_time(),
            cache_gc: config.listing.cache_gc(),
            confirm_delete: config.ui.confirm_delete,
        }
    }
}

/// Owns every piece of client state and decides which requests to send.
/// Nothing here performs I/O: methods return the [`Request`]s to dispatch
/// and results come back through [`Coordinator::handle`].
pub struct Coordinator<N: Notifier> {
    search: SearchController,
    pages: PageState,
    query: NotesQuery,
    modal: ModalHost,
    notifier: N,
    deleting: HashSet<i64>,
    last_submission: u64,
    confirm_delete: bool,
}

impl<N: Notifier> Coordinator<N> {
    pub fn new(options: CoordinatorOptions, notifier: N) -> Self {
        let search = SearchController::new(options.debounce);
        let pages = PageState::new(options.per_page);
        let query = NotesQuery::new(
            QueryKey::new(search.committed(), &pages),
            QueryCache::new(options.stale_time, options.cache_gc),
        );
        Self {
            search,
            pages,
            query,
            modal: ModalHost::new(),
            notifier,
            deleting: HashSet::new(),
            last_submission: 0,
            confirm_delete: options.confirm_delete,
        }
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn pages(&self) -> &PageState {
        &self.pages
    }

    pub fn query(&self) -> &NotesQuery {
        &self.query
    }

    pub fn view(&self) -> ListingView<'_> {
        self.query.view()
    }

    pub fn modal(&self) -> &ModalHost {
        &self.modal
    }

    pub fn modal_mut(&mut self) -> &mut ModalHost {
        &mut self.modal
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn is_deleting(&self, note_id: i64) -> bool {
        self.deleting.contains(&note_id)
    }

    /// Page count for the pagination control; follows whatever is on screen.
    pub fn total_pages(&self) -> u32 {
        self.query
            .displayed()
            .map(|page| page.total_pages)
            .unwrap_or(0)
    }

    pub fn start(&mut self) -> Vec<Request> {
        self.query.ensure_fetched().map(Request::List).into_iter().collect()
    }

    pub fn on_search_input(&mut self, text: &str) {
        self.search.on_input(text);
    }

    pub fn push_search_char(&mut self, ch: char) {
        self.search.push_char(ch);
    }

    pub fn pop_search_char(&mut self) {
        self.search.pop_char();
    }

    /// Earliest instant at which [`Coordinator::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    pub fn tick(&mut self) -> Vec<Request> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Vec<Request> {
        match self.search.poll_at(now) {
            Some(_) => self.on_query_committed(now),
            None => Vec::new(),
        }
    }

    pub fn commit_search(&mut self) -> Vec<Request> {
        match self.search.flush() {
            Some(_) => self.on_query_committed(Instant::now()),
            None => Vec::new(),
        }
    }

    pub fn clear_search(&mut self) -> Vec<Request> {
        match self.search.clear() {
            Some(_) => self.on_query_committed(Instant::now()),
            None => Vec::new(),
        }
    }

    pub fn select_page(&mut self, page: u32) -> Vec<Request> {
        if self.modal.background_scroll_locked() {
            return Vec::new();
        }
        if self.pages.select(page, self.total_pages()) {
            self.sync_key(Instant::now())
        } else {
            Vec::new()
        }
    }

    pub fn next_page(&mut self) -> Vec<Request> {
        self.select_page(self.pages.current().saturating_add(1))
    }

    pub fn previous_page(&mut self) -> Vec<Request> {
        self.select_page(self.pages.current().saturating_sub(1))
    }

    pub fn refresh(&mut self) -> Vec<Request> {
        self.query.invalidate().map(Request::List).into_iter().collect()
    }

    pub fn open_create(&mut self) -> bool {
        self.modal
            .open(ModalContent::CreateNote(NoteForm::new()))
    }

    pub fn close_modal(&mut self, reason: CloseReason) -> bool {
        self.modal.close(reason).is_some()
    }

    pub fn escape(&mut self) -> bool {
        self.modal.handle_escape().is_some()
    }

    pub fn form_mut(&mut self) -> Option<&mut NoteForm> {
        self.modal.form_mut()
    }

    pub fn submit_form(&mut self) -> Vec<Request> {
        let Some(form) = self.modal.form_mut() else {
            return Vec::new();
        };
        let submission = self.last_submission + 1;
        match form.submit(submission) {
            Some(payload) => {
                self.last_submission = submission;
                tracing::info!(submission, title = payload.title(), tag = %payload.tag(), "creating note");
                vec![Request::Create {
                    submission,
                    payload,
                }]
            }
            None => Vec::new(),
        }
    }

    pub fn request_delete(&mut self, note_id: i64) -> Vec<Request> {
        if self.deleting.contains(&note_id) || self.modal.is_open() {
            return Vec::new();
        }
        if !self.confirm_delete {
            return self.start_delete(note_id);
        }
        let title = self
            .query
            .displayed()
            .and_then(|page| page.notes.iter().find(|note| note.id == note_id))
            .map(|note| note.title.clone())
            .unwrap_or_default();
        self.modal
            .open(ModalContent::ConfirmDelete { note_id, title });
        Vec::new()
    }

    pub fn confirm_delete(&mut self) -> Vec<Request> {
        let Some(ModalContent::ConfirmDelete { note_id, .. }) = self.modal.content() else {
            return Vec::new();
        };
        let note_id = *note_id;
        self.modal.close(CloseReason::Submitted);
        self.start_delete(note_id)
    }

    pub fn handle(&mut self, response: Response) -> Vec<Request> {
        self.handle_at(response, Instant::now())
    }

    pub fn handle_at(&mut self, response: Response, now: Instant) -> Vec<Request> {
        match response {
            Response::Listed { ticket, result } => {
                match self.query.resolve_at(&ticket, result, now) {
                    Resolution::Applied => {
                        let total = self.total_pages();
                        if self.pages.clamp(total) {
                            tracing::debug!(page = self.pages.current(), "page clamped to listing size");
                            return self.sync_key(now);
                        }
                    }
                    Resolution::Failed(_) => self.notifier.error(LOAD_FAILURE),
                    Resolution::Cached | Resolution::Discarded => {}
                }
                Vec::new()
            }
            Response::Created {
                submission,
                result: Ok(note),
            } => {
                tracing::info!(submission, note_id = note.id, "note created");
                // A form opened after the sender was dismissed stays open.
                if self.modal.form().and_then(NoteForm::submission) == Some(submission) {
                    self.modal.close(CloseReason::Submitted);
                }
                self.pages.reset();
                self.notifier.success(CREATE_SUCCESS);
                self.invalidate_and_sync(now)
            }
            Response::Created {
                submission,
                result: Err(err),
            } => {
                tracing::error!(submission, error = %err, "failed to create note");
                if let Some(form) = self
                    .modal
                    .form_mut()
                    .filter(|form| form.submission() == Some(submission))
                {
                    form.submission_failed();
                }
                self.notifier.error(CREATE_FAILURE);
                Vec::new()
            }
            Response::Deleted {
                note_id,
                result: Ok(()),
            } => {
                tracing::info!(note_id, "note deleted");
                self.deleting.remove(&note_id);
                let emptied_page = self.pages.current() > 1
                    && self.query.displayed().is_some_and(|page| {
                        page.notes.len() == 1 && page.notes[0].id == note_id
                    });
                if emptied_page {
                    self.pages.reset();
                }
                self.notifier.success(DELETE_SUCCESS);
                self.invalidate_and_sync(now)
            }
            Response::Deleted {
                note_id,
                result: Err(err),
            } => {
                tracing::error!(note_id, error = %err, "failed to delete note");
                self.deleting.remove(&note_id);
                self.notifier.error(DELETE_FAILURE);
                Vec::new()
            }
        }
    }

    fn start_delete(&mut self, note_id: i64) -> Vec<Request> {
        if !self.deleting.insert(note_id) {
            return Vec::new();
        }
        tracing::info!(note_id, "deleting note");
        vec![Request::Delete(note_id)]
    }

    fn on_query_committed(&mut self, now: Instant) -> Vec<Request> {
        self.pages.reset();
        self.sync_key(now)
    }

    fn invalidate_and_sync(&mut self, now: Instant) -> Vec<Request> {
        self.query.invalidate_cache();
        self.sync_key(now)
    }

    fn sync_key(&mut self, now: Instant) -> Vec<Request> {
        let key = QueryKey::new(self.search.committed(), &self.pages);
        self.query
            .set_key_at(key, now)
            .map(Request::List)
            .into_iter()
            .collect()
    }
}

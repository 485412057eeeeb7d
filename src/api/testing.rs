//! In-process stand-in for the NoteHub service used by unit tests.

use parking_lot::Mutex;
use time::OffsetDateTime;

use super::{ApiError, ListParams, NewNote, Note, NoteTag, NotesApi, NotesPage};

#[derive(Default)]
pub(crate) struct MemoryNotesApi {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    notes: Vec<Note>,
    next_id: i64,
    fail_lists: usize,
    fail_creates: usize,
    fail_deletes: usize,
    list_calls: Vec<ListParams>,
    create_calls: usize,
    delete_calls: usize,
}

impl MemoryNotesApi {
    pub(crate) fn with_notes(count: usize) -> Self {
        let api = Self::default();
        {
            let mut inner = api.inner.lock();
            for idx in 0..count {
                inner.insert(format!("Note {}", idx + 1), String::new(), NoteTag::Todo);
            }
        }
        api
    }

    pub(crate) fn fail_next_lists(&self, count: usize) {
        self.inner.lock().fail_lists = count;
    }

    pub(crate) fn fail_next_creates(&self, count: usize) {
        self.inner.lock().fail_creates = count;
    }

    pub(crate) fn fail_next_deletes(&self, count: usize) {
        self.inner.lock().fail_deletes = count;
    }

    pub(crate) fn list_calls(&self) -> Vec<ListParams> {
        self.inner.lock().list_calls.clone()
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.inner.lock().create_calls
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.inner.lock().delete_calls
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().notes.len()
    }
}

impl Inner {
    fn insert(&mut self, title: String, content: String, tag: NoteTag) -> Note {
        self.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let note = Note {
            id: self.next_id,
            title,
            content,
            tag,
            created_at: now,
            updated_at: now,
        };
        // Newest first, like the hosted service.
        self.notes.insert(0, note.clone());
        note
    }
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        message: "service unavailable".into(),
    }
}

impl NotesApi for MemoryNotesApi {
    fn list(&self, params: &ListParams) -> Result<NotesPage, ApiError> {
        let mut inner = self.inner.lock();
        inner.list_calls.push(params.clone());
        if inner.fail_lists > 0 {
            inner.fail_lists -= 1;
            return Err(unavailable());
        }
        let needle = params.search.trim().to_lowercase();
        let matching: Vec<&Note> = inner
            .notes
            .iter()
            .filter(|note| {
                needle.is_empty()
                    || note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
            })
            .collect();
        let per_page = params.per_page.max(1) as usize;
        let total_pages = matching.len().div_ceil(per_page) as u32;
        let start = (params.page.max(1) as usize - 1) * per_page;
        let notes = matching
            .into_iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect();
        Ok(NotesPage { notes, total_pages })
    }

    fn create(&self, note: &NewNote) -> Result<Note, ApiError> {
        let mut inner = self.inner.lock();
        inner.create_calls += 1;
        if inner.fail_creates > 0 {
            inner.fail_creates -= 1;
            return Err(unavailable());
        }
        Ok(inner.insert(note.title().to_string(), note.content().to_string(), note.tag()))
    }

    fn delete(&self, id: i64) -> Result<(), ApiError> {
        let mut inner = self.inner.lock();
        inner.delete_calls += 1;
        if inner.fail_deletes > 0 {
            inner.fail_deletes -= 1;
            return Err(unavailable());
        }
        let before = inner.notes.len();
        inner.notes.retain(|note| note.id != id);
        if inner.notes.len() == before {
            return Err(ApiError::Status {
                status: 404,
                message: format!("note {id} not found"),
            });
        }
        Ok(())
    }
}

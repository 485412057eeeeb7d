use std::cell::Cell;
use std::rc::Rc;

use crate::form::NoteForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Submitted,
    Cancelled,
    Escape,
    Backdrop,
}

#[derive(Debug, Clone)]
pub enum ModalContent {
    CreateNote(NoteForm),
    ConfirmDelete { note_id: i64, title: String },
}

/// Registration held while a modal is open. Dropping it releases the
/// registration, whichever path closed the modal.
#[derive(Debug)]
struct InputGuard {
    counter: Rc<Cell<usize>>,
}

impl InputGuard {
    fn acquire(counter: &Rc<Cell<usize>>) -> Self {
        counter.set(counter.get() + 1);
        Self {
            counter: Rc::clone(counter),
        }
    }
}

impl Drop for InputGuard {
    fn drop(&mut self) {
        self.counter.set(self.counter.get().saturating_sub(1));
    }
}

#[derive(Debug)]
struct ModalSession {
    content: ModalContent,
    _scroll_lock: InputGuard,
    _escape_binding: InputGuard,
}

/// Hosts at most one modal above the note list.
#[derive(Debug, Default)]
pub struct ModalHost {
    session: Option<ModalSession>,
    scroll_locks: Rc<Cell<usize>>,
    escape_bindings: Rc<Cell<usize>>,
}

impl ModalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn content(&self) -> Option<&ModalContent> {
        self.session.as_ref().map(|session| &session.content)
    }

    pub fn content_mut(&mut self) -> Option<&mut ModalContent> {
        self.session.as_mut().map(|session| &mut session.content)
    }

    pub fn form(&self) -> Option<&NoteForm> {
        match self.content() {
            Some(ModalContent::CreateNote(form)) => Some(form),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut NoteForm> {
        match self.content_mut() {
            Some(ModalContent::CreateNote(form)) => Some(form),
            _ => None,
        }
    }

    /// Returns false when another modal is already showing.
    pub fn open(&mut self, content: ModalContent) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(ModalSession {
            content,
            _scroll_lock: InputGuard::acquire(&self.scroll_locks),
            _escape_binding: InputGuard::acquire(&self.escape_bindings),
        });
        true
    }

    pub fn close(&mut self, reason: CloseReason) -> Option<ModalContent> {
        let session = self.session.take()?;
        tracing::debug!(?reason, "modal closed");
        Some(session.content)
    }

    /// Escape only closes the modal while its key binding is registered.
    pub fn handle_escape(&mut self) -> Option<ModalContent> {
        if self.escape_bindings.get() == 0 {
            return None;
        }
        self.close(CloseReason::Escape)
    }

    pub fn background_scroll_locked(&self) -> bool {
        self.scroll_locks.get() > 0
    }

    pub fn active_escape_bindings(&self) -> usize {
        self.escape_bindings.get()
    }
}

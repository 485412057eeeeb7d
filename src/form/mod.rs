//! Create-note form: local validation rules and the editable form state.

use std::fmt;

use unicode_segmentation::UnicodeSegmentation;

use crate::api::{NewNote, NoteTag};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 50;
pub const CONTENT_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Content,
    Tag,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Title, FormField::Content, FormField::Tag];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Content => "Content",
            FormField::Tag => "Tag",
        }
    }

    pub fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Content,
            FormField::Content => FormField::Tag,
            FormField::Tag => FormField::Title,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            FormField::Title => FormField::Tag,
            FormField::Content => FormField::Title,
            FormField::Tag => FormField::Content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tag: Option<NoteTag>,
}

impl Default for NoteDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            tag: Some(NoteTag::Todo),
        }
    }
}

/// Per-field messages; a `None` field passed its rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tag: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tag.is_none()
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        match field {
            FormField::Title => self.title.as_deref(),
            FormField::Content => self.content.as_deref(),
            FormField::Tag => self.tag.as_deref(),
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in FormField::ALL {
            if let Some(message) = self.get(field) {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {message}", field.label().to_lowercase())?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

pub fn validate(draft: &NoteDraft) -> Result<NewNote, FieldErrors> {
    let mut errors = FieldErrors::default();

    let title_len = draft.title.chars().count();
    if title_len == 0 {
        errors.title = Some("Title is required".into());
    } else if title_len < TITLE_MIN_CHARS {
        errors.title = Some("Title must be at least 3 characters".into());
    } else if title_len > TITLE_MAX_CHARS {
        errors.title = Some("Title is too long".into());
    }

    if draft.content.chars().count() > CONTENT_MAX_CHARS {
        errors.content = Some("Content is too long".into());
    }

    match (draft.tag, errors.is_empty()) {
        (None, _) => {
            errors.tag = Some("Tag is required".into());
            Err(errors)
        }
        (Some(tag), true) => Ok(NewNote::new_unchecked(
            draft.title.clone(),
            draft.content.clone(),
            tag,
        )),
        (Some(_), false) => Err(errors),
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoteForm {
    draft: NoteDraft,
    focus: Option<FormField>,
    errors: FieldErrors,
    attempted: bool,
    submission: Option<u64>,
}

impl NoteForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &NoteDraft {
        &self.draft
    }

    pub fn focus(&self) -> FormField {
        self.focus.unwrap_or(FormField::Title)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error_for(&self, field: FormField) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn is_submitting(&self) -> bool {
        self.submission.is_some()
    }

    /// Id of the create request this form is waiting on.
    pub fn submission(&self) -> Option<u64> {
        self.submission
    }

    pub fn focus_next(&mut self) {
        self.focus = Some(self.focus().next());
    }

    pub fn focus_previous(&mut self) {
        self.focus = Some(self.focus().previous());
    }

    pub fn insert_char(&mut self, ch: char) {
        match self.focus() {
            FormField::Title => self.draft.title.push(ch),
            FormField::Content => self.draft.content.push(ch),
            FormField::Tag => return,
        }
        self.after_edit();
    }

    pub fn insert_newline(&mut self) {
        if self.focus() == FormField::Content {
            self.draft.content.push('\n');
            self.after_edit();
        }
    }

    pub fn backspace(&mut self) {
        let buffer = match self.focus() {
            FormField::Title => &mut self.draft.title,
            FormField::Content => &mut self.draft.content,
            FormField::Tag => return,
        };
        let last = buffer.grapheme_indices(true).next_back().map(|(idx, _)| idx);
        if let Some(idx) = last {
            buffer.truncate(idx);
            self.after_edit();
        }
    }

    pub fn cycle_tag(&mut self, forward: bool) {
        let current = self.draft.tag.unwrap_or_default();
        self.draft.tag = Some(if forward {
            current.next()
        } else {
            current.previous()
        });
        self.after_edit();
    }

    /// Validates and, when every rule passes, locks the form under
    /// `submission` until [`NoteForm::submission_failed`] or the form is dropped.
    pub fn submit(&mut self, submission: u64) -> Option<NewNote> {
        if self.submission.is_some() {
            return None;
        }
        self.attempted = true;
        match validate(&self.draft) {
            Ok(payload) => {
                self.errors = FieldErrors::default();
                self.submission = Some(submission);
                Some(payload)
            }
            Err(errors) => {
                self.errors = errors;
                if let Some(field) = FormField::ALL
                    .into_iter()
                    .find(|field| self.errors.get(*field).is_some())
                {
                    self.focus = Some(field);
                }
                None
            }
        }
    }

    pub fn submission_failed(&mut self) {
        self.submission = None;
    }

    fn after_edit(&mut self) {
        if self.attempted {
            self.errors = validate(&self.draft).err().unwrap_or_default();
        }
    }
}

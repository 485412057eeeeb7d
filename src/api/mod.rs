//! NoteHub REST API: wire types, the [`NotesApi`] capability and its errors.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

mod http;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpNotesApi;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum NoteTag {
    #[default]
    Todo,
    Work,
    Personal,
    Meeting,
    Shopping,
}

impl NoteTag {
    pub const ALL: [NoteTag; 5] = [
        NoteTag::Todo,
        NoteTag::Work,
        NoteTag::Personal,
        NoteTag::Meeting,
        NoteTag::Shopping,
    ];

    fn position(self) -> usize {
        Self::ALL.iter().position(|tag| *tag == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let len = Self::ALL.len();
        Self::ALL[(self.position() + len - 1) % len]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub tag: NoteTag,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Payload accepted by [`NotesApi::create`]. Only obtainable through
/// [`crate::form::validate`], so every value here already passed the form rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNote {
    title: String,
    content: String,
    tag: NoteTag,
}

impl NewNote {
    pub(crate) fn new_unchecked(title: String, content: String, tag: NoteTag) -> Self {
        Self {
            title,
            content,
            tag,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tag(&self) -> NoteTag {
        self.tag
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesPage {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: String,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("request was never sent: {0}")]
    Dispatch(String),
}

/// The remote notes service. Implementations block; callers run them off the
/// UI thread (see [`crate::app::ApiWorker`]).
pub trait NotesApi: Send + Sync {
    fn list(&self, params: &ListParams) -> Result<NotesPage, ApiError>;
    fn create(&self, note: &NewNote) -> Result<Note, ApiError>;
    fn delete(&self, id: i64) -> Result<(), ApiError>;
}

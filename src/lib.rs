pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod form;
pub mod notify;
pub mod query;
pub mod search;
pub mod ui;

pub use api::{HttpNotesApi, Note, NoteTag, NotesApi};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};

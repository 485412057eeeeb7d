use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::api::{ListParams, Note, NoteTag, NotesApi, NotesPage};
use crate::app::coordinator::{CREATE_FAILURE, CREATE_SUCCESS, DELETE_FAILURE, DELETE_SUCCESS};
use crate::app::App;
use crate::config::AppConfig;
use crate::form::{validate, NoteDraft};
use crate::notify::{ConsoleNotifier, Notifier};
use crate::search::transport_search;
use crate::ui::EMPTY_MESSAGE;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only show notes matching this text
    #[arg(long)]
    pub search: Option<String>,
    /// 1-based page number
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (3 to 50 characters)
    #[arg(long)]
    pub title: String,
    /// Provide the note content inline. If omitted, reads from stdin.
    #[arg(long)]
    pub content: Option<String>,
    /// One of Todo, Work, Personal, Meeting, Shopping
    #[arg(long, default_value_t = NoteTag::Todo)]
    pub tag: NoteTag,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier
    pub id: i64,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn list_notes(api: &dyn NotesApi, config: &AppConfig, args: ListArgs) -> Result<()> {
    let output = run_list(api, config.listing.per_page, &args)?;
    print!("{output}");
    Ok(())
}

fn run_list(api: &dyn NotesApi, per_page: u32, args: &ListArgs) -> Result<String> {
    let params = ListParams {
        search: transport_search(args.search.as_deref().unwrap_or_default()),
        page: args.page,
        per_page,
    };
    let page = api
        .list(&params)
        .with_context(|| format!("listing notes (page {})", args.page))?;
    Ok(format_page(&page, args.page))
}

fn format_page(page: &NotesPage, current: u32) -> String {
    if page.notes.is_empty() {
        return format!("{EMPTY_MESSAGE}\n");
    }
    let mut out = String::new();
    for note in &page.notes {
        let _ = writeln!(&mut out, "#{}  {}  [{}]", note.id, note.title, note.tag);
        let _ = writeln!(&mut out, "    created {}", format_timestamp(note.created_at));
        if let Some(snippet) = build_snippet(note, 2) {
            let _ = writeln!(&mut out, "    {snippet}");
        }
        out.push('\n');
    }
    let _ = writeln!(&mut out, "Page {current} of {}", page.total_pages.max(1));
    out
}

pub fn new_note(api: &dyn NotesApi, args: NewArgs) -> Result<()> {
    let content = match args.content.clone() {
        Some(content) => content,
        None => read_stdin()?.unwrap_or_default(),
    };
    let note = run_new(api, &args, content, &mut ConsoleNotifier)?;
    println!("#{}  {}  [{}]", note.id, note.title, note.tag);
    Ok(())
}

fn run_new(
    api: &dyn NotesApi,
    args: &NewArgs,
    content: String,
    notifier: &mut dyn Notifier,
) -> Result<Note> {
    let draft = NoteDraft {
        title: args.title.clone(),
        content,
        tag: Some(args.tag),
    };
    let payload = validate(&draft).map_err(|errors| anyhow!("invalid note: {errors}"))?;
    match api.create(&payload) {
        Ok(note) => {
            notifier.success(CREATE_SUCCESS);
            Ok(note)
        }
        Err(err) => {
            notifier.error(CREATE_FAILURE);
            Err(err).context("creating note")
        }
    }
}

pub fn delete_note(api: &dyn NotesApi, args: DeleteArgs) -> Result<()> {
    run_delete(api, &args, &mut ConsoleNotifier)
}

fn run_delete(api: &dyn NotesApi, args: &DeleteArgs, notifier: &mut dyn Notifier) -> Result<()> {
    match api.delete(args.id) {
        Ok(()) => {
            notifier.success(DELETE_SUCCESS);
            Ok(())
        }
        Err(err) => {
            notifier.error(DELETE_FAILURE);
            Err(err).with_context(|| format!("deleting note {}", args.id))
        }
    }
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn build_snippet(note: &Note, max_lines: usize) -> Option<String> {
    let lines: Vec<&str> = note
        .content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect();
    if lines.is_empty() {
        return None;
    }
    let joined = lines.join(" / ");
    if joined.chars().count() > 80 {
        let truncated: String = joined.chars().take(77).collect();
        Some(format!("{truncated}..."))
    } else {
        Some(joined)
    }
}

fn format_timestamp(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

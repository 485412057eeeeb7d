use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, EnvFilter};

use crate::api::{HttpNotesApi, NotesApi};
use crate::app::App;
use crate::config::ConfigLoader;

pub mod commands;

use self::commands::{DeleteArgs, ListArgs, NewArgs};

#[derive(Parser, Debug)]
#[command(
    name = "notehub",
    version,
    about = "Terminal client for the NoteHub notes service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTEHUB_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the service base URL (takes precedence over NOTEHUB_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Print one page of notes
    List(ListArgs),
    /// Create a note
    New(NewArgs),
    /// Delete a note by id
    Delete(DeleteArgs),
}

enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("NOTEHUB_CONFIG", path);
    }
    if let Some(url) = &cli.api_url {
        env::set_var("NOTEHUB_API_URL", url);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);

    let log_file = paths.log_file();
    let target = match command {
        Commands::Tui => LogTarget::File(&log_file),
        _ => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let config = loader.load_or_init()?;
    tracing::debug!(base_url = %config.api.base_url, "configuration loaded");
    let api = HttpNotesApi::new(&config.api).context("building NoteHub client")?;
    let api: Arc<dyn NotesApi> = Arc::new(api);

    match command {
        Commands::Tui => {
            let mut app = App::new(&config, api);
            commands::run_tui(&mut app)
        }
        Commands::List(args) => commands::list_notes(api.as_ref(), &config, args),
        Commands::New(args) => commands::new_note(api.as_ref(), args),
        Commands::Delete(args) => commands::delete_note(api.as_ref(), args),
    }
}

fn init_tracing(level: &str, target: LogTarget<'_>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogTarget::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_timer(UtcTime::rfc_3339())
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}

//! Guidesync - browse and edit travel guides from the terminal.
//!
//! Works offline: reads come from the local cache when the API is
//! unreachable, and edits are queued until the next successful sync.

mod app;
mod output;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use guidesync_core::{GuideDraft, Session, SyncOutcome};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

#[derive(Parser)]
#[command(name = "guidesync", version, about = "Travel guides that keep working offline")]
struct Cli {
    /// Skip the network entirely and work from the local cache
    #[arg(long, global = true)]
    offline: bool,

    /// Write logs to guidesync.log in this directory instead of stderr
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save a bearer token as the current session
    Login { token: String },
    /// Forget the saved session
    Logout,
    /// List your guides
    List,
    /// Show one guide and its activities
    Show {
        id: i64,
        /// Only show this day (0 shows every day)
        #[arg(long, default_value_t = 0)]
        day: u32,
    },
    /// Toggle the favorite flag on a guide
    Favorite { id: i64 },
    /// Create a guide
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Edit a guide
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Delete a guide
    Delete { id: i64 },
    /// Replay queued edits now
    Sync,
    /// Show connectivity, session and the number of queued edits
    Status,
    /// List queued edits
    Pending,
    /// Discard queued edits
    ClearPending,
    /// Show what is cached locally
    CacheInfo,
    /// Remove every cached entry
    ClearCache,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "guidesync.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_ref());
    info!("guidesync starting");

    match cli.command {
        Command::Login { token } => login(&token)?,
        Command::Logout => logout()?,
        command => run(command, cli.offline).await?,
    }

    info!("guidesync done");
    Ok(())
}

async fn run(command: Command, offline: bool) -> Result<()> {
    let mut app = App::new(offline).await?;
    app.remember_principal();
    if !app.monitor.is_online() {
        eprintln!("Offline - showing cached data, edits will be queued");
    }

    match command {
        Command::List => {
            app.flush_pending().await;
            let guides = app.guides.user_guides().await?;
            output::print_guides(&guides, app.guides.user_guides_age().as_deref());
        }
        Command::Show { id, day } => {
            app.flush_pending().await;
            let guide = app.guides.guide(id).await?;
            if day > guide.days {
                bail!("Guide {} only has {} days", id, guide.days);
            }
            output::print_guide(&guide, day);
        }
        Command::Favorite { id } => {
            let outcome = app.guides.toggle_favorite(id).await?;
            output::print_write("Favorite toggled", &outcome);
        }
        Command::Create {
            title,
            description,
            days,
        } => {
            let draft = GuideDraft {
                title: Some(title),
                description,
                days,
                ..Default::default()
            };
            let outcome = app.guides.create_guide(&draft).await?;
            output::print_write("Guide created", &outcome);
        }
        Command::Update {
            id,
            title,
            description,
            days,
        } => {
            let draft = GuideDraft {
                title,
                description,
                days,
                ..Default::default()
            };
            if draft == GuideDraft::default() {
                bail!("Nothing to update - pass --title, --description or --days");
            }
            let outcome = app.guides.update_guide(id, &draft).await?;
            output::print_write("Guide updated", &outcome);
        }
        Command::Delete { id } => {
            let outcome = app.guides.delete_guide(id).await?;
            output::print_write("Guide deleted", &outcome);
        }
        Command::Sync => match app.sync.force_sync().await? {
            SyncOutcome::Completed(report) => output::print_report(&report),
            SyncOutcome::AlreadyRunning => println!("A sync is already running"),
            SyncOutcome::Offline => println!("Offline - nothing synced"),
        },
        Command::Status => {
            output::print_status(app.monitor.is_online(), app.sync.queue().len(), &app.session);
        }
        Command::Pending => output::print_pending(&app.sync.queue().list()),
        Command::ClearPending => {
            let count = app.sync.status().pending_count;
            app.sync.clear_queue()?;
            println!("Discarded {} queued edit(s)", count);
        }
        Command::CacheInfo => {
            let info = app.guides.data().cache().info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::ClearCache => {
            let removed = app.guides.data().cache().clear()?;
            println!("Removed {} cached entr{}", removed, if removed == 1 { "y" } else { "ies" });
        }
        // Handled without wiring the data layer
        Command::Login { .. } | Command::Logout => {}
    }
    Ok(())
}

fn login(token: &str) -> Result<()> {
    let config = guidesync_core::Config::load()?;
    let session = Session::new(config.data_dir()?);
    session.set_token(token.trim())?;
    session.save()?;
    if let Some(data) = session.data() {
        println!(
            "Signed in as {} (expires in {} min)",
            data.principal_id,
            data.minutes_until_expiry()
        );
    }
    Ok(())
}

fn logout() -> Result<()> {
    let config = guidesync_core::Config::load()?;
    Session::new(config.data_dir()?).clear()?;
    println!("Signed out");
    Ok(())
}

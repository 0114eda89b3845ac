use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use playhead_client::HttpBackend;
use playhead_engine::{AskOutcome, RetrievalClient};
use playhead_settings::PlayheadSettings;
use playhead_store::SqliteStorage;
use playhead_telemetry::{init_telemetry, TelemetryConfig};

mod repl;

#[derive(Parser)]
#[command(name = "playhead", version, about = "Chat with YouTube videos through a retrieval backend")]
struct Cli {
    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Path to the state database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current session id, creating one if needed
    Session,
    /// Ingest a video, playlist or channel URL
    Ingest { url: String },
    /// Ask a question about the ingested videos
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// List videos ingested in this session
    Videos,
    /// Check that the backend is reachable
    Health,
    /// Interactive session (default)
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    let telemetry = TelemetryConfig::from_levels(
        &settings.logging.level,
        settings
            .logging
            .modules
            .iter()
            .map(|(m, l)| (m.as_str(), l.as_str())),
        settings.logging.json,
    )?;
    init_telemetry(&telemetry)?;

    let db_path = settings.storage.resolved_db_path();
    let storage = SqliteStorage::open(&db_path)
        .with_context(|| format!("opening state database at {}", db_path.display()))?;
    let backend = HttpBackend::with_connect_timeout(
        settings.backend.base_url.clone(),
        Duration::from_millis(settings.backend.connect_timeout_ms),
    )?;
    tracing::debug!(backend = %backend.base_url(), db = %db_path.display(), "starting");

    let client = Arc::new(RetrievalClient::new(Arc::new(backend), Arc::new(storage)));

    match cli.command.unwrap_or(Command::Repl) {
        Command::Session => {
            let session = client.bootstrap().await;
            match session.id() {
                Some(id) => println!("{id}"),
                None => anyhow::bail!("could not establish a session with {}", settings.backend.base_url),
            }
        }
        Command::Ingest { url } => {
            let _ = client.bootstrap().await;
            let report = client.ingest(&url).await;
            println!("{}", report.status);
            let summary = report.outcome?;
            for video in &summary.videos {
                println!("  {}  {}", video.video_id, video.title);
            }
        }
        Command::Ask { query } => {
            let _ = client.bootstrap().await;
            let outcome = client.ask(&query.join(" ")).await;
            let transcript = client.transcript();
            match outcome {
                AskOutcome::Answered { index } => println!("{}", transcript.turns()[index].content),
                AskOutcome::Failed { index, error } => {
                    println!("{}", transcript.turns()[index].content);
                    return Err(error.into());
                }
                AskOutcome::Ignored(error) => return Err(error.into()),
            }
        }
        Command::Videos => {
            let videos = client.videos();
            if videos.is_empty() {
                println!("No videos ingested yet.");
            }
            for video in videos {
                println!("{}  {}  {}", video.video_id, video.title, video.url);
            }
        }
        Command::Health => {
            let health = client.health().await?;
            println!("{}: {}", settings.backend.base_url, health.status);
        }
        Command::Repl => repl::run(client, BufReader::new(tokio::io::stdin())).await?,
    }

    Ok(())
}

/// File and env settings, then command-line flags on top.
fn resolve_settings(cli: &Cli) -> Result<PlayheadSettings> {
    let mut settings = playhead_settings::load_settings().with_context(|| {
        format!(
            "loading settings from {}",
            playhead_settings::settings_path().display()
        )
    })?;
    if let Some(url) = &cli.backend_url {
        settings.backend.base_url = url.clone();
    }
    if let Some(db) = &cli.db {
        settings.storage.db_path = Some(db.display().to_string());
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    if cli.log_json {
        settings.logging.json = true;
    }
    settings.validate()?;
    Ok(settings)
}

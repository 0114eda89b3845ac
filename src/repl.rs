use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

use playhead_core::errors::ClientError;
use playhead_core::events::ClientEvent;
use playhead_core::messages::Role;
use playhead_engine::RetrievalClient;

const HELP: &str = "\
/ingest <url>   ingest a video, playlist or channel
/videos         list ingested videos
/session        show the session id
/quit           exit
anything else is sent as a question";

/// Read commands and questions from `input` until it ends or `/quit`.
///
/// Ingests and questions run on their own tasks so a slow ingest does not
/// block chatting. All of them are awaited before this returns, and all
/// output goes through a single printer task.
pub async fn run<R>(client: Arc<RetrievalClient>, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let (notes, note_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(client.subscribe(), note_rx));

    for turn in client.transcript().turns() {
        let _ = notes.send(turn.content.clone());
    }
    let session = client.bootstrap().await;
    if !session.is_established() {
        let _ = notes.send("[no session, questions will fail until the backend is reachable]".into());
    }
    let _ = notes.send(HELP.into());

    let mut tasks = JoinSet::new();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        while tasks.try_join_next().is_some() {}

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => {
                let _ = notes.send(HELP.into());
            }
            ("/videos", _) => {
                let videos = client.videos();
                if videos.is_empty() {
                    let _ = notes.send("No videos ingested yet.".into());
                }
                for video in videos {
                    let _ = notes.send(format!("  {}  {}", video.video_id, video.title));
                }
            }
            ("/session", _) => {
                let _ = notes.send(match client.session().id() {
                    Some(id) => id.to_string(),
                    None => "no session".into(),
                });
            }
            ("/ingest", url) => {
                let client = client.clone();
                let notes = notes.clone();
                let url = url.to_string();
                let _ = tasks.spawn(async move {
                    let report = client.ingest(&url).await;
                    // rejected before any status event is sent
                    if matches!(
                        report.outcome,
                        Err(ClientError::Busy | ClientError::EmptyInput(_))
                    ) {
                        let _ = notes.send(report.status);
                    }
                });
            }
            _ => {
                let client = client.clone();
                let query = line.to_string();
                let _ = tasks.spawn(async move {
                    let _ = client.ask(&query).await;
                });
            }
        }
    }

    if !tasks.is_empty() {
        tracing::debug!(pending = tasks.len(), "input closed, waiting for outstanding requests");
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "repl task failed");
        }
    }

    drop(notes);
    printer.await?;
    Ok(())
}

/// Prints events and notes as they arrive. Returns once every note sender
/// is gone, after flushing the events already queued.
async fn print_events(
    mut events: broadcast::Receiver<ClientEvent>,
    mut notes: mpsc::UnboundedReceiver<String>,
) {
    loop {
        tokio::select! {
            note = notes.recv() => match note {
                Some(note) => println!("{note}"),
                None => break,
            },
            event = events.recv() => match event {
                Ok(event) => println!("{}", render(&event)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        }
    }

    loop {
        match events.try_recv() {
            Ok(event) => println!("{}", render(&event)),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

fn render(event: &ClientEvent) -> String {
    match event {
        ClientEvent::TurnAppended { turn, .. } => match turn.role {
            Role::User => format!("> {}", turn.content),
            Role::Assistant => format!("\n{}\n", turn.content),
            Role::System => format!("\n! {}\n", turn.content),
        },
        ClientEvent::IngestStatus { status, .. } => format!("[{status}]"),
        ClientEvent::CatalogUpdated { added, total } => {
            format!("[{added} new video(s), {total} total]")
        }
        ClientEvent::SessionChanged { session_id } => format!("[session {}]", session_id.short()),
    }
}

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use playhead_core::backend::{Backend, IngestRequest};
use playhead_core::errors::ClientError;
use playhead_core::events::ClientEvent;
use playhead_core::videos::VideoRef;
use playhead_store::{SessionStore, VideoCatalog};

pub const INGEST_STARTED: &str = "Starting ingestion...";
pub const INGEST_SUCCEEDED: &str = "Ingestion complete! You can start chatting now.";
pub const INGEST_BUSY: &str = "Ingestion already in progress.";
pub const INGEST_UNREACHABLE: &str = "Error connecting to backend.";
pub const INGEST_INTERRUPTED: &str = "Ingestion interrupted before the backend replied.";
pub const INGEST_EMPTY_URL: &str = "Enter a video, playlist or channel URL to ingest.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestPhase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// What a successful ingest changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestSummary {
    /// Videos the backend reported, in response order.
    pub videos: Vec<VideoRef>,
    /// How many of them were new to the catalog.
    pub added: usize,
    pub session_changed: bool,
    /// Free-form message from the backend.
    pub backend_message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestReport {
    /// Human-readable status line.
    pub status: String,
    pub outcome: Result<IngestSummary, ClientError>,
}

impl IngestReport {
    fn rejected(status: &str, error: ClientError) -> Self {
        Self {
            status: status.to_string(),
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

struct IngestState {
    phase: IngestPhase,
    status: String,
    last_settled: Option<IngestPhase>,
}

/// Drives one ingest at a time against the backend and folds the result
/// into the session store and catalog.
pub struct IngestionCoordinator {
    backend: Arc<dyn Backend>,
    sessions: Arc<SessionStore>,
    catalog: Arc<VideoCatalog>,
    state: Mutex<IngestState>,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl IngestionCoordinator {
    pub fn new(
        backend: Arc<dyn Backend>,
        sessions: Arc<SessionStore>,
        catalog: Arc<VideoCatalog>,
        event_tx: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            backend,
            sessions,
            catalog,
            state: Mutex::new(IngestState {
                phase: IngestPhase::Idle,
                status: String::new(),
                last_settled: None,
            }),
            event_tx,
        }
    }

    /// `Idle` or `Submitting`. Settled phases are reported by
    /// [`last_settled`](Self::last_settled).
    pub fn phase(&self) -> IngestPhase {
        self.state.lock().phase
    }

    pub fn last_settled(&self) -> Option<IngestPhase> {
        self.state.lock().last_settled
    }

    /// Latest status line; empty before the first ingest.
    pub fn status(&self) -> String {
        self.state.lock().status.clone()
    }

    #[instrument(skip(self))]
    pub async fn start(&self, url: &str) -> IngestReport {
        if url.trim().is_empty() {
            return IngestReport::rejected(INGEST_EMPTY_URL, ClientError::EmptyInput("url"));
        }

        {
            let mut state = self.state.lock();
            if state.phase == IngestPhase::Submitting {
                debug!("ingest rejected, another one is in flight");
                return IngestReport::rejected(INGEST_BUSY, ClientError::Busy);
            }
            state.phase = IngestPhase::Submitting;
            state.status = INGEST_STARTED.to_string();
        }
        let _guard = SubmittingGuard { coordinator: self };
        self.emit_status(INGEST_STARTED, true);

        // Read after claiming the slot so a session adopted by the previous
        // ingest is attached.
        let session = self.sessions.current_id();
        let request = match IngestRequest::new(url, session.as_ref()) {
            Ok(request) => request,
            Err(e) => return self.settle_failure(e),
        };

        match self.backend.ingest(&request).await {
            Ok(resp) => {
                let session_changed = resp
                    .session_id
                    .as_deref()
                    .is_some_and(|id| self.sessions.adopt(id));
                if session_changed {
                    if let Some(session_id) = self.sessions.current_id() {
                        let _ = self.event_tx.send(ClientEvent::SessionChanged { session_id });
                    }
                }

                let added = self.catalog.merge(&resp.videos);
                let _ = self.event_tx.send(ClientEvent::CatalogUpdated {
                    added,
                    total: self.catalog.len(),
                });

                info!(
                    returned = resp.videos.len(),
                    added, session_changed, "ingestion complete"
                );
                self.settle(IngestPhase::Succeeded, INGEST_SUCCEEDED);
                IngestReport {
                    status: INGEST_SUCCEEDED.to_string(),
                    outcome: Ok(IngestSummary {
                        videos: resp.videos,
                        added,
                        session_changed,
                        backend_message: resp.message,
                    }),
                }
            }
            Err(e) => {
                warn!(error = %e, kind = e.error_kind(), "ingestion failed");
                self.settle_failure(ClientError::from_ingest(e))
            }
        }
    }

    fn settle_failure(&self, error: ClientError) -> IngestReport {
        let status = failure_status(&error);
        self.settle(IngestPhase::Failed, &status);
        IngestReport {
            status,
            outcome: Err(error),
        }
    }

    fn settle(&self, outcome: IngestPhase, status: &str) {
        {
            let mut state = self.state.lock();
            state.phase = IngestPhase::Idle;
            state.status = status.to_string();
            state.last_settled = Some(outcome);
        }
        debug!(?outcome, "ingest settled");
        self.emit_status(status, false);
    }

    fn emit_status(&self, status: &str, in_flight: bool) {
        let _ = self.event_tx.send(ClientEvent::IngestStatus {
            status: status.to_string(),
            in_flight,
        });
    }
}

fn failure_status(error: &ClientError) -> String {
    match error {
        ClientError::IngestionRejected { detail } => format!(
            "Ingestion failed: {}",
            detail.as_deref().unwrap_or("Unknown error")
        ),
        ClientError::TransportFailure(_) => INGEST_UNREACHABLE.to_string(),
        other => format!("Ingestion failed: {other}"),
    }
}

/// Settles the attempt as failed if the ingest future is dropped before
/// the backend replies.
struct SubmittingGuard<'a> {
    coordinator: &'a IngestionCoordinator,
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        let interrupted = self.coordinator.state.lock().phase == IngestPhase::Submitting;
        if interrupted {
            warn!("ingest dropped before the backend replied");
            self.coordinator.settle(IngestPhase::Failed, INGEST_INTERRUPTED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use playhead_client::mock::{MockBackend, MockResponse};
    use playhead_core::errors::BackendError;
    use playhead_core::ids::SessionId;
    use playhead_store::{KeyValueStorage, MemoryStorage, SESSION_KEY};

    struct Fixture {
        backend: Arc<MockBackend>,
        storage: Arc<MemoryStorage>,
        sessions: Arc<SessionStore>,
        catalog: Arc<VideoCatalog>,
        coordinator: IngestionCoordinator,
        events: broadcast::Receiver<ClientEvent>,
    }

    fn fixture(backend: MockBackend, session: Option<&str>) -> Fixture {
        let backend = Arc::new(backend);
        let storage = Arc::new(MemoryStorage::new());
        let sessions = Arc::new(SessionStore::new(storage.clone(), backend.clone()));
        if let Some(id) = session {
            assert!(sessions.adopt(id));
        }
        let catalog = Arc::new(VideoCatalog::restore(storage.clone()));
        let (event_tx, events) = broadcast::channel(64);
        let coordinator =
            IngestionCoordinator::new(backend.clone(), sessions.clone(), catalog.clone(), event_tx);
        Fixture {
            backend,
            storage,
            sessions,
            catalog,
            coordinator,
            events,
        }
    }

    fn video(id: &str) -> VideoRef {
        VideoRef::new(id, format!("Video {id}"), format!("https://youtu.be/{id}"))
    }

    #[tokio::test]
    async fn success_merges_videos_and_reports_status() {
        let f = fixture(
            MockBackend::new().on_ingest(MockResponse::ingest(
                "s1",
                vec![VideoRef::new("abc", "Test", "https://youtu.be/abc")],
                "ok",
            )),
            Some("s1"),
        );

        let report = f.coordinator.start("https://youtu.be/abc").await;

        assert_eq!(report.status, INGEST_SUCCEEDED);
        let summary = report.outcome.unwrap();
        assert_eq!(summary.added, 1);
        assert!(!summary.session_changed);
        assert_eq!(summary.backend_message, "ok");

        let videos = f.catalog.list();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id.as_str(), "abc");

        let sent = f.backend.ingest_requests();
        assert_eq!(sent[0].session_id.as_ref().map(SessionId::as_str), Some("s1"));

        assert_eq!(f.coordinator.phase(), IngestPhase::Idle);
        assert_eq!(f.coordinator.last_settled(), Some(IngestPhase::Succeeded));
        assert_eq!(f.coordinator.status(), INGEST_SUCCEEDED);
    }

    #[tokio::test]
    async fn rejection_keeps_detail_and_leaves_state_alone() {
        let f = fixture(
            MockBackend::new().on_ingest(MockResponse::rejected(500, r#"{"detail":"bad url"}"#)),
            Some("s1"),
        );
        let _ = f.catalog.merge(&[video("keep")]);

        let report = f.coordinator.start("https://example.com/nope").await;

        assert!(report.status.contains("bad url"), "got: {}", report.status);
        assert_eq!(
            report.outcome.unwrap_err(),
            ClientError::IngestionRejected {
                detail: Some("bad url".into())
            }
        );
        assert_eq!(f.catalog.len(), 1);
        assert_eq!(f.sessions.current_id().unwrap().as_str(), "s1");
        assert_eq!(f.coordinator.phase(), IngestPhase::Idle);
        assert_eq!(f.coordinator.last_settled(), Some(IngestPhase::Failed));
    }

    #[tokio::test]
    async fn rejection_without_detail_is_generic() {
        let f = fixture(
            MockBackend::new().on_ingest(MockResponse::rejected(502, "Bad Gateway")),
            None,
        );
        let report = f.coordinator.start("https://youtu.be/x").await;
        assert_eq!(report.status, "Ingestion failed: Unknown error");
    }

    #[tokio::test]
    async fn transport_failure_reports_connectivity() {
        let f = fixture(
            MockBackend::new().on_ingest(MockResponse::Error(BackendError::Transport(
                "connection refused".into(),
            ))),
            None,
        );
        let report = f.coordinator.start("https://youtu.be/x").await;
        assert_eq!(report.status, INGEST_UNREACHABLE);
        assert!(matches!(report.outcome, Err(ClientError::TransportFailure(_))));
        assert!(f.catalog.is_empty());
        assert!(f.sessions.current_id().is_none());
    }

    #[tokio::test]
    async fn adopts_session_assigned_by_backend() {
        let mut f = fixture(
            MockBackend::new().on_ingest(MockResponse::ingest("assigned", vec![video("a")], "ok")),
            None,
        );

        let report = f.coordinator.start("https://youtu.be/a").await;

        assert!(report.outcome.unwrap().session_changed);
        assert_eq!(f.sessions.current_id().unwrap().as_str(), "assigned");
        assert_eq!(f.storage.get(SESSION_KEY).unwrap().as_deref(), Some("assigned"));
        assert!(f.backend.ingest_requests()[0].session_id.is_none());

        let mut saw_session_change = false;
        while let Ok(event) = f.events.try_recv() {
            if let ClientEvent::SessionChanged { session_id } = event {
                assert_eq!(session_id.as_str(), "assigned");
                saw_session_change = true;
            }
        }
        assert!(saw_session_change);
    }

    #[tokio::test]
    async fn empty_url_has_no_side_effects() {
        let f = fixture(MockBackend::new(), Some("s1"));
        let report = f.coordinator.start("   ").await;
        assert_eq!(report.outcome.unwrap_err(), ClientError::EmptyInput("url"));
        assert_eq!(f.backend.call_count(), 0);
        assert_eq!(f.coordinator.status(), "");
        assert_eq!(f.coordinator.last_settled(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_submitting_is_busy() {
        let f = fixture(
            MockBackend::new()
                .on_ingest(MockResponse::delayed(
                    Duration::from_millis(100),
                    MockResponse::ingest("s1", vec![video("a")], "ok"),
                ))
                .on_ingest(MockResponse::ingest("s1", vec![video("b")], "ok")),
            Some("s1"),
        );

        let second = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(f.coordinator.phase(), IngestPhase::Submitting);
            f.coordinator.start("https://youtu.be/b").await
        };
        let (first, second) = tokio::join!(f.coordinator.start("https://youtu.be/a"), second);

        assert!(first.is_success());
        assert_eq!(second.status, INGEST_BUSY);
        assert_eq!(second.outcome.unwrap_err(), ClientError::Busy);
        assert_eq!(f.backend.ingest_requests().len(), 1);
        assert_eq!(f.catalog.len(), 1);

        // ready again once settled
        let third = f.coordinator.start("https://youtu.be/b").await;
        assert!(third.is_success());
        assert_eq!(f.catalog.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_ingest_settles_as_interrupted() {
        let mut f = fixture(
            MockBackend::new().on_ingest(MockResponse::delayed(
                Duration::from_secs(60),
                MockResponse::ingest("s1", vec![], "ok"),
            )),
            Some("s1"),
        );

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), f.coordinator.start("https://youtu.be/a"))
                .await;
        assert!(timed_out.is_err());
        assert_eq!(f.coordinator.phase(), IngestPhase::Idle);
        assert_eq!(f.coordinator.status(), INGEST_INTERRUPTED);
        assert_eq!(f.coordinator.last_settled(), Some(IngestPhase::Failed));

        let mut last_status = None;
        while let Ok(event) = f.events.try_recv() {
            if let ClientEvent::IngestStatus { status, in_flight } = event {
                last_status = Some((status, in_flight));
            }
        }
        assert_eq!(last_status, Some((INGEST_INTERRUPTED.to_string(), false)));

        // the slot is free again
        let next = f.coordinator.start("https://youtu.be/b").await;
        assert_ne!(next.outcome, Err(ClientError::Busy));
        assert_eq!(f.backend.ingest_requests().len(), 2);
    }

    #[tokio::test]
    async fn status_events_bracket_the_request() {
        let mut f = fixture(
            MockBackend::new().on_ingest(MockResponse::ingest("s1", vec![], "ok")),
            Some("s1"),
        );
        let _ = f.coordinator.start("https://youtu.be/a").await;

        let mut statuses = Vec::new();
        while let Ok(event) = f.events.try_recv() {
            if let ClientEvent::IngestStatus { status, in_flight } = event {
                statuses.push((status, in_flight));
            }
        }
        assert_eq!(
            statuses,
            vec![
                (INGEST_STARTED.to_string(), true),
                (INGEST_SUCCEEDED.to_string(), false),
            ]
        );
    }
}

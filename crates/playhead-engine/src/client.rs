use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, instrument};

use playhead_core::backend::{Backend, HealthResponse};
use playhead_core::errors::ClientError;
use playhead_core::events::ClientEvent;
use playhead_core::messages::Transcript;
use playhead_core::videos::VideoRef;
use playhead_store::{KeyValueStorage, Session, SessionStore, VideoCatalog};

use crate::chat::{AskOutcome, ChatCoordinator};
use crate::ingest::{IngestPhase, IngestReport, IngestionCoordinator};

const EVENT_CAPACITY: usize = 256;

/// Everything a front end needs: one session, its catalog, its transcript.
pub struct RetrievalClient {
    backend: Arc<dyn Backend>,
    sessions: Arc<SessionStore>,
    catalog: Arc<VideoCatalog>,
    ingestion: IngestionCoordinator,
    chat: ChatCoordinator,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl RetrievalClient {
    /// Restores the catalog from `storage` immediately. The session is
    /// resolved by [`bootstrap`](Self::bootstrap).
    pub fn new(backend: Arc<dyn Backend>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let sessions = Arc::new(SessionStore::new(storage.clone(), backend.clone()));
        let catalog = Arc::new(VideoCatalog::restore(storage));
        let ingestion = IngestionCoordinator::new(
            backend.clone(),
            sessions.clone(),
            catalog.clone(),
            event_tx.clone(),
        );
        let chat = ChatCoordinator::new(backend.clone(), sessions.clone(), event_tx.clone());
        Self {
            backend,
            sessions,
            catalog,
            ingestion,
            chat,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn bootstrap(&self) -> Session {
        let before = self.sessions.current_id();
        let session = self.sessions.bootstrap().await;
        if let Some(id) = session.id() {
            if before.as_ref() != Some(id) {
                info!(session_id = %id.short(), "session ready");
                let _ = self.event_tx.send(ClientEvent::SessionChanged {
                    session_id: id.clone(),
                });
            }
        }
        session
    }

    pub async fn ingest(&self, url: &str) -> IngestReport {
        self.ingestion.start(url).await
    }

    pub async fn ask(&self, query: &str) -> AskOutcome {
        self.chat.ask(query).await
    }

    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.backend
            .health()
            .await
            .map_err(|e| ClientError::TransportFailure(e.to_string()))
    }

    pub fn session(&self) -> Session {
        self.sessions.current()
    }

    pub fn videos(&self) -> Vec<VideoRef> {
        self.catalog.list()
    }

    pub fn transcript(&self) -> Transcript {
        self.chat.transcript()
    }

    pub fn ingest_status(&self) -> String {
        self.ingestion.status()
    }

    pub fn ingest_phase(&self) -> IngestPhase {
        self.ingestion.phase()
    }

    pub fn pending_questions(&self) -> usize {
        self.chat.pending()
    }
}

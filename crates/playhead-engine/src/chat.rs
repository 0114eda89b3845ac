use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, instrument, warn};

use playhead_core::backend::{Backend, ChatRequest};
use playhead_core::errors::ClientError;
use playhead_core::events::ClientEvent;
use playhead_core::messages::{Transcript, Turn, CHAT_FAILURE_MESSAGE, MISSING_SESSION_MESSAGE};
use playhead_store::SessionStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    AwaitingResponse,
}

/// How a single `ask` ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AskOutcome {
    /// An assistant turn was appended at `index`.
    Answered { index: usize },
    /// An error turn was appended at `index`.
    Failed { index: usize, error: ClientError },
    /// Nothing was appended and no request was made.
    Ignored(ClientError),
}

impl AskOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

/// Shared state the request task writes into after the caller has moved on.
struct ChatShared {
    transcript: Mutex<Transcript>,
    in_flight: AtomicUsize,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl ChatShared {
    fn append(&self, turn: Turn) -> usize {
        let index = self.transcript.lock().push(turn.clone());
        let _ = self.event_tx.send(ClientEvent::TurnAppended { index, turn });
        index
    }
}

/// Owns the transcript and turns questions into backend chat calls.
///
/// Several questions may be outstanding at once. Responses are appended in
/// the order they arrive, not the order they were asked.
pub struct ChatCoordinator {
    backend: Arc<dyn Backend>,
    sessions: Arc<SessionStore>,
    shared: Arc<ChatShared>,
}

impl ChatCoordinator {
    pub fn new(
        backend: Arc<dyn Backend>,
        sessions: Arc<SessionStore>,
        event_tx: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            backend,
            sessions,
            shared: Arc::new(ChatShared {
                transcript: Mutex::new(Transcript::new()),
                in_flight: AtomicUsize::new(0),
                event_tx,
            }),
        }
    }

    pub fn transcript(&self) -> Transcript {
        self.shared.transcript.lock().clone()
    }

    /// Questions sent but not yet answered.
    pub fn pending(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> ChatPhase {
        match self.pending() {
            0 => ChatPhase::Idle,
            _ => ChatPhase::AwaitingResponse,
        }
    }

    /// Append the question, ask the backend, append exactly one reply.
    ///
    /// The user turn is visible before this first yields. The backend call
    /// runs on its own task, so dropping the returned future does not stop
    /// the reply from landing in the transcript.
    #[instrument(skip_all, fields(query_len = query.len()))]
    pub async fn ask(&self, query: &str) -> AskOutcome {
        if query.trim().is_empty() {
            return AskOutcome::Ignored(ClientError::EmptyInput("query"));
        }

        let request = match ChatRequest::new(query, self.sessions.current_id().as_ref()) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "chat attempted without a session");
                let index = self.shared.append(Turn::system(MISSING_SESSION_MESSAGE));
                return AskOutcome::Failed { index, error };
            }
        };

        let _ = self.shared.append(Turn::user(query));
        let _ = self.shared.in_flight.fetch_add(1, Ordering::AcqRel);

        let backend = self.backend.clone();
        let shared = self.shared.clone();
        let task = tokio::spawn(async move {
            let outcome = match backend.chat(&request).await {
                Ok(resp) => {
                    debug!(answer_len = resp.answer.len(), "chat answered");
                    AskOutcome::Answered {
                        index: shared.append(Turn::assistant(resp.answer)),
                    }
                }
                Err(e) => {
                    warn!(error = %e, kind = e.error_kind(), "chat failed");
                    AskOutcome::Failed {
                        index: shared.append(Turn::system(CHAT_FAILURE_MESSAGE)),
                        error: ClientError::from_chat(e),
                    }
                }
            };
            let _ = shared.in_flight.fetch_sub(1, Ordering::AcqRel);
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "chat task aborted");
                let _ = self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
                AskOutcome::Failed {
                    index: self.shared.append(Turn::system(CHAT_FAILURE_MESSAGE)),
                    error: ClientError::TransportFailure(e.to_string()),
                }
            }
        }
    }
}

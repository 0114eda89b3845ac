use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use playhead_core::backend::{
    Backend, ChatRequest, ChatResponse, HealthResponse, IngestRequest, IngestResponse,
    SessionResponse,
};
use playhead_core::errors::BackendError;
use playhead_core::ids::SessionId;
use playhead_core::videos::VideoRef;

/// Pre-programmed backend replies for deterministic tests.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Session(SessionResponse),
    Ingest(IngestResponse),
    Chat(ChatResponse),
    Health(HealthResponse),
    /// Fail the call with this error.
    Error(BackendError),
    /// Wait a duration, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn session(id: &str) -> Self {
        Self::Session(SessionResponse {
            session_id: id.to_string(),
        })
    }

    /// A session reply carrying a newly minted id.
    pub fn fresh_session() -> Self {
        Self::session(SessionId::generate().as_str())
    }

    pub fn ingest(session_id: &str, videos: Vec<VideoRef>, message: &str) -> Self {
        Self::Ingest(IngestResponse {
            session_id: Some(session_id.to_string()),
            videos,
            message: message.to_string(),
        })
    }

    pub fn answer(text: &str) -> Self {
        Self::Chat(ChatResponse {
            answer: text.to_string(),
        })
    }

    /// A non-2xx reply with the given raw body.
    pub fn rejected(status: u16, body: &str) -> Self {
        Self::Error(BackendError::from_status(status, body))
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// In-process [`Backend`] that replays queued responses per endpoint and
/// records every request it receives.
#[derive(Default)]
pub struct MockBackend {
    sessions: Mutex<VecDeque<MockResponse>>,
    ingests: Mutex<VecDeque<MockResponse>>,
    chats: Mutex<VecDeque<MockResponse>>,
    health: Mutex<VecDeque<MockResponse>>,
    ingest_log: Mutex<Vec<IngestRequest>>,
    chat_log: Mutex<Vec<ChatRequest>>,
    session_calls: AtomicUsize,
    call_count: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_session(self, response: MockResponse) -> Self {
        self.sessions.lock().push_back(response);
        self
    }

    pub fn on_ingest(self, response: MockResponse) -> Self {
        self.ingests.lock().push_back(response);
        self
    }

    pub fn on_chat(self, response: MockResponse) -> Self {
        self.chats.lock().push_back(response);
        self
    }

    pub fn on_health(self, response: MockResponse) -> Self {
        self.health.lock().push_back(response);
        self
    }

    /// Total calls across all endpoints.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::Relaxed)
    }

    pub fn ingest_requests(&self) -> Vec<IngestRequest> {
        self.ingest_log.lock().clone()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_log.lock().clone()
    }

    async fn next(
        &self,
        queue: &Mutex<VecDeque<MockResponse>>,
        endpoint: &str,
    ) -> Result<MockResponse, BackendError> {
        let _ = self.call_count.fetch_add(1, Ordering::Relaxed);
        let response = queue.lock().pop_front().ok_or_else(|| {
            BackendError::Transport(format!("MockBackend: no response configured for {endpoint}"))
        })?;
        resolve(response).await
    }
}

/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve(response: MockResponse) -> Result<MockResponse, BackendError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
            MockResponse::Error(e) => return Err(e),
            other => return Ok(other),
        }
    }
}

fn mismatch(endpoint: &str, got: &MockResponse) -> BackendError {
    BackendError::Decode(format!("MockBackend: {endpoint} got {got:?}"))
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_session(&self) -> Result<SessionResponse, BackendError> {
        let _ = self.session_calls.fetch_add(1, Ordering::Relaxed);
        match self.next(&self.sessions, "/session").await? {
            MockResponse::Session(resp) => Ok(resp),
            other => Err(mismatch("/session", &other)),
        }
    }

    async fn ingest(&self, request: &IngestRequest) -> Result<IngestResponse, BackendError> {
        self.ingest_log.lock().push(request.clone());
        match self.next(&self.ingests, "/ingest").await? {
            MockResponse::Ingest(resp) => Ok(resp),
            other => Err(mismatch("/ingest", &other)),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        self.chat_log.lock().push(request.clone());
        match self.next(&self.chats, "/chat").await? {
            MockResponse::Chat(resp) => Ok(resp),
            other => Err(mismatch("/chat", &other)),
        }
    }

    async fn health(&self) -> Result<HealthResponse, BackendError> {
        match self.next(&self.health, "/health").await? {
            MockResponse::Health(resp) => Ok(resp),
            other => Err(mismatch("/health", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_per_endpoint() {
        let mock = MockBackend::new()
            .on_chat(MockResponse::answer("first"))
            .on_chat(MockResponse::answer("second"));
        let session = SessionId::from_raw("s1");
        let req = ChatRequest::new("q", Some(&session)).unwrap();

        assert_eq!(mock.chat(&req).await.unwrap().answer, "first");
        assert_eq!(mock.chat(&req).await.unwrap().answer, "second");
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.chat_requests().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_queue_is_transport_error() {
        let mock = MockBackend::new();
        let err = mock.create_session().await.unwrap_err();
        assert_eq!(err.error_kind(), "transport");
        assert_eq!(mock.session_calls(), 1);
    }

    #[tokio::test]
    async fn wrong_response_kind_is_decode_error() {
        let mock = MockBackend::new().on_session(MockResponse::answer("oops"));
        let err = mock.create_session().await.unwrap_err();
        assert_eq!(err.error_kind(), "decode");
    }

    #[tokio::test]
    async fn rejected_response_keeps_detail() {
        let mock = MockBackend::new().on_ingest(MockResponse::rejected(500, r#"{"detail":"bad url"}"#));
        let req = IngestRequest::new("u", None).unwrap();
        let err = mock.ingest(&req).await.unwrap_err();
        assert_eq!(err.detail(), Some("bad url"));
        assert_eq!(mock.ingest_requests(), vec![req]);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_response() {
        let mock = MockBackend::new().on_health(MockResponse::delayed(
            Duration::from_millis(50),
            MockResponse::Health(HealthResponse {
                status: "ok".into(),
            }),
        ));

        let start = tokio::time::Instant::now();
        let resp = mock.health().await.unwrap();
        assert_eq!(resp.status, "ok");
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use playhead_core::backend::{
    Backend, ChatRequest, ChatResponse, HealthResponse, IngestRequest, IngestResponse,
    SessionResponse,
};
use playhead_core::errors::BackendError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-over-HTTP client for the retrieval backend.
///
/// Only the connect phase is time-limited; a request that connects and then
/// hangs stays pending.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_connect_timeout(base_url, CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(
        base_url: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let resp = req
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "backend returned error status");
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        resp.json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn create_session(&self) -> Result<SessionResponse, BackendError> {
        self.send(self.client.get(self.endpoint("/session"))).await
    }

    #[instrument(skip_all, fields(url = %request.url, session_id = ?request.session_id))]
    async fn ingest(&self, request: &IngestRequest) -> Result<IngestResponse, BackendError> {
        let resp: IngestResponse = self
            .send(self.client.post(self.endpoint("/ingest")).json(request))
            .await?;
        debug!(videos = resp.videos.len(), "ingest accepted");
        Ok(resp)
    }

    #[instrument(skip_all, fields(session_id = %request.session_id))]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        self.send(self.client.post(self.endpoint("/chat")).json(request))
            .await
    }

    #[instrument(skip(self))]
    async fn health(&self) -> Result<HealthResponse, BackendError> {
        self.send(self.client.get(self.endpoint("/health"))).await
    }
}

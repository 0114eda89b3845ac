use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{BackendError, ClientError};
use crate::ids::SessionId;
use crate::videos::VideoRef;

/// Body of `POST /ingest`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl IngestRequest {
    pub fn new(url: impl Into<String>, session: Option<&SessionId>) -> Result<Self, ClientError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ClientError::EmptyInput("url"));
        }
        Ok(Self {
            url,
            session_id: session.cloned(),
        })
    }
}

/// Body of `POST /chat`. Cannot be built without a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub session_id: SessionId,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>, session: Option<&SessionId>) -> Result<Self, ClientError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ClientError::EmptyInput("query"));
        }
        let session_id = session
            .filter(|s| !s.as_str().is_empty())
            .cloned()
            .ok_or(ClientError::SessionUnavailable)?;
        Ok(Self { query, session_id })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub videos: Vec<VideoRef>,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// The remote retrieval backend. One implementation talks HTTP; tests use
/// a scripted mock.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// `GET /session`
    async fn create_session(&self) -> Result<SessionResponse, BackendError>;

    /// `POST /ingest`
    async fn ingest(&self, request: &IngestRequest) -> Result<IngestResponse, BackendError>;

    /// `POST /chat`
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthResponse, BackendError>;
}

/// Errors returned by a [`Backend`](crate::backend::Backend) call.
///
/// A non-2xx response is `Rejected`; anything that stops a well-formed
/// response from arriving is `Transport` or `Decode`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend rejected request with status {status}")]
    Rejected { status: u16, detail: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Build a `Rejected` error from a status code and raw response body,
    /// lifting a string `detail` field out of a JSON body when present.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_owned))
            .filter(|d| !d.is_empty());
        Self::Rejected { status, detail }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
        }
    }
}

/// User-facing error taxonomy for the retrieval client.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("no session established")]
    SessionUnavailable,

    #[error("ingestion rejected: {}", detail.as_deref().unwrap_or("Unknown error"))]
    IngestionRejected { detail: Option<String> },

    #[error("chat rejected with status {status}")]
    ChatRejected { status: u16 },

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("ingestion already in progress")]
    Busy,

    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
}

impl ClientError {
    pub fn from_ingest(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { detail, .. } => Self::IngestionRejected { detail },
            other => Self::TransportFailure(other.to_string()),
        }
    }

    pub fn from_chat(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { status, .. } => Self::ChatRejected { status },
            other => Self::TransportFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_extracts_detail() {
        let err = BackendError::from_status(500, r#"{"detail":"bad url"}"#);
        assert_eq!(err.detail(), Some("bad url"));
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn from_status_without_detail() {
        assert_eq!(BackendError::from_status(502, "Bad Gateway").detail(), None);
        assert_eq!(BackendError::from_status(500, "{}").detail(), None);
        assert_eq!(BackendError::from_status(500, r#"{"detail":""}"#).detail(), None);
    }

    #[test]
    fn non_string_detail_is_ignored() {
        let body = r#"{"detail":[{"loc":["body","url"],"msg":"field required"}]}"#;
        assert_eq!(BackendError::from_status(422, body).detail(), None);
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(BackendError::Transport("refused".into()).error_kind(), "transport");
        assert_eq!(BackendError::Decode("eof".into()).error_kind(), "decode");
        assert_eq!(BackendError::from_status(400, "").error_kind(), "rejected");
    }

    #[test]
    fn ingest_mapping() {
        let rejected = ClientError::from_ingest(BackendError::from_status(500, r#"{"detail":"bad url"}"#));
        assert_eq!(
            rejected,
            ClientError::IngestionRejected {
                detail: Some("bad url".into())
            }
        );
        assert!(rejected.to_string().contains("bad url"));

        let decode = ClientError::from_ingest(BackendError::Decode("missing field".into()));
        assert!(matches!(decode, ClientError::TransportFailure(_)));
    }

    #[test]
    fn chat_mapping() {
        let rejected = ClientError::from_chat(BackendError::from_status(503, ""));
        assert_eq!(rejected, ClientError::ChatRejected { status: 503 });

        let transport = ClientError::from_chat(BackendError::Transport("reset".into()));
        assert!(matches!(transport, ClientError::TransportFailure(_)));
    }
}

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::messages::Turn;

/// State changes emitted by the client so a front end can re-render.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session_changed")]
    SessionChanged { session_id: SessionId },

    #[serde(rename = "turn_appended")]
    TurnAppended { index: usize, turn: Turn },

    #[serde(rename = "ingest_status")]
    IngestStatus { status: String, in_flight: bool },

    #[serde(rename = "catalog_updated")]
    CatalogUpdated { added: usize, total: usize },
}

pub mod chat;
pub mod client;
pub mod ingest;

pub use chat::{AskOutcome, ChatCoordinator, ChatPhase};
pub use client::RetrievalClient;
pub use ingest::{IngestPhase, IngestReport, IngestSummary, IngestionCoordinator};

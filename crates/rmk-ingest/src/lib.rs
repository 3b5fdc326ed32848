//! Synchronous hot-path ingestion and its durable pub/sub front door (C6).

pub mod pipeline;
pub mod stats;
pub mod transport;

pub use pipeline::IngestionPipeline;
pub use stats::{IngestionStats, IngestionStatsSnapshot};
pub use transport::{
    consume_with_retry, dead_letter_subject, transcripts_subject, DeadLetterEnvelope,
    DurableTransport, Envelope, InProcessTransport, DEFAULT_MAX_RETRIES, RETRY_BASE, RETRY_CAP,
};

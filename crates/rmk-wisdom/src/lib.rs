//! Cold-path wisdom manager: buffers ingested turns, summarizes them per
//! namespace, and persists the result to the graph and vector index (C5).

pub mod buffer;
pub mod manager;
pub mod persist;
pub mod summarizer;

pub use buffer::{partition_by_namespace, WisdomBuffer};
pub use manager::WisdomManager;
pub use persist::persist_namespace_batch;
pub use summarizer::{local_extractor_summary, HttpSummarizer, Summarizer, Summary};

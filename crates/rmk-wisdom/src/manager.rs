//! Wires the buffer, summarizer, and embedder together into the always-on
//! cold-path worker. `spawn` returns a handle the service shuts down via a
//! shared cancellation token: a root cancel causes the ticker to return.

use crate::buffer::{partition_by_namespace, WisdomBuffer};
use crate::persist::persist_namespace_batch;
use crate::summarizer::Summarizer;
use rmk_core::{Namespace, TranscriptEvent};
use rmk_graph::GraphClient;
use rmk_vector::{Embedder, VectorIndex};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct WisdomManager {
    buffer: WisdomBuffer,
    graph: Arc<dyn GraphClient>,
    vector: Arc<dyn VectorIndex>,
    summarizer: Arc<dyn Summarizer>,
    embedder: Arc<dyn Embedder>,
    flush_interval: Duration,
}

impl WisdomManager {
    #[must_use]
    pub fn new(
        batch_size: usize,
        flush_interval: Duration,
        graph: Arc<dyn GraphClient>,
        vector: Arc<dyn VectorIndex>,
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
    ) -> Arc<Self> {
        Arc::new(Self {
            buffer: WisdomBuffer::new(batch_size),
            graph,
            vector,
            summarizer,
            embedder,
            flush_interval,
        })
    }

    /// Appends one event. If this push crosses the batch-size threshold,
    /// flushes immediately instead of waiting for the next tick.
    pub async fn ingest(self: &Arc<Self>, event: TranscriptEvent) {
        if self.buffer.push(event) {
            self.flush().await;
        }
    }

    pub async fn flush(self: &Arc<Self>) {
        let events = self.buffer.take();
        if events.is_empty() {
            return;
        }
        let groups = partition_by_namespace(events);
        for (ns, events) in groups {
            let namespace = match Namespace::parse(ns) {
                Ok(ns) => ns,
                Err(err) => {
                    error!(%err, "flushed batch carried an invalid namespace, dropping");
                    continue;
                }
            };
            if let Err(err) = persist_namespace_batch(
                self.graph.as_ref(),
                self.vector.as_ref(),
                self.summarizer.as_ref(),
                self.embedder.as_ref(),
                &namespace,
                events,
            )
            .await
            {
                error!(%err, namespace = %namespace, "wisdom batch persistence failed");
            }
        }
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.flush_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.flush().await,
                    () = cancel.cancelled() => {
                        info!("wisdom manager shutting down, flushing remaining buffer");
                        self.flush().await;
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarizer::Summary;
    use async_trait::async_trait;
    use rmk_graph::memory_store::InMemoryGraphClient;
    use rmk_vector::memory_store::InMemoryVectorIndex;

    struct StubSummarizer;
    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, _events: &[TranscriptEvent]) -> Option<Summary> {
            Some(Summary {
                summary_text: "summary".to_string(),
                entities: vec![],
            })
        }
    }

    struct StubEmbedder;
    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> rmk_core::RmkResult<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[tokio::test]
    async fn ingest_triggers_flush_at_batch_size() {
        let manager = WisdomManager::new(
            2,
            Duration::from_secs(3600),
            Arc::new(InMemoryGraphClient::new()),
            Arc::new(InMemoryVectorIndex::new("rmk_nodes")),
            Arc::new(StubSummarizer),
            Arc::new(StubEmbedder),
        );
        let ns = Namespace::for_user("alice").unwrap();
        manager
            .ingest(TranscriptEvent::new("c1", "alice", ns.clone(), "hi", "hello"))
            .await;
        assert_eq!(manager.buffer.len(), 1);
        manager
            .ingest(TranscriptEvent::new("c1", "alice", ns, "bye", "bye"))
            .await;
        assert_eq!(manager.buffer.len(), 0);
    }
}

//! `Ingest(event)`: the synchronous hot path. Target latency is low, so
//! this never blocks on cold-path summarization — it only appends to the
//! Wisdom buffer and returns.

use crate::stats::IngestionStats;
use rmk_cache::{KvStore, RecentContext};
use rmk_core::{Node, NodeType, RmkError, RmkResult, TranscriptEvent};
use rmk_graph::GraphClient;
use rmk_vector::{Embedder, VectorIndex};
use rmk_wisdom::WisdomManager;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

pub struct IngestionPipeline {
    graph: Arc<dyn GraphClient>,
    vector: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    wisdom: Arc<WisdomManager>,
    recent_context: RecentContext,
    stats: IngestionStats,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(
        graph: Arc<dyn GraphClient>,
        vector: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        wisdom: Arc<WisdomManager>,
        kv: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            graph,
            vector,
            embedder,
            wisdom,
            recent_context: RecentContext::new(kv),
            stats: IngestionStats::new(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> &IngestionStats {
        &self.stats
    }

    pub async fn ingest(&self, event: TranscriptEvent) -> RmkResult<()> {
        let started = Instant::now();
        match self.ingest_inner(&event).await {
            Ok((extraction_ms, dgraph_write_ms)) => {
                self.stats.record_success(
                    extraction_ms,
                    dgraph_write_ms,
                    started.elapsed().as_millis() as u64,
                );
                Ok(())
            }
            Err(err) => {
                self.stats.record_error();
                Err(err)
            }
        }
    }

    /// Returns `(extraction_ms, dgraph_write_ms)` on success.
    async fn ingest_inner(&self, event: &TranscriptEvent) -> RmkResult<(u64, u64)> {
        // 1. Permission gate.
        if event.namespace.is_group() {
            let is_member = self.graph.is_member(&event.namespace, &event.user_id).await?;
            if !is_member {
                return Err(RmkError::PolicyDenied {
                    action: "Write".to_string(),
                });
            }
        }

        // 2. Embed. Embedder failure degrades gracefully: steps 3-4 are
        // skipped but the event still reaches the cold path and recent
        // context cache.
        let extraction_started = Instant::now();
        let embedding = self.embedder.embed(&event.user_query).await.ok();
        let extraction_ms = extraction_started.elapsed().as_millis() as u64;

        let dgraph_started = Instant::now();
        if let Some(embedding) = embedding {
            self.write_fact_and_vector(event, embedding).await;
        }
        let dgraph_write_ms = dgraph_started.elapsed().as_millis() as u64;

        // 5. Cold hand-off.
        self.wisdom.ingest(event.clone()).await;

        // 6. Recent context.
        let turn = rmk_cache::RecentTurn {
            query: event.user_query.clone(),
            response_summary: event.ai_response.clone(),
        };
        if let Err(err) = self.recent_context.record(event.namespace.as_str(), &turn).await {
            warn!(%err, "failed to record recent context, continuing");
        }

        Ok((extraction_ms, dgraph_write_ms))
    }

    /// Steps 3-4: create the Fact node, then upsert its embedding under the
    /// same UID (the unified-ID invariant). If graph insert fails, falls
    /// back to a synthetic UID so the vector write still lands.
    async fn write_fact_and_vector(&self, event: &TranscriptEvent, embedding: Vec<f32>) {
        let mut node = Node::new(
            NodeType::Fact,
            event.namespace.clone(),
            format!("Chat: {}", event.query_prefix(50)),
        );
        node.description = event.user_query.clone();
        node.activation = 0.8;
        node.confidence = 0.9;
        node.tags.insert("chat".to_string());
        node.tags.insert("memory".to_string());
        node.source_conversation_id = Some(event.conversation_id.clone());

        let uid = match self.graph.create_nodes(vec![node]).await {
            Ok(created) => created.values().next().cloned(),
            Err(err) => {
                warn!(%err, "hot-path graph insert failed, vector upsert will use a synthetic uid");
                None
            }
        };
        let uid = uid.unwrap_or_else(|| format!("synthetic-{}", Uuid::new_v4()));

        let payload: HashMap<String, serde_json::Value> = HashMap::from([
            ("text".to_string(), json!(event.user_query)),
            ("ai_response".to_string(), json!(event.ai_response)),
            ("conversation_id".to_string(), json!(event.conversation_id)),
            ("type".to_string(), json!("chat")),
            ("timestamp".to_string(), json!(event.timestamp.to_rfc3339())),
        ]);
        if let Err(err) = self
            .vector
            .store(event.namespace.as_str(), &uid, embedding, payload)
            .await
        {
            warn!(%err, "hot-path vector upsert failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rmk_cache::InMemoryKvStore;
    use rmk_core::Namespace;
    use rmk_graph::memory_store::InMemoryGraphClient;
    use rmk_vector::memory_store::InMemoryVectorIndex;
    use rmk_wisdom::{local_extractor_summary, Summarizer, Summary};
    use std::time::Duration;

    struct StubEmbedder;
    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> RmkResult<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    struct FailingEmbedder;
    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> RmkResult<Vec<f32>> {
            Err(RmkError::DownstreamSoft("embedder down".to_string()))
        }
    }

    struct StubSummarizer;
    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, events: &[TranscriptEvent]) -> Option<Summary> {
            Some(local_extractor_summary(events))
        }
    }

    fn make_pipeline(embedder: Arc<dyn Embedder>) -> (IngestionPipeline, Arc<InMemoryGraphClient>, Arc<InMemoryVectorIndex>) {
        let graph = Arc::new(InMemoryGraphClient::new());
        let vector = Arc::new(InMemoryVectorIndex::new("rmk_nodes"));
        let wisdom = WisdomManager::new(
            100,
            Duration::from_secs(3600),
            graph.clone() as Arc<dyn GraphClient>,
            vector.clone() as Arc<dyn VectorIndex>,
            Arc::new(StubSummarizer),
            embedder.clone(),
        );
        let kv = Arc::new(InMemoryKvStore::new());
        let pipeline = IngestionPipeline::new(
            graph.clone() as Arc<dyn GraphClient>,
            vector.clone() as Arc<dyn VectorIndex>,
            embedder,
            wisdom,
            kv,
        );
        (pipeline, graph, vector)
    }

    #[tokio::test]
    async fn happy_path_writes_fact_and_vector_and_updates_stats() {
        let (pipeline, graph, vector) = make_pipeline(Arc::new(StubEmbedder));
        let ns = Namespace::for_user("alice").unwrap();
        let event = TranscriptEvent::new("c1", "alice", ns.clone(), "I love gulab jamun", "Noted.");

        pipeline.ingest(event).await.unwrap();

        let nodes = graph.nodes_by_activation(&ns, 10).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "Chat: I love gulab jamun");

        let stats = vector.stats().await.unwrap();
        assert_eq!(stats.points_count, 1);

        let snap = pipeline.stats().snapshot();
        assert_eq!(snap.total_processed, 1);
        assert_eq!(snap.total_errors, 0);
    }

    #[tokio::test]
    async fn embedder_failure_still_completes_cold_and_recent_context_paths() {
        let (pipeline, graph, vector) = make_pipeline(Arc::new(FailingEmbedder));
        let ns = Namespace::for_user("bob").unwrap();
        let event = TranscriptEvent::new("c1", "bob", ns.clone(), "hello there", "hi");

        pipeline.ingest(event).await.unwrap();

        assert!(graph.nodes_by_activation(&ns, 10).await.unwrap().is_empty());
        assert_eq!(vector.stats().await.unwrap().points_count, 0);
        assert_eq!(pipeline.stats().snapshot().total_processed, 1);
    }

    #[tokio::test]
    async fn group_namespace_without_membership_is_rejected() {
        let (pipeline, _graph, _vector) = make_pipeline(Arc::new(StubEmbedder));
        let ns = Namespace::parse("group_eng").unwrap();
        let event = TranscriptEvent::new("c1", "carol", ns, "secret plans", "noted");

        let err = pipeline.ingest(event).await.unwrap_err();
        assert!(matches!(err, RmkError::PolicyDenied { .. }));
        assert_eq!(pipeline.stats().snapshot().total_errors, 1);
    }
}

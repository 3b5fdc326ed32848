//! Turns one namespace's flushed batch into graph + vector writes.

use crate::summarizer::{local_extractor_summary, Summarizer};
use rmk_core::{Namespace, Node, NodeType, RmkResult, TranscriptEvent};
use rmk_graph::{batched_upsert, GraphClient, PendingEdge};
use rmk_vector::{Embedder, VectorIndex};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// Summarizes `events` (falling back locally on summarizer failure),
/// embeds and upserts the summary, and batch-upserts the extracted
/// entities as Fact nodes linked to the namespace owner.
///
/// If embedding fails, the summary text is still persisted as a graph node
/// — only the vector write is best-effort.
pub async fn persist_namespace_batch(
    graph: &dyn GraphClient,
    vector: &dyn VectorIndex,
    summarizer: &dyn Summarizer,
    embedder: &dyn Embedder,
    namespace: &Namespace,
    events: Vec<TranscriptEvent>,
) -> RmkResult<()> {
    if events.is_empty() {
        return Ok(());
    }

    let summary = match summarizer.summarize(&events).await {
        Some(s) => s,
        None => local_extractor_summary(&events),
    };

    let summary_uid = Uuid::new_v4().to_string();
    match embedder.embed(&summary.summary_text).await {
        Ok(vec) => {
            let mut payload = HashMap::new();
            payload.insert(
                "namespace".to_string(),
                serde_json::Value::String(namespace.as_str().to_string()),
            );
            payload.insert(
                "summary_text".to_string(),
                serde_json::Value::String(summary.summary_text.clone()),
            );
            if let Err(err) = vector.store(namespace.as_str(), &summary_uid, vec, payload).await {
                warn!(%err, "summary embedding upsert failed, continuing with graph-only persistence");
            }
        }
        Err(err) => {
            warn!(%err, "summary embedding failed, persisting summary text without a vector");
        }
    }

    let mut summary_node = Node::new(NodeType::Insight, namespace.clone(), "Conversation summary");
    summary_node.description = summary.summary_text;
    summary_node.attributes.insert("summary_uid".to_string(), summary_uid);

    let mut nodes = vec![summary_node];
    let mut edges = Vec::new();
    for entity_name in &summary.entities {
        nodes.push(Node::new(NodeType::Fact, namespace.clone(), entity_name.clone()));
        edges.push(PendingEdge {
            from_name: "Conversation summary".to_string(),
            to_name: entity_name.clone(),
            edge_type: "derived_from".to_string(),
            weight: Some(1.0),
        });
    }
    batched_upsert(graph, namespace, nodes, edges).await?;
    Ok(())
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
                summary_text: "Alice likes gulab jamun".to_string(),
                entities: vec!["gulab jamun".to_string()],
            })
        }
    }

    struct StubEmbedder;
    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> RmkResult<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    struct FailingSummarizer;
    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _events: &[TranscriptEvent]) -> Option<Summary> {
            None
        }
    }

    #[tokio::test]
    async fn persists_summary_and_entities() {
        let graph = InMemoryGraphClient::new();
        let vector = InMemoryVectorIndex::new("rmk_nodes");
        let ns = Namespace::for_user("alice").unwrap();
        let event = TranscriptEvent::new("c1", "alice", ns.clone(), "I love gulab jamun", "Noted.");

        persist_namespace_batch(&graph, &vector, &StubSummarizer, &StubEmbedder, &ns, vec![event])
            .await
            .unwrap();

        let stats = vector.stats().await.unwrap();
        assert_eq!(stats.points_count, 1);
    }

    #[tokio::test]
    async fn falls_back_to_local_extractor_on_summarizer_failure() {
        let graph = InMemoryGraphClient::new();
        let vector = InMemoryVectorIndex::new("rmk_nodes");
        let ns = Namespace::for_user("bob").unwrap();
        let event = TranscriptEvent::new("c1", "bob", ns.clone(), "I live in Austin", "Cool.");

        persist_namespace_batch(&graph, &vector, &FailingSummarizer, &StubEmbedder, &ns, vec![event])
            .await
            .unwrap();

        let nodes = graph
            .nodes_by_activation(&ns, 10)
            .await
            .unwrap();
        assert!(nodes.iter().any(|n| n.name == "Chat: I live in Austin"));
    }
}

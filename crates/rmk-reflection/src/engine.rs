//! Two independent tickers: reflection, which extracts insights/patterns
//! from high-activation nodes, and decay, which ages activation down over
//! time.

use crate::insighter::{ExtractedKind, Insighter};
use rmk_core::{Namespace, Node, NodeType};
use rmk_graph::GraphClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const REFLECTION_CYCLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Minimum activation for a node to be eligible for reflection.
pub const DEFAULT_ACTIVATION_THRESHOLD: f64 = 0.6;

pub struct ReflectionConfig {
    pub reflection_interval: Duration,
    pub decay_interval: Duration,
    pub decay_rate: f64,
    pub activation_threshold: f64,
    pub min_batch: usize,
    pub max_batch: usize,
}

pub struct ReflectionEngine {
    graph: Arc<dyn GraphClient>,
    insighter: Arc<dyn Insighter>,
    config: ReflectionConfig,
}

impl ReflectionEngine {
    #[must_use]
    pub fn new(graph: Arc<dyn GraphClient>, insighter: Arc<dyn Insighter>, config: ReflectionConfig) -> Arc<Self> {
        Arc::new(Self { graph, insighter, config })
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> (JoinHandle<()>, JoinHandle<()>) {
        let reflection = {
            let this = Arc::clone(&self);
            let cancel = cancel.clone();
            tokio::spawn(async move { this.run_reflection_loop(cancel).await })
        };
        let decay = {
            let this = Arc::clone(&self);
            tokio::spawn(async move { this.run_decay_loop(cancel).await })
        };
        (reflection, decay)
    }

    async fn run_reflection_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.reflection_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match tokio::time::timeout(REFLECTION_CYCLE_TIMEOUT, self.run_reflection_cycle()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => error!(%err, "reflection cycle failed"),
                        Err(_) => warn!("reflection cycle timed out after 5 minutes, cancelling in-flight work"),
                    }
                }
                () = cancel.cancelled() => {
                    info!("reflection loop shutting down");
                    break;
                }
            }
        }
    }

    async fn run_decay_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.decay_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.run_decay_cycle().await {
                        error!(%err, "decay cycle failed");
                    }
                }
                () = cancel.cancelled() => {
                    info!("decay loop shutting down");
                    break;
                }
            }
        }
    }

    async fn run_reflection_cycle(&self) -> rmk_core::RmkResult<()> {
        for namespace in self.graph.list_namespaces().await? {
            if let Err(err) = self.reflect_namespace(&namespace).await {
                error!(%namespace, %err, "reflection failed for namespace, continuing with others");
            }
        }
        Ok(())
    }

    async fn reflect_namespace(&self, namespace: &Namespace) -> rmk_core::RmkResult<()> {
        let candidates: Vec<Node> = self
            .graph
            .nodes_by_activation(namespace, self.config.max_batch)
            .await?
            .into_iter()
            .filter(|n| n.activation >= self.config.activation_threshold)
            .collect();

        if candidates.len() < self.config.min_batch {
            return Ok(());
        }

        let extracted = self.insighter.extract(&candidates).await;
        if extracted.is_empty() {
            return Ok(());
        }

        let nodes: Vec<Node> = extracted
            .into_iter()
            .map(|item| {
                let node_type = match item.kind {
                    ExtractedKind::Insight => NodeType::Insight,
                    ExtractedKind::Pattern => NodeType::Pattern,
                };
                let mut node = Node::new(node_type, namespace.clone(), item.name);
                node.description = item.description;
                node
            })
            .collect();
        self.graph.create_nodes(nodes).await?;
        Ok(())
    }

    async fn run_decay_cycle(&self) -> rmk_core::RmkResult<()> {
        for namespace in self.graph.list_namespaces().await? {
            match self.graph.apply_decay(&namespace, self.config.decay_rate).await {
                Ok(updated) => {
                    if updated > 0 {
                        info!(%namespace, updated, "applied decay");
                    }
                }
                Err(err) => error!(%namespace, %err, "decay failed for namespace, continuing with others"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rmk_core::NodeType as NT;
    use rmk_graph::memory_store::InMemoryGraphClient;

    struct StubInsighter;
    #[async_trait]
    impl Insighter for StubInsighter {
        async fn extract(&self, nodes: &[Node]) -> Vec<crate::insighter::ExtractedInsight> {
            nodes
                .iter()
                .map(|n| crate::insighter::ExtractedInsight {
                    kind: ExtractedKind::Insight,
                    name: format!("Insight about {}", n.name),
                    description: n.description.clone(),
                })
                .collect()
        }
    }

    fn config() -> ReflectionConfig {
        ReflectionConfig {
            reflection_interval: Duration::from_secs(300),
            decay_interval: Duration::from_secs(3600),
            decay_rate: 0.05,
            activation_threshold: 0.6,
            min_batch: 1,
            max_batch: 200,
        }
    }

    #[tokio::test]
    async fn reflects_high_activation_nodes_into_insights() {
        let graph = Arc::new(InMemoryGraphClient::new());
        let ns = Namespace::for_user("alice").unwrap();
        let mut fact = Node::new(NT::Fact, ns.clone(), "Likes gulab jamun");
        fact.activation = 0.9;
        graph.insert_node_for_test(fact);

        let engine = ReflectionEngine::new(graph.clone(), Arc::new(StubInsighter), config());
        engine.reflect_namespace(&ns).await.unwrap();

        let nodes = graph.nodes_by_activation(&ns, 10).await.unwrap();
        assert!(nodes.iter().any(|n| n.name.starts_with("Insight about")));
    }

    #[tokio::test]
    async fn skips_reflection_below_min_batch() {
        let graph = Arc::new(InMemoryGraphClient::new());
        let ns = Namespace::for_user("bob").unwrap();
        let mut cfg = config();
        cfg.min_batch = 5;
        let engine = ReflectionEngine::new(graph.clone(), Arc::new(StubInsighter), cfg);

        let mut fact = Node::new(NT::Fact, ns.clone(), "one fact");
        fact.activation = 0.9;
        graph.insert_node_for_test(fact);

        engine.reflect_namespace(&ns).await.unwrap();
        let nodes = graph.nodes_by_activation(&ns, 10).await.unwrap();
        assert_eq!(nodes.len(), 1, "no insight should have been created");
    }

    #[tokio::test]
    async fn decay_cycle_runs_across_all_namespaces() {
        let graph = Arc::new(InMemoryGraphClient::new());
        let ns_a = Namespace::for_user("alice").unwrap();
        let ns_b = Namespace::for_user("bob").unwrap();
        for ns in [&ns_a, &ns_b] {
            let mut fact = Node::new(NT::Fact, ns.clone(), "f");
            fact.activation = 1.0;
            fact.last_accessed = chrono::Utc::now() - chrono::Duration::hours(3);
            graph.insert_node_for_test(fact);
        }

        let engine = ReflectionEngine::new(graph.clone(), Arc::new(StubInsighter), config());
        engine.run_decay_cycle().await.unwrap();

        for ns in [&ns_a, &ns_b] {
            let nodes = graph.nodes_by_activation(ns, 10).await.unwrap();
            assert!(nodes[0].activation < 1.0);
        }
    }
}

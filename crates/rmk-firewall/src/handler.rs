//! Pre-cortex firewall entry point: short-circuits a request before it ever
//! reaches the Consultation Handler or an external LLM.

use crate::intent::{Intent, IntentClassifier, RuleClassifier};
use crate::reflex::{match_query, run_reflex_query};
use crate::semantic_cache::SemanticCache;
use rmk_core::{Namespace, RmkResult};
use rmk_graph::GraphClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct FirewallResponse {
    pub text: String,
    pub action: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FirewallOutcome {
    Handled(FirewallResponse),
    NotHandled,
}

const GREETING_REPLY: &str = "Hi! How can I help you today?";

pub struct PreCortexFirewall {
    cache: SemanticCache,
    classifier: Arc<dyn IntentClassifier>,
    graph: Arc<dyn GraphClient>,
    enable_semantic_cache: bool,
    enable_dgraph_reflex: bool,
    reflex_responses: AtomicU64,
}

impl PreCortexFirewall {
    #[must_use]
    pub fn new(
        cache: SemanticCache,
        classifier: Arc<dyn IntentClassifier>,
        graph: Arc<dyn GraphClient>,
        enable_semantic_cache: bool,
        enable_dgraph_reflex: bool,
    ) -> Self {
        Self {
            cache,
            classifier,
            graph,
            enable_semantic_cache,
            enable_dgraph_reflex,
            reflex_responses: AtomicU64::new(0),
        }
    }

    /// Rule classifier only, ignoring any configured external classifier —
    /// used by callers that want a zero-RPC firewall (e.g. local dev mode).
    #[must_use]
    pub fn with_rule_classifier(
        cache: SemanticCache,
        graph: Arc<dyn GraphClient>,
        enable_semantic_cache: bool,
        enable_dgraph_reflex: bool,
    ) -> Self {
        Self::new(cache, Arc::new(RuleClassifier), graph, enable_semantic_cache, enable_dgraph_reflex)
    }

    #[must_use]
    pub fn reflex_response_count(&self) -> u64 {
        self.reflex_responses.load(Ordering::Relaxed)
    }

    pub async fn handle(&self, user_id: &str, namespace: &Namespace, query: &str) -> RmkResult<FirewallOutcome> {
        if self.enable_semantic_cache {
            if let Some(cached) = self.cache.probe(namespace.as_str(), user_id, query).await? {
                return Ok(FirewallOutcome::Handled(FirewallResponse { text: cached, action: None }));
            }
        }

        let intent = self.classifier.classify(query).await?;
        let outcome = match intent {
            Intent::Greeting => Some(FirewallResponse { text: GREETING_REPLY.to_string(), action: None }),
            Intent::Navigation => RuleClassifier::navigation_target(query).map(|target| FirewallResponse {
                text: format!("Navigating to {target}."),
                action: Some(serde_json::json!({ "action": "navigate", "target": target })),
            }),
            Intent::FactRetrieval => self.try_reflex(namespace, user_id, query).await?,
            Intent::Complex => None,
        };

        let Some(response) = outcome else {
            return Ok(FirewallOutcome::NotHandled);
        };

        if self.enable_semantic_cache {
            self.cache.store(namespace.as_str(), user_id, query, &response.text).await?;
        }
        Ok(FirewallOutcome::Handled(response))
    }

    async fn try_reflex(&self, namespace: &Namespace, user_id: &str, query: &str) -> RmkResult<Option<FirewallResponse>> {
        if !self.enable_dgraph_reflex {
            return Ok(None);
        }
        let Some(query_type) = match_query(query) else {
            return Ok(None);
        };
        let filled = run_reflex_query(self.graph.as_ref(), namespace, user_id, query_type).await?;
        if filled.is_some() {
            self.reflex_responses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(filled.map(|text| FirewallResponse { text, action: None }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_cache::InMemoryKvStore;
    use rmk_core::{Node, NodeType};
    use rmk_graph::memory_store::InMemoryGraphClient;

    fn firewall(graph: Arc<InMemoryGraphClient>) -> PreCortexFirewall {
        let cache = SemanticCache::new(Arc::new(InMemoryKvStore::new()), None, None, 0.92);
        PreCortexFirewall::with_rule_classifier(cache, graph as Arc<dyn GraphClient>, true, true)
    }

    #[tokio::test]
    async fn greeting_is_handled_with_static_reply() {
        let fw = firewall(Arc::new(InMemoryGraphClient::new()));
        let ns = Namespace::for_user("alice").unwrap();
        let outcome = fw.handle("alice", &ns, "hello").await.unwrap();
        assert_eq!(outcome, FirewallOutcome::Handled(FirewallResponse { text: GREETING_REPLY.to_string(), action: None }));
    }

    #[tokio::test]
    async fn navigation_emits_structured_action() {
        let fw = firewall(Arc::new(InMemoryGraphClient::new()));
        let ns = Namespace::for_user("alice").unwrap();
        let outcome = fw.handle("alice", &ns, "take me to settings").await.unwrap();
        match outcome {
            FirewallOutcome::Handled(resp) => {
                assert_eq!(resp.action, Some(serde_json::json!({ "action": "navigate", "target": "settings" })));
            }
            FirewallOutcome::NotHandled => panic!("expected a handled navigation outcome"),
        }
    }

    #[tokio::test]
    async fn fact_retrieval_with_no_reflex_match_falls_through_to_not_handled() {
        let fw = firewall(Arc::new(InMemoryGraphClient::new()));
        let ns = Namespace::for_user("alice").unwrap();
        let outcome = fw.handle("alice", &ns, "what is my email").await.unwrap();
        let graph = InMemoryGraphClient::new();
        let mut user = Node::new(NodeType::User, ns.clone(), "alice");
        user.attributes.insert("email".to_string(), "alice@example.com".to_string());
        graph.insert_node_for_test(user);
        let fw2 = firewall(Arc::new(graph));
        let outcome2 = fw2.handle("alice", &ns, "what is my email").await.unwrap();

        assert_eq!(outcome, FirewallOutcome::NotHandled);
        assert_eq!(
            outcome2,
            FirewallOutcome::Handled(FirewallResponse { text: "Your email is alice@example.com.".to_string(), action: None })
        );
        assert_eq!(fw2.reflex_response_count(), 1);
    }

    #[tokio::test]
    async fn complex_query_is_not_handled() {
        let fw = firewall(Arc::new(InMemoryGraphClient::new()));
        let ns = Namespace::for_user("alice").unwrap();
        let outcome = fw.handle("alice", &ns, "write me a haiku about rust").await.unwrap();
        assert_eq!(outcome, FirewallOutcome::NotHandled);
    }
}

//! The policy engine: a read-mostly per-namespace cache of [`PolicySet`]s,
//! reloaded by atomic pointer swap.

use crate::loader::{fail_safe_on_load_error, load_policy_set};
use crate::model::{Effect, PolicySet, Resource, UserContext};
use dashmap::DashMap;
use parking_lot::RwLock;
use rmk_core::Namespace;
use rmk_graph::GraphClient;
use std::sync::Arc;

// Re-export so downstream crates depend on rmk_policy::Action rather than
// reaching into the model module directly.
pub use crate::model::Action;

pub struct PolicyEngine {
    graph: Arc<dyn GraphClient>,
    cache: DashMap<String, Arc<RwLock<Arc<PolicySet>>>>,
}

impl PolicyEngine {
    #[must_use]
    pub fn new(graph: Arc<dyn GraphClient>) -> Self {
        Self {
            graph,
            cache: DashMap::new(),
        }
    }

    /// Loads (or reuses the cached) policy set for `namespace` and returns
    /// the Allow/Deny effect for `(ctx, resource, action)`.
    pub async fn check(
        &self,
        ctx: &UserContext,
        namespace: &Namespace,
        resource: &Resource,
        action: Action,
    ) -> Effect {
        let set = self.policy_set(namespace).await;
        set.evaluate(ctx, resource, action)
    }

    async fn policy_set(&self, namespace: &Namespace) -> Arc<PolicySet> {
        if let Some(slot) = self.cache.get(namespace.as_str()) {
            return Arc::clone(&slot.read());
        }
        self.reload(namespace).await
    }

    /// Forces a reload for `namespace`, swapping the cached pointer
    /// atomically so concurrent readers never observe a half-updated set.
    pub async fn reload(&self, namespace: &Namespace) -> Arc<PolicySet> {
        let loaded = load_policy_set(&self.graph, namespace)
            .await
            .unwrap_or_else(fail_safe_on_load_error);
        let set = Arc::new(loaded);

        let slot = self
            .cache
            .entry(namespace.as_str().to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Arc::new(PolicySet::default()))));
        *slot.write() = Arc::clone(&set);
        set
    }
}

//! Generic interface for the tenant-scoped knowledge graph.
//!
//! One generic contract, multiple backends: a Dgraph HTTP client for
//! production, an in-memory client for tests and local development.

use async_trait::async_trait;
use rmk_core::{Edge, Namespace, Node, RmkResult};
use std::collections::HashMap;

/// A predicate-expression query scoped to one namespace. `predicate` is the
/// backend's native query language (DQL for Dgraph); `vars` supplies bound
/// variables so callers never string-interpolate user input into the query.
#[derive(Debug, Clone, Default)]
pub struct GraphQuery {
    pub predicate: String,
    pub vars: HashMap<String, String>,
}

impl GraphQuery {
    #[must_use]
    pub fn new(predicate: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            vars: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

/// Request for a spreading-activation traversal.
#[derive(Debug, Clone)]
pub struct SpreadActivationRequest {
    pub start_uid: String,
    pub namespace: Namespace,
    pub decay_factor: f64,
    pub max_hops: u32,
    pub min_activation: f64,
    pub max_results: usize,
}

impl SpreadActivationRequest {
    #[must_use]
    pub fn new(start_uid: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            start_uid: start_uid.into(),
            namespace,
            decay_factor: 0.6,
            max_hops: 2,
            min_activation: 0.2,
            max_results: 10,
        }
    }
}

/// A node reached by spreading activation, carrying the activation computed
/// for this traversal (not persisted back to the node).
#[derive(Debug, Clone)]
pub struct ActivatedNode {
    pub node: Node,
    pub activation: f64,
}

/// Typed CRUD + namespace-scoped queries over the graph store (C1).
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Creates nodes that don't already exist, returning `{name -> uid}` for
    /// every node passed in (existing nodes are resolved by the caller via
    /// `get_nodes_by_names` first; this always inserts).
    async fn create_nodes(&self, nodes: Vec<Node>) -> RmkResult<HashMap<String, String>>;

    /// Inserts edges between already-resolved UIDs in one mutation.
    async fn create_edges(&self, edges: Vec<Edge>) -> RmkResult<()>;

    /// Resolves a batch of names to nodes within a namespace, in one query.
    async fn get_nodes_by_names(
        &self,
        namespace: &Namespace,
        names: &[String],
    ) -> RmkResult<HashMap<String, Node>>;

    async fn get_nodes_by_uids(&self, uids: &[String]) -> RmkResult<Vec<Node>>;

    async fn get_node(&self, uid: &str) -> RmkResult<Option<Node>>;

    async fn query(&self, namespace: &Namespace, query: &GraphQuery) -> RmkResult<Vec<Node>>;

    /// Bumps `activation` by `cfg.access_boost`, clamped to 1.0, and updates
    /// `last_accessed`.
    async fn increment_access_count(&self, uid: &str, access_boost: f64) -> RmkResult<()>;

    /// Applies `activation <- activation * (1 - rate)^hours_elapsed` to every
    /// node in `namespace` whose `last_accessed` is older than one tick.
    /// Returns the number of nodes updated.
    async fn apply_decay(&self, namespace: &Namespace, rate: f64) -> RmkResult<usize>;

    /// Breadth-first spreading activation from `req.start_uid`. Does not
    /// mutate graph state.
    async fn spread_activation(
        &self,
        req: &SpreadActivationRequest,
    ) -> RmkResult<Vec<ActivatedNode>>;

    /// Persists a Wisdom batch: the summary as a Fact/Insight-bearing node
    /// plus its entities, via the 3-phase batched upsert. Returns the
    /// summary node's UID.
    async fn ingest_wisdom_batch(
        &self,
        namespace: &Namespace,
        summary: &str,
        entities: Vec<Node>,
    ) -> RmkResult<String>;

    /// Outgoing edges from `uid`, used by the generic spreading-activation
    /// walk in [`crate::activation`].
    async fn get_outgoing_edges(&self, uid: &str) -> RmkResult<Vec<Edge>>;

    /// Membership check for `group_*` namespaces (permission gate).
    async fn is_member(&self, namespace: &Namespace, user_id: &str) -> RmkResult<bool>;

    /// Top nodes in `namespace` ordered by descending activation.
    async fn nodes_by_activation(&self, namespace: &Namespace, limit: usize) -> RmkResult<Vec<Node>>;

    /// Top nodes in `namespace` ordered by descending `created_at`.
    async fn nodes_by_recency(&self, namespace: &Namespace, limit: usize) -> RmkResult<Vec<Node>>;

    /// Every distinct namespace currently present in the graph, used by the
    /// reflection and decay tickers to discover which tenants need a pass
    /// this cycle.
    async fn list_namespaces(&self) -> RmkResult<Vec<Namespace>>;
}

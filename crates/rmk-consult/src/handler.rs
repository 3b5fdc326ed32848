//! Wires the pipeline stages into `Consult` and `Speculate` (C8).

use crate::format::format_brief;
use crate::merge::merge_and_filter;
use crate::policy_filter::filter_denied;
use crate::rank::rank_and_truncate;
use crate::request::{ConsultRequest, ConsultResponse};
use crate::retrieval::hybrid_retrieve;
use crate::speculate::speculate;
use rmk_cache::Speculation;
use rmk_core::{Namespace, RmkError, RmkResult};
use rmk_graph::GraphClient;
use rmk_policy::{PolicyEngine, UserContext};
use rmk_vector::{Embedder, VectorIndex};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Background activation-boost work must never prolong a request or bubble
/// errors back.
const ACCESS_BOOST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ConsultationHandler {
    graph: Arc<dyn GraphClient>,
    vector: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    policy: Arc<PolicyEngine>,
    speculation: Speculation,
    access_boost: f64,
    speculation_hits: std::sync::atomic::AtomicU64,
}

impl ConsultationHandler {
    #[must_use]
    pub fn new(
        graph: Arc<dyn GraphClient>,
        vector: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        policy: Arc<PolicyEngine>,
        kv: Arc<dyn rmk_cache::KvStore>,
        access_boost: f64,
    ) -> Self {
        Self {
            graph,
            vector,
            embedder,
            policy,
            speculation: Speculation::new(kv),
            access_boost,
            speculation_hits: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Count of times a speculation slot's facts were used as the seed set
    /// for a subsequent `Consult`.
    #[must_use]
    pub fn speculation_hit_count(&self) -> u64 {
        self.speculation_hits.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub async fn speculate(&self, user_id: &str, namespace: &Namespace, query: &str) -> RmkResult<()> {
        speculate(self.graph.as_ref(), &self.speculation, user_id, namespace, query).await
    }

    pub async fn consult(&self, req: &ConsultRequest) -> RmkResult<ConsultResponse> {
        let namespace = req.resolved_namespace()?;

        // 1. Permission gate.
        if namespace.is_group() {
            let is_member = self.graph.is_member(&namespace, &req.user_id).await?;
            if !is_member {
                return Err(RmkError::PolicyDenied { action: "Read".to_string() });
            }
        }

        // 2. Speculation probe.
        let speculated = self.speculation.probe(&req.user_id, &req.query).await?;
        let (merged, used_speculation) = if let Some(facts) = speculated {
            self.speculation_hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let nodes = self.graph.nodes_by_recency(&namespace, 50).await?;
            let seeded = nodes
                .into_iter()
                .filter(|n| facts.iter().any(|f| f.contains(&n.description) || n.description.contains(f.as_str())))
                .collect();
            (seeded, true)
        } else {
            // 3. Hybrid retrieval.
            let candidates =
                hybrid_retrieve(self.graph.as_ref(), self.vector.as_ref(), self.embedder.as_ref(), &namespace, &req.user_id, &req.query)
                    .await?;
            // 4. Merge & filter.
            (merge_and_filter(candidates), false)
        };

        // 5. Policy filter.
        let ctx = build_user_context(self.graph.as_ref(), &req.user_id, &namespace).await;
        let allowed = filter_denied(&self.policy, &ctx, merged).await;

        // 6. Rank.
        let ranked = rank_and_truncate(allowed, req.effective_max_results());

        // 7. Format brief.
        let (brief, confidence) = format_brief(&ranked);

        self.spawn_access_boost(&ranked);

        Ok(ConsultResponse {
            relevant_facts: ranked,
            confidence,
            brief,
            used_speculation,
        })
    }

    /// Fire-and-forget activation boost: best-effort, bounded by a timeout,
    /// never awaited by the caller.
    fn spawn_access_boost(&self, nodes: &[rmk_core::Node]) {
        let uids: HashSet<String> = nodes.iter().filter_map(|n| n.uid.clone()).collect();
        if uids.is_empty() {
            return;
        }
        let graph = Arc::clone(&self.graph);
        let boost = self.access_boost;
        tokio::spawn(async move {
            let work = async {
                for uid in uids {
                    if let Err(err) = graph.increment_access_count(&uid, boost).await {
                        warn!(%err, %uid, "post-consult activation boost failed");
                    }
                }
            };
            if tokio::time::timeout(ACCESS_BOOST_TIMEOUT, work).await.is_err() {
                warn!("post-consult activation boost timed out after 10s");
            }
        });
    }
}

/// Fail-safe context construction: on any lookup failure, downgrade to
/// minimal visibility rather than propagating the error.
async fn build_user_context(graph: &dyn GraphClient, user_id: &str, namespace: &Namespace) -> UserContext {
    match try_build_user_context(graph, user_id, namespace).await {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%err, %user_id, "user context construction failed, falling back to fail-safe context");
            UserContext::fail_safe(user_id)
        }
    }
}

async fn try_build_user_context(
    graph: &dyn GraphClient,
    user_id: &str,
    namespace: &Namespace,
) -> RmkResult<UserContext> {
    let user_namespace = Namespace::for_user(user_id)?;
    let users = graph
        .get_nodes_by_names(&user_namespace, &[user_id.to_string()])
        .await?;
    let clearance = users.get(user_id).and_then(|n| n.clearance).unwrap_or(0);

    let mut groups = HashSet::new();
    if namespace.is_group() && graph.is_member(namespace, user_id).await? {
        groups.insert(namespace.as_str().to_string());
    }
    Ok(UserContext::new(user_id, groups, clearance))
}

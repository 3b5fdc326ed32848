//! Loads policies for a namespace from the graph. Policy definitions are
//! stored as `Pattern` nodes tagged `policy`, with the serialized
//! [`Policy`](crate::model::Policy) in the `policy_json` attribute — the
//! graph has no first-class policy row type, so this reuses the existing
//! attribute bag rather than adding one.

use crate::model::PolicySet;
use rmk_core::{Namespace, RmkError, RmkResult};
use rmk_graph::{GraphClient, GraphQuery};
use std::sync::Arc;
use tracing::warn;

pub async fn load_policy_set(
    graph: &Arc<dyn GraphClient>,
    namespace: &Namespace,
) -> RmkResult<PolicySet> {
    let query = GraphQuery::new("tag == \"policy\"");
    let nodes = graph.query(namespace, &query).await?;

    let mut policies = Vec::with_capacity(nodes.len());
    for node in nodes {
        let Some(raw) = node.attributes.get("policy_json") else {
            warn!(uid = ?node.uid, "policy node missing policy_json attribute, skipping");
            continue;
        };
        match serde_json::from_str(raw) {
            Ok(policy) => policies.push(policy),
            Err(err) => {
                warn!(uid = ?node.uid, %err, "failed to parse policy_json, skipping");
            }
        }
    }
    Ok(PolicySet { policies })
}

/// Converts an I/O error loading policies into the fail-safe case: the
/// caller downgrades to an empty policy set (which denies everything)
/// rather than propagating the error and leaving access undetermined.
pub fn fail_safe_on_load_error(err: RmkError) -> PolicySet {
    warn!(%err, "policy load failed, falling back to empty (deny-all) policy set");
    PolicySet::default()
}

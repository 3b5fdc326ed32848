//! Policy filter: drops any node the policy engine denies Read on.

use rmk_core::Node;
use rmk_policy::{Action, Effect, PolicyEngine, Resource, UserContext};

pub async fn filter_denied(engine: &PolicyEngine, ctx: &UserContext, nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let Some(uid) = node.uid.clone() else { continue };
        let resource = Resource {
            uid,
            namespace: node.namespace.as_str().to_string(),
            clearance: node.clearance.unwrap_or(0),
        };
        let namespace = node.namespace.clone();
        let effect = engine.check(ctx, &namespace, &resource, Action::Read).await;
        if effect == Effect::Allow {
            out.push(node);
        }
    }
    out
}

//! Generic spreading-activation walk, implemented once against the
//! [`GraphClient`] primitives so every backend gets the same traversal
//! semantics for free, built as a default-style helper atop the trait's
//! lower-level edge lookups rather than duplicated per backend.

use crate::client::{ActivatedNode, GraphClient, SpreadActivationRequest};
use rmk_core::RmkResult;
use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};

/// Breadth-first from `req.start_uid`; child activation = parent activation
/// x edge weight x `decay_factor`. Nodes below `min_activation` are pruned;
/// traversal stops at `max_hops` or once `max_results` candidates have been
/// collected from a hop level. Ties break by edge weight then by
/// `last_accessed` (newer first). Never mutates graph state.
pub async fn spread_activation(
    client: &dyn GraphClient,
    req: &SpreadActivationRequest,
) -> RmkResult<Vec<ActivatedNode>> {
    let Some(start_node) = client.get_node(&req.start_uid).await? else {
        return Ok(Vec::new());
    };

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(req.start_uid.clone());

    let mut frontier: VecDeque<(String, f64, u32)> = VecDeque::new();
    frontier.push_back((req.start_uid.clone(), start_node.activation, 0));

    // (result, edge weight used to reach it) -- edge weight feeds the tie-break.
    let mut results: Vec<(ActivatedNode, f64)> = Vec::new();

    while let Some((uid, parent_activation, hop)) = frontier.pop_front() {
        if hop >= req.max_hops {
            continue;
        }
        let mut edges = client.get_outgoing_edges(&uid).await?;
        edges.sort_by(|a, b| {
            b.weight_or_default()
                .partial_cmp(&a.weight_or_default())
                .unwrap_or(Ordering::Equal)
        });

        for edge in edges {
            if visited.contains(&edge.to) {
                continue;
            }
            let weight = edge.weight_or_default();
            let child_activation = parent_activation * weight * req.decay_factor;
            if child_activation < req.min_activation {
                continue;
            }
            let Some(child_node) = client.get_node(&edge.to).await? else {
                continue;
            };
            if child_node.namespace != req.namespace {
                continue;
            }
            visited.insert(edge.to.clone());
            results.push((
                ActivatedNode {
                    node: child_node,
                    activation: child_activation,
                },
                weight,
            ));
            frontier.push_back((edge.to.clone(), child_activation, hop + 1));
        }
    }

    results.sort_by(|a, b| {
        b.0.activation
            .partial_cmp(&a.0.activation)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
            .then_with(|| b.0.node.last_accessed.cmp(&a.0.node.last_accessed))
    });
    results.truncate(req.max_results);

    Ok(results.into_iter().map(|(n, _)| n).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryGraphClient;
    use rmk_core::{Edge, Namespace, Node, NodeType};

    #[tokio::test]
    async fn weighted_traversal_returns_facet_weights_within_tolerance() {
        let store = InMemoryGraphClient::new();
        let ns = Namespace::for_user("alice").unwrap();

        let user = Node::new(NodeType::User, ns.clone(), "user");
        let alice = Node::new(NodeType::Entity, ns.clone(), "Alice");
        let bob = Node::new(NodeType::Entity, ns.clone(), "Bob");

        let user_uid = store.insert_node_for_test(user);
        let alice_uid = store.insert_node_for_test(alice);
        let bob_uid = store.insert_node_for_test(bob);

        store.insert_edge_for_test(
            Edge::new(alice_uid.clone(), user_uid.clone(), "family_member").with_weight(0.95),
        );
        store.insert_edge_for_test(
            Edge::new(bob_uid.clone(), user_uid.clone(), "has_manager").with_weight(0.80),
        );

        let req = SpreadActivationRequest::new(alice_uid.clone(), ns.clone());
        let results = spread_activation(&store, &req).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node.uid.as_deref(), Some(user_uid.as_str()));

        let edges = store.get_outgoing_edges(&alice_uid).await.unwrap();
        assert!((edges[0].weight_or_default() - 0.95).abs() <= 0.01);

        let req2 = SpreadActivationRequest::new(bob_uid.clone(), ns);
        let results2 = spread_activation(&store, &req2).await.unwrap();
        let edges2 = store.get_outgoing_edges(&bob_uid).await.unwrap();
        assert!((edges2[0].weight_or_default() - 0.80).abs() <= 0.01);
        assert_eq!(results2.len(), 1);
    }

    #[tokio::test]
    async fn prunes_below_min_activation_and_respects_max_hops() {
        let store = InMemoryGraphClient::new();
        let ns = Namespace::for_user("alice").unwrap();

        let a = store.insert_node_for_test(Node::new(NodeType::Fact, ns.clone(), "a"));
        let b = store.insert_node_for_test(Node::new(NodeType::Fact, ns.clone(), "b"));
        let c = store.insert_node_for_test(Node::new(NodeType::Fact, ns.clone(), "c"));

        store.insert_edge_for_test(Edge::new(a.clone(), b.clone(), "knows").with_weight(0.9));
        store.insert_edge_for_test(Edge::new(b.clone(), c.clone(), "knows").with_weight(0.05));

        let mut req = SpreadActivationRequest::new(a, ns);
        req.min_activation = 0.2;
        req.max_hops = 2;
        let results = spread_activation(&store, &req).await.unwrap();
        // b is reachable (0.8 activation * 0.9 * 0.6 = 0.432 >= 0.2); c's edge
        // weight (0.05) drops its activation far below the floor.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node.uid.as_deref(), Some(b.as_str()));
    }
}

//! Three-phase batched upsert: resolve names, create missing nodes in one
//! mutation, create edges between resolved UIDs in one mutation. Phase 2 is
//! skipped when every name already resolves.

use crate::client::GraphClient;
use rmk_core::{Edge, Namespace, Node, RmkResult};
use std::collections::HashMap;

/// An edge to create once both endpoint names have resolved to UIDs.
pub struct PendingEdge {
    pub from_name: String,
    pub to_name: String,
    pub edge_type: String,
    pub weight: Option<f64>,
}

/// Runs the 3-phase upsert and returns the final `{name -> uid}` map,
/// including names that already existed before this call.
pub async fn batched_upsert(
    client: &dyn GraphClient,
    namespace: &Namespace,
    nodes: Vec<Node>,
    edges: Vec<PendingEdge>,
) -> RmkResult<HashMap<String, String>> {
    let names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();

    // Phase 1: resolve all referenced names in one read.
    let existing = client.get_nodes_by_names(namespace, &names).await?;
    let mut resolved: HashMap<String, String> = existing
        .into_iter()
        .filter_map(|(name, node)| node.uid.map(|uid| (name, uid)))
        .collect();

    // Phase 2: create whatever didn't resolve, in one mutation. Skipped
    // entirely when every name already resolved.
    let missing: Vec<Node> = nodes
        .into_iter()
        .filter(|n| !resolved.contains_key(&n.name))
        .collect();
    if !missing.is_empty() {
        let created = client.create_nodes(missing).await?;
        resolved.extend(created);
    }

    // Phase 3: create edges between resolved UIDs in one mutation.
    let mut to_create = Vec::new();
    for pending in edges {
        if let (Some(from_uid), Some(to_uid)) =
            (resolved.get(&pending.from_name), resolved.get(&pending.to_name))
        {
            let mut edge = Edge::new(from_uid.clone(), to_uid.clone(), pending.edge_type);
            if let Some(w) = pending.weight {
                edge = edge.with_weight(w);
            }
            to_create.push(edge);
        } else {
            tracing::warn!(
                from = %pending.from_name,
                to = %pending.to_name,
                "skipping edge: endpoint name did not resolve to a uid"
            );
        }
    }
    if !to_create.is_empty() {
        client.create_edges(to_create).await?;
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryGraphClient;
    use rmk_core::NodeType;

    #[tokio::test]
    async fn skips_create_mutation_when_all_names_resolve() {
        let store = InMemoryGraphClient::new();
        let ns = Namespace::for_user("alice").unwrap();
        let existing = Node::new(NodeType::Entity, ns.clone(), "Alice");
        store.insert_node_for_test(existing);

        let before = store.create_node_call_count();
        let resolved = batched_upsert(
            &store,
            &ns,
            vec![Node::new(NodeType::Entity, ns.clone(), "Alice")],
            vec![],
        )
        .await
        .unwrap();
        assert_eq!(store.create_node_call_count(), before);
        assert!(resolved.contains_key("Alice"));
    }

    #[tokio::test]
    async fn creates_missing_nodes_and_edges_between_them() {
        let store = InMemoryGraphClient::new();
        let ns = Namespace::for_user("alice").unwrap();

        let resolved = batched_upsert(
            &store,
            &ns,
            vec![
                Node::new(NodeType::Entity, ns.clone(), "Alice"),
                Node::new(NodeType::Entity, ns.clone(), "Bob"),
            ],
            vec![PendingEdge {
                from_name: "Alice".to_string(),
                to_name: "Bob".to_string(),
                edge_type: "knows".to_string(),
                weight: Some(0.7),
            }],
        )
        .await
        .unwrap();

        let alice_uid = resolved.get("Alice").unwrap().clone();
        let edges = store.get_outgoing_edges(&alice_uid).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, *resolved.get("Bob").unwrap());
    }
}

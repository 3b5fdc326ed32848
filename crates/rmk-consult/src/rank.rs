//! Rank by descending activation, tie-break by descending `last_accessed`,
//! truncated to `max_results`.

use rmk_core::Node;

#[must_use]
pub fn rank_and_truncate(mut nodes: Vec<Node>, max_results: usize) -> Vec<Node> {
    nodes.sort_by(|a, b| {
        b.activation
            .partial_cmp(&a.activation)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.last_accessed.cmp(&a.last_accessed))
    });
    nodes.truncate(max_results);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_core::{Namespace, NodeType};

    #[test]
    fn sorts_by_activation_then_recency() {
        let ns = Namespace::for_user("alice").unwrap();
        let mut a = Node::new(NodeType::Fact, ns.clone(), "a");
        a.activation = 0.5;
        let mut b = Node::new(NodeType::Fact, ns.clone(), "b");
        b.activation = 0.9;
        let mut c = Node::new(NodeType::Fact, ns, "c");
        c.activation = 0.9;
        c.last_accessed = b.last_accessed + chrono::Duration::seconds(5);

        let ranked = rank_and_truncate(vec![a, b, c.clone()], 10);
        assert_eq!(ranked[0].name, "c");
        assert_eq!(ranked[2].name, "a");
    }

    #[test]
    fn truncates_to_max_results() {
        let ns = Namespace::for_user("alice").unwrap();
        let nodes = (0..20)
            .map(|i| Node::new(NodeType::Fact, ns.clone(), format!("n{i}")))
            .collect();
        assert_eq!(rank_and_truncate(nodes, 10).len(), 10);
    }
}

//! Merge & filter: de-duplicate by UID with vector→spread→activation→recency
//! priority, then drop nodes that aren't useful memory results.

use crate::retrieval::Candidate;
use rmk_core::{Node, NodeType};
use std::collections::HashSet;

#[must_use]
pub fn merge_and_filter(mut candidates: Vec<Candidate>) -> Vec<Node> {
    candidates.sort_by_key(|c| c.stage);

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for candidate in candidates {
        let Some(uid) = candidate.node.uid.clone() else {
            continue;
        };
        if !seen.insert(uid) {
            continue;
        }
        if should_keep(&candidate.node) {
            out.push(candidate.node);
        }
    }
    out
}

fn should_keep(node: &Node) -> bool {
    if matches!(node.node_type, NodeType::User | NodeType::Group) {
        return false;
    }
    if node.name.is_empty() {
        return false;
    }
    if node.name_looks_like_uuid() {
        return false;
    }
    if node.name.starts_with("user_") || node.name.starts_with("Conversation_") {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::Stage;
    use rmk_core::Namespace;

    fn node(uid: &str, name: &str, node_type: NodeType) -> Node {
        let ns = Namespace::for_user("alice").unwrap();
        let mut n = Node::new(node_type, ns, name);
        n.uid = Some(uid.to_string());
        n
    }

    #[test]
    fn first_stage_wins_on_duplicate_uid() {
        let mut vector_hit = node("u1", "Gulab jamun", NodeType::Fact);
        vector_hit.description = "from vector".to_string();
        let mut recency_hit = node("u1", "Gulab jamun", NodeType::Fact);
        recency_hit.description = "from recency".to_string();

        let merged = merge_and_filter(vec![
            Candidate { node: recency_hit, stage: Stage::ByRecency },
            Candidate { node: vector_hit, stage: Stage::Vector },
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description, "from vector");
    }

    #[test]
    fn drops_user_group_and_uuid_like_names() {
        let candidates = vec![
            Candidate { node: node("u1", "alice", NodeType::User), stage: Stage::ByActivation },
            Candidate {
                node: node("u2", "550e8400-e29b-41d4-a716-446655440000", NodeType::Fact),
                stage: Stage::ByActivation,
            },
            Candidate { node: node("u3", "user_alice", NodeType::Fact), stage: Stage::ByActivation },
            Candidate { node: node("u4", "Conversation_123", NodeType::Fact), stage: Stage::ByActivation },
            Candidate { node: node("u5", "Gulab jamun", NodeType::Fact), stage: Stage::ByActivation },
        ];
        let merged = merge_and_filter(candidates);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Gulab jamun");
    }
}

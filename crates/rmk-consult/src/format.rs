//! Deterministic brief assembly. No LLM call on this path — the brief is a
//! plain concatenation of the ranked nodes' descriptions.

use rmk_core::Node;

pub const MAX_BRIEF_NODES: usize = 10;
pub const EMPTY_BRIEF: &str = "I don't have any stored information about you yet.";
pub const CONFIDENCE_WITH_FACTS: f64 = 0.9;
pub const CONFIDENCE_EMPTY: f64 = 0.3;

#[must_use]
pub fn format_brief(nodes: &[Node]) -> (String, f64) {
    if nodes.is_empty() {
        return (EMPTY_BRIEF.to_string(), CONFIDENCE_EMPTY);
    }
    let brief = nodes
        .iter()
        .take(MAX_BRIEF_NODES)
        .map(|n| {
            if n.description.is_empty() {
                n.name.clone()
            } else {
                n.description.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    (brief, CONFIDENCE_WITH_FACTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_core::{Namespace, NodeType};

    #[test]
    fn empty_nodes_produce_the_canonical_empty_brief() {
        let (brief, confidence) = format_brief(&[]);
        assert_eq!(brief, EMPTY_BRIEF);
        assert!((confidence - CONFIDENCE_EMPTY).abs() < f64::EPSILON);
    }

    #[test]
    fn non_empty_nodes_join_descriptions_with_high_confidence() {
        let ns = Namespace::for_user("alice").unwrap();
        let mut n = Node::new(NodeType::Fact, ns, "Chat: I love gulab jamun");
        n.description = "I love gulab jamun".to_string();
        let (brief, confidence) = format_brief(&[n]);
        assert!(brief.contains("gulab jamun"));
        assert!((confidence - CONFIDENCE_WITH_FACTS).abs() < f64::EPSILON);
    }
}

//! Node kinds, represented as a tagged variant with a common attribute set
//! rather than an inheritance hierarchy (see design notes, §9).

use crate::namespace::Namespace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Discriminates node kinds. Each kind has a default initial activation
/// range used when the node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    User,
    Group,
    Entity,
    Fact,
    Event,
    Insight,
    Pattern,
}

impl NodeType {
    /// Initial activation assigned at creation time, per kind.
    #[must_use]
    pub fn default_activation(self) -> f64 {
        match self {
            NodeType::User | NodeType::Group => 1.0,
            NodeType::Fact => 0.8,
            NodeType::Event => 0.7,
            NodeType::Entity => 0.6,
            NodeType::Insight | NodeType::Pattern => 0.5,
        }
    }

    /// User/Group nodes are created externally and never decayed or deleted
    /// by the kernel.
    #[must_use]
    pub fn is_externally_owned(self) -> bool {
        matches!(self, NodeType::User | NodeType::Group)
    }
}

/// A graph node. `uid` is assigned by the graph store; leave `None` when
/// constructing a node to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub uid: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub namespace: Namespace,
    pub tags: HashSet<String>,
    pub attributes: HashMap<String, String>,
    pub activation: f64,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub source_conversation_id: Option<String>,
    pub clearance: Option<i64>,
}

impl Node {
    /// Builds a node with the kind's default activation and `now` for both
    /// timestamps. Callers fill in name/description/namespace/confidence.
    #[must_use]
    pub fn new(node_type: NodeType, namespace: Namespace, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: None,
            name: name.into(),
            description: String::new(),
            node_type,
            namespace,
            tags: HashSet::new(),
            attributes: HashMap::new(),
            activation: node_type.default_activation(),
            confidence: 1.0,
            created_at: now,
            last_accessed: now,
            source_conversation_id: None,
            clearance: None,
        }
    }

    /// Clamps `activation` into `[0, 1]`. Called after every mutation.
    pub fn clamp_activation(&mut self) {
        self.activation = self.activation.clamp(0.0, 1.0);
    }

    /// Applies `IncrementAccessCount`: bumps activation by `boost`, clamped,
    /// and refreshes `last_accessed`.
    pub fn record_access(&mut self, boost: f64) {
        self.activation += boost;
        self.clamp_activation();
        self.last_accessed = Utc::now();
    }

    /// Heuristic used by the consultation merge step to drop nodes that look
    /// like opaque identifiers rather than human-readable facts.
    #[must_use]
    pub fn name_looks_like_uuid(&self) -> bool {
        looks_like_uuid(&self.name)
    }
}

#[must_use]
pub fn looks_like_uuid(s: &str) -> bool {
    uuid::Uuid::parse_str(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_activation_by_kind() {
        assert!((NodeType::Fact.default_activation() - 0.8).abs() < f64::EPSILON);
        assert!((NodeType::User.default_activation() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_access_clamps_to_one() {
        let ns = Namespace::for_user("alice").unwrap();
        let mut n = Node::new(NodeType::Fact, ns, "Chat: hello");
        n.activation = 0.95;
        n.record_access(0.2);
        assert!((n.activation - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn uuid_like_names_detected() {
        assert!(looks_like_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!looks_like_uuid("gulab jamun"));
    }
}

//! Schema introspection: a `get_structured_schema`/`refresh_schema` pair so
//! the reflection engine can describe what predicates and edge types exist
//! without hand-maintaining a list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum predicate/edge-type set the kernel relies on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredSchema {
    pub node_predicates: Vec<String>,
    pub edge_types: Vec<String>,
    pub indexed_predicates: HashMap<String, String>,
}

impl StructuredSchema {
    /// The predicate set every deployment must provide, independent of
    /// whatever the live store reports — used as a fallback when schema
    /// introspection itself fails.
    #[must_use]
    pub fn minimum() -> Self {
        let node_predicates = vec![
            "namespace", "name", "description", "activation", "created_at",
            "last_accessed", "confidence", "tags", "source_conversation_id",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let mut indexed_predicates = HashMap::new();
        indexed_predicates.insert("namespace".to_string(), "exact".to_string());
        indexed_predicates.insert("name".to_string(), "term".to_string());
        indexed_predicates.insert("description".to_string(), "fulltext".to_string());
        indexed_predicates.insert("created_at".to_string(), "hour".to_string());
        indexed_predicates.insert("tags".to_string(), "exact".to_string());
        indexed_predicates.insert("source_conversation_id".to_string(), "exact".to_string());

        Self {
            node_predicates,
            edge_types: vec![
                "knows", "created_by", "derived_from", "family_member", "has_manager",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            indexed_predicates,
        }
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::from("Node predicates:\n");
        for p in &self.node_predicates {
            let idx = self
                .indexed_predicates
                .get(p)
                .map(|i| format!(" @index({i})"))
                .unwrap_or_default();
            out.push_str(&format!("  {p}{idx}\n"));
        }
        out.push_str("Edge types:\n");
        for e in &self.edge_types {
            out.push_str(&format!("  <{e}>: uid @reverse\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_schema_includes_required_predicates() {
        let schema = StructuredSchema::minimum();
        assert!(schema.node_predicates.contains(&"namespace".to_string()));
        assert!(schema.edge_types.contains(&"family_member".to_string()));
        assert!(schema.to_text().contains("namespace @index(exact)"));
    }
}

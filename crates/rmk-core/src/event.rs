//! The event shape exchanged between the agent-facing service, the durable
//! pub/sub transport, and the Hot/Cold ingestion paths.

use crate::namespace::Namespace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingested conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub namespace: Namespace,
    pub user_query: String,
    pub ai_response: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub extracted_entities: Vec<String>,
}

impl TranscriptEvent {
    #[must_use]
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        namespace: Namespace,
        user_query: impl Into<String>,
        ai_response: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            namespace,
            user_query: user_query.into(),
            ai_response: ai_response.into(),
            timestamp: Utc::now(),
            extracted_entities: Vec::new(),
        }
    }

    /// First 50 characters of the user query, used as the Fact node's name
    /// prefix (`"Chat: " + first-50-chars`).
    #[must_use]
    pub fn query_prefix(&self, max_chars: usize) -> String {
        self.user_query.chars().take(max_chars).collect()
    }

    /// First five whitespace-separated words, used by the local-extractor
    /// fallback as a Fact node name.
    #[must_use]
    pub fn first_words(&self, n: usize) -> String {
        self.user_query
            .split_whitespace()
            .take(n)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_prefix_truncates() {
        let ns = Namespace::for_user("alice").unwrap();
        let e = TranscriptEvent::new("c1", "alice", ns, "a".repeat(80), "ok");
        assert_eq!(e.query_prefix(50).len(), 50);
    }

    #[test]
    fn first_words_extraction() {
        let ns = Namespace::for_user("alice").unwrap();
        let e = TranscriptEvent::new(
            "c1",
            "alice",
            ns,
            "My favorite dessert is gulab jamun and I love it",
            "Noted.",
        );
        assert_eq!(e.first_words(5), "My favorite dessert is gulab");
    }
}

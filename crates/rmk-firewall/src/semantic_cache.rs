//! Semantic cache probe: exact-normalized key first, vector fallback against
//! the `rmk_cache` collection when an embedder is configured.

use rmk_cache::KvStore;
use rmk_core::sanitize::normalize_query;
use rmk_core::RmkResult;
use rmk_vector::{Embedder, VectorIndex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Cache key format: `semantic:<ns>:<normalized-query>`, 5-10 min TTL.
pub const SEMANTIC_CACHE_TTL: Duration = Duration::from_secs(300);

pub struct SemanticCache {
    kv: Arc<dyn KvStore>,
    vector: Option<Arc<dyn VectorIndex>>,
    embedder: Option<Arc<dyn Embedder>>,
    similarity_threshold: f32,
}

impl SemanticCache {
    #[must_use]
    pub fn new(
        kv: Arc<dyn KvStore>,
        vector: Option<Arc<dyn VectorIndex>>,
        embedder: Option<Arc<dyn Embedder>>,
        similarity_threshold: f64,
    ) -> Self {
        Self {
            kv,
            vector,
            embedder,
            similarity_threshold: similarity_threshold as f32,
        }
    }

    fn exact_key(namespace: &str, normalized: &str) -> String {
        format!("semantic:{namespace}:{normalized}")
    }

    /// Returns the cached response text, trying the exact key then, on
    /// miss, a vector search against `rmk_cache` if configured.
    pub async fn probe(&self, namespace: &str, user_id: &str, query: &str) -> RmkResult<Option<String>> {
        let normalized = normalize_query(query);
        if let Some(hit) = self.kv.get(&Self::exact_key(namespace, &normalized)).await? {
            return Ok(Some(hit));
        }

        let (Some(vector), Some(embedder)) = (&self.vector, &self.embedder) else {
            return Ok(None);
        };
        let Ok(query_vec) = embedder.embed(&normalized).await else {
            return Ok(None);
        };
        let hits = vector.search(namespace, user_id, query_vec, 1).await?;
        let Some(top) = hits.into_iter().next() else {
            return Ok(None);
        };
        if top.score < self.similarity_threshold {
            return Ok(None);
        }
        Ok(top
            .payload
            .get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    /// Writes `response` back to the exact key and, when a vector index is
    /// configured, the `rmk_cache` collection keyed by the normalized query.
    pub async fn store(&self, namespace: &str, user_id: &str, query: &str, response: &str) -> RmkResult<()> {
        let normalized = normalize_query(query);
        self.kv
            .set_ex(&Self::exact_key(namespace, &normalized), response.to_string(), SEMANTIC_CACHE_TTL)
            .await?;

        if let (Some(vector), Some(embedder)) = (&self.vector, &self.embedder) {
            if let Ok(query_vec) = embedder.embed(&normalized).await {
                let mut payload = HashMap::new();
                payload.insert("response".to_string(), serde_json::Value::String(response.to_string()));
                payload.insert("text".to_string(), serde_json::Value::String(normalized.clone()));
                vector.store(namespace, &normalized, query_vec, payload).await?;
            }
        }
        Ok(())
    }
}

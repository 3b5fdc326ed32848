//! In-memory [`VectorIndex`] for tests and local development, grounded in
//! the same trait-plus-test-double pattern as [`crate::memory_store`]'s
//! graph counterpart.

use crate::client::{SearchHit, VectorIndex, VectorStats};
use crate::point_id::cosine_similarity;
use crate::rate_limit::TokenBucketLimiter;
use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use rmk_core::{RmkError, RmkResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

struct Point {
    vec: Vec<f32>,
    payload: HashMap<String, Value>,
}

/// Namespace-scoped in-memory cosine index.
pub struct InMemoryVectorIndex {
    points: DashMap<String, Point>,
    limiter: Option<TokenBucketLimiter>,
    collection: String,
}

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(user|group)_[A-Za-z0-9_-]+$").expect("valid regex"))
}

impl InMemoryVectorIndex {
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            points: DashMap::new(),
            limiter: None,
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn with_rate_limit(mut self, capacity: f64, refill_per_sec: f64) -> Self {
        self.limiter = Some(TokenBucketLimiter::new(capacity, refill_per_sec));
        self
    }
}

fn validate_namespace(namespace: &str) -> RmkResult<()> {
    if namespace.is_empty() || !namespace_regex().is_match(namespace) {
        return Err(RmkError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn store(
        &self,
        namespace: &str,
        uid: &str,
        mut vec: Vec<f32>,
        mut payload: HashMap<String, Value>,
    ) -> RmkResult<()> {
        validate_namespace(namespace)?;
        crate::point_id::l2_normalize(&mut vec);
        payload.insert("namespace".to_string(), Value::String(namespace.to_string()));
        payload.insert("uid".to_string(), Value::String(uid.to_string()));
        let id = crate::point_id::point_id(namespace, uid);
        self.points.insert(id, Point { vec, payload });
        Ok(())
    }

    async fn update(
        &self,
        namespace: &str,
        uid: &str,
        vec: Vec<f32>,
        payload: HashMap<String, Value>,
    ) -> RmkResult<()> {
        self.delete(namespace, uid).await?;
        self.store(namespace, uid, vec, payload).await
    }

    async fn search(
        &self,
        namespace: &str,
        user_id: &str,
        mut query_vec: Vec<f32>,
        top_k: usize,
    ) -> RmkResult<Vec<SearchHit>> {
        validate_namespace(namespace)?;
        if let Some(limiter) = &self.limiter {
            if let Err(retry_after) = limiter.try_acquire(user_id) {
                return Err(RmkError::RateLimited {
                    retry_after_secs: retry_after.as_secs().max(1),
                });
            }
        }
        crate::point_id::l2_normalize(&mut query_vec);

        let mut hits: Vec<SearchHit> = self
            .points
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .payload
                    .get("namespace")
                    .and_then(|v| v.as_str())
                    == Some(namespace)
            })
            .map(|entry| {
                let uid = entry
                    .value()
                    .payload
                    .get("uid")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let score = cosine_similarity(&query_vec, &entry.value().vec);
                SearchHit {
                    uid,
                    score,
                    payload: entry.value().payload.clone(),
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete(&self, namespace: &str, uid: &str) -> RmkResult<()> {
        let id = crate::point_id::point_id(namespace, uid);
        self.points.remove(&id);
        Ok(())
    }

    async fn stats(&self) -> RmkResult<VectorStats> {
        Ok(VectorStats {
            points_count: self.points.len() as u64,
            collection: self.collection.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_invalid_namespace_before_any_rpc() {
        let idx = InMemoryVectorIndex::new("rmk_nodes");
        let err = idx.search("not-a-namespace", "alice", vec![1.0, 0.0], 5).await;
        assert!(matches!(err, Err(RmkError::InvalidNamespace(_))));
    }

    #[tokio::test]
    async fn search_filters_by_namespace() {
        let idx = InMemoryVectorIndex::new("rmk_nodes");
        idx.store("user_alice", "n1", vec![1.0, 0.0], HashMap::new())
            .await
            .unwrap();
        idx.store("user_bob", "n2", vec![1.0, 0.0], HashMap::new())
            .await
            .unwrap();

        let hits = idx.search("user_alice", "alice", vec![1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].uid, "n1");
    }

    #[tokio::test]
    async fn embed_then_search_round_trips_near_one() {
        let idx = InMemoryVectorIndex::new("rmk_nodes");
        idx.store("user_alice", "n1", vec![0.3, 0.4, 0.5], HashMap::new())
            .await
            .unwrap();
        let hits = idx
            .search("user_alice", "alice", vec![0.3, 0.4, 0.5], 1)
            .await
            .unwrap();
        assert_eq!(hits[0].uid, "n1");
        assert!(hits[0].score > 0.999);
    }

    #[tokio::test]
    async fn store_is_idempotent_for_unchanged_vec_and_payload() {
        let idx = InMemoryVectorIndex::new("rmk_nodes");
        idx.store("user_alice", "n1", vec![1.0, 0.0], HashMap::new())
            .await
            .unwrap();
        idx.store("user_alice", "n1", vec![1.0, 0.0], HashMap::new())
            .await
            .unwrap();
        let stats = idx.stats().await.unwrap();
        assert_eq!(stats.points_count, 1);
    }

    #[tokio::test]
    async fn rate_limiter_rejects_with_retry_after() {
        let idx = InMemoryVectorIndex::new("rmk_nodes").with_rate_limit(1.0, 0.001);
        idx.search("user_alice", "alice", vec![1.0], 1).await.unwrap();
        let second = idx.search("user_alice", "alice", vec![1.0], 1).await;
        assert!(matches!(second, Err(RmkError::RateLimited { .. })));
    }
}

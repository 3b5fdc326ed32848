//! Namespaced upsert/search/delete over a cosine-ANN index (C2).

use async_trait::async_trait;
use rmk_core::RmkResult;
use serde_json::Value;
use std::collections::HashMap;

/// One search hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub uid: String,
    pub score: f32,
    pub payload: HashMap<String, Value>,
}

/// Aggregate collection stats, surfaced for operator visibility.
#[derive(Debug, Clone, Default)]
pub struct VectorStats {
    pub points_count: u64,
    pub collection: String,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upserts `vec` under the deterministic point ID for `(namespace, uid)`.
    /// Idempotent for an unchanged `(vec, payload)` pair.
    async fn store(
        &self,
        namespace: &str,
        uid: &str,
        vec: Vec<f32>,
        payload: HashMap<String, Value>,
    ) -> RmkResult<()>;

    /// Delete-then-store at the same point ID.
    async fn update(
        &self,
        namespace: &str,
        uid: &str,
        vec: Vec<f32>,
        payload: HashMap<String, Value>,
    ) -> RmkResult<()>;

    /// Cosine search filtered server-side on `payload.namespace == namespace`.
    /// `user_id` is used only for rate limiting.
    async fn search(
        &self,
        namespace: &str,
        user_id: &str,
        query_vec: Vec<f32>,
        top_k: usize,
    ) -> RmkResult<Vec<SearchHit>>;

    async fn delete(&self, namespace: &str, uid: &str) -> RmkResult<()>;

    async fn stats(&self) -> RmkResult<VectorStats>;
}

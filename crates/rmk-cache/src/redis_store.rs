//! Production [`KvStore`] backed by Redis, using a connection manager so
//! reconnects are transparent to callers.

use crate::client::KvStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use rmk_core::{RmkError, RmkResult};
use std::time::Duration;

pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(address: &str, password: Option<&str>, db: i64) -> RmkResult<Self> {
        let mut url = address.to_string();
        if let Some(pw) = password {
            url = url.replacen("redis://", &format!("redis://:{pw}@"), 1);
        }
        if db != 0 {
            url = format!("{url}/{db}");
        }
        let client = redis::Client::open(url)
            .map_err(|e| RmkError::Fatal(format!("invalid redis address: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| RmkError::Transient(format!("redis connect: {e}")))?;
        Ok(Self { conn })
    }

    fn to_rmk_err(e: redis::RedisError) -> RmkError {
        if e.is_connection_dropped() || e.is_timeout() {
            RmkError::Transient(format!("redis transport: {e}"))
        } else {
            RmkError::Permanent(format!("redis: {e}"))
        }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn lpush_trim(
        &self,
        key: &str,
        value: String,
        max_len: usize,
        ttl: Duration,
    ) -> RmkResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .lpush(key, value)
            .ltrim(key, 0, max_len as isize - 1)
            .expire(key, ttl.as_secs() as i64)
            .query_async(&mut conn)
            .await
            .map_err(Self::to_rmk_err)?;
        Ok(())
    }

    async fn lrange_all(&self, key: &str) -> RmkResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(key, 0, -1).await.map_err(Self::to_rmk_err)
    }

    async fn get(&self, key: &str) -> RmkResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(Self::to_rmk_err)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> RmkResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(Self::to_rmk_err)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> RmkResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(Self::to_rmk_err)?;
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: String, ttl: Duration) -> RmkResult<bool> {
        let mut conn = self.conn.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(Self::to_rmk_err)?;
        Ok(result.is_some())
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> RmkResult<bool> {
        // Compare-and-delete via a Lua script so the check and the delete
        // are atomic (the standard lock-release pattern: an unlock must not
        // remove a lock some other owner has since acquired).
        const SCRIPT: &str = r"
            if redis.call('get', KEYS[1]) == ARGV[1] then
                return redis.call('del', KEYS[1])
            else
                return 0
            end
        ";
        let mut conn = self.conn.clone();
        let deleted: i64 = redis::Script::new(SCRIPT)
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::to_rmk_err)?;
        Ok(deleted == 1)
    }
}

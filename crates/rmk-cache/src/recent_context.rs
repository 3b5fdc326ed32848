//! Per-namespace recent-turn cache: `context:<namespace>:recent`, capped at
//! [`RECENT_CONTEXT_MAX_LEN`] entries with a sliding [`RECENT_CONTEXT_TTL`].
//! Consulted by the firewall and consultation handler as a cheap short-term
//! memory ahead of any graph/vector lookup.

use crate::client::KvStore;
use rmk_core::RmkResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const RECENT_CONTEXT_MAX_LEN: usize = 10;
pub const RECENT_CONTEXT_TTL: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentTurn {
    pub query: String,
    pub response_summary: String,
}

pub struct RecentContext {
    store: Arc<dyn KvStore>,
}

impl RecentContext {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(namespace: &str) -> String {
        format!("context:{namespace}:recent")
    }

    pub async fn record(&self, namespace: &str, turn: &RecentTurn) -> RmkResult<()> {
        let encoded = serde_json::to_string(turn)?;
        self.store
            .lpush_trim(
                &Self::key(namespace),
                encoded,
                RECENT_CONTEXT_MAX_LEN,
                RECENT_CONTEXT_TTL,
            )
            .await
    }

    /// Most recent turn first.
    pub async fn recent(&self, namespace: &str) -> RmkResult<Vec<RecentTurn>> {
        let raw = self.store.lrange_all(&Self::key(namespace)).await?;
        Ok(raw
            .into_iter()
            .filter_map(|s| serde_json::from_str(&s).ok())
            .collect())
    }
}

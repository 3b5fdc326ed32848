//! Partial-query speculative pre-fetch (`speculation:<user>:latest`, 10s
//! TTL). `Speculate` stores a guess at what the user is about to ask;
//! `probe` lets consultation accept that guess's facts as a seed set when
//! the real query turns out to share its prefix.

use crate::client::KvStore;
use rmk_core::RmkResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const SPECULATION_TTL: Duration = Duration::from_secs(10);
/// Queries shorter than this aren't worth speculating on.
pub const MIN_SPECULATION_QUERY_LEN: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeculationSlot {
    pub query: String,
    pub facts: Vec<String>,
}

pub struct Speculation {
    store: Arc<dyn KvStore>,
}

impl Speculation {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(user_id: &str) -> String {
        format!("speculation:{user_id}:latest")
    }

    pub async fn store(&self, user_id: &str, query: &str, facts: Vec<String>) -> RmkResult<()> {
        if query.len() < MIN_SPECULATION_QUERY_LEN {
            return Ok(());
        }
        let slot = SpeculationSlot {
            query: query.to_string(),
            facts,
        };
        let encoded = serde_json::to_string(&slot)?;
        self.store
            .set_ex(&Self::key(user_id), encoded, SPECULATION_TTL)
            .await
    }

    /// Returns the speculated facts if the slot's query is a case-
    /// insensitive prefix of `actual_query`.
    pub async fn probe(&self, user_id: &str, actual_query: &str) -> RmkResult<Option<Vec<String>>> {
        let Some(raw) = self.store.get(&Self::key(user_id)).await? else {
            return Ok(None);
        };
        let Ok(slot) = serde_json::from_str::<SpeculationSlot>(&raw) else {
            return Ok(None);
        };
        let actual_lower = actual_query.to_lowercase();
        let stored_lower = slot.query.to_lowercase();
        if actual_lower.starts_with(&stored_lower) {
            Ok(Some(slot.facts))
        } else {
            Ok(None)
        }
    }
}

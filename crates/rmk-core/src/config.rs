//! Kernel configuration: the enumerated fields from the external-interfaces
//! section, loaded from a TOML file with `RMK_<FIELD>` environment overrides.

use crate::error::RmkError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// All externally tunable knobs. Defaults match the values named throughout
/// the design (`§4`, `§6`, `§9`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RmkConfig {
    pub dgraph_address: String,
    pub nats_address: String,
    pub redis_address: String,
    pub redis_password: Option<String>,
    pub redis_db: i64,
    pub ai_services_url: String,
    pub qdrant_url: String,

    pub reflection_interval_secs: u64,
    pub activation_decay_rate: f64,
    pub decay_interval_secs: u64,
    pub min_reflection_batch: usize,
    pub max_reflection_batch: usize,

    pub ingestion_batch_size: usize,
    pub ingestion_flush_interval_secs: u64,

    pub wisdom_batch_size: usize,
    pub wisdom_flush_interval_secs: u64,

    pub cache_similarity: f64,
    pub enable_semantic_cache: bool,
    pub enable_intent_router: bool,
    pub enable_dgraph_reflex: bool,

    pub access_boost: f64,
    pub max_retries: u32,
    pub retry_interval_ms: u64,
    pub wisdom_channel_capacity: usize,
    pub ingest_lock_ttl_secs: u64,
    pub sharelink_lock_ttl_secs: u64,
    pub metrics_port: u16,
}

impl Default for RmkConfig {
    fn default() -> Self {
        Self {
            dgraph_address: "http://localhost:8080".to_string(),
            nats_address: "nats://localhost:4222".to_string(),
            redis_address: "redis://localhost:6379".to_string(),
            redis_password: None,
            redis_db: 0,
            ai_services_url: "http://localhost:9000".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),

            reflection_interval_secs: 300,
            activation_decay_rate: 0.05,
            decay_interval_secs: 3600,
            min_reflection_batch: 5,
            max_reflection_batch: 200,

            ingestion_batch_size: 50,
            ingestion_flush_interval_secs: 10,

            wisdom_batch_size: 20,
            wisdom_flush_interval_secs: 15,

            cache_similarity: 0.92,
            enable_semantic_cache: true,
            enable_intent_router: true,
            enable_dgraph_reflex: true,

            access_boost: 0.1,
            max_retries: 3,
            retry_interval_ms: 1000,
            wisdom_channel_capacity: 1000,
            ingest_lock_ttl_secs: 30,
            sharelink_lock_ttl_secs: 30,
            metrics_port: 9090,
        }
    }
}

impl RmkConfig {
    /// Loads a TOML file, then applies `RMK_<FIELD>` environment overrides
    /// for the string/URL fields operators most commonly need to override
    /// per-deployment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RmkError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RmkError::Fatal(format!("reading config: {e}")))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RmkError> {
        let mut cfg: RmkConfig =
            toml::from_str(text).map_err(|e| RmkError::Fatal(format!("parsing config: {e}")))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RMK_DGRAPH_ADDRESS") {
            self.dgraph_address = v;
        }
        if let Ok(v) = std::env::var("RMK_NATS_ADDRESS") {
            self.nats_address = v;
        }
        if let Ok(v) = std::env::var("RMK_REDIS_ADDRESS") {
            self.redis_address = v;
        }
        if let Ok(v) = std::env::var("RMK_REDIS_PASSWORD") {
            self.redis_password = Some(v);
        }
        if let Ok(v) = std::env::var("RMK_AI_SERVICES_URL") {
            self.ai_services_url = v;
        }
        if let Ok(v) = std::env::var("RMK_QDRANT_URL") {
            self.qdrant_url = v;
        }
    }

    #[must_use]
    pub fn reflection_interval(&self) -> Duration {
        Duration::from_secs(self.reflection_interval_secs)
    }

    #[must_use]
    pub fn decay_interval(&self) -> Duration {
        Duration::from_secs(self.decay_interval_secs)
    }

    #[must_use]
    pub fn wisdom_flush_interval(&self) -> Duration {
        Duration::from_secs(self.wisdom_flush_interval_secs)
    }

    #[must_use]
    pub fn ingestion_flush_interval(&self) -> Duration {
        Duration::from_secs(self.ingestion_flush_interval_secs)
    }
}

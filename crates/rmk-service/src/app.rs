//! Builds every component from `RmkConfig` and spawns the always-on
//! workers: one reflection ticker, one decay ticker, one wisdom-flush
//! ticker, plus a subscriber task per known user subject.

use rmk_cache::{InMemoryKvStore, KvStore, RedisKvStore};
use rmk_core::RmkConfig;
use rmk_firewall::{PreCortexFirewall, SemanticCache};
use rmk_graph::memory_store::InMemoryGraphClient;
use rmk_graph::{DgraphClient, GraphClient};
use rmk_ingest::{transcripts_subject, consume_with_retry, InProcessTransport, IngestionPipeline};
use rmk_policy::PolicyEngine;
use rmk_reflection::{HttpInsighter, ReflectionConfig, ReflectionEngine};
use rmk_vector::memory_store::InMemoryVectorIndex;
use rmk_vector::{HttpEmbedder, QdrantVectorIndex, VectorIndex};
use rmk_wisdom::{HttpSummarizer, WisdomManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct App {
    pub config: RmkConfig,
    pub graph: Arc<dyn GraphClient>,
    pub wisdom: Arc<WisdomManager>,
    pub ingestion: Arc<IngestionPipeline>,
    pub consult: Arc<rmk_consult::ConsultationHandler>,
    pub firewall: Arc<PreCortexFirewall>,
    pub transport: Arc<InProcessTransport>,
}

impl App {
    pub async fn build(config: RmkConfig, dev_mode: bool) -> anyhow::Result<Self> {
        let graph: Arc<dyn GraphClient> = if dev_mode {
            Arc::new(InMemoryGraphClient::new())
        } else {
            Arc::new(DgraphClient::new(
                config.dgraph_address.clone(),
                config.max_retries,
                Duration::from_millis(config.retry_interval_ms),
            ))
        };

        let nodes_vector: Arc<dyn VectorIndex> = if dev_mode {
            Arc::new(InMemoryVectorIndex::new("rmk_nodes"))
        } else {
            Arc::new(QdrantVectorIndex::new(&config.qdrant_url, "rmk_nodes")?)
        };
        let cache_vector: Arc<dyn VectorIndex> = if dev_mode {
            Arc::new(InMemoryVectorIndex::new("rmk_cache"))
        } else {
            Arc::new(QdrantVectorIndex::new(&config.qdrant_url, "rmk_cache")?)
        };

        let kv: Arc<dyn KvStore> = if dev_mode {
            Arc::new(InMemoryKvStore::new())
        } else {
            Arc::new(
                RedisKvStore::connect(&config.redis_address, config.redis_password.as_deref(), config.redis_db)
                    .await?,
            )
        };

        let embedder = Arc::new(HttpEmbedder::new(config.ai_services_url.clone(), Duration::from_secs(10)));
        let summarizer = Arc::new(HttpSummarizer::new(config.ai_services_url.clone(), Duration::from_secs(30)));
        let insighter = Arc::new(HttpInsighter::new(config.ai_services_url.clone(), Duration::from_secs(30)));

        let wisdom = WisdomManager::new(
            config.wisdom_batch_size,
            config.wisdom_flush_interval(),
            Arc::clone(&graph),
            Arc::clone(&nodes_vector),
            summarizer,
            embedder.clone(),
        );

        let ingestion = Arc::new(IngestionPipeline::new(
            Arc::clone(&graph),
            Arc::clone(&nodes_vector),
            embedder.clone(),
            Arc::clone(&wisdom),
            Arc::clone(&kv),
        ));

        let policy = Arc::new(PolicyEngine::new(Arc::clone(&graph)));

        let consult = Arc::new(rmk_consult::ConsultationHandler::new(
            Arc::clone(&graph),
            Arc::clone(&nodes_vector),
            embedder.clone(),
            Arc::clone(&policy),
            Arc::clone(&kv),
            config.access_boost,
        ));

        let semantic_cache = SemanticCache::new(
            Arc::clone(&kv),
            Some(Arc::clone(&cache_vector)),
            Some(embedder.clone()),
            config.cache_similarity,
        );
        let firewall = if config.enable_intent_router {
            Arc::new(PreCortexFirewall::new(
                semantic_cache,
                Arc::new(rmk_firewall::HttpIntentClassifier::new(config.ai_services_url.clone())),
                Arc::clone(&graph),
                config.enable_semantic_cache,
                config.enable_dgraph_reflex,
            ))
        } else {
            Arc::new(PreCortexFirewall::with_rule_classifier(
                semantic_cache,
                Arc::clone(&graph),
                config.enable_semantic_cache,
                config.enable_dgraph_reflex,
            ))
        };

        let transport = Arc::new(InProcessTransport::new(config.wisdom_channel_capacity));

        Ok(Self {
            config,
            graph,
            wisdom,
            ingestion,
            consult,
            firewall,
            transport,
        })
    }

    /// Spawns the always-on workers and returns their handles so the caller
    /// can await them at shutdown.
    pub fn spawn_workers(&self, insighter_config: ReflectionConfig, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let reflection = ReflectionEngine::new(
            Arc::clone(&self.graph),
            Arc::new(HttpInsighter::new(self.config.ai_services_url.clone(), Duration::from_secs(30))),
            insighter_config,
        );
        let (reflect_handle, decay_handle) = reflection.spawn(cancel.clone());
        handles.push(reflect_handle);
        handles.push(decay_handle);

        handles.push(Arc::clone(&self.wisdom).spawn(cancel.clone()));

        let wisdom_cancel = cancel.clone();
        let ingestion = Arc::clone(&self.ingestion);
        let transport = Arc::clone(&self.transport);
        let graph = Arc::clone(&self.graph);
        handles.push(tokio::spawn(async move {
            spawn_subscribers(graph, transport, ingestion, wisdom_cancel).await;
        }));

        handles
    }
}

/// Discovers known user namespaces and spawns one durable-consumer loop per
/// subject, honoring the root cancellation token between namespace scans.
async fn spawn_subscribers(
    graph: Arc<dyn GraphClient>,
    transport: Arc<InProcessTransport>,
    ingestion: Arc<IngestionPipeline>,
    cancel: CancellationToken,
) {
    let namespaces = match graph.list_namespaces().await {
        Ok(ns) => ns,
        Err(err) => {
            warn!(%err, "failed to list namespaces for subscriber startup");
            return;
        }
    };

    let mut subject_handles = Vec::new();
    for namespace in namespaces.into_iter().filter(|ns| !ns.is_group()) {
        let user_id = namespace.as_str().trim_start_matches("user_").to_string();
        let subject = transcripts_subject(&user_id);
        let transport = Arc::clone(&transport);
        let ingestion = Arc::clone(&ingestion);
        info!(%subject, "starting durable subscriber");
        subject_handles.push(tokio::spawn(async move {
            consume_with_retry(transport.as_ref(), &subject, 3, |event| {
                let ingestion = Arc::clone(&ingestion);
                async move { ingestion.ingest(event).await }
            })
            .await;
        }));
    }

    cancel.cancelled().await;
    for handle in subject_handles {
        handle.abort();
    }
}

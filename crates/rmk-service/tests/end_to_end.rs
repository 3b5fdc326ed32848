//! End-to-end scenarios run against in-memory backends with deterministic
//! mocks so they don't depend on any external service.

use rmk_cache::{InMemoryKvStore, KvStore};
use rmk_consult::{ConsultRequest, ConsultationHandler};
use rmk_core::{Namespace, TranscriptEvent};
use rmk_firewall::{FirewallOutcome, PreCortexFirewall, SemanticCache};
use rmk_graph::memory_store::InMemoryGraphClient;
use rmk_graph::GraphClient;
use rmk_ingest::{
    consume_with_retry, transcripts_subject, DeadLetterEnvelope, DurableTransport, IngestionPipeline,
    InProcessTransport,
};
use rmk_policy::PolicyEngine;
use rmk_vector::memory_store::InMemoryVectorIndex;
use rmk_vector::VectorIndex;
use rmk_wisdom::WisdomManager;
use std::sync::Arc;
use std::time::Duration;
use rmk_test_support::{DeterministicEmbedder, LocalSummarizer};

struct Pipeline {
    graph: Arc<InMemoryGraphClient>,
    vector: Arc<dyn VectorIndex>,
    embedder: Arc<DeterministicEmbedder>,
    ingestion: Arc<IngestionPipeline>,
    kv: Arc<dyn KvStore>,
}

fn build_pipeline() -> Pipeline {
    let graph = Arc::new(InMemoryGraphClient::new());
    let vector: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new("rmk_nodes"));
    let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let embedder = Arc::new(DeterministicEmbedder::new(8));

    let wisdom = WisdomManager::new(
        10,
        Duration::from_secs(60),
        graph.clone() as Arc<dyn GraphClient>,
        Arc::clone(&vector),
        Arc::new(LocalSummarizer),
        embedder.clone(),
    );

    let ingestion = Arc::new(IngestionPipeline::new(
        graph.clone() as Arc<dyn GraphClient>,
        Arc::clone(&vector),
        embedder.clone(),
        wisdom,
        Arc::clone(&kv),
    ));

    Pipeline { graph, vector, embedder, ingestion, kv }
}

#[tokio::test]
async fn cold_start_ingest_then_consult_returns_the_ingested_fact() {
    let p = build_pipeline();
    let ns = Namespace::for_user("alice").unwrap();
    let event = TranscriptEvent::new(
        "conv-1",
        "alice",
        ns.clone(),
        "My favorite dessert is gulab jamun",
        "Noted, I'll remember that.",
    );
    p.ingestion.ingest(event).await.unwrap();

    let policy = Arc::new(PolicyEngine::new(p.graph.clone() as Arc<dyn GraphClient>));
    let handler = ConsultationHandler::new(
        p.graph.clone() as Arc<dyn GraphClient>,
        Arc::clone(&p.vector),
        p.embedder.clone(),
        policy,
        Arc::clone(&p.kv),
        0.1,
    );

    let response = handler
        .consult(&ConsultRequest::new("alice", "what is my favorite dessert"))
        .await
        .unwrap();
    assert!(!response.relevant_facts.is_empty());
}

#[tokio::test]
async fn cross_namespace_isolation_keeps_one_users_facts_out_of_anothers_consult() {
    let p = build_pipeline();
    let alice_ns = Namespace::for_user("alice").unwrap();
    p.ingestion
        .ingest(TranscriptEvent::new("c1", "alice", alice_ns, "Alice's secret project is Atlas", "Got it."))
        .await
        .unwrap();

    let bob_ns = Namespace::for_user("bob").unwrap();
    let nodes = p.graph.nodes_by_recency(&bob_ns, 50).await.unwrap();
    assert!(nodes.is_empty(), "bob's namespace must not see alice's facts");
}

#[tokio::test]
async fn dead_letter_on_poison_event_after_exhausting_retries() {
    let transport = Arc::new(InProcessTransport::new(8));
    let ns = Namespace::for_user("carol").unwrap();
    let subject = transcripts_subject("carol");
    transport
        .publish(&subject, TranscriptEvent::new("c1", "carol", ns, "poison", "n/a"))
        .await
        .unwrap();

    // `consume_with_retry` loops until its transport's channel closes, so it
    // must run as a background task: drive it until the dead letter lands,
    // then abort the loop rather than waiting on a channel nothing closes.
    let transport2 = Arc::clone(&transport);
    let subject2 = subject.clone();
    let handle = tokio::spawn(async move {
        consume_with_retry(transport2.as_ref(), &subject2, 0, |_event| async {
            Err(rmk_core::RmkError::Permanent("boom".to_string()))
        })
        .await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();

    let dead: Vec<DeadLetterEnvelope> = transport.dead_letters_for(&subject);
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].original_subject, subject);
}

#[tokio::test]
async fn pre_cortex_firewall_short_circuits_a_greeting_without_consultation() {
    let graph: Arc<dyn GraphClient> = Arc::new(InMemoryGraphClient::new());
    let cache = SemanticCache::new(Arc::new(InMemoryKvStore::new()), None, None, 0.92);
    let firewall = PreCortexFirewall::with_rule_classifier(cache, graph, true, true);

    let ns = Namespace::for_user("dave").unwrap();
    let outcome = firewall.handle("dave", &ns, "hey there").await.unwrap();
    assert!(matches!(outcome, FirewallOutcome::Handled(_)));
}

//! Deterministic stand-ins for the HTTP-backed traits (`Embedder`,
//! `Summarizer`, `Insighter`, `IntentClassifier`), shared across crates'
//! integration tests so each doesn't hand-roll its own copy.

use async_trait::async_trait;
use rmk_core::{Node, RmkError, RmkResult, TranscriptEvent};
use rmk_reflection::{ExtractedInsight, ExtractedKind, Insighter};
use rmk_vector::Embedder;
use rmk_wisdom::{local_extractor_summary, Summarizer, Summary};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Embeds `text` into a fixed-dimension vector derived from its hash, so
/// the same text always embeds to the same vector and different text
/// (almost always) embeds to a different one. Not remotely a real model,
/// but stable and cheap enough for retrieval tests that only need
/// reproducible nearest-neighbor behavior.
pub struct DeterministicEmbedder {
    pub dim: usize,
}

impl DeterministicEmbedder {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    async fn embed(&self, text: &str) -> RmkResult<Vec<f32>> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut vec: Vec<f32> = (0..self.dim)
            .map(|i| {
                let mixed = seed.wrapping_add(i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
                ((mixed >> 11) as f32 / u64::MAX as f32) * 2.0 - 1.0
            })
            .collect();
        rmk_vector::l2_normalize(&mut vec);
        Ok(vec)
    }
}

/// Always fails, to exercise the degrade-gracefully paths (ingestion still
/// writes cold/recent-context data even when the embed step fails).
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> RmkResult<Vec<f32>> {
        Err(RmkError::Transient("mock embedder always fails".to_string()))
    }
}

/// Counts how many times `embed` was called, so tests can assert a stage
/// didn't call it (e.g. speculation should never embed).
pub struct CountingEmbedder {
    inner: DeterministicEmbedder,
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            inner: DeterministicEmbedder::new(dim),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> RmkResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.embed(text).await
    }
}

/// Wraps the production local-extractor fallback so integration tests get
/// the same Fact-per-utterance shape without standing up an HTTP server.
pub struct LocalSummarizer;

#[async_trait]
impl Summarizer for LocalSummarizer {
    async fn summarize(&self, events: &[TranscriptEvent]) -> Option<Summary> {
        Some(local_extractor_summary(events))
    }
}

/// Turns every node over `threshold` activation into one `Insight`, named
/// after its source node, so reflection-cycle tests have deterministic
/// output without an external extraction call.
pub struct StubInsighter {
    pub threshold: f64,
}

#[async_trait]
impl Insighter for StubInsighter {
    async fn extract(&self, nodes: &[Node]) -> Vec<ExtractedInsight> {
        nodes
            .iter()
            .filter(|n| n.activation >= self.threshold)
            .map(|n| ExtractedInsight {
                kind: ExtractedKind::Insight,
                name: format!("Insight: {}", n.name),
                description: n.description.clone(),
            })
            .collect()
    }
}

//! The external summarization call and its local fallback.

use async_trait::async_trait;
use rmk_core::TranscriptEvent;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub summary_text: String,
    pub entities: Vec<String>,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes one namespace's batch of events. Implementations should
    /// return `None` rather than erroring on non-200/timeout so the caller
    /// can fall back locally without treating it as a pipeline failure.
    async fn summarize(&self, events: &[TranscriptEvent]) -> Option<Summary>;
}

/// Calls the external AI-services summarization endpoint over HTTP.
pub struct HttpSummarizer {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSummarizer {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[derive(serde::Serialize)]
struct SummarizeRequest<'a> {
    turns: Vec<TurnPayload<'a>>,
}

#[derive(serde::Serialize)]
struct TurnPayload<'a> {
    user_query: &'a str,
    ai_response: &'a str,
}

#[derive(serde::Deserialize)]
struct SummarizeResponse {
    summary_text: String,
    #[serde(default)]
    entities: Vec<String>,
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, events: &[TranscriptEvent]) -> Option<Summary> {
        let request = SummarizeRequest {
            turns: events
                .iter()
                .map(|e| TurnPayload {
                    user_query: &e.user_query,
                    ai_response: &e.ai_response,
                })
                .collect(),
        };
        let url = format!("{}/summarize", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await;
        match resp {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<SummarizeResponse>().await {
                    Ok(body) => Some(Summary {
                        summary_text: body.summary_text,
                        entities: body.entities,
                    }),
                    Err(err) => {
                        warn!(%err, "summarizer returned an unparseable body");
                        None
                    }
                }
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "summarizer returned non-200, falling back locally");
                None
            }
            Err(err) => {
                warn!(%err, "summarizer request failed, falling back locally");
                None
            }
        }
    }
}

/// One Fact per user utterance, named by its first five words. Used when
/// the external summarizer is unreachable so ingestion never blocks on it.
#[must_use]
pub fn local_extractor_summary(events: &[TranscriptEvent]) -> Summary {
    let entities = events
        .iter()
        .map(|e| format!("Chat: {}", e.first_words(5)))
        .collect();
    let summary_text = events
        .iter()
        .map(|e| e.user_query.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Summary {
        summary_text,
        entities,
    }
}

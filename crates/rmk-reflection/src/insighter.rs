//! The external insight/pattern extraction call made during a reflection
//! cycle. Mirrors `rmk_wisdom::Summarizer`'s HTTP-call-with-graceful-
//! degradation shape.

use async_trait::async_trait;
use rmk_core::Node;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractedKind {
    Insight,
    Pattern,
}

#[derive(Debug, Clone)]
pub struct ExtractedInsight {
    pub kind: ExtractedKind,
    pub name: String,
    pub description: String,
}

#[async_trait]
pub trait Insighter: Send + Sync {
    /// Requests insight/pattern extraction over `nodes`. Returns an empty
    /// vec (not an error) on HTTP failure so a failed reflection cycle just
    /// produces no new insights rather than crashing the ticker.
    async fn extract(&self, nodes: &[Node]) -> Vec<ExtractedInsight>;
}

pub struct HttpInsighter {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpInsighter {
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
struct ExtractRequest<'a> {
    nodes: Vec<NodePayload<'a>>,
}

#[derive(serde::Serialize)]
struct NodePayload<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(serde::Deserialize)]
struct ExtractResponseItem {
    kind: String,
    name: String,
    description: String,
}

#[async_trait]
impl Insighter for HttpInsighter {
    async fn extract(&self, nodes: &[Node]) -> Vec<ExtractedInsight> {
        let request = ExtractRequest {
            nodes: nodes
                .iter()
                .map(|n| NodePayload {
                    name: &n.name,
                    description: &n.description,
                })
                .collect(),
        };
        let url = format!("{}/reflect", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await;
        let items: Vec<ExtractResponseItem> = match resp {
            Ok(resp) if resp.status().is_success() => match resp.json().await {
                Ok(items) => items,
                Err(err) => {
                    warn!(%err, "insighter returned an unparseable body");
                    return Vec::new();
                }
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "insighter returned non-200");
                return Vec::new();
            }
            Err(err) => {
                warn!(%err, "insighter request failed");
                return Vec::new();
            }
        };
        items
            .into_iter()
            .filter_map(|item| {
                let kind = match item.kind.as_str() {
                    "insight" => ExtractedKind::Insight,
                    "pattern" => ExtractedKind::Pattern,
                    other => {
                        warn!(kind = %other, "insighter returned an unrecognized kind, skipping");
                        return None;
                    }
                };
                Some(ExtractedInsight {
                    kind,
                    name: item.name,
                    description: item.description,
                })
            })
            .collect()
    }
}

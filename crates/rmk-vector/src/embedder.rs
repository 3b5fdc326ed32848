//! The external embedding call shared by the ingestion and wisdom
//! pipelines. Both Hot and Cold paths turn text into a vector the same way,
//! so the contract lives here rather than being duplicated per caller.

use async_trait::async_trait;
use rmk_core::RmkResult;
use std::time::Duration;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> RmkResult<Vec<f32>>;
}

/// Calls the external AI-services embedding endpoint over HTTP, then
/// L2-normalizes the result so downstream cosine search is a plain dot
/// product.
pub struct HttpEmbedder {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpEmbedder {
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
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> RmkResult<Vec<f32>> {
        let url = format!("{}/embed", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&EmbedRequest { text })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| rmk_core::RmkError::Transient(format!("embedder transport: {e}")))?;
        if !resp.status().is_success() {
            return Err(rmk_core::RmkError::DownstreamSoft(format!(
                "embedder returned {}",
                resp.status()
            )));
        }
        let mut body: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| rmk_core::RmkError::Permanent(format!("embedder body: {e}")))?;
        crate::point_id::l2_normalize(&mut body.embedding);
        Ok(body.embedding)
    }
}

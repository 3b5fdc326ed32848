//! `wiremock` servers standing in for the AI-services HTTP endpoints
//! (`/embed`, `/summarize`, `/reflect`, `/classify`), gated behind the
//! `mock-server` feature so crates that don't need HTTP mocking avoid the
//! dependency.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Starts a mock server that answers `/embed` with a fixed-dimension
/// all-`0.1` vector for any request body.
pub async fn embedder_server(dim: usize) -> MockServer {
    let server = MockServer::start().await;
    let embedding: Vec<f32> = vec![0.1; dim];
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embedding": embedding })))
        .mount(&server)
        .await;
    server
}

/// Starts a mock server that answers `/summarize` with a canned summary.
pub async fn summarizer_server(summary_text: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "summary_text": summary_text,
            "entities": Vec::<String>::new(),
        })))
        .mount(&server)
        .await;
    server
}

/// Starts a mock server whose `/embed`, `/summarize`, and `/reflect`
/// endpoints all fail, to exercise graceful-degradation paths.
pub async fn always_failing_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

/// Starts a mock server that answers `/classify` with a fixed intent
/// label for any request.
pub async fn classifier_server(intent: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "intent": intent })))
        .mount(&server)
        .await;
    server
}

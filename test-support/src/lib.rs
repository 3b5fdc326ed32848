//! Shared test fixtures: deterministic mocks for the HTTP-backed traits,
//! plus `wiremock` servers (behind `mock-server`) for exercising the real
//! HTTP implementations end to end.

pub mod mocks;

#[cfg(feature = "mock-server")]
pub mod http;

pub use mocks::{CountingEmbedder, DeterministicEmbedder, FailingEmbedder, LocalSummarizer, StubInsighter};

//! Typed CRUD, batched upsert, and spreading activation over the
//! tenant-scoped knowledge graph (C1).

pub mod activation;
pub mod batch;
pub mod client;
pub mod dgraph;
pub mod memory_store;
pub mod schema;

pub use activation::spread_activation;
pub use batch::{batched_upsert, PendingEdge};
pub use client::{ActivatedNode, GraphClient, GraphQuery, SpreadActivationRequest};
pub use dgraph::DgraphClient;
pub use memory_store::InMemoryGraphClient;
pub use schema::StructuredSchema;

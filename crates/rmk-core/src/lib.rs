//! Shared types, configuration, and error taxonomy for the reflective memory
//! kernel. Every other `rmk-*` crate depends on this one; it has no
//! dependency on the graph/vector/cache backends it describes.

pub mod config;
pub mod edge;
pub mod error;
pub mod event;
pub mod namespace;
pub mod node;
pub mod sanitize;

pub use config::RmkConfig;
pub use edge::{Edge, EdgeStatus};
pub use error::{RmkError, RmkResult};
pub use event::TranscriptEvent;
pub use namespace::Namespace;
pub use node::{Node, NodeType};

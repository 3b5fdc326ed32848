//! Consultation (C8): hybrid retrieval, merge/filter, policy enforcement,
//! ranking, and deterministic brief formatting behind a single
//! `ConsultationHandler::consult` / `::speculate` entry point.

pub mod format;
pub mod handler;
pub mod merge;
pub mod policy_filter;
pub mod rank;
pub mod request;
pub mod retrieval;
pub mod speculate;

pub use format::{format_brief, CONFIDENCE_EMPTY, CONFIDENCE_WITH_FACTS, EMPTY_BRIEF};
pub use handler::ConsultationHandler;
pub use merge::merge_and_filter;
pub use policy_filter::filter_denied;
pub use rank::rank_and_truncate;
pub use request::{ConsultRequest, ConsultResponse};
pub use retrieval::{hybrid_retrieve, Candidate, Stage};
pub use speculate::{speculate, text_search};

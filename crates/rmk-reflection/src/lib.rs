//! Reflection and decay tickers: periodic insight/pattern extraction and
//! activation decay (C7).

pub mod engine;
pub mod insighter;

pub use engine::{ReflectionConfig, ReflectionEngine, DEFAULT_ACTIVATION_THRESHOLD, REFLECTION_CYCLE_TIMEOUT};
pub use insighter::{ExtractedInsight, ExtractedKind, HttpInsighter, Insighter};

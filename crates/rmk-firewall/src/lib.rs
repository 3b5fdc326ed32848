//! Pre-cortex firewall (C9): the first thing a query hits, before
//! consultation or an external LLM. Semantic cache, intent routing, and a
//! reflex table for the handful of fact lookups cheap enough to answer
//! without a full retrieval pass.

pub mod handler;
pub mod intent;
pub mod reflex;
pub mod semantic_cache;

pub use handler::{FirewallOutcome, FirewallResponse, PreCortexFirewall};
pub use intent::{HttpIntentClassifier, Intent, IntentClassifier, RuleClassifier};
pub use reflex::{match_query, run_reflex_query, ReflexQueryType};
pub use semantic_cache::{SemanticCache, SEMANTIC_CACHE_TTL};

//! Request/response shapes for the consultation handler.

use rmk_core::Namespace;

#[derive(Debug, Clone)]
pub struct ConsultRequest {
    pub user_id: String,
    pub query: String,
    pub namespace: Option<Namespace>,
    pub context: Option<String>,
    pub max_results: Option<usize>,
    pub include_insights: bool,
}

impl ConsultRequest {
    #[must_use]
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            query: query.into(),
            namespace: None,
            context: None,
            max_results: None,
            include_insights: false,
        }
    }

    /// Resolves the effective namespace: the explicit one, else `user_<id>`.
    pub fn resolved_namespace(&self) -> rmk_core::RmkResult<Namespace> {
        match &self.namespace {
            Some(ns) => Ok(ns.clone()),
            None => Namespace::for_user(&self.user_id),
        }
    }

    #[must_use]
    pub fn effective_max_results(&self) -> usize {
        self.max_results.unwrap_or(10)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsultResponse {
    pub relevant_facts: Vec<rmk_core::Node>,
    pub confidence: f64,
    pub brief: String,
    pub used_speculation: bool,
}

//! Directed, typed edges with a weight facet used by spreading activation.

use serde::{Deserialize, Serialize};

/// Edge lifecycle state. A `superseded` edge is kept for audit/history but
/// excluded from traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeStatus {
    Current,
    Superseded,
}

/// A directed edge between two node UIDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub edge_type: String,
    /// Traversal weight in `[0, 1]`. Absent facet defaults to 1.0 at read
    /// time (see `weight_or_default`); never negative.
    pub weight: Option<f64>,
    pub status: EdgeStatus,
}

impl Edge {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, edge_type: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: edge_type.into(),
            weight: None,
            status: EdgeStatus::Current,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight.max(0.0));
        self
    }

    /// Weight used for traversal; absent facet defaults to 1.0.
    #[must_use]
    pub fn weight_or_default(&self) -> f64 {
        self.weight.unwrap_or(1.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_weight_defaults_to_one() {
        let e = Edge::new("a", "b", "knows");
        assert!((e.weight_or_default() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn weight_never_negative() {
        let e = Edge::new("a", "b", "knows").with_weight(-0.3);
        assert!(e.weight_or_default() >= 0.0);
    }
}

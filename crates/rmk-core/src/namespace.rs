//! Tenant scope. Every node, edge, and vector carries a namespace; the format
//! is validated once at the edges (ingestion, consultation) and trusted
//! internally.

use crate::error::RmkError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

fn namespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(user|group)_[A-Za-z0-9_-]+$").expect("namespace regex is valid")
    })
}

/// Validated tenant scope, e.g. `user_alice` or `group_<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validates `raw` against `^(user|group)_[A-Za-z0-9_-]+$`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, RmkError> {
        let raw = raw.into();
        if namespace_regex().is_match(&raw) {
            Ok(Self(raw))
        } else {
            Err(RmkError::InvalidNamespace(raw))
        }
    }

    /// Builds the default namespace for a user: `user_<user_id>`.
    pub fn for_user(user_id: &str) -> Result<Self, RmkError> {
        Self::parse(format!("user_{user_id}"))
    }

    /// True if this is a `group_*` namespace, requiring membership checks.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.0.starts_with("group_")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Namespace {
    type Error = RmkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_namespaces() {
        assert!(Namespace::parse("user_alice").is_ok());
        assert!(Namespace::parse("group_550e8400-e29b-41d4-a716-446655440000").is_ok());
    }

    #[test]
    fn rejects_invalid_namespaces() {
        assert!(Namespace::parse("").is_err());
        assert!(Namespace::parse("alice").is_err());
        assert!(Namespace::parse("user_").is_err());
        assert!(Namespace::parse("admin_alice").is_err());
        assert!(Namespace::parse("user_alice; DROP").is_err());
    }

    #[test]
    fn for_user_builds_default() {
        let ns = Namespace::for_user("alice").unwrap();
        assert_eq!(ns.as_str(), "user_alice");
        assert!(!ns.is_group());
    }
}

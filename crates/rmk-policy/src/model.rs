//! Policy model types: a policy is `{id, effect, subjects, resources,
//! actions, description}`, the shape of one ABAC/RBAC rule.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Read,
    Write,
    Delete,
}

/// Identifies a candidate to match a policy's `subjects` set against: the
/// requesting user's ID, plus every group they belong to.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub groups: HashSet<String>,
    pub clearance: i64,
}

impl UserContext {
    #[must_use]
    pub fn new(user_id: impl Into<String>, groups: HashSet<String>, clearance: i64) -> Self {
        Self {
            user_id: user_id.into(),
            groups,
            clearance,
        }
    }

    /// The fail-safe context: minimal visibility, never elevated. Used
    /// whenever constructing a real context fails.
    #[must_use]
    pub fn fail_safe(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            groups: HashSet::new(),
            clearance: 0,
        }
    }

    fn matches_subject(&self, subject: &str) -> bool {
        subject == "*" || subject == self.user_id || self.groups.contains(subject)
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub uid: String,
    pub namespace: String,
    pub clearance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub effect: Effect,
    pub subjects: Vec<String>,
    pub resources: Vec<String>,
    pub actions: Vec<Action>,
    pub description: String,
}

impl Policy {
    fn matches_resource(&self, resource: &Resource) -> bool {
        self.resources
            .iter()
            .any(|r| r == "*" || r == &resource.uid || r == &resource.namespace)
    }

    fn matches(&self, ctx: &UserContext, resource: &Resource, action: Action) -> bool {
        self.actions.contains(&action)
            && self.matches_resource(resource)
            && self.subjects.iter().any(|s| ctx.matches_subject(s))
    }
}

/// The loaded set of policies for one namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicySet {
    pub policies: Vec<Policy>,
}

impl PolicySet {
    /// Deny-overrides evaluation:
    /// 1. Any matching Deny policy wins outright.
    /// 2. Else an Allow policy fires only if `ctx.clearance >= resource.clearance`.
    /// 3. Else Deny by default.
    #[must_use]
    pub fn evaluate(&self, ctx: &UserContext, resource: &Resource, action: Action) -> Effect {
        let mut allow_fired = false;
        for policy in &self.policies {
            if !policy.matches(ctx, resource, action) {
                continue;
            }
            match policy.effect {
                Effect::Deny => return Effect::Deny,
                Effect::Allow => allow_fired = true,
            }
        }
        if allow_fired && ctx.clearance >= resource.clearance {
            Effect::Allow
        } else {
            Effect::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(id: &str, effect: Effect, subjects: &[&str], resources: &[&str]) -> Policy {
        Policy {
            id: id.to_string(),
            effect,
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            resources: resources.iter().map(|s| s.to_string()).collect(),
            actions: vec![Action::Read],
            description: String::new(),
        }
    }

    #[test]
    fn deny_overrides_a_matching_allow() {
        let set = PolicySet {
            policies: vec![
                policy("allow-all", Effect::Allow, &["*"], &["*"]),
                policy("deny-bob", Effect::Deny, &["bob"], &["fact-1"]),
            ],
        };
        let ctx = UserContext::new("bob", HashSet::new(), 10);
        let resource = Resource {
            uid: "fact-1".into(),
            namespace: "user_bob".into(),
            clearance: 0,
        };
        assert_eq!(set.evaluate(&ctx, &resource, Action::Read), Effect::Deny);
    }

    #[test]
    fn allow_requires_sufficient_clearance() {
        let set = PolicySet {
            policies: vec![policy("allow-group", Effect::Allow, &["eng"], &["*"])],
        };
        let resource = Resource {
            uid: "fact-1".into(),
            namespace: "group_eng".into(),
            clearance: 5,
        };
        let low = UserContext::new("alice", ["eng".to_string()].into(), 2);
        let high = UserContext::new("alice", ["eng".to_string()].into(), 5);
        assert_eq!(set.evaluate(&low, &resource, Action::Read), Effect::Deny);
        assert_eq!(set.evaluate(&high, &resource, Action::Read), Effect::Allow);
    }

    #[test]
    fn no_matching_policy_denies_by_default() {
        let set = PolicySet::default();
        let ctx = UserContext::new("alice", HashSet::new(), 10);
        let resource = Resource {
            uid: "fact-1".into(),
            namespace: "user_alice".into(),
            clearance: 0,
        };
        assert_eq!(set.evaluate(&ctx, &resource, Action::Read), Effect::Deny);
    }

    #[test]
    fn fail_safe_context_never_elevated() {
        let ctx = UserContext::fail_safe("alice");
        assert_eq!(ctx.clearance, 0);
        assert!(ctx.groups.is_empty());
    }
}

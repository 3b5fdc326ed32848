//! Reflex Engine for the `FactRetrieval` intent branch: a table of
//! `(regex, query-type, response-template)` triples matched against the raw
//! query, each backed by a templated graph lookup.

use regex::Regex;
use rmk_core::{Namespace, RmkResult};
use rmk_graph::GraphClient;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflexQueryType {
    Email,
    Name,
    Groups,
    Preferences,
    Facts,
}

struct ReflexPattern {
    regex: &'static str,
    query_type: ReflexQueryType,
}

fn patterns() -> &'static [(Regex, ReflexQueryType)] {
    static PATTERNS: OnceLock<Vec<(Regex, ReflexQueryType)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let raw: &[ReflexPattern] = &[
            ReflexPattern { regex: r"(?i)what.*(my|is).*email", query_type: ReflexQueryType::Email },
            ReflexPattern { regex: r"(?i)what.*my email address", query_type: ReflexQueryType::Email },
            ReflexPattern { regex: r"(?i)who am i|what.*my name", query_type: ReflexQueryType::Name },
            ReflexPattern { regex: r"(?i)what.*(groups|teams).*(in|belong)", query_type: ReflexQueryType::Groups },
            ReflexPattern { regex: r"(?i)my (groups|teams)", query_type: ReflexQueryType::Groups },
            ReflexPattern { regex: r"(?i)my preferences|what.*i prefer", query_type: ReflexQueryType::Preferences },
            ReflexPattern { regex: r"(?i)what do you (know|remember) about me", query_type: ReflexQueryType::Facts },
        ];
        raw.iter()
            .map(|p| (Regex::new(p.regex).expect("reflex pattern is a fixed literal"), p.query_type))
            .collect()
    })
}

#[must_use]
pub fn match_query(query: &str) -> Option<ReflexQueryType> {
    patterns().iter().find(|(re, _)| re.is_match(query)).map(|(_, qt)| *qt)
}

/// Runs the templated lookup for `query_type` and fills the response
/// template. Returns `None` if the backing data doesn't exist (e.g. no
/// email on file) so the caller can fall through to `Complex`.
pub async fn run_reflex_query(
    graph: &dyn GraphClient,
    namespace: &Namespace,
    user_id: &str,
    query_type: ReflexQueryType,
) -> RmkResult<Option<String>> {
    let user_ns = Namespace::for_user(user_id)?;
    let users = graph.get_nodes_by_names(&user_ns, &[user_id.to_string()]).await?;
    let Some(user_node) = users.get(user_id) else {
        return Ok(None);
    };

    let response = match query_type {
        ReflexQueryType::Email => user_node
            .attributes
            .get("email")
            .map(|e| format!("Your email is {e}.")),
        ReflexQueryType::Name => {
            let name = user_node.attributes.get("display_name").unwrap_or(&user_node.name);
            Some(format!("Your name is {name}."))
        }
        ReflexQueryType::Groups => user_node.attributes.get("groups").map(|g| format!("You belong to: {g}.")),
        ReflexQueryType::Preferences => {
            let prefs = graph.nodes_by_recency(namespace, 50).await?;
            let list: Vec<String> = prefs
                .into_iter()
                .filter(|n| n.tags.contains("preference"))
                .map(|n| n.description)
                .collect();
            if list.is_empty() {
                None
            } else {
                Some(format!("Your preferences: {}.", list.join(", ")))
            }
        }
        ReflexQueryType::Facts => {
            let facts = graph.nodes_by_recency(namespace, 5).await?;
            let list: Vec<String> = facts
                .into_iter()
                .filter(|n| matches!(n.node_type, rmk_core::NodeType::Fact))
                .map(|n| n.description)
                .collect();
            if list.is_empty() {
                None
            } else {
                Some(format!("Here's what I remember: {}.", list.join(" ")))
            }
        }
    };
    Ok(response)
}

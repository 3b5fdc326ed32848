//! Hybrid retrieval: vector search, spreading activation from the top
//! vector seeds, plus by-activation and by-recency namespace scans.

use rmk_core::{Namespace, Node, NodeType, RmkResult};
use rmk_graph::{GraphClient, SpreadActivationRequest};
use rmk_vector::{Embedder, VectorIndex};

const VECTOR_TOP_K: usize = 20;
const SPREAD_SEED_COUNT: usize = 3;
const BY_ACTIVATION_LIMIT: usize = 50;
const BY_RECENCY_LIMIT: usize = 50;

/// One retrieval candidate, tagged with which stage produced it so the
/// merge step can apply vector→spread→activation→recency priority.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: Node,
    pub stage: Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Vector,
    Spread,
    ByActivation,
    ByRecency,
}

pub async fn hybrid_retrieve(
    graph: &dyn GraphClient,
    vector: &dyn VectorIndex,
    embedder: &dyn Embedder,
    namespace: &Namespace,
    user_id: &str,
    query: &str,
) -> RmkResult<Vec<Candidate>> {
    let mut candidates = Vec::new();

    // 3a. Vector search, partitioned into snippet vs entity hits.
    let query_vec = embedder.embed(query).await.ok();
    let mut seed_uids = Vec::new();
    if let Some(query_vec) = query_vec {
        let hits = vector
            .search(namespace.as_str(), user_id, query_vec, VECTOR_TOP_K)
            .await?;
        for hit in hits {
            let is_snippet = hit.payload.contains_key("text");
            let node = if is_snippet {
                let text = hit
                    .payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let mut node = Node::new(NodeType::Fact, namespace.clone(), format!("Chat: {}", first_n_chars(text, 50)));
                node.uid = Some(hit.uid.clone());
                node.description = text.to_string();
                node.confidence = f64::from(hit.score);
                node.activation = 1.0;
                node.tags.insert("vector-result".to_string());
                node.tags.insert("snippet".to_string());
                Some(node)
            } else if let Some(node) = graph.get_node(&hit.uid).await? {
                Some(node)
            } else {
                None
            };
            if let Some(node) = node {
                if seed_uids.len() < SPREAD_SEED_COUNT {
                    if let Some(uid) = &node.uid {
                        seed_uids.push(uid.clone());
                    }
                }
                candidates.push(Candidate { node, stage: Stage::Vector });
            }
        }
    }

    // 3b. Spreading activation from up to the top-3 vector seeds.
    for seed_uid in seed_uids {
        let req = SpreadActivationRequest::new(seed_uid, namespace.clone());
        let activated = graph.spread_activation(&req).await?;
        for item in activated {
            candidates.push(Candidate { node: item.node, stage: Stage::Spread });
        }
    }

    // 3c. By-activation.
    for node in graph.nodes_by_activation(namespace, BY_ACTIVATION_LIMIT).await? {
        candidates.push(Candidate { node, stage: Stage::ByActivation });
    }

    // 3d. By-recency.
    for node in graph.nodes_by_recency(namespace, BY_RECENCY_LIMIT).await? {
        candidates.push(Candidate { node, stage: Stage::ByRecency });
    }

    Ok(candidates)
}

fn first_n_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

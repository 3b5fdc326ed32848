//! `Speculate(req)`: partial-query pre-fetch via a lightweight text search.
//! Unlike `Consult`, this never embeds — it only token-matches against node
//! name/description, which is cheap enough to run on every
//! keystroke-triggered partial query.

use rmk_cache::Speculation;
use rmk_core::{sanitize::clean_query_for_text_search, Namespace, RmkResult};
use rmk_graph::GraphClient;

const TEXT_SEARCH_TOP_K: usize = 5;
/// Namespace scan size used as the text-search candidate pool. The in-
/// memory and Dgraph backends both expose recency-ordered scans already,
/// so reusing that avoids adding a dedicated free-text index.
const CANDIDATE_POOL_SIZE: usize = 200;

pub async fn text_search(
    graph: &dyn GraphClient,
    namespace: &Namespace,
    query: &str,
) -> RmkResult<Vec<String>> {
    let cleaned = clean_query_for_text_search(query);
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }
    let tokens: Vec<&str> = cleaned.split(' ').collect();

    let candidates = graph.nodes_by_recency(namespace, CANDIDATE_POOL_SIZE).await?;
    let mut scored: Vec<(usize, String)> = candidates
        .into_iter()
        .filter_map(|node| {
            let haystack = format!("{} {}", node.name, node.description).to_lowercase();
            let hits = tokens.iter().filter(|t| haystack.contains(*t)).count();
            if hits == 0 {
                None
            } else {
                Some((hits, node.description.clone()))
            }
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(TEXT_SEARCH_TOP_K);
    Ok(scored.into_iter().map(|(_, text)| text).collect())
}

pub async fn speculate(
    graph: &dyn GraphClient,
    speculation: &Speculation,
    user_id: &str,
    namespace: &Namespace,
    query: &str,
) -> RmkResult<()> {
    if query.len() < rmk_cache::MIN_SPECULATION_QUERY_LEN {
        return Ok(());
    }
    let facts = text_search(graph, namespace, query).await?;
    speculation.store(user_id, query, facts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmk_core::{Node, NodeType};
    use rmk_graph::memory_store::InMemoryGraphClient;

    #[tokio::test]
    async fn text_search_finds_token_overlap() {
        let graph = InMemoryGraphClient::new();
        let ns = Namespace::for_user("alice").unwrap();
        let mut node = Node::new(NodeType::Fact, ns.clone(), "Chat: favorite dessert");
        node.description = "Alice's favorite dessert is gulab jamun".to_string();
        graph.insert_node_for_test(node);

        let results = text_search(&graph, &ns, "what is my favorite dessert").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].contains("gulab jamun"));
    }

    #[tokio::test]
    async fn short_queries_return_nothing() {
        let graph = InMemoryGraphClient::new();
        let ns = Namespace::for_user("alice").unwrap();
        assert!(text_search(&graph, &ns, "hi").await.unwrap().is_empty());
    }
}

//! Inventory Lookup Tool
//!
//! Information Hiding:
//! - Two-tier search (vector, then lexical) hidden behind one call
//! - Payload shapes are the only contract the model sees
//! - Errors are folded into payloads; `lookup` cannot fail

use super::{Tool, ToolMetadata, ToolParameter, ToolResult};
use crate::core::{run_with_backoff, AgentError, BackoffPolicy, Embedder};
use crate::inventory::{InventoryStore, TextField};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub const LOOKUP_TOOL_NAME: &str = "lookup_inventory";

pub const EMPTY_INVENTORY_ERROR: &str = "No items found in inventory";

const MAX_RESULTS: usize = 50;

/// Retrieval over the furniture inventory
pub struct InventoryLookupTool {
    store: Arc<dyn InventoryStore>,
    embedder: Arc<dyn Embedder>,
    backoff: BackoffPolicy,
    default_results: usize,
}

impl InventoryLookupTool {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        embedder: Arc<dyn Embedder>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            store,
            embedder,
            backoff,
            default_results: 10,
        }
    }

    pub fn with_default_results(mut self, n: usize) -> Self {
        self.default_results = n.clamp(1, MAX_RESULTS);
        self
    }

    /// Search the inventory for `query`, returning at most `n` items.
    ///
    /// Always returns one of four shapes: empty-inventory error, vector
    /// results, text results, or search-failure error.
    pub async fn lookup(&self, query: &str, n: usize) -> Value {
        match self.search(query, n).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("[InventoryLookup] Search for '{}' failed: {}", query, e);
                json!({
                    "error": "Search failed",
                    "details": e.to_string(),
                    "query": query,
                })
            }
        }
    }

    async fn search(&self, query: &str, n: usize) -> Result<Value, AgentError> {
        let total = self.store.count().await.map_err(store_failure)?;
        if total == 0 {
            tracing::info!("[InventoryLookup] Inventory is empty, skipping search");
            return Ok(json!({
                "error": EMPTY_INVENTORY_ERROR,
                "message": "The inventory database appears to be empty",
                "count": 0,
            }));
        }

        let embedding =
            run_with_backoff(&self.backoff, "embed_query", || self.embedder.embed(query)).await?;

        let vector_hits = self
            .store
            .similarity_search(&embedding, n)
            .await
            .map_err(store_failure)?;

        if !vector_hits.is_empty() {
            tracing::info!(
                "[InventoryLookup] Vector search for '{}' returned {} item(s)",
                query,
                vector_hits.len()
            );
            let results: Vec<Value> = vector_hits
                .iter()
                .map(|hit| {
                    let mut payload = hit.item.to_payload();
                    payload["score"] = json!(hit.score);
                    payload
                })
                .collect();
            return Ok(result_payload(results, "vector", query));
        }

        let text_hits = self
            .store
            .text_search(query, &TextField::ALL, n)
            .await
            .map_err(store_failure)?;

        tracing::info!(
            "[InventoryLookup] Vector search empty, text search for '{}' returned {} item(s)",
            query,
            text_hits.len()
        );
        let results = text_hits.iter().map(|item| item.to_payload()).collect();
        Ok(result_payload(results, "text", query))
    }
}

fn store_failure(e: anyhow::Error) -> AgentError {
    AgentError::ToolFailure(format!("{:#}", e))
}

fn result_payload(results: Vec<Value>, search_type: &str, query: &str) -> Value {
    json!({
        "count": results.len(),
        "results": results,
        "searchType": search_type,
        "query": query,
    })
}

#[async_trait]
impl Tool for InventoryLookupTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: LOOKUP_TOOL_NAME.to_string(),
            description: "Search the furniture inventory. Uses semantic search and falls back \
                          to keyword matching on names, descriptions and categories."
                .to_string(),
            parameters: vec![
                ToolParameter {
                    name: "query".to_string(),
                    param_type: "string".to_string(),
                    description: "What the customer is looking for, e.g. 'red chairs'".to_string(),
                    required: true,
                },
                ToolParameter {
                    name: "n".to_string(),
                    param_type: "integer".to_string(),
                    description: format!(
                        "Maximum number of items to return (default {})",
                        self.default_results
                    ),
                    required: false,
                },
            ],
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("'query' parameter is required and must be a string"))?;

        if query.trim().is_empty() {
            return Err(anyhow::anyhow!("'query' cannot be empty"));
        }
        Ok(())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        if let Err(e) = self.validate(&args) {
            return Ok(ToolResult::failure(json!({
                "error": "Search failed",
                "details": e.to_string(),
                "query": args["query"].as_str().unwrap_or_default(),
            })));
        }

        let query = args["query"].as_str().unwrap_or_default().trim();
        let n = args["n"]
            .as_u64()
            .map(|n| (n as usize).clamp(1, MAX_RESULTS))
            .unwrap_or(self.default_results);

        let payload = self.lookup(query, n).await;
        if payload.get("error").is_some() {
            Ok(ToolResult::failure(payload))
        } else {
            Ok(ToolResult::success(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::memory::InMemoryInventory;
    use crate::inventory::{InventoryItem, ScoredItem};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AgentError> {
            Ok(self.0.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AgentError> {
            Err(AgentError::Upstream("status 500: boom".to_string()))
        }
    }

    /// Wraps a store and counts which search paths were taken
    struct CountingStore {
        inner: InMemoryInventory,
        vector_calls: AtomicUsize,
        text_calls: AtomicUsize,
    }

    impl CountingStore {
        fn new(items: Vec<InventoryItem>) -> Self {
            Self {
                inner: InMemoryInventory::with_items(items),
                vector_calls: AtomicUsize::new(0),
                text_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InventoryStore for CountingStore {
        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }

        async fn sample(&self, limit: usize) -> Result<Vec<InventoryItem>> {
            self.inner.sample(limit).await
        }

        async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredItem>> {
            self.vector_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.similarity_search(embedding, k).await
        }

        async fn text_search(
            &self,
            pattern: &str,
            fields: &[TextField],
            limit: usize,
        ) -> Result<Vec<InventoryItem>> {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.text_search(pattern, fields, limit).await
        }
    }

    fn desks() -> Vec<InventoryItem> {
        vec![
            InventoryItem::new("d1", "Oak Writing Desk")
                .with_categories(&["Desks"])
                .with_embedding("oak writing desk", vec![1.0, 0.0]),
            InventoryItem::new("d2", "Glass Desk")
                .with_categories(&["Desks"])
                .with_embedding("glass desk", vec![0.8, 0.2]),
            InventoryItem::new("c1", "Red Chair")
                .with_categories(&["Chairs"])
                .with_embedding("red chair", vec![-1.0, 0.0]),
        ]
    }

    fn tool(store: Arc<dyn InventoryStore>, embedder: Arc<dyn Embedder>) -> InventoryLookupTool {
        InventoryLookupTool::new(store, embedder, BackoffPolicy::default())
    }

    #[tokio::test]
    async fn test_empty_inventory_short_circuits() {
        let store = Arc::new(CountingStore::new(Vec::new()));
        let lookup = tool(store.clone(), Arc::new(FailingEmbedder));

        let first = lookup.lookup("red chairs", 10).await;
        let second = lookup.lookup("red chairs", 10).await;

        assert_eq!(first["error"], EMPTY_INVENTORY_ERROR);
        assert_eq!(first["count"], 0);
        assert_eq!(first, second);
        assert_eq!(store.vector_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.text_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_vector_hits_skip_text_search() {
        let store = Arc::new(CountingStore::new(desks()));
        let lookup = tool(store.clone(), Arc::new(FixedEmbedder(vec![1.0, 0.0])));

        let payload = lookup.lookup("desk", 10).await;

        assert_eq!(payload["searchType"], "vector");
        assert_eq!(payload["count"], 2);
        assert_eq!(payload["results"][0]["item_name"], "Oak Writing Desk");
        assert!(payload["results"][0]["score"].as_f64().unwrap() > 0.99);
        assert!(payload["results"][0].get("embedding").is_none());
        assert_eq!(store.text_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_text_exactly_once() {
        let store = Arc::new(CountingStore::new(desks()));
        // Orthogonal to every stored vector, so no positive similarity
        let lookup = tool(store.clone(), Arc::new(FixedEmbedder(vec![0.0, 0.0])));

        let payload = lookup.lookup("chair", 10).await;

        assert_eq!(payload["searchType"], "text");
        assert_eq!(payload["count"], 1);
        assert_eq!(payload["results"][0]["item_id"], "c1");
        assert_eq!(store.vector_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.text_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_becomes_payload() {
        let store = Arc::new(CountingStore::new(desks()));
        let lookup = tool(store, Arc::new(FailingEmbedder));

        let payload = lookup.lookup("desk", 10).await;

        assert_eq!(payload["error"], "Search failed");
        assert_eq!(payload["query"], "desk");
        assert!(payload["details"].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_execute_validates_and_clamps() {
        let store = Arc::new(CountingStore::new(desks()));
        let lookup = tool(store, Arc::new(FixedEmbedder(vec![1.0, 0.0])));

        let missing = lookup.execute(json!({})).await.unwrap();
        assert!(!missing.success);
        assert_eq!(missing.output["error"], "Search failed");

        let limited = lookup.execute(json!({"query": "desk", "n": 1})).await.unwrap();
        assert!(limited.success);
        assert_eq!(limited.output["count"], 1);

        let zero = lookup.execute(json!({"query": "desk", "n": 0})).await.unwrap();
        assert_eq!(zero.output["count"], 1);
    }
}

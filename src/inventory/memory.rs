//! In-Memory Inventory
//!
//! Information Hiding:
//! - Vec storage and RwLock hidden behind async interface
//! - Suitable for tests and demos; nothing is persisted

use super::{rank_by_similarity, InventoryItem, InventoryStore, ScoredItem, TextField, TextMatcher};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct InMemoryInventory {
    items: Arc<RwLock<Vec<InventoryItem>>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(items: Vec<InventoryItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    pub async fn insert(&self, item: InventoryItem) {
        self.items.write().await.push(item);
    }
}

impl Default for InMemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventory {
    async fn count(&self) -> Result<usize> {
        Ok(self.items.read().await.len())
    }

    async fn sample(&self, limit: usize) -> Result<Vec<InventoryItem>> {
        let items = self.items.read().await;
        Ok(items.iter().take(limit).cloned().collect())
    }

    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredItem>> {
        let items = self.items.read().await;
        Ok(rank_by_similarity(items.iter().cloned(), embedding, k))
    }

    async fn text_search(
        &self,
        pattern: &str,
        fields: &[TextField],
        limit: usize,
    ) -> Result<Vec<InventoryItem>> {
        let matcher = TextMatcher::new(pattern)?;

        let items = self.items.read().await;
        let matches = items
            .iter()
            .filter(|item| matcher.matches(item, fields))
            .take(limit)
            .cloned()
            .collect::<Vec<_>>();

        tracing::debug!(
            "[InMemoryInventory] Text search '{}' matched {} item(s)",
            pattern,
            matches.len()
        );
        Ok(matches)
    }
}

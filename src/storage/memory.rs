//! In-Memory Checkpoint Storage
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral sessions

use super::CheckpointStore;
use crate::core::ConversationState;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage using HashMap
/// Data is lost when process terminates
pub struct InMemoryCheckpointStore {
    threads: Arc<RwLock<HashMap<String, ConversationState>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        let mut threads = self.threads.write().await;
        threads.insert(thread_id.to_string(), state.clone());
        tracing::debug!(
            "[InMemoryCheckpointStore] Saved {} messages for thread '{}'",
            state.len(),
            thread_id
        );
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned())
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        let mut threads = self.threads.write().await;
        threads.remove(thread_id);
        tracing::debug!("[InMemoryCheckpointStore] Deleted thread '{}'", thread_id);
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let threads = self.threads.read().await;
        Ok(threads.keys().cloned().collect())
    }

    async fn exists(&self, thread_id: &str) -> Result<bool> {
        let threads = self.threads.read().await;
        Ok(threads.contains_key(thread_id))
    }
}

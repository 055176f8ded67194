//! Checkpoint Storage Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Allows swapping between memory, filesystem and SQLite without API changes
//! - Each backend namespaces threads under the configured application id

use crate::config::{CheckpointBackend, StorageConfig};
use crate::core::ConversationState;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod filesystem;
pub mod memory;
pub mod sqlite;

pub use filesystem::FileSystemCheckpointStore;
pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

/// Durable per-thread conversation checkpoints.
///
/// One state per thread; `save` overwrites (last write wins).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Replace the checkpoint of a thread
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()>;

    /// Load the checkpoint of a thread, `None` if the thread has never been saved
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>>;

    /// Remove a thread's checkpoint; missing threads are not an error
    async fn delete(&self, thread_id: &str) -> Result<()>;

    /// List all thread ids in this namespace
    async fn list_threads(&self) -> Result<Vec<String>>;

    async fn exists(&self, thread_id: &str) -> Result<bool> {
        Ok(self.load(thread_id).await?.is_some())
    }
}

/// Build the configured checkpoint backend
pub async fn open_checkpoint_store(config: &StorageConfig) -> Result<Arc<dyn CheckpointStore>> {
    let store: Arc<dyn CheckpointStore> = match config.checkpoint_backend {
        CheckpointBackend::Memory => Arc::new(InMemoryCheckpointStore::new()),
        CheckpointBackend::Filesystem => Arc::new(
            FileSystemCheckpointStore::new(config.checkpoint_dir.clone(), &config.namespace).await?,
        ),
        CheckpointBackend::Sqlite => Arc::new(
            SqliteCheckpointStore::open(config.checkpoint_db.clone(), &config.namespace).await?,
        ),
    };

    tracing::info!(
        "Checkpoint store ready ({:?}, namespace '{}')",
        config.checkpoint_backend,
        config.namespace
    );
    Ok(store)
}

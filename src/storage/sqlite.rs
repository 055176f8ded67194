//! SQLite Checkpoint Storage
//!
//! Information Hiding:
//! - Table layout hidden; one row per (namespace, thread)
//! - Blocking rusqlite calls run on the blocking pool

use super::CheckpointStore;
use crate::core::ConversationState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    namespace TEXT NOT NULL,
    thread_id TEXT NOT NULL,
    messages TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, thread_id)
);
"#;

pub struct SqliteCheckpointStore {
    db_path: PathBuf,
    namespace: String,
}

impl SqliteCheckpointStore {
    pub async fn open(db_path: PathBuf, namespace: &str) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create checkpoint directory")?;
            }
        }

        let store = Self {
            db_path,
            namespace: namespace.to_string(),
        };
        store
            .run_db(|conn| {
                conn.execute_batch(SCHEMA)
                    .context("Failed to create checkpoint schema")
            })
            .await?;
        Ok(store)
    }

    async fn run_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)
                .with_context(|| format!("Failed to open checkpoint database {:?}", path))?;
            f(&conn)
        })
        .await
        .context("Checkpoint database task panicked")?
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        let messages =
            serde_json::to_string(state).context("Failed to serialize conversation state")?;
        let namespace = self.namespace.clone();
        let thread = thread_id.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();

        self.run_db(move |conn| {
            conn.execute(
                "INSERT INTO checkpoints (namespace, thread_id, messages, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(namespace, thread_id)
                 DO UPDATE SET messages = excluded.messages, updated_at = excluded.updated_at",
                params![namespace, thread, messages, updated_at],
            )
            .context("Failed to write checkpoint")?;
            Ok(())
        })
        .await?;

        tracing::debug!(
            "[SqliteCheckpointStore] Saved {} messages for thread '{}'",
            state.len(),
            thread_id
        );
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        let namespace = self.namespace.clone();
        let thread = thread_id.to_string();

        let raw: Option<String> = self
            .run_db(move |conn| {
                conn.query_row(
                    "SELECT messages FROM checkpoints WHERE namespace = ?1 AND thread_id = ?2",
                    params![namespace, thread],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to read checkpoint")
            })
            .await?;

        raw.map(|json| {
            serde_json::from_str(&json).context("Failed to deserialize conversation state")
        })
        .transpose()
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        let namespace = self.namespace.clone();
        let thread = thread_id.to_string();

        self.run_db(move |conn| {
            conn.execute(
                "DELETE FROM checkpoints WHERE namespace = ?1 AND thread_id = ?2",
                params![namespace, thread],
            )
            .context("Failed to delete checkpoint")?;
            Ok(())
        })
        .await?;

        tracing::debug!("[SqliteCheckpointStore] Deleted thread '{}'", thread_id);
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let namespace = self.namespace.clone();

        self.run_db(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT thread_id FROM checkpoints WHERE namespace = ?1 ORDER BY updated_at DESC",
            )?;
            let threads = stmt
                .query_map(params![namespace], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(threads)
        })
        .await
    }
}

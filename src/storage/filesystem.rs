//! File System Checkpoint Storage
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Directory structure management hidden behind interface
//! - Thread ids are escaped into file names, so any id is accepted

use super::CheckpointStore;
use crate::core::ConversationState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// File system storage - each thread is a JSON file
/// Files are stored as {base_path}/{namespace}/{escaped_thread_id}.json
pub struct FileSystemCheckpointStore {
    dir: PathBuf,
}

impl FileSystemCheckpointStore {
    pub async fn new(base_path: PathBuf, namespace: &str) -> Result<Self> {
        let dir = base_path.join(escape_id(namespace));
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create checkpoint directory")?;

        Ok(Self { dir })
    }

    fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_id(thread_id)))
    }
}

/// Keep `[A-Za-z0-9_-]`, write every other byte as `~XX`
fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("~{:02X}", byte));
        }
    }
    out
}

fn unescape_id(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'~' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl CheckpointStore for FileSystemCheckpointStore {
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        let path = self.thread_path(thread_id);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)
            .context("Failed to serialize conversation state")?;

        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write checkpoint file: {:?}", tmp_path))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to replace checkpoint file: {:?}", path))?;

        tracing::debug!(
            "[FileSystemCheckpointStore] Saved {} messages for thread '{}' to {:?}",
            state.len(),
            thread_id,
            path
        );
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        let path = self.thread_path(thread_id);

        if !path.exists() {
            tracing::debug!("[FileSystemCheckpointStore] Thread '{}' does not exist", thread_id);
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read checkpoint file: {:?}", path))?;

        let state: ConversationState =
            serde_json::from_str(&json).context("Failed to deserialize conversation state")?;

        tracing::debug!(
            "[FileSystemCheckpointStore] Loaded {} messages for thread '{}' from {:?}",
            state.len(),
            thread_id,
            path
        );
        Ok(Some(state))
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        let path = self.thread_path(thread_id);

        if path.exists() {
            fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to delete checkpoint file: {:?}", path))?;
            tracing::debug!("[FileSystemCheckpointStore] Deleted thread '{}' at {:?}", thread_id, path);
        }

        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let mut threads = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .context("Failed to read checkpoint directory")?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(thread_id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(unescape_id)
                {
                    threads.push(thread_id);
                }
            }
        }

        tracing::debug!("[FileSystemCheckpointStore] Listed {} threads", threads.len());
        Ok(threads)
    }

    async fn exists(&self, thread_id: &str) -> Result<bool> {
        Ok(self.thread_path(thread_id).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Message, ToolCall};
    use serde_json::json;
    use tempfile::TempDir;

    fn transcript() -> ConversationState {
        ConversationState::from_messages(vec![
            Message::user("desk"),
            Message::assistant_with_calls(
                "",
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "lookup_inventory".to_string(),
                    arguments: json!({"query": "desk", "n": 10}),
                }],
            ),
            Message::tool_result("call_1", "lookup_inventory", "{\"count\":2}"),
            Message::assistant("We have an oak desk and a glass desk."),
        ])
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemCheckpointStore::new(temp_dir.path().to_path_buf(), "inventory_database")
            .await
            .unwrap();

        store.save("t2", &transcript()).await.unwrap();
        let loaded = store.load("t2").await.unwrap().unwrap();

        assert_eq!(loaded, transcript());
    }

    #[tokio::test]
    async fn test_load_nonexistent_thread() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemCheckpointStore::new(temp_dir.path().to_path_buf(), "ns")
            .await
            .unwrap();

        assert!(store.load("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemCheckpointStore::new(temp_dir.path().to_path_buf(), "ns")
            .await
            .unwrap();

        store.save("thread-1", &transcript()).await.unwrap();
        store.save("user@example.com/42", &transcript()).await.unwrap();

        let mut threads = store.list_threads().await.unwrap();
        threads.sort();
        assert_eq!(threads, vec!["thread-1".to_string(), "user@example.com/42".to_string()]);

        store.delete("thread-1").await.unwrap();
        assert!(!store.exists("thread-1").await.unwrap());
        store.delete("thread-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let a = FileSystemCheckpointStore::new(temp_dir.path().to_path_buf(), "app_a")
            .await
            .unwrap();
        let b = FileSystemCheckpointStore::new(temp_dir.path().to_path_buf(), "app_b")
            .await
            .unwrap();

        a.save("t1", &transcript()).await.unwrap();
        assert!(b.load("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let store = FileSystemCheckpointStore::new(path.clone(), "ns").await.unwrap();
            store.save("persist", &transcript()).await.unwrap();
        }

        {
            let store = FileSystemCheckpointStore::new(path, "ns").await.unwrap();
            let loaded = store.load("persist").await.unwrap().unwrap();
            assert_eq!(loaded.len(), 4);
        }
    }

    #[test]
    fn test_id_escaping_round_trips() {
        for id in ["t1", "a/b", "../etc", "ünï", "x~y"] {
            let escaped = escape_id(id);
            assert!(!escaped.contains('/'));
            assert!(!escaped.contains('.'));
            assert_eq!(unescape_id(&escaped).as_deref(), Some(id));
        }
    }
}

//! SQLite Inventory
//!
//! Information Hiding:
//! - Schema and JSON column encoding hidden from callers
//! - Blocking rusqlite calls run on the blocking pool
//! - A connection is opened per operation, so the store is cheap to share

use super::{rank_by_similarity, InventoryItem, InventoryStore, ScoredItem, TextField, TextMatcher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_items (
    item_id TEXT PRIMARY KEY,
    item_name TEXT NOT NULL,
    item_description TEXT NOT NULL DEFAULT '',
    categories TEXT NOT NULL DEFAULT '[]',
    embedding_text TEXT NOT NULL DEFAULT '',
    embedding TEXT NOT NULL DEFAULT '[]',
    attributes TEXT NOT NULL DEFAULT '{}'
);
"#;

const SELECT_COLUMNS: &str =
    "SELECT item_id, item_name, item_description, categories, embedding_text, embedding, attributes FROM inventory_items";

type RawRow = (String, String, String, String, String, String, String);

pub struct SqliteInventory {
    db_path: PathBuf,
}

impl SqliteInventory {
    /// Open (and create if needed) the inventory database at `db_path`
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create inventory directory")?;
            }
        }

        let store = Self { db_path };
        store
            .run_db(|conn| {
                conn.execute_batch(SCHEMA)
                    .context("Failed to create inventory schema")
            })
            .await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert or replace items, returning how many were written
    pub async fn upsert_items(&self, items: Vec<InventoryItem>) -> Result<usize> {
        self.run_db(move |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO inventory_items
                        (item_id, item_name, item_description, categories, embedding_text, embedding, attributes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for item in &items {
                    stmt.execute(params![
                        item.item_id,
                        item.item_name,
                        item.item_description,
                        serde_json::to_string(&item.categories)?,
                        item.embedding_text,
                        serde_json::to_string(&item.embedding)?,
                        serde_json::to_string(&item.attributes)?,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(items.len())
        })
        .await
    }

    async fn run_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)
                .with_context(|| format!("Failed to open inventory database {:?}", path))?;
            f(&conn)
        })
        .await
        .context("Inventory database task panicked")?
    }

    async fn query_items(&self, sql: String) -> Result<Vec<InventoryItem>> {
        let rows = self
            .run_db(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<RawRow>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(decode_row).collect()
    }
}

fn decode_row(row: RawRow) -> Result<InventoryItem> {
    let (item_id, item_name, item_description, categories, embedding_text, embedding, attributes) =
        row;
    Ok(InventoryItem {
        categories: serde_json::from_str(&categories)
            .with_context(|| format!("Corrupt categories for item '{}'", item_id))?,
        embedding: serde_json::from_str(&embedding)
            .with_context(|| format!("Corrupt embedding for item '{}'", item_id))?,
        attributes: serde_json::from_str(&attributes)
            .with_context(|| format!("Corrupt attributes for item '{}'", item_id))?,
        item_id,
        item_name,
        item_description,
        embedding_text,
    })
}

#[async_trait]
impl InventoryStore for SqliteInventory {
    async fn count(&self) -> Result<usize> {
        let count: i64 = self
            .run_db(|conn| {
                conn.query_row("SELECT COUNT(*) FROM inventory_items", [], |row| row.get(0))
                    .context("Failed to count inventory items")
            })
            .await?;
        Ok(count as usize)
    }

    async fn sample(&self, limit: usize) -> Result<Vec<InventoryItem>> {
        self.query_items(format!("{} ORDER BY rowid LIMIT {}", SELECT_COLUMNS, limit))
            .await
    }

    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredItem>> {
        let items = self
            .query_items(SELECT_COLUMNS.to_string())
            .await?;
        Ok(rank_by_similarity(items, embedding, k))
    }

    /// Rows are filtered in Rust so categories match as text, not as their stored JSON
    async fn text_search(
        &self,
        pattern: &str,
        fields: &[TextField],
        limit: usize,
    ) -> Result<Vec<InventoryItem>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let matcher = TextMatcher::new(pattern)?;
        let items = self
            .query_items(format!("{} ORDER BY rowid", SELECT_COLUMNS))
            .await?
            .into_iter()
            .filter(|item| matcher.matches(item, fields))
            .take(limit)
            .collect::<Vec<_>>();

        tracing::debug!(
            "[SqliteInventory] Text search '{}' matched {} item(s)",
            pattern,
            items.len()
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn items() -> Vec<InventoryItem> {
        vec![
            InventoryItem::new("d1", "Oak Writing Desk")
                .with_description("Solid oak, two drawers")
                .with_categories(&["Office", "Desks"])
                .with_embedding("oak writing desk", vec![1.0, 0.0, 0.0])
                .with_attribute("prices", json!({"full_price": 320.0, "sale_price": 280.0})),
            InventoryItem::new("d2", "Glass Desk")
                .with_categories(&["Office", "Desks"])
                .with_embedding("glass desk", vec![0.9, 0.1, 0.0]),
            InventoryItem::new("c1", "100% Wool Armchair")
                .with_categories(&["Chairs"])
                .with_embedding("wool armchair", vec![0.0, 0.0, 1.0]),
        ]
    }

    async fn seeded() -> (TempDir, SqliteInventory) {
        let dir = TempDir::new().unwrap();
        let store = SqliteInventory::open(dir.path().join("inventory.db"))
            .await
            .unwrap();
        store.upsert_items(items()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_round_trip_preserves_fields() {
        let (_dir, store) = seeded().await;
        assert_eq!(store.count().await.unwrap(), 3);

        let sample = store.sample(1).await.unwrap();
        assert_eq!(sample[0], items()[0]);
    }

    #[tokio::test]
    async fn test_similarity_search_ranks() {
        let (_dir, store) = seeded().await;
        let hits = store.similarity_search(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.item_id, "d1");
        assert_eq!(hits[1].item.item_id, "d2");
    }

    #[tokio::test]
    async fn test_text_search() {
        let (_dir, store) = seeded().await;

        let hits = store.text_search("DESK", &TextField::ALL, 10).await.unwrap();
        assert_eq!(hits.len(), 2);

        let hits = store.text_search("desks", &[TextField::Categories], 1).await.unwrap();
        assert_eq!(hits.len(), 1);

        let hits = store.text_search("100%", &TextField::ALL, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id, "c1");

        let hits = store.text_search("_", &TextField::ALL, 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_empty_database() {
        let dir = TempDir::new().unwrap();
        let store = SqliteInventory::open(dir.path().join("nested/inventory.db"))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.sample(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_search_ignores_stored_json_syntax() {
        let (_dir, store) = seeded().await;

        for pattern in ["[", "\"", "\",\""] {
            let hits = store.text_search(pattern, &TextField::ALL, 10).await.unwrap();
            assert!(hits.is_empty(), "'{}' should match nothing", pattern);
        }

        // Multiple categories are matched as space-joined text
        let hits = store
            .text_search("office desks", &[TextField::Categories], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_text_search_folds_non_ascii_case() {
        let dir = TempDir::new().unwrap();
        let store = SqliteInventory::open(dir.path().join("inventory.db"))
            .await
            .unwrap();
        store
            .upsert_items(vec![
                InventoryItem::new("s1", "Étagère Shelf").with_embedding("etagere", vec![1.0]),
                InventoryItem::new("d1", "Oak Desk").with_embedding("oak desk", vec![1.0]),
            ])
            .await
            .unwrap();

        let hits = store.text_search("étagère", &TextField::ALL, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_id, "s1");
    }
}

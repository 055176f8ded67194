//! Application wiring
//!
//! Information Hiding:
//! - Concrete backends chosen from settings in one place

use crate::agent::{TurnOutcome, TurnRunner};
use crate::config::Settings;
use crate::core::{AgentError, ChatModel, ConversationState, Embedder, LLMClient, OpenAiEmbedder};
use crate::inventory::sqlite::SqliteInventory;
use crate::inventory::{InventoryItem, InventoryStore};
use crate::storage::{open_checkpoint_store, CheckpointStore};
use crate::tools::{InventoryLookupTool, ToolRegistry};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Fully assembled inventory assistant
pub struct InventoryAgent {
    settings: Settings,
    runner: TurnRunner,
    checkpoints: Arc<dyn CheckpointStore>,
    inventory: Arc<SqliteInventory>,
}

impl InventoryAgent {
    /// Open the configured stores and connect to the model endpoint
    pub async fn build(settings: Settings, api_key: String) -> Result<Self> {
        let inventory = Arc::new(
            SqliteInventory::open(settings.storage.inventory_db.clone())
                .await
                .context("Failed to open inventory database")?,
        );
        let checkpoints = open_checkpoint_store(&settings.storage)
            .await
            .context("Failed to open checkpoint store")?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(api_key.clone(), &settings.llm)?);
        let model: Arc<dyn ChatModel> = Arc::new(LLMClient::new(api_key, settings.llm.clone())?);

        Ok(Self::assemble(settings, model, embedder, inventory, checkpoints))
    }

    /// Wire already-constructed components together
    pub fn assemble(
        settings: Settings,
        model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        inventory: Arc<SqliteInventory>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        let lookup = InventoryLookupTool::new(inventory.clone(), embedder, settings.backoff.clone())
            .with_default_results(settings.agent.default_result_count);

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(lookup));

        let runner = TurnRunner::new(model, Arc::new(registry), checkpoints.clone())
            .with_backoff(settings.backoff.clone())
            .with_max_steps(settings.agent.max_steps)
            .with_turn_timeout(Duration::from_millis(settings.agent.turn_timeout_ms));

        Self {
            settings,
            runner,
            checkpoints,
            inventory,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one turn, bounded by `agent.turn_timeout_ms`
    pub async fn send(&self, thread_id: &str, message: &str) -> Result<TurnOutcome, AgentError> {
        self.runner.run_turn(thread_id, message).await
    }

    pub async fn history(&self, thread_id: &str) -> Result<ConversationState, AgentError> {
        self.runner.history(thread_id).await
    }

    pub async fn list_threads(&self) -> Result<Vec<String>> {
        let mut threads = self.checkpoints.list_threads().await?;
        threads.sort();
        Ok(threads)
    }

    /// Returns false if the thread did not exist
    pub async fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        if !self.checkpoints.exists(thread_id).await? {
            return Ok(false);
        }
        self.checkpoints.delete(thread_id).await?;
        Ok(true)
    }

    pub async fn inventory_count(&self) -> Result<usize> {
        self.inventory.count().await
    }

    pub async fn inventory_sample(&self, limit: usize) -> Result<Vec<InventoryItem>> {
        self.inventory.sample(limit).await
    }

    /// Load a JSON array of items that already carry embeddings
    pub async fn import_inventory(&self, path: &Path) -> Result<usize> {
        let items = read_inventory_file(path).await?;
        let imported = self.inventory.upsert_items(items).await?;
        tracing::info!(
            "[InventoryAgent] Imported {} item(s) from {}",
            imported,
            path.display()
        );
        Ok(imported)
    }
}

pub async fn read_inventory_file(path: &Path) -> Result<Vec<InventoryItem>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let items: Vec<InventoryItem> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of inventory items", path.display()))?;

    if let Some(item) = items.iter().find(|item| item.embedding.is_empty()) {
        anyhow::bail!("Item '{}' has no embedding", item.item_id);
    }
    Ok(items)
}

//! Inventory Document Store
//!
//! Information Hiding:
//! - Storage backend hidden behind `InventoryStore`
//! - Ranking and matching rules live with each backend
//! - The agent only reads; items are never mutated through this interface

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod memory;
pub mod sqlite;

/// A furniture item as stored in the inventory collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: String,
    pub item_name: String,
    #[serde(default)]
    pub item_description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Text the embedding was generated from
    #[serde(default)]
    pub embedding_text: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Price, brand, reviews and anything else the catalogue carries
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl InventoryItem {
    pub fn new(item_id: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            item_name: item_name.into(),
            item_description: String::new(),
            categories: Vec::new(),
            embedding_text: String::new(),
            embedding: Vec::new(),
            attributes: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.item_description = description.into();
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_embedding(mut self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embedding_text = text.into();
        self.embedding = embedding;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// JSON handed to the model: everything except the embedding vector
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("item_id".to_string(), Value::String(self.item_id.clone()));
        payload.insert("item_name".to_string(), Value::String(self.item_name.clone()));
        payload.insert(
            "item_description".to_string(),
            Value::String(self.item_description.clone()),
        );
        payload.insert(
            "categories".to_string(),
            Value::Array(self.categories.iter().cloned().map(Value::String).collect()),
        );
        for (key, value) in &self.attributes {
            payload.insert(key.clone(), value.clone());
        }
        Value::Object(payload)
    }

    fn field_text(&self, field: TextField) -> String {
        match field {
            TextField::Name => self.item_name.clone(),
            TextField::Description => self.item_description.clone(),
            TextField::Categories => self.categories.join(" "),
            TextField::EmbeddingText => self.embedding_text.clone(),
        }
    }
}

/// Item paired with its similarity to the query vector
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub item: InventoryItem,
    pub score: f32,
}

/// Text fields the lexical fallback matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Name,
    Description,
    Categories,
    EmbeddingText,
}

impl TextField {
    pub const ALL: [TextField; 4] = [
        TextField::Name,
        TextField::Description,
        TextField::Categories,
        TextField::EmbeddingText,
    ];
}

/// Literal, Unicode case-insensitive substring match shared by every backend
pub(crate) struct TextMatcher {
    regex: Regex,
}

impl TextMatcher {
    pub(crate) fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(&regex::escape(pattern))
            .case_insensitive(true)
            .build()
            .context("Failed to build text search pattern")?;
        Ok(Self { regex })
    }

    pub(crate) fn matches(&self, item: &InventoryItem, fields: &[TextField]) -> bool {
        fields
            .iter()
            .any(|field| self.regex.is_match(&item.field_text(*field)))
    }
}

/// Read side of the inventory collection
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Number of items in the collection
    async fn count(&self) -> Result<usize>;

    /// Up to `limit` items in storage order
    async fn sample(&self, limit: usize) -> Result<Vec<InventoryItem>>;

    /// Top `k` items by cosine similarity; items with no positive similarity are omitted
    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredItem>>;

    /// Items where any of `fields` contains `pattern`, ignoring case
    async fn text_search(
        &self,
        pattern: &str,
        fields: &[TextField],
        limit: usize,
    ) -> Result<Vec<InventoryItem>>;
}

/// Cosine similarity; 0.0 for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub(crate) fn rank_by_similarity(
    items: impl IntoIterator<Item = InventoryItem>,
    query: &[f32],
    k: usize,
) -> Vec<ScoredItem> {
    let mut scored: Vec<ScoredItem> = items
        .into_iter()
        .map(|item| {
            let score = cosine_similarity(query, &item.embedding);
            ScoredItem { item, score }
        })
        .filter(|s| s.score > 0.0)
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
    scored
}

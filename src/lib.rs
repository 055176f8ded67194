//! Furnish - Conversational furniture-inventory assistant
//!
//! A tool-calling agent that answers questions about a furniture
//! inventory, with vector search plus lexical fallback, rate-limit aware
//! retries and per-thread conversation checkpoints.

pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod inventory;
pub mod storage;
pub mod tools;
pub mod utils;

pub use agent::{TurnOutcome, TurnRunner};
pub use app::InventoryAgent;
pub use config::Settings;
pub use crate::core::{AgentError, BackoffPolicy, ConversationState, Message, ToolCall};

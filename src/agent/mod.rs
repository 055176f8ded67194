//! Conversation State Machine
//!
//! Information Hiding:
//! - Graph routing, model invocation and the turn loop are separate pieces
//! - Callers only see `TurnRunner::start_turn`

pub mod graph;
pub mod invoker;
pub mod runner;

pub use graph::{route, Node};
pub use invoker::{system_prompt, ModelInvoker};
pub use runner::{TurnOutcome, TurnRunner, DEFAULT_MAX_STEPS};

pub mod backoff;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod message;

pub use backoff::{run_with_backoff, BackoffPolicy};
pub use embedding::{Embedder, OpenAiEmbedder};
pub use error::AgentError;
pub use llm::{ChatModel, LLMClient};
pub use message::{ConversationState, Message, ToolCall};

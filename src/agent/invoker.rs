//! Model Invoker
//!
//! Information Hiding:
//! - Persona text and its timestamp parameter hidden from the turn loop
//! - Rate-limit retries applied here, around the chat call only

use crate::core::{run_with_backoff, AgentError, BackoffPolicy, ChatModel, ConversationState, Message};
use crate::tools::ToolMetadata;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// System persona for the inventory assistant
pub fn system_prompt(tool_names: &[String], now: DateTime<Utc>) -> String {
    let tools = if tool_names.is_empty() {
        "(none)".to_string()
    } else {
        tool_names.join(", ")
    };

    format!(
        "You are a helpful AI assistant for a furniture store, answering questions about the \
         store's inventory. You have access to the following tools: {tools}.\n\n\
         Rules:\n\
         1. For ANY question about furniture, products, availability, prices or categories, \
            ALWAYS call the inventory lookup tool first, even if you think you know the answer.\n\
         2. Only describe items that the tool returned. Never invent products, prices or stock.\n\
         3. If the tool result has \"count\": 0 or an error saying no items were found in \
            inventory, tell the customer the inventory is currently empty. Do not call the tool \
            again for the same question.\n\
         4. If the tool result reports that the search failed, apologise, say the search is \
            temporarily unavailable, and suggest trying again or rephrasing.\n\
         5. If the search returned items, summarise the relevant ones by name and mention useful \
            details such as price or category.\n\
         6. For follow-up questions, use the earlier results in this conversation when they \
            already contain the answer.\n\n\
         Current time: {time}.",
        tools = tools,
        time = now.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

pub struct ModelInvoker {
    model: Arc<dyn ChatModel>,
    backoff: BackoffPolicy,
}

impl ModelInvoker {
    pub fn new(model: Arc<dyn ChatModel>, backoff: BackoffPolicy) -> Self {
        Self { model, backoff }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Ask the model for the next assistant message given the whole transcript
    pub async fn invoke(
        &self,
        state: &ConversationState,
        tools: &[ToolMetadata],
    ) -> Result<Message, AgentError> {
        let tool_names: Vec<String> = tools.iter().map(|t| t.name.clone()).collect();
        let prompt = system_prompt(&tool_names, Utc::now());

        let reply = run_with_backoff(&self.backoff, "chat_complete", || {
            self.model.complete(&prompt, state.messages(), tools)
        })
        .await?;

        match reply {
            Message::Assistant { .. } => Ok(reply),
            other => Err(AgentError::Upstream(format!(
                "Model replied with a '{}' message",
                other.role()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[test]
    fn test_prompt_mentions_tools_and_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let prompt = system_prompt(&["lookup_inventory".to_string()], now);

        assert!(prompt.contains("lookup_inventory"));
        assert!(prompt.contains("2024-03-01 09:30:00 UTC"));
        assert!(prompt.contains("ALWAYS call the inventory lookup tool"));
    }

    struct RecordingModel {
        prompts: Mutex<Vec<(String, usize)>>,
        reply: Message,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(
            &self,
            system_prompt: &str,
            history: &[Message],
            _tools: &[ToolMetadata],
        ) -> Result<Message, AgentError> {
            self.prompts
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), history.len()));
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_invoke_passes_full_history() {
        let model = Arc::new(RecordingModel {
            prompts: Mutex::new(Vec::new()),
            reply: Message::assistant("Hello!"),
        });
        let invoker = ModelInvoker::new(model.clone(), BackoffPolicy::default());

        let state = ConversationState::from_messages(vec![
            Message::user("hi"),
            Message::assistant("Hello"),
            Message::user("any desks?"),
        ]);
        let reply = invoker.invoke(&state, &[]).await.unwrap();

        assert_eq!(reply, Message::assistant("Hello!"));
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, 3);
        assert!(prompts[0].0.contains("furniture store"));
    }

    #[tokio::test]
    async fn test_rejects_non_assistant_reply() {
        let model = Arc::new(RecordingModel {
            prompts: Mutex::new(Vec::new()),
            reply: Message::user("confused"),
        });
        let invoker = ModelInvoker::new(model, BackoffPolicy::default());

        let err = invoker
            .invoke(&ConversationState::from_messages(vec![Message::user("hi")]), &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream");
    }
}

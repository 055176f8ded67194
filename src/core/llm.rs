use super::error::AgentError;
use super::message::{Message, ToolCall};
use crate::config::LLMConfig;
use crate::tools::ToolMetadata;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Chat completion endpoint with function calling.
///
/// Implementations classify failures into `AgentError` themselves so that the
/// backoff executor can recognise rate limiting.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
        tools: &[ToolMetadata],
    ) -> Result<Message, AgentError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

fn function_kind() -> String {
    "function".to_string()
}

impl WireMessage {
    fn new(role: &str, content: Option<String>) -> Self {
        Self {
            role: role.to_string(),
            content,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn from_message(message: &Message) -> Self {
        match message {
            Message::User { content } => Self::new("user", Some(content.clone())),
            Message::Assistant { content, tool_calls } => {
                let mut wire = Self::new("assistant", Some(content.clone()));
                if !tool_calls.is_empty() {
                    if content.is_empty() {
                        wire.content = None;
                    }
                    wire.tool_calls = Some(
                        tool_calls
                            .iter()
                            .map(|call| WireToolCall {
                                id: call.id.clone(),
                                kind: function_kind(),
                                function: WireFunction {
                                    name: call.name.clone(),
                                    arguments: call.arguments.to_string(),
                                },
                            })
                            .collect(),
                    );
                }
                wire
            }
            Message::Tool {
                tool_call_id,
                content,
                ..
            } => {
                let mut wire = Self::new("tool", Some(content.clone()));
                wire.tool_call_id = Some(tool_call_id.clone());
                wire
            }
        }
    }

    fn into_assistant(self) -> Message {
        let tool_calls = self
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments)),
            })
            .collect();

        Message::assistant_with_calls(self.content.unwrap_or_default(), tool_calls)
    }
}

/// Turn a non-success response into a classified error
pub(crate) async fn check_status(response: Response) -> Result<Response, AgentError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AgentError::from_status(status.as_u16(), &body))
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

pub(crate) fn http_client(timeout_secs: u64) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// OpenAI-compatible chat completions client
pub struct LLMClient {
    client: Client,
    api_key: String,
    config: LLMConfig,
}

impl LLMClient {
    pub fn new(api_key: String, config: LLMConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config.request_timeout_secs)?,
            api_key,
            config,
        })
    }
}

#[async_trait]
impl ChatModel for LLMClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
        tools: &[ToolMetadata],
    ) -> Result<Message, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage::new("system", Some(system_prompt.to_string())));
        messages.extend(history.iter().map(WireMessage::from_message));

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            tools: tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireFunctionDef {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters_schema(),
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(endpoint(&self.config.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Upstream(format!("HTTP request failed: {}", e)))?;

        let response = check_status(response).await?;

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| AgentError::Upstream(format!("Response decode error: {}", e)))?;

        let reply = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.into_assistant())
            .ok_or_else(|| AgentError::Upstream("Response contained no choices".to_string()))?;

        tracing::debug!(
            "[LLMClient] Reply with {} tool call(s)",
            reply.tool_calls().len()
        );
        Ok(reply)
    }
}

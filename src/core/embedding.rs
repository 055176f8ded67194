//! Embedding Endpoint
//!
//! Information Hiding:
//! - Request/response shapes of the `/embeddings` endpoint hidden
//! - HTTP status classification shared with the chat client

use super::error::AgentError;
use super::llm::{check_status, endpoint, http_client};
use crate::config::LLMConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Encodes text into the vector space of the inventory index
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, config: &LLMConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config.request_timeout_secs)?,
            api_key,
            base_url: config.base_url.clone(),
            model: config.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Upstream(format!("HTTP request failed: {}", e)))?;

        let response = check_status(response).await?;

        let body = response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| AgentError::Upstream(format!("Response decode error: {}", e)))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AgentError::Upstream("Embedding response was empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder_for(server: &MockServer) -> OpenAiEmbedder {
        let mut config = Settings::defaults().unwrap().llm;
        config.base_url = server.uri();
        OpenAiEmbedder::new("test-key".to_string(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.25, -0.5, 1.0]}]
            })))
            .mount(&server)
            .await;

        let vector = embedder_for(&server).embed("oak desk").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = embedder_for(&server).embed("oak desk").await.unwrap_err();
        assert!(err.is_rate_limited());
    }
}

//! HTTP embedding backend
//!
//! Talks to an Ollama-compatible `/api/embeddings` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use climate_agent_core::{Embedder, Result};

use crate::retriever::retrieval_error;

/// Embedder configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Endpoint base URL
    pub endpoint: String,
    /// Embedding model name
    pub model: String,
    /// Request timeout
    pub timeout: std::time::Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// Embedder backed by an HTTP embedding endpoint
pub struct HttpEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| retrieval_error(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.config.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| retrieval_error(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(retrieval_error(format!("embedding endpoint returned {status}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| retrieval_error(format!("invalid embedding response: {e}")))?;

        if parsed.embedding.is_empty() {
            return Err(retrieval_error("embedding endpoint returned an empty vector"));
        }
        Ok(parsed.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.model, "nomic-embed-text");
        assert!(config.endpoint.starts_with("http://"));
    }

    #[test]
    fn test_request_serialization() {
        let request = EmbeddingRequest {
            model: "nomic-embed-text",
            prompt: "what is climate change",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "nomic-embed-text");
        assert_eq!(json["prompt"], "what is climate change");
    }
}

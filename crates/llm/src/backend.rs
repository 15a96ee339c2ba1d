//! HTTP chat backend
//!
//! Talks to an Ollama-compatible `/api/chat` endpoint and implements the
//! model capabilities the pipeline needs: structured classifier calls,
//! grounded answer generation, and translation. Transient failures retry
//! with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use climate_agent_core::{
    ClassifierModel, Document, Error, Message, ResponseModel, Result, Translator,
};

use crate::prompt::{answer_prompt, translation_prompt};

/// Chat backend configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// API key (optional)
    pub api_key: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "llama3.1:8b-instruct-q4_K_M".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            api_key: None,
            max_tokens: 1024,
            temperature: 0.1,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

/// Chat backend over an HTTP endpoint
#[derive(Clone)]
pub struct HttpChatBackend {
    client: Client,
    config: ChatConfig,
}

impl HttpChatBackend {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Model(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    async fn execute_request(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let mut builder = self.client.post(self.api_url("/chat")).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Model(format!("chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("chat endpoint returned {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Model(format!("invalid chat response: {e}")))
    }

    /// 5xx and transport errors are retryable, 4xx are not
    fn is_retryable(error: &Error) -> bool {
        match error {
            Error::Model(message) => {
                message.contains("chat request failed")
                    || message.contains("returned 5")
                    || message.contains("timed out")
            }
            _ => false,
        }
    }

    /// Run a chat completion with retry on transient failures
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens as i32,
            },
        };

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    ?backoff,
                    attempt,
                    max = self.config.max_retries,
                    "chat request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(&request).await {
                Ok(response) => return Ok(response.message.content.trim().to_string()),
                Err(e) if Self::is_retryable(&e) => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Model("max retries exceeded".to_string())))
    }
}

#[async_trait]
impl ClassifierModel for HttpChatBackend {
    async fn generate_structured(&self, prompt: &str, system: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system),
            ChatMessage::user(prompt),
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ResponseModel for HttpChatBackend {
    async fn generate_answer(
        &self,
        query: &str,
        docs: &[Document],
        system: &str,
        history: &[Message],
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        for turn in history {
            messages.push(ChatMessage {
                role: turn.role.to_string(),
                content: turn.content.clone(),
            });
        }
        messages.push(ChatMessage::user(&answer_prompt(query, docs)));

        self.chat(messages).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Translator for HttpChatBackend {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> String {
        if text.is_empty() || source_lang.eq_ignore_ascii_case(target_lang) {
            return text.to_string();
        }

        let prompt = translation_prompt(text, target_lang);
        match self.chat(vec![ChatMessage::user(&prompt)]).await {
            Ok(translated) if !translated.is_empty() => translated,
            Ok(_) => {
                tracing::warn!("translator returned empty text, keeping original");
                text.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "translation failed, keeping original");
                text.to_string()
            }
        }
    }
}

// Chat API types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API:
//! - OpenAI itself (https://api.openai.com)
//! - vLLM, LocalAI, llama-server / llama.cpp
//! - text-generation-inference
//!
//! # Configuration
//!
//! Resolved by [`crate::config::Config`]:
//! - `OPENAI_API_KEY`: bearer credential (required)
//! - `OPENAI_BASE_URL`: server URL (default: https://api.openai.com)
//! - `OPENAI_MODEL`: model name (default: gpt-4o-mini)
//! - `[openai] timeout_secs`: cap on every request timeout (default: 30)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TextGenConfig;
use crate::error::{Error, Result};

use super::types::{CompletionRequest, PromptMessage, Role};
use super::AIBackend;

/// OpenAI-compatible backend
///
/// Works with any server implementing the OpenAI `/v1/chat/completions` API.
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    /// Upper bound on per-request timeouts
    max_timeout: Option<Duration>,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            max_timeout: None,
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Create from resolved settings, using the chat model
    pub fn from_config(config: &TextGenConfig) -> Self {
        let mut backend = Self::with_api_key(&config.base_url, &config.model, &config.api_key);
        backend.max_timeout = Some(config.timeout);
        backend
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
            api_key: self.api_key.clone(),
            max_timeout: self.max_timeout,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref api_key) => builder.header("Authorization", format!("Bearer {}", api_key)),
            None => builder,
        }
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: Role,
    content: String,
}

impl From<&PromptMessage> for ChatMessage {
    fn from(message: &PromptMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message (content is null for refusals and tool calls)
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(ChatMessage::from).collect(),
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            stream: false,
        };

        let timeout = match self.max_timeout {
            Some(max) => request.timeout.min(max),
            None => request.timeout,
        };
        let req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(timeout)
            .json(&body);

        let response = self.authorized(req_builder).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status,
                context: "OpenAI API error".into(),
                body,
            });
        }

        let chat_response: ChatCompletionResponse = response.json().await?;
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidData("No response from OpenAI API".into()))?
            .message
            .content
            .unwrap_or_default();

        debug!(model = %self.model, chars = content.len(), "Chat completion received");
        Ok(content.trim().to_string())
    }

    async fn health_check(&self) -> bool {
        // Try /v1/models first (standard OpenAI endpoint)
        let models = self.authorized(
            self.http_client
                .get(format!("{}/v1/models", self.base_url))
                .timeout(Duration::from_secs(5)),
        );
        if let Ok(resp) = models.send().await {
            if resp.status().is_success() {
                return true;
            }
        }

        // Try /health (common for self-hosted servers)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        false
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

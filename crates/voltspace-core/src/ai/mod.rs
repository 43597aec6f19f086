//! Text-generation collaborator abstraction
//!
//! This module provides a backend-agnostic interface for chat completions.
//! Both the augmented insights and the assistant go through it.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all backends
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = Config::load(None)?;
//! if let Some(settings) = config.text_generation.as_option() {
//!     let client = AIClient::from_config(settings);
//!     let text = client
//!         .complete(&CompletionRequest::new(vec![PromptMessage::user("Hello")]))
//!         .await?;
//! }
//! ```

mod mock;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::{MockBackend, MockReply};
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;

use crate::config::TextGenConfig;
use crate::error::Result;

/// Trait defining the interface for all text-generation backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run one chat completion and return the trimmed assistant text.
    ///
    /// A reply with no content is returned as an empty string.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Check if the backend is reachable with the configured credential
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI-compatible backend (OpenAI, vLLM, LocalAI, llama-server, etc.)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create a chat client from resolved settings (uses the chat model)
    pub fn from_config(config: &TextGenConfig) -> Self {
        AIClient::OpenAICompatible(OpenAICompatibleBackend::from_config(config))
    }

    /// Create a mock backend for testing
    pub fn mock(backend: MockBackend) -> Self {
        AIClient::Mock(backend)
    }

    /// Create a new instance with a different model
    ///
    /// Used to derive the insights client from the chat client.
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self {
            AIClient::OpenAICompatible(b) => b.complete(request).await,
            AIClient::Mock(b) => b.complete(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

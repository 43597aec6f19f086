//! Mock backend for testing
//!
//! Replays scripted replies in order and records every request it sees.
//! Useful for unit tests and development without a text-generation service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::CompletionRequest;
use super::AIBackend;

/// One scripted outcome of a completion call
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful completion with this text
    Text(String),
    /// Non-success HTTP status with this body
    Fail { status: u16, body: String },
    /// The request timed out
    Timeout,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn fail(status: u16, body: impl Into<String>) -> Self {
        MockReply::Fail {
            status,
            body: body.into(),
        }
    }
}

/// Mock AI backend for testing
///
/// Replies are consumed in order; once the script runs out the fallback
/// reply is used for every call.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    fallback: MockReply,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy, replies with empty text)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: MockReply::text(""),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Queue a reply
    pub fn reply(self, reply: MockReply) -> Self {
        lock(&self.script).push_back(reply);
        self
    }

    /// Reply used once the script is exhausted
    pub fn fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Create a new instance with a different model
    ///
    /// The script and the request log stay shared with `self`.
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        lock(&self.requests).push(request.clone());
        let reply = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            MockReply::Text(text) => Ok(text.trim().to_string()),
            MockReply::Fail { status, body } => Err(Error::Upstream {
                status,
                context: "OpenAI API error".into(),
                body,
            }),
            MockReply::Timeout => Err(Error::Timeout("chat completion".into())),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

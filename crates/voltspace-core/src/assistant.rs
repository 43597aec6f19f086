//! Conversational assistant
//!
//! Forwards a question (plus optional caller-supplied context) to the
//! text-generation collaborator. Failures never surface as errors: the
//! caller always receives displayable text.

use std::time::Duration;

use serde_json::Value;

use crate::ai::parsing::truncate_chars;
use crate::ai::{AIBackend, AIClient, CompletionRequest, PromptMessage};
use crate::error::{Error, FailureKind};

pub const ASSISTANT_SYSTEM_PROMPT: &str =
    "You are VoltSpace's home energy assistant. Be concise and actionable.";

pub const CONTEXT_PREFIX: &str = "Context from database (JSON/text):\n";

/// Context longer than this many characters is cut off
pub const MAX_CONTEXT_CHARS: usize = 6000;

pub const ASSISTANT_TEMPERATURE: f32 = 0.2;
pub const ASSISTANT_MAX_TOKENS: u32 = 200;
pub const ASSISTANT_TIMEOUT: Duration = Duration::from_secs(30);

pub const NO_ANSWER: &str = "No answer.";

/// Answers free-text energy questions
#[derive(Clone)]
pub struct Assistant {
    client: Option<AIClient>,
}

impl Assistant {
    /// `client` is `None` when no credential is configured
    pub fn new(client: Option<AIClient>) -> Self {
        Self { client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Answer a question. Always returns text.
    pub async fn answer(&self, question: &str, context: Option<&Value>) -> String {
        let Some(client) = &self.client else {
            return local_demo_answer(context.is_some_and(is_meaningful));
        };
        let context = context.and_then(render_context);

        let request = build_request(question, context.as_deref());
        match client.complete(&request).await {
            Ok(answer) if answer.is_empty() => NO_ANSWER.to_string(),
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(model = client.model(), error = %e, "Assistant request failed");
                describe_failure(&e)
            }
        }
    }
}

/// Build the completion request for a question
pub fn build_request(question: &str, context: Option<&str>) -> CompletionRequest {
    let mut messages = vec![PromptMessage::system(ASSISTANT_SYSTEM_PROMPT)];
    if let Some(context) = context {
        messages.push(PromptMessage::system(format!(
            "{}{}",
            CONTEXT_PREFIX,
            truncate_chars(context, MAX_CONTEXT_CHARS)
        )));
    }
    messages.push(PromptMessage::user(question.trim()));

    CompletionRequest::new(messages)
        .temperature(ASSISTANT_TEMPERATURE)
        .max_tokens(ASSISTANT_MAX_TOKENS)
        .timeout(ASSISTANT_TIMEOUT)
}

/// Strings verbatim, structured values as compact JSON, null as absent
fn render_context(context: &Value) -> Option<String> {
    match context {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Empty strings, containers, zero and false carry no context
fn is_meaningful(context: &Value) -> bool {
    match context {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Reply used when no text-generation credential is configured
pub fn local_demo_answer(with_context: bool) -> String {
    let hint = if with_context { " with context" } else { "" };
    format!(
        "[Local demo] No OpenAI key set. Try using Dashboard & Insights; consider turning off long-running devices and shifting flexible loads{}.",
        hint
    )
}

/// Turn a collaborator failure into text for the user
pub fn describe_failure(error: &Error) -> String {
    match error.failure_kind() {
        FailureKind::Authentication => {
            "OpenAI authentication failed. Check OPENAI_API_KEY.".to_string()
        }
        FailureKind::RateLimited => "OpenAI rate limit exceeded. Try again later.".to_string(),
        FailureKind::Network => {
            "Network error reaching OpenAI. Check internet/proxy and try again.".to_string()
        }
        FailureKind::Other => format!("Assistant error: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockBackend, MockReply, Role};
    use serde_json::json;

    fn assistant(reply: MockReply) -> (Assistant, MockBackend) {
        let backend = MockBackend::new().reply(reply);
        (Assistant::new(Some(AIClient::mock(backend.clone()))), backend)
    }

    #[tokio::test]
    async fn test_unconfigured_local_demo() {
        let assistant = Assistant::new(None);
        let answer = assistant.answer("How do I save?", None).await;
        assert!(answer.starts_with("[Local demo] No OpenAI key set."));
        assert!(answer.ends_with("shifting flexible loads."));

        let answer = assistant
            .answer("How do I save?", Some(&json!({"devices": 3})))
            .await;
        assert!(answer.ends_with("shifting flexible loads with context."));

        let answer = assistant.answer("How do I save?", Some(&Value::Null)).await;
        assert!(answer.ends_with("shifting flexible loads."));
    }

    #[tokio::test]
    async fn test_local_demo_ignores_empty_context() {
        let assistant = Assistant::new(None);
        for empty in [json!(""), json!({}), json!([])] {
            let answer = assistant.answer("Q", Some(&empty)).await;
            assert!(answer.ends_with("shifting flexible loads."), "{}", empty);
        }
        let answer = assistant.answer("Q", Some(&json!("kWh today: 12"))).await;
        assert!(answer.ends_with("shifting flexible loads with context."));
    }

    #[tokio::test]
    async fn test_empty_context_still_forwarded() {
        let (assistant, backend) = assistant(MockReply::text("ok"));
        assistant.answer("Q", Some(&json!({}))).await;

        let request = &backend.requests()[0];
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].content, format!("{}{{}}", CONTEXT_PREFIX));
    }

    #[tokio::test]
    async fn test_answer_passthrough() {
        let (assistant, backend) = assistant(MockReply::text("Turn off the AC."));
        let answer = assistant.answer("  What now?  ", None).await;
        assert_eq!(answer, "Turn off the AC.");

        let request = &backend.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, ASSISTANT_SYSTEM_PROMPT);
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, "What now?");
        assert_eq!(request.max_tokens, 200);
    }

    #[tokio::test]
    async fn test_empty_answer() {
        let (assistant, _) = assistant(MockReply::text("   "));
        assert_eq!(assistant.answer("Hi", None).await, NO_ANSWER);
    }

    #[tokio::test]
    async fn test_context_message() {
        let (assistant, backend) = assistant(MockReply::text("ok"));
        assistant
            .answer("Q", Some(&json!({"kwh": 12, "room": "Kitchen"})))
            .await;

        let request = &backend.requests()[0];
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].role, Role::System);
        assert_eq!(
            request.messages[1].content,
            "Context from database (JSON/text):\n{\"kwh\":12,\"room\":\"Kitchen\"}"
        );
    }

    #[test]
    fn test_context_truncated() {
        let long = "a".repeat(10_000);
        let request = build_request("Q", Some(&long));
        assert_eq!(
            request.messages[1].content.chars().count(),
            CONTEXT_PREFIX.chars().count() + MAX_CONTEXT_CHARS
        );
    }

    #[tokio::test]
    async fn test_failure_categories() {
        let cases = [
            (
                MockReply::fail(401, "invalid key"),
                "OpenAI authentication failed. Check OPENAI_API_KEY.",
            ),
            (
                MockReply::fail(429, "too many"),
                "OpenAI rate limit exceeded. Try again later.",
            ),
            (
                MockReply::Timeout,
                "Network error reaching OpenAI. Check internet/proxy and try again.",
            ),
        ];
        for (reply, expected) in cases {
            let (assistant, _) = assistant(reply);
            assert_eq!(assistant.answer("Q", None).await, expected);
        }
    }

    #[tokio::test]
    async fn test_generic_failure() {
        let (assistant, _) = assistant(MockReply::fail(500, "server exploded"));
        let answer = assistant.answer("Q", None).await;
        assert!(answer.starts_with("Assistant error: "));
        assert!(answer.contains("server exploded"));
    }
}

//! Energy assistant command

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use voltspace_core::{AIClient, Assistant, Config};

pub async fn cmd_ask(config: &Config, question: &str, context: Option<&Path>) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        bail!("Missing question");
    }

    let context = match context {
        Some(path) => Some(read_context(path)?),
        None => None,
    };

    let assistant = Assistant::new(config.text_generation.as_option().map(AIClient::from_config));
    let answer = assistant.answer(question, context.as_ref()).await;
    println!("{}", answer);
    Ok(())
}

/// JSON when the file parses as JSON, otherwise its text
pub fn read_context(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {}", path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or(Value::String(content)))
}

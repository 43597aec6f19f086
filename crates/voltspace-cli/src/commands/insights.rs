//! Insight commands

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use voltspace_core::insights::{evaluate, evaluate_augmented};
use voltspace_core::{AIClient, Config, DeviceSnapshot, InsightsResponse};

pub async fn cmd_insights(config: &Config, file: &Path, ai: bool, at: Option<&str>) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let now = match at {
        Some(at) => parse_at(at)?,
        None => chrono::Local::now().fixed_offset(),
    };

    let client = if ai {
        if !config.text_generation.is_configured() {
            println!("ℹ️  OPENAI_API_KEY not set, using rule-based insights");
        }
        insights_client(config)
    } else {
        None
    };

    let response = run_insights(&content, now, client.as_ref()).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Evaluate a JSON device list at `now`, with the model when a client is given
pub async fn run_insights(
    devices_json: &str,
    now: DateTime<FixedOffset>,
    client: Option<&AIClient>,
) -> Result<InsightsResponse> {
    let devices: Vec<DeviceSnapshot> =
        serde_json::from_str(devices_json).context("Expected a JSON list of devices")?;

    let insights = match client {
        Some(client) => evaluate_augmented(&devices, &now, Some(client)).await,
        None => evaluate(&devices, &now),
    };
    Ok(InsightsResponse { insights })
}

/// Client for augmented insights, using the insights model
pub fn insights_client(config: &Config) -> Option<AIClient> {
    config
        .text_generation
        .as_option()
        .map(|text| AIClient::from_config(text).with_model(&text.insights_model))
}

fn parse_at(at: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(at)
        .with_context(|| format!("Invalid --at time (expected RFC 3339): {}", at))
}

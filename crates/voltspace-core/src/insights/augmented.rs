//! LLM-augmented insights
//!
//! Sends a compact projection of the devices to the text-generation
//! collaborator and sanitizes whatever comes back. The caller always gets a
//! batch: without a collaborator, or when the call or the parse fails, the
//! rule engine's output for the same input is returned instead.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat, Timelike};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::ai::parsing::parse_insights_response;
use crate::ai::{AIBackend, CompletionRequest, PromptMessage};
use crate::error::Result;
use crate::models::{DeviceSnapshot, InsightBatch};

use super::rules;

pub const INSIGHTS_SYSTEM_PROMPT: &str = "You are VoltSpace's energy analyst. Analyze the provided household devices and generate concise, actionable insights. \
Always return JSON with a top-level key 'insights' (1 to 5 items). Each item must have: severity in ['info','warn','critical'], title, detail. \
Use fields like on, hours_on, power_w, hour_now, room/home, and attrs (e.g., brightness, setpoint, flexible) to decide. \
Focus on: long-on lights (>8h), AC overuse (>6h), phantom loads at night (00:00-05:00), high draws, and shifting flexible plugs (22:00-06:00). \
If nothing critical, include at least one 'info' tip (e.g., cost shifting).";

pub const INSIGHTS_TEMPERATURE: f32 = 0.2;
pub const INSIGHTS_MAX_TOKENS: u32 = 600;
pub const INSIGHTS_TIMEOUT: Duration = Duration::from_secs(30);

/// What the model sees of one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProjection {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub home: Option<String>,
    pub room: Option<String>,
    pub on: bool,
    pub power_w: u32,
    pub hours_on: f64,
    pub last_active: Option<String>,
    pub hour_now: u32,
    pub attrs: Map<String, Value>,
}

/// Project devices for the prompt
pub fn project(devices: &[DeviceSnapshot], now: &DateTime<FixedOffset>) -> Vec<DeviceProjection> {
    let hour_now = now.hour();
    devices
        .iter()
        .map(|device| DeviceProjection {
            name: device.name.clone(),
            device_type: device.device_type.clone(),
            home: device.home.clone(),
            room: device.room.clone(),
            on: device.state.on,
            power_w: device.power_w,
            hours_on: round2(rules::elapsed_on_hours(device, now)),
            last_active: device
                .last_active
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            hour_now,
            attrs: device.state.attributes(),
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Build the completion request for a device snapshot
pub fn build_request(
    devices: &[DeviceSnapshot],
    now: &DateTime<FixedOffset>,
) -> Result<CompletionRequest> {
    let projection = serde_json::to_string(&project(devices, now))?;
    Ok(CompletionRequest::new(vec![
        PromptMessage::system(INSIGHTS_SYSTEM_PROMPT),
        PromptMessage::user(format!("Devices JSON:\n{}", projection)),
    ])
    .temperature(INSIGHTS_TEMPERATURE)
    .max_tokens(INSIGHTS_MAX_TOKENS)
    .timeout(INSIGHTS_TIMEOUT))
}

/// Evaluate with the collaborator, falling back to the rules.
///
/// `backend` is `None` when no credential is configured; no call is made.
pub async fn evaluate_augmented<B>(
    devices: &[DeviceSnapshot],
    now: &DateTime<FixedOffset>,
    backend: Option<&B>,
) -> InsightBatch
where
    B: AIBackend + ?Sized,
{
    let Some(backend) = backend else {
        tracing::debug!("No text-generation collaborator, using rules");
        return rules::evaluate(devices, now);
    };

    match request_insights(backend, devices, now).await {
        Ok(batch) => {
            tracing::debug!(model = backend.model(), insights = batch.len(), "Augmented insights");
            batch
        }
        Err(e) => {
            tracing::warn!(model = backend.model(), error = %e, "Augmented insights failed, falling back to rules");
            rules::evaluate(devices, now)
        }
    }
}

async fn request_insights<B>(
    backend: &B,
    devices: &[DeviceSnapshot],
    now: &DateTime<FixedOffset>,
) -> Result<InsightBatch>
where
    B: AIBackend + ?Sized,
{
    let request = build_request(devices, now)?;
    let reply = backend.complete(&request).await?;
    parse_insights_response(&reply)
}

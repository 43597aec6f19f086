//! Image-to-3D request and task types

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Media types accepted for conversion
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// Default subject hint sent by the floor-plan front end
pub const DEFAULT_HINT: &str = "smart home floor plan";

const SUCCESS_STATUSES: &[&str] = &["SUCCEEDED", "COMPLETED", "DONE"];
const FAILURE_STATUSES: &[&str] = &["FAILED", "ERROR", "CANCELED"];

/// An uploaded image awaiting conversion
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
    pub hint: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            filename: None,
            hint: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Subject hint, or the floor-plan default when the caller gave none
    pub fn hint_or_default(&self) -> &str {
        self.hint
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HINT)
    }

    /// Reject anything but PNG and JPEG
    pub fn validate(&self) -> Result<()> {
        let mime = essence(&self.content_type);
        if SUPPORTED_MEDIA_TYPES.contains(&mime.as_str()) {
            Ok(())
        } else {
            Err(Error::UnsupportedMediaType(
                "Only PNG or JPG images are supported".into(),
            ))
        }
    }

    /// `data:{mime};base64,...`
    pub fn data_uri(&self) -> String {
        data_uri(&essence(&self.content_type), &self.bytes)
    }
}

/// Media type without parameters, lower-cased
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Task submission body
#[derive(Debug, Clone, Serialize)]
pub struct SubmitPayload {
    pub image_url: String,
    pub should_texture: bool,
    pub should_remesh: bool,
    pub enable_pbr: bool,
}

impl SubmitPayload {
    pub fn new(image_url: String) -> Self {
        Self {
            image_url,
            should_texture: true,
            should_remesh: true,
            enable_pbr: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    #[serde(default)]
    pub result: Option<String>,
}

/// Where a task stands after one status poll
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// Finished with a downloadable model
    Succeeded { glb_url: String },
    Failed,
    /// Anything else, including success without a model URL yet
    Pending,
}

/// One status poll result
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    /// Upper-cased status, `None` when absent or empty
    pub status: Option<String>,
    pub glb_url: Option<String>,
    pub payload: Value,
}

impl TaskSnapshot {
    pub fn from_payload(payload: Value) -> Self {
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
        let glb_url = payload
            .get("model_urls")
            .and_then(|urls| urls.get("glb"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            status,
            glb_url,
            payload,
        }
    }

    pub fn state(&self) -> TaskState {
        let status = self.status.as_deref().unwrap_or("");
        if FAILURE_STATUSES.contains(&status) {
            return TaskState::Failed;
        }
        match &self.glb_url {
            Some(url) if SUCCESS_STATUSES.contains(&status) => TaskState::Succeeded {
                glb_url: url.clone(),
            },
            _ => TaskState::Pending,
        }
    }
}

/// Raw status passthrough: collaborator status code plus body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPassthrough {
    pub code: u16,
    /// JSON body when the collaborator answered JSON, else the body text
    pub json: Value,
}

//! Error types for VoltSpace

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} not set")]
    NotConfigured(&'static str),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A collaborator answered with a non-success status
    #[error("{context} ({status}): {body}")]
    Upstream {
        status: u16,
        context: String,
        body: String,
    },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Meshy task failed: {0}")]
    TaskFailed(serde_json::Value),

    /// The polling deadline passed before the task reached a terminal state
    #[error(
        "Meshy task timed out; last status: {}, payload: {}",
        .last_status.as_deref().unwrap_or("none"),
        .last_payload.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "none".into())
    )]
    DeadlineExceeded {
        last_status: Option<String>,
        last_payload: Option<serde_json::Value>,
    },

    /// A collaborator or model returned something unusable
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Caller input failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// How a failed collaborator call should be described to a person
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    RateLimited,
    Network,
    Other,
}

impl Error {
    /// Classify a collaborator failure.
    ///
    /// Status codes and transport flags are checked first; the message text
    /// is only consulted when neither is available.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Upstream { status: 401 | 403, .. } => FailureKind::Authentication,
            Error::Upstream { status: 429, .. } => FailureKind::RateLimited,
            Error::Timeout(_) => FailureKind::Network,
            Error::Http(e) if e.is_timeout() || e.is_connect() => FailureKind::Network,
            Error::Http(e) if e.status().map(|s| s.as_u16()) == Some(401) => {
                FailureKind::Authentication
            }
            Error::Http(e) if e.status().map(|s| s.as_u16()) == Some(429) => {
                FailureKind::RateLimited
            }
            other => classify_message(&other.to_string()),
        }
    }
}

fn classify_message(msg: &str) -> FailureKind {
    let msg = msg.to_lowercase();
    if msg.contains("auth") {
        FailureKind::Authentication
    } else if msg.contains("rate") && msg.contains("limit") {
        FailureKind::RateLimited
    } else if msg.contains("timeout") || msg.contains("network") || msg.contains("connect") {
        FailureKind::Network
    } else {
        FailureKind::Other
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(status: u16, body: &str) -> Error {
        Error::Upstream {
            status,
            context: "Chat completion failed".into(),
            body: body.into(),
        }
    }

    #[test]
    fn test_failure_kind_from_status() {
        assert_eq!(upstream(401, "").failure_kind(), FailureKind::Authentication);
        assert_eq!(upstream(403, "").failure_kind(), FailureKind::Authentication);
        assert_eq!(upstream(429, "").failure_kind(), FailureKind::RateLimited);
        assert_eq!(upstream(500, "boom").failure_kind(), FailureKind::Other);
    }

    #[test]
    fn test_failure_kind_from_message() {
        assert_eq!(
            upstream(400, "Rate limit reached for requests").failure_kind(),
            FailureKind::RateLimited
        );
        assert_eq!(
            Error::InvalidData("connection reset by peer".into()).failure_kind(),
            FailureKind::Network
        );
    }

    #[test]
    fn test_timeout_is_network() {
        assert_eq!(
            Error::Timeout("chat completion".into()).failure_kind(),
            FailureKind::Network
        );
    }

    #[test]
    fn test_deadline_message() {
        let err = Error::DeadlineExceeded {
            last_status: Some("IN_PROGRESS".into()),
            last_payload: Some(serde_json::json!({"progress": 40})),
        };
        assert_eq!(
            err.to_string(),
            "Meshy task timed out; last status: IN_PROGRESS, payload: {\"progress\":40}"
        );
    }

    #[test]
    fn test_not_configured_names_setting() {
        let err = Error::NotConfigured("MESHY_API_KEY");
        assert_eq!(err.to_string(), "MESHY_API_KEY not set");
    }
}

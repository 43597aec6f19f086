//! Data models for VoltSpace
//!
//! Device snapshots arrive from callers that build them from loosely typed
//! storage, so deserialization here is lenient: optional fields that are
//! missing, null or malformed fall back to safe defaults instead of failing
//! the whole request.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Device categories the insight rules know about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Light,
    Ac,
    Plug,
    /// Any other category; matches no rule
    Other,
}

impl DeviceKind {
    /// Parse a category string (case-insensitive, surrounding whitespace ignored)
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "light" => DeviceKind::Light,
            "ac" => DeviceKind::Ac,
            "plug" => DeviceKind::Plug,
            _ => DeviceKind::Other,
        }
    }
}

/// Point-in-time description of one device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub name: String,
    /// Category string as supplied by the caller (e.g. "light", "AC")
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default, deserialize_with = "lenient::watts")]
    pub power_w: u32,
    #[serde(default, deserialize_with = "lenient::state")]
    pub state: DeviceState,
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub room: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub home: Option<String>,
}

impl DeviceSnapshot {
    pub fn new(name: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device_type: device_type.into(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> DeviceKind {
        DeviceKind::parse(&self.device_type)
    }

    pub fn with_power(mut self, watts: u32) -> Self {
        self.power_w = watts;
        self
    }

    pub fn with_on(mut self, on: bool) -> Self {
        self.state.on = on;
        self
    }

    pub fn with_flexible(mut self, flexible: bool) -> Self {
        self.state.flexible = flexible;
        self
    }

    pub fn with_last_active(mut self, at: DateTime<Utc>) -> Self {
        self.last_active = Some(at);
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }
}

/// Device state attributes
///
/// `on` and `flexible` drive the insight rules. Everything else is kept in
/// `extra` and only forwarded as context to the LLM-augmented path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub on: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub flexible: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceState {
    /// All attributes except `on`, as forwarded to the LLM
    pub fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut attrs = self.extra.clone();
        if self.flexible {
            attrs.insert("flexible".into(), serde_json::Value::Bool(true));
        }
        attrs
    }
}

/// Severity of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    /// Only produced by the LLM-augmented path
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Critical => "critical",
        }
    }

    /// Clamp an untrusted severity label into the known set (default `info`)
    pub fn clamp(label: Option<&str>) -> Self {
        label
            .and_then(|l| l.trim().to_lowercase().parse().ok())
            .unwrap_or(Severity::Info)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// A single human-readable alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
}

impl Insight {
    pub fn new(severity: Severity, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            detail: detail.into(),
        }
    }
}

/// Ordered insights for one evaluation: device input order, then rule order
pub type InsightBatch = Vec<Insight>;

/// Response envelope shared by `/insights` and `/insights_ai`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub insights: InsightBatch,
}

mod lenient {
    use super::*;
    use serde_json::Value;

    /// Truthiness for state flags: booleans, non-zero numbers and the usual
    /// affirmative strings are true; everything else is false.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Value::String(s) => matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "1" | "on" | "yes"
            ),
            _ => false,
        })
    }

    pub fn watts<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let value = match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(value
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(|v| v.min(u32::MAX as f64) as u32)
            .unwrap_or(0))
    }

    pub fn state<'de, D: Deserializer<'de>>(d: D) -> Result<DeviceState, D::Error> {
        match Value::deserialize(d)? {
            v @ Value::Object(_) => {
                serde_json::from_value(v).map_err(serde::de::Error::custom)
            }
            _ => Ok(DeviceState::default()),
        }
    }

    /// Strings are kept; any other value is dropped
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => parse_timestamp(&s),
            _ => None,
        })
    }
}

/// Parse a timestamp, treating values without an offset as UTC.
///
/// Accepts RFC 3339 (`2024-05-01T08:00:00+02:00`) and naive forms with a `T`
/// or space separator (`2024-05-01 08:00:00`). Returns `None` for anything
/// else.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_device_kind_case_insensitive() {
        assert_eq!(DeviceKind::parse("Light"), DeviceKind::Light);
        assert_eq!(DeviceKind::parse("AC"), DeviceKind::Ac);
        assert_eq!(DeviceKind::parse(" plug "), DeviceKind::Plug);
        assert_eq!(DeviceKind::parse("fridge"), DeviceKind::Other);
        assert_eq!(DeviceKind::parse(""), DeviceKind::Other);
    }

    #[test]
    fn test_deserialize_minimal_device() {
        let device: DeviceSnapshot =
            serde_json::from_str(r#"{"name": "Lamp", "type": "light"}"#).unwrap();
        assert_eq!(device.name, "Lamp");
        assert_eq!(device.kind(), DeviceKind::Light);
        assert_eq!(device.power_w, 0);
        assert!(!device.state.on);
        assert!(!device.state.flexible);
        assert!(device.last_active.is_none());
    }

    #[test]
    fn test_deserialize_state_keeps_extra_attributes() {
        let device: DeviceSnapshot = serde_json::from_str(
            r#"{"name": "Heater", "type": "plug", "power_w": 1200,
                "state": {"on": true, "flexible": true, "setpoint": 21, "mode": "eco"}}"#,
        )
        .unwrap();
        assert!(device.state.on);
        assert!(device.state.flexible);
        assert_eq!(device.state.extra.len(), 2);
        assert_eq!(device.state.extra["setpoint"], 21);

        let attrs = device.state.attributes();
        assert!(attrs.get("on").is_none());
        assert_eq!(attrs["flexible"], true);
        assert_eq!(attrs["mode"], "eco");
    }

    #[test]
    fn test_deserialize_lenient_fields() {
        let device: DeviceSnapshot = serde_json::from_str(
            r#"{"name": "X", "type": "plug", "power_w": null,
                "state": {"on": 1, "flexible": "no"}, "last_active": "not a date"}"#,
        )
        .unwrap();
        assert_eq!(device.power_w, 0);
        assert!(device.state.on);
        assert!(!device.state.flexible);
        assert!(device.last_active.is_none());

        let device: DeviceSnapshot =
            serde_json::from_str(r#"{"name": "Y", "type": "ac", "power_w": -40, "state": null}"#)
                .unwrap();
        assert_eq!(device.power_w, 0);
        assert_eq!(device.state, DeviceState::default());
    }

    #[test]
    fn test_deserialize_malformed_room_and_home() {
        let devices: Vec<DeviceSnapshot> = serde_json::from_str(
            r#"[{"name": "Hall", "type": "light", "state": {"on": true}, "room": 3},
                {"name": "Den", "type": "plug", "home": {"id": 1, "name": "Main"}},
                {"name": "Attic", "type": "ac", "room": "Attic", "home": null}]"#,
        )
        .unwrap();
        assert_eq!(devices.len(), 3);
        assert!(devices[0].room.is_none());
        assert!(devices[0].state.on);
        assert!(devices[1].home.is_none());
        assert_eq!(devices[2].room.as_deref(), Some("Attic"));
        assert!(devices[2].home.is_none());
    }

    #[test]
    fn test_parse_timestamp_naive_is_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T08:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 08:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T08:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T10:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_severity_clamp() {
        assert_eq!(Severity::clamp(Some("WARN")), Severity::Warn);
        assert_eq!(Severity::clamp(Some("critical")), Severity::Critical);
        assert_eq!(Severity::clamp(Some("urgent")), Severity::Info);
        assert_eq!(Severity::clamp(None), Severity::Info);
    }

    #[test]
    fn test_insight_serialization() {
        let insight = Insight::new(Severity::Warn, "Title", "Detail");
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["severity"], "warn");
        assert_eq!(json["title"], "Title");
        assert_eq!(json["detail"], "Detail");
    }
}

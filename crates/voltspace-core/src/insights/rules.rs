//! Rule-based insight engine
//!
//! Deterministic: the same devices and `now` always produce the same batch.

use chrono::{DateTime, TimeZone, Timelike, Utc};

use crate::models::{DeviceKind, DeviceSnapshot, Insight, InsightBatch, Severity};

/// Lights on for longer than this many hours are flagged
pub const LIGHT_MAX_HOURS: f64 = 8.0;

/// AC units running longer than this many hours are flagged
pub const AC_MAX_HOURS: f64 = 6.0;

/// Plugs drawing more than this overnight are flagged
pub const NIGHT_LOAD_MIN_WATTS: u32 = 5;

/// Last local hour (inclusive) of the overnight window starting at 00:00
pub const NIGHT_LAST_HOUR: u32 = 5;

/// Hours between `last_active` and `now`, never negative.
///
/// A device with no recorded activity has zero elapsed hours.
pub fn hours_since<Tz: TimeZone>(last_active: Option<DateTime<Utc>>, now: &DateTime<Tz>) -> f64 {
    let Some(last_active) = last_active else {
        return 0.0;
    };
    let elapsed = now.with_timezone(&Utc) - last_active;
    (elapsed.num_milliseconds() as f64 / 3_600_000.0).max(0.0)
}

/// Hours a device has been running: zero whenever it is currently off
pub fn elapsed_on_hours<Tz: TimeZone>(device: &DeviceSnapshot, now: &DateTime<Tz>) -> f64 {
    if device.state.on {
        hours_since(device.last_active, now)
    } else {
        0.0
    }
}

/// Evaluate every rule against every device.
///
/// `now` supplies both the instant used for elapsed time and the local hour
/// of day (taken in `now`'s own time zone) for the overnight rule.
pub fn evaluate<Tz: TimeZone>(devices: &[DeviceSnapshot], now: &DateTime<Tz>) -> InsightBatch {
    let hour = now.hour();
    let mut out = Vec::new();

    for device in devices {
        let kind = device.kind();
        let on = device.state.on;
        let hours = elapsed_on_hours(device, now);
        let whole_hours = hours.trunc() as u64;
        let name = &device.name;

        if kind == DeviceKind::Light && on && hours > LIGHT_MAX_HOURS {
            out.push(Insight::new(
                Severity::Warn,
                format!("Light on for {}h: {}", whole_hours, name),
                format!(
                    "The light '{}' appears to be on for over {} hours. Consider turning it off.",
                    name, whole_hours
                ),
            ));
        }

        if kind == DeviceKind::Ac && on && hours > AC_MAX_HOURS {
            out.push(Insight::new(
                Severity::Warn,
                format!("AC running {}h: {}", whole_hours, name),
                format!(
                    "'{}' has been cooling for more than {} hours. Review setpoint or schedule.",
                    name, whole_hours
                ),
            ));
        }

        if kind == DeviceKind::Plug
            && on
            && hour <= NIGHT_LAST_HOUR
            && device.power_w > NIGHT_LOAD_MIN_WATTS
        {
            out.push(Insight::new(
                Severity::Info,
                format!("Night-time load on plug: {}", name),
                format!(
                    "'{}' is using ~{}W overnight (00:00–05:00). Consider turning it off.",
                    name, device.power_w
                ),
            ));
        }

        if kind == DeviceKind::Plug && device.state.flexible {
            out.push(Insight::new(
                Severity::Info,
                format!("Shiftable load: {}", name),
                "This plug is marked flexible. Consider moving usage to 22:00–06:00 to save costs.",
            ));
        }
    }

    tracing::debug!(devices = devices.len(), insights = out.len(), "Rules evaluated");
    out
}

//! Insight Engine - Device Usage Alerts
//!
//! Turns a snapshot of smart-home devices into short, actionable alerts.
//!
//! ## Paths
//!
//! - **Rules** - deterministic heuristics (long-on lights, AC overuse,
//!   overnight plug load, shiftable loads)
//! - **Augmented** - asks the text-generation collaborator for insights and
//!   falls back to the rules on any failure
//!
//! ## Usage
//!
//! ```rust,ignore
//! use voltspace_core::insights;
//!
//! let now = chrono::Local::now().fixed_offset();
//! let batch = insights::evaluate(&devices, &now);
//! let enriched = insights::evaluate_augmented(&devices, &now, client.as_ref()).await;
//! ```

pub mod augmented;
pub mod rules;

pub use augmented::{build_request, evaluate_augmented, project, DeviceProjection};
pub use rules::{elapsed_on_hours, evaluate, hours_since};

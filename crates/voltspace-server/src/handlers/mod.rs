//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod agent;
pub mod health;
pub mod insights;
pub mod meshify;

// Re-export all handlers for use in router
pub use agent::*;
pub use health::*;
pub use insights::*;
pub use meshify::*;

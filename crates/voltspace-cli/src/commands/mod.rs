//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (load_config)
//! - `config` - Show the resolved configuration
//! - `insights` - Rule-based and augmented insights for a snapshot file
//! - `ask` - Energy assistant
//! - `meshify` - Image-to-3D conversion
//! - `serve` - Web server command

pub mod ask;
pub mod config;
pub mod core;
pub mod insights;
pub mod meshify;
pub mod serve;

// Re-export command functions for main.rs
pub use ask::*;
pub use config::*;
pub use core::*;
pub use insights::*;
pub use meshify::*;
pub use serve::*;

//! Shared command utilities

use std::path::Path;

use anyhow::{Context, Result};
use voltspace_core::Config;

/// Resolve configuration from the config file, `.env` and the environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load configuration")
}

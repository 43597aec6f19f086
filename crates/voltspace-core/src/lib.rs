//! VoltSpace Core Library
//!
//! Shared functionality for the VoltSpace home energy service:
//! - Device snapshot models with lenient decoding
//! - Rule-based insight engine
//! - LLM-augmented insights with rule fallback
//! - Conversational energy assistant
//! - Image-to-3D conversion with local asset republishing
//! - Layered configuration (defaults, TOML file, .env, environment)

pub mod ai;
pub mod assistant;
pub mod config;
pub mod error;
pub mod insights;
pub mod mesh;
pub mod models;
pub mod storage;

/// Test utilities including mock collaborator server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, CompletionRequest, MockBackend, MockReply, OpenAICompatibleBackend,
    PromptMessage, Role,
};
pub use assistant::Assistant;
pub use config::{Config, MeshConfig, Provider, ServerSettings, TextGenConfig};
pub use error::{Error, FailureKind, Result};
pub use mesh::{ImageUpload, MeshClient, MeshConverter, StatusPassthrough};
pub use models::{
    DeviceKind, DeviceSnapshot, DeviceState, Insight, InsightBatch, InsightsResponse, Severity,
};
pub use storage::AssetStore;

//! Image-to-3D conversion
//!
//! Submits PNG/JPEG images to a Meshy-compatible service, polls the task
//! and republishes the resulting GLB from the local static directory.

mod client;
mod convert;
pub mod types;

pub use client::MeshClient;
pub use convert::MeshConverter;
pub use types::{
    data_uri, ImageUpload, StatusPassthrough, SubmitPayload, TaskSnapshot, TaskState,
    DEFAULT_HINT, SUPPORTED_MEDIA_TYPES,
};

//! Image-to-3D handlers
//!
//! `/meshify` runs the whole conversion in one request. The `submit`,
//! `status` and `fetch_glb` endpoints let the browser drive the polling.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};
use voltspace_core::{ImageUpload, StatusPassthrough};

#[derive(Debug, Serialize)]
pub struct ModelUrlResponse {
    pub model_url: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: String,
}

/// POST /meshify - Convert an uploaded image and return the served model URL
pub async fn meshify(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ModelUrlResponse>, AppError> {
    let converter = state.mesh.require()?;
    let upload = read_image_upload(multipart).await?;

    let model_url = converter.convert(&upload).await?;
    Ok(Json(ModelUrlResponse { model_url }))
}

/// POST /meshify/submit - Start a conversion and return its task id
pub async fn submit_mesh(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<SubmitResponse>, AppError> {
    let converter = state.mesh.require()?;
    let upload = read_image_upload(multipart).await?;

    let task_id = converter.submit(&upload).await?;
    Ok(Json(SubmitResponse { task_id }))
}

/// GET /meshify/status/:task_id - Collaborator status, passed through as-is
pub async fn mesh_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<StatusPassthrough>, AppError> {
    let converter = state.mesh.require()?;
    Ok(Json(converter.status(&task_id).await?))
}

/// POST /meshify/fetch_glb/:task_id - Republish a finished model locally
pub async fn fetch_glb(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<ModelUrlResponse>, AppError> {
    let converter = state.mesh.require()?;
    let model_url = converter.fetch(&task_id).await?;
    Ok(Json(ModelUrlResponse { model_url }))
}

/// Read the `image` and optional `hint` fields
async fn read_image_upload(mut multipart: Multipart) -> Result<ImageUpload, AppError> {
    let mut upload: Option<ImageUpload> = None;
    let mut hint: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                let content_type = field.content_type().unwrap_or("").to_string();
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read image data"))?;

                // Check file size limit
                if bytes.len() > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        MAX_UPLOAD_SIZE / 1024 / 1024
                    )));
                }

                let mut image = ImageUpload::new(bytes.to_vec(), content_type);
                if let Some(filename) = filename {
                    image = image.with_filename(filename);
                }
                upload = Some(image);
            }
            "hint" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read hint"))?;
                if !value.trim().is_empty() {
                    hint = Some(value);
                }
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::bad_request("Missing image field"))?;
    Ok(match hint {
        Some(hint) => upload.with_hint(hint),
        None => upload,
    })
}

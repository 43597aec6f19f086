//! Image-to-3D command

use std::path::Path;

use anyhow::{Context, Result};
use voltspace_core::{AssetStore, Config, ImageUpload, MeshConverter};

pub async fn cmd_meshify(config: &Config, image: &Path, hint: Option<&str>) -> Result<()> {
    let mesh = config.mesh.require()?;
    let store = AssetStore::from_settings(&config.server);
    store
        .ensure_dirs()
        .await
        .context("Failed to create upload and model directories")?;

    let upload = read_image(image, hint)?;
    let converter = MeshConverter::from_config(mesh, store);

    println!("🧊 Converting {} via {}...", image.display(), converter.host());
    println!(
        "   Polling every {}s for up to {}s",
        mesh.poll_interval.as_secs(),
        mesh.deadline.as_secs()
    );

    let url = converter
        .convert(&upload)
        .await
        .context("Mesh conversion failed")?;

    println!("✅ Model ready: {}", url);
    Ok(())
}

/// Load an image file as an upload, inferring the media type from its extension
pub fn read_image(path: &Path, hint: Option<&str>) -> Result<ImageUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut upload = ImageUpload::new(bytes, content_type_for(path));
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        upload = upload.with_filename(name);
    }
    if let Some(hint) = hint.filter(|h| !h.trim().is_empty()) {
        upload = upload.with_hint(hint);
    }
    Ok(upload)
}

/// Media type by file extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

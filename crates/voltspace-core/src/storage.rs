//! Local file storage for uploads and generated assets
//!
//! Uploads land in the upload directory; generated models land in
//! `{static_dir}/models/` and are published under `{public_url}/static/`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;

use crate::config::ServerSettings;
use crate::error::{Error, Result};

/// Process-wide upload sequence; keeps same-millisecond uploads apart
static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Upload and model directories plus the public base URL
#[derive(Debug, Clone)]
pub struct AssetStore {
    upload_dir: PathBuf,
    static_dir: PathBuf,
    public_url: String,
}

impl AssetStore {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        static_dir: impl Into<PathBuf>,
        public_url: &str,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            static_dir: static_dir.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::new(
            &settings.upload_dir,
            &settings.static_dir,
            &settings.public_url,
        )
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    pub fn models_dir(&self) -> PathBuf {
        self.static_dir.join("models")
    }

    /// Create the upload and model directories if missing
    pub async fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.upload_dir).await?;
        fs::create_dir_all(self.models_dir()).await?;
        Ok(())
    }

    /// Persist an uploaded file and return its path
    pub async fn save_upload(&self, filename: Option<&str>, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(upload_file_name(filename));
        fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved upload");
        Ok(path)
    }

    /// Local path of a generated model
    pub fn model_path(&self, task_id: &str) -> Result<PathBuf> {
        validate_task_id(task_id)?;
        Ok(self.models_dir().join(format!("{}.glb", task_id)))
    }

    /// Public URL of a generated model
    pub fn model_url(&self, task_id: &str) -> String {
        format!("{}/static/models/{}.glb", self.public_url, task_id)
    }
}

/// `{unix_millis}_{seq}_{sanitized name}`
fn upload_file_name(original: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}_{}_{}",
        millis,
        seq,
        sanitize_filename(original.unwrap_or("upload"))
    )
}

/// Keep only the final path component and a conservative character set
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Task ids become file names, so only plain identifier characters pass
pub fn validate_task_id(task_id: &str) -> Result<()> {
    let valid = !task_id.is_empty()
        && task_id.len() <= 128
        && task_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid task id: {}", task_id)))
    }
}

//! Image-to-3D conversion workflow
//!
//! Synchronous mode submits, polls until the task settles and republishes
//! the model locally in one call. Asynchronous mode splits that into
//! `submit`, `status` and `fetch` so the caller drives the polling.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::MeshConfig;
use crate::error::{Error, Result};
use crate::storage::{validate_task_id, AssetStore};

use super::client::MeshClient;
use super::types::{ImageUpload, StatusPassthrough, SubmitPayload, TaskSnapshot, TaskState};

/// Converts uploaded images into locally served GLB models
#[derive(Clone)]
pub struct MeshConverter {
    client: MeshClient,
    store: AssetStore,
    poll_interval: Duration,
    deadline: Duration,
}

impl MeshConverter {
    pub fn new(client: MeshClient, store: AssetStore) -> Self {
        Self {
            client,
            store,
            poll_interval: Duration::from_secs(3),
            deadline: Duration::from_secs(420),
        }
    }

    pub fn from_config(config: &MeshConfig, store: AssetStore) -> Self {
        Self::new(MeshClient::from_config(config), store)
            .with_polling(config.poll_interval, config.deadline)
    }

    /// Override the poll interval and the overall deadline
    pub fn with_polling(mut self, poll_interval: Duration, deadline: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.deadline = deadline;
        self
    }

    pub fn host(&self) -> &str {
        self.client.host()
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Convert an image and return the public model URL
    pub async fn convert(&self, upload: &ImageUpload) -> Result<String> {
        let task_id = self.submit(upload).await?;
        let glb_url = self.wait_for_model(&task_id).await?;
        let url = self.republish(&task_id, &glb_url, "Failed to download GLB").await?;
        tracing::info!(task_id = %task_id, url = %url, "Mesh conversion complete");
        Ok(url)
    }

    /// Validate, store and submit an image; returns the task id
    pub async fn submit(&self, upload: &ImageUpload) -> Result<String> {
        upload.validate()?;
        self.store
            .save_upload(upload.filename.as_deref(), &upload.bytes)
            .await?;

        let payload = SubmitPayload::new(upload.data_uri());
        let task_id = self.client.submit(&payload).await?;
        tracing::info!(
            task_id = %task_id,
            bytes = upload.bytes.len(),
            hint = upload.hint_or_default(),
            "Mesh task submitted"
        );
        Ok(task_id)
    }

    /// Raw collaborator status for a task
    pub async fn status(&self, task_id: &str) -> Result<StatusPassthrough> {
        validate_task_id(task_id)?;
        self.client.raw_status(task_id).await
    }

    /// Download a finished task's model; not-found while no model URL exists
    pub async fn fetch(&self, task_id: &str) -> Result<String> {
        validate_task_id(task_id)?;
        let snapshot = self.client.task(task_id).await?;
        let Some(glb_url) = snapshot.glb_url else {
            return Err(Error::NotFound(format!(
                "No GLB in payload: {}",
                snapshot.payload
            )));
        };
        self.republish(task_id, &glb_url, "GLB download failed").await
    }

    /// Poll until the task succeeds with a model URL, fails, or the deadline passes
    pub async fn wait_for_model(&self, task_id: &str) -> Result<String> {
        let deadline = Instant::now() + self.deadline;
        let mut last: Option<TaskSnapshot> = None;

        while Instant::now() < deadline {
            let snapshot = self.client.task(task_id).await?;
            match snapshot.state() {
                TaskState::Succeeded { glb_url } => return Ok(glb_url),
                TaskState::Failed => {
                    tracing::warn!(task_id = %task_id, status = ?snapshot.status, "Mesh task failed");
                    return Err(Error::TaskFailed(snapshot.payload));
                }
                TaskState::Pending => {
                    tracing::debug!(task_id = %task_id, status = ?snapshot.status, "Mesh task pending");
                }
            }
            last = Some(snapshot);
            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::warn!(task_id = %task_id, "Mesh task deadline exceeded");
        let (last_status, last_payload) = match last {
            Some(s) => (s.status, Some(s.payload)),
            None => (None, None),
        };
        Err(Error::DeadlineExceeded {
            last_status,
            last_payload,
        })
    }

    async fn republish(&self, task_id: &str, glb_url: &str, context: &str) -> Result<String> {
        let path = self.store.model_path(task_id)?;
        self.client.download(glb_url, &path, context).await?;
        Ok(self.store.model_url(task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockCollaboratorServer, MOCK_GLB_BYTES, MOCK_TASK_ID};
    use serde_json::json;
    use tempfile::TempDir;

    fn converter(server: &MockCollaboratorServer, dir: &TempDir) -> MeshConverter {
        let store = AssetStore::new(
            dir.path().join("uploads"),
            dir.path().join("static"),
            "http://127.0.0.1:8000",
        );
        MeshConverter::new(MeshClient::new(&server.url(), "msy-test"), store)
            .with_polling(Duration::from_millis(10), Duration::from_secs(5))
    }

    fn png() -> ImageUpload {
        ImageUpload::new(b"\x89PNG\r\n".to_vec(), "image/png").with_filename("plan.png")
    }

    #[tokio::test]
    async fn test_convert_success() {
        let server = MockCollaboratorServer::start().await;
        server.push_task_status("PENDING");
        server.push_task_status("IN_PROGRESS");
        server.push_task_succeeded();
        let dir = TempDir::new().unwrap();
        let converter = converter(&server, &dir);

        let url = converter.convert(&png()).await.unwrap();
        assert_eq!(
            url,
            format!("http://127.0.0.1:8000/static/models/{}.glb", MOCK_TASK_ID)
        );

        let saved = converter.store().model_path(MOCK_TASK_ID).unwrap();
        assert_eq!(std::fs::read(saved).unwrap(), MOCK_GLB_BYTES);
        assert_eq!(server.status_polls(), 3);

        let submission = &server.submissions()[0];
        assert!(submission["image_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(submission["enable_pbr"], true);
        assert_eq!(server.authorizations()[0], "Bearer msy-test");

        let uploads: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .collect();
        assert_eq!(uploads.len(), 1);
    }

    #[tokio::test]
    async fn test_convert_rejects_unsupported_type_before_submit() {
        let server = MockCollaboratorServer::start().await;
        let dir = TempDir::new().unwrap();
        let upload = ImageUpload::new(b"GIF89a".to_vec(), "image/gif");

        let err = converter(&server, &dir).convert(&upload).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(_)));
        assert!(server.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_convert_task_failed() {
        let server = MockCollaboratorServer::start().await;
        server.push_task_payload(json!({"status": "FAILED", "task_error": {"message": "bad image"}}));
        let dir = TempDir::new().unwrap();

        let err = converter(&server, &dir).convert(&png()).await.unwrap_err();
        match err {
            Error::TaskFailed(payload) => {
                assert_eq!(payload["task_error"]["message"], "bad image")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_convert_deadline_exceeded() {
        let server = MockCollaboratorServer::start().await;
        server.push_task_status("IN_PROGRESS");
        let dir = TempDir::new().unwrap();
        let converter = converter(&server, &dir)
            .with_polling(Duration::from_millis(20), Duration::from_millis(100));

        let err = converter.convert(&png()).await.unwrap_err();
        match err {
            Error::DeadlineExceeded {
                last_status,
                last_payload,
            } => {
                assert_eq!(last_status.as_deref(), Some("IN_PROGRESS"));
                assert_eq!(last_payload.unwrap()["progress"], 50);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(server.status_polls() >= 2);
    }

    #[tokio::test]
    async fn test_submit_failure_propagates_status() {
        let server = MockCollaboratorServer::start().await;
        server.fail_submit(402, json!({"message": "Insufficient credits"}));
        let dir = TempDir::new().unwrap();

        let err = converter(&server, &dir).submit(&png()).await.unwrap_err();
        match err {
            Error::Upstream { status, body, .. } => {
                assert_eq!(status, 402);
                assert!(body.contains("Insufficient credits"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_without_task_id() {
        let server = MockCollaboratorServer::start().await;
        server.fail_submit(200, json!({"message": "accepted"}));
        let dir = TempDir::new().unwrap();

        let err = converter(&server, &dir).submit(&png()).await.unwrap_err();
        assert!(err.to_string().contains("Meshy did not return a task id"));
    }

    #[tokio::test]
    async fn test_status_passthrough() {
        let server = MockCollaboratorServer::start().await;
        server.push_task_status("IN_PROGRESS");
        let dir = TempDir::new().unwrap();
        let converter = converter(&server, &dir);

        let status = converter.status(MOCK_TASK_ID).await.unwrap();
        assert_eq!(status.code, 200);
        assert_eq!(status.json["status"], "IN_PROGRESS");

        let status = converter.status("unknown-task").await.unwrap();
        assert_eq!(status.code, 404);
    }

    #[tokio::test]
    async fn test_fetch() {
        let server = MockCollaboratorServer::start().await;
        server.push_task_status("IN_PROGRESS");
        server.push_task_succeeded();
        let dir = TempDir::new().unwrap();
        let converter = converter(&server, &dir);

        let err = converter.fetch(MOCK_TASK_ID).await.unwrap_err();
        match err {
            Error::NotFound(msg) => assert!(msg.starts_with("No GLB in payload: ")),
            other => panic!("unexpected error: {other:?}"),
        }

        let url = converter.fetch(MOCK_TASK_ID).await.unwrap();
        assert!(url.ends_with("/static/models/task-123.glb"));
        assert!(converter.store().model_path(MOCK_TASK_ID).unwrap().exists());
    }

    #[tokio::test]
    async fn test_download_failure_leaves_no_file() {
        let server = MockCollaboratorServer::start().await;
        server.push_task_payload(json!({
            "status": "SUCCEEDED",
            "model_urls": {"glb": format!("{}/assets/missing.glb", server.url())}
        }));
        let dir = TempDir::new().unwrap();
        let converter = converter(&server, &dir);

        let err = converter.convert(&png()).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 404, .. }));
        assert!(!converter.store().model_path(MOCK_TASK_ID).unwrap().exists());
    }

    #[tokio::test]
    async fn test_invalid_task_id() {
        let server = MockCollaboratorServer::start().await;
        let dir = TempDir::new().unwrap();
        let converter = converter(&server, &dir);
        assert!(matches!(
            converter.fetch("../etc").await.unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert_eq!(server.status_polls(), 0);
    }
}

//! Meshy-compatible image-to-3D HTTP client

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::config::MeshConfig;
use crate::error::{Error, Result};

use super::types::{StatusPassthrough, SubmitPayload, SubmitResponse, TaskSnapshot};

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(180);

/// Thin client over the collaborator's task endpoints
#[derive(Clone)]
pub struct MeshClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl MeshClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &MeshConfig) -> Self {
        Self::new(&config.base_url, &config.api_key)
    }

    pub fn host(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self) -> String {
        format!("{}/openapi/v1/image-to-3d", self.base_url)
    }

    /// Submit a conversion task and return its id
    pub async fn submit(&self, payload: &SubmitPayload) -> Result<String> {
        let response = self
            .http_client
            .post(self.tasks_url())
            .bearer_auth(&self.api_key)
            .timeout(SUBMIT_TIMEOUT)
            .json(payload)
            .send()
            .await?;
        let response = ensure_success(response, "Meshy submit failed").await?;

        let text = response.text().await?;
        let submitted: SubmitResponse = serde_json::from_str(&text).map_err(|_| {
            Error::InvalidData(format!("Meshy did not return a task id. Raw: {}", text))
        })?;
        submitted
            .result
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::InvalidData(format!("Meshy did not return a task id. Raw: {}", text)))
    }

    async fn get_task(&self, task_id: &str) -> Result<Response> {
        Ok(self
            .http_client
            .get(format!("{}/{}", self.tasks_url(), task_id))
            .bearer_auth(&self.api_key)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await?)
    }

    /// Poll a task once; non-success statuses are errors
    pub async fn task(&self, task_id: &str) -> Result<TaskSnapshot> {
        let response = self.get_task(task_id).await?;
        let response = ensure_success(response, "Meshy task status failed").await?;
        let payload: Value = response.json().await?;
        Ok(TaskSnapshot::from_payload(payload))
    }

    /// Poll a task once and hand back whatever the collaborator said
    pub async fn raw_status(&self, task_id: &str) -> Result<StatusPassthrough> {
        let response = self.get_task(task_id).await?;
        let code = response.status().as_u16();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        let text = response.text().await?;
        let json = if is_json {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };
        Ok(StatusPassthrough { code, json })
    }

    /// Stream a remote asset to `dest`, returning the byte count.
    ///
    /// Writes to a sibling `.part` file first so a failed download never
    /// leaves a truncated asset behind.
    pub async fn download(&self, url: &str, dest: &Path, context: &str) -> Result<u64> {
        let response = self
            .http_client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        let mut response = ensure_success(response, context).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = dest.with_extension("glb.part");
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written = 0u64;

        let result = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<(), Error>(())
        }
        .await;

        if let Err(e) = result {
            drop(file);
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        tokio::fs::rename(&partial, dest).await?;
        tracing::debug!(path = %dest.display(), bytes = written, "Downloaded asset");
        Ok(written)
    }
}

/// Turn a status >= 300 into `Error::Upstream` carrying the body
async fn ensure_success(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.as_u16() < 300 {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream {
        status: status.as_u16(),
        context: context.to_string(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_urls() {
        let client = MeshClient::new("https://api.meshy.ai/", "msy-key");
        assert_eq!(client.host(), "https://api.meshy.ai");
        assert_eq!(
            client.tasks_url(),
            "https://api.meshy.ai/openapi/v1/image-to-3d"
        );
    }

    #[tokio::test]
    async fn test_submit_unreachable() {
        let client = MeshClient::new("http://127.0.0.1:1", "msy-key");
        let err = client
            .submit(&SubmitPayload::new("data:image/png;base64,AA==".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}

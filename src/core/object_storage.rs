use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use tracing::info;

use crate::config;

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Client for the external object storage that hosts profile images. Files
/// are sent as base64 data URIs; only the returned secure URL is ever
/// persisted by this service.
pub struct ObjectStorage {
    endpoint: Option<String>,
    http: reqwest::Client,
}

impl ObjectStorage {
    pub fn new(endpoint: Option<String>) -> Self {
        ObjectStorage {
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(config::upload_endpoint())
    }

    /// Uploads one encoded file and returns its public URL. Any failure is
    /// fatal for the calling request; there is no retry or fallback.
    pub async fn upload(&self, bytes: &[u8], content_type: &str) -> anyhow::Result<String> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("object storage endpoint not configured"))?;

        let data_uri = format!("data:{};base64,{}", content_type, BASE64.encode(bytes));

        let resp = self
            .http
            .post(endpoint)
            .json(&serde_json::json!({ "file": data_uri }))
            .send()
            .await?
            .error_for_status()?;

        let body: UploadResponse = resp.json().await?;
        info!(url = %body.secure_url, "uploaded profile image");
        Ok(body.secure_url)
    }
}

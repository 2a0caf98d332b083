//! Object storage client
//!
//! Uploads capture bytes to a bucket under a caller-constructed,
//! collision-resistant path and derives the public URL the inference
//! service will fetch. Uploads never overwrite: the storage service is
//! asked to reject an existing path, and path uniqueness comes from the
//! time-derived file name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Fixed subdirectory for capture uploads
const CAPTURE_PREFIX: &str = "captures";

/// Object storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Storage service rejected the upload
    #[error("Storage rejected upload ({0}): {1}")]
    Rejected(u16, String),
}

/// Result of a successful upload: the server-assigned object key and the
/// stable public locator derived from it. Created exactly once per upload,
/// never mutated, never deleted by this system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub path: String,
    pub public_url: String,
}

/// Upload target for capture payloads
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under `path`, refusing to overwrite an existing
    /// object, and return the asset with its public URL.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedAsset, StoreError>;
}

/// Build the collision-resistant object path for a capture taken at `at`:
/// fixed prefix, time-derived stem, fixed extension.
pub fn capture_object_path(at: DateTime<Utc>) -> String {
    format!("{}/bird-{}.jpg", CAPTURE_PREFIX, at.timestamp_millis())
}

/// Upload response body; the server echoes the assigned key
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
    path: Option<String>,
}

/// Bucket-backed object store speaking the storage REST API
pub struct BucketClient {
    http_client: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: Option<String>,
}

impl BucketClient {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let base_url = base_url.into();
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_key,
        })
    }

    /// Stable dereferenceable locator for an uploaded object
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedAsset, StoreError> {
        let url = self.object_url(path);
        tracing::debug!(path, size = bytes.len(), "Uploading capture to object storage");

        let mut request = self
            .http_client
            .post(&url)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes);

        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key).header("apikey", key.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected(status.as_u16(), error_text));
        }

        // The server echoes the assigned key; fall back to the requested
        // path when the body is empty or unrecognized.
        let assigned = match response.json::<UploadResponse>().await {
            Ok(body) => body
                .path
                .or_else(|| {
                    body.key.map(|k| {
                        k.strip_prefix(&format!("{}/", self.bucket))
                            .map(str::to_owned)
                            .unwrap_or(k)
                    })
                })
                .unwrap_or_else(|| path.to_string()),
            Err(_) => path.to_string(),
        };

        let public_url = self.public_url(&assigned);
        tracing::info!(path = %assigned, url = %public_url, "Capture uploaded");

        Ok(UploadedAsset {
            path: assigned,
            public_url,
        })
    }
}

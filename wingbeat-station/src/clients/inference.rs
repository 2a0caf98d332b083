//! Species identification client
//!
//! Posts the uploaded image's public URL and the capture coordinate to the
//! identification service and returns the raw response body for
//! normalization. Non-2xx statuses are classified so the user sees a
//! distinct message for a missing endpoint (404) versus a payload schema
//! rejection (422).

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use wingbeat_common::Coordinate;

/// Identification endpoint path under the service base URL
const IDENTIFY_PATH: &str = "/api/v1/identify-url";

/// Identification request errors
#[derive(Debug, Error)]
pub enum IdentifyError {
    /// Endpoint not found (404), service deployed without the route
    #[error("identification endpoint {IDENTIFY_PATH} was not found")]
    EndpointMissing,

    /// Request payload rejected (422)
    #[error("identification service rejected the request payload")]
    SchemaMismatch,

    /// Transport failure or any other non-2xx response
    #[error("identification request failed: {0}")]
    RequestFailed(String),
}

/// Remote species identification service
#[async_trait]
pub trait InferenceApi: Send + Sync {
    /// Identify the bird in the image at `image_url`, captured at `location`
    async fn identify(&self, image_url: &str, location: Coordinate)
        -> Result<Value, IdentifyError>;
}

#[derive(Debug, Serialize)]
struct IdentifyRequest<'a> {
    image_url: &'a str,
    location: Coordinate,
}

/// HTTP client for the identification service
pub struct InferenceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IdentifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .build()
            .map_err(|e| IdentifyError::RequestFailed(e.to_string()))?;

        let base_url = base_url.into();
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl InferenceApi for InferenceClient {
    async fn identify(
        &self,
        image_url: &str,
        location: Coordinate,
    ) -> Result<Value, IdentifyError> {
        let url = format!("{}{}", self.base_url, IDENTIFY_PATH);
        let request = IdentifyRequest {
            image_url,
            location,
        };

        tracing::debug!(image_url, lat = location.lat, lon = location.lon, "Requesting identification");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| IdentifyError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 404 {
            return Err(IdentifyError::EndpointMissing);
        }
        if status.as_u16() == 422 {
            return Err(IdentifyError::SchemaMismatch);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentifyError::RequestFailed(error_message(status.as_u16(), &body)));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| IdentifyError::RequestFailed(format!("unreadable response: {}", e)))?;

        tracing::info!(status = status.as_u16(), "Identification response received");

        Ok(raw)
    }
}

/// Extract the most specific message from an error response body.
///
/// Probes the body's `detail` then `message` field; falls back to the raw
/// body text, or the status code when the body is empty.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "message"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        format!("status {}", status)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = IdentifyRequest {
            image_url: "https://storage.example.org/captures/bird-1.jpg",
            location: Coordinate::new(41.0, 29.0),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "image_url": "https://storage.example.org/captures/bird-1.jpg",
                "location": { "lat": 41.0, "lon": 29.0 },
            })
        );
    }

    #[test]
    fn test_error_message_prefers_detail() {
        let body = r#"{"detail": "model not loaded", "message": "secondary"}"#;
        assert_eq!(error_message(500, body), "model not loaded");
    }

    #[test]
    fn test_error_message_falls_back_to_message() {
        let body = r#"{"message": "try again later"}"#;
        assert_eq!(error_message(503, body), "try again later");
    }

    #[test]
    fn test_error_message_raw_body() {
        assert_eq!(error_message(500, "plain failure"), "plain failure");
    }

    #[test]
    fn test_error_message_empty_body() {
        assert_eq!(error_message(500, ""), "status 500");
    }

    #[test]
    fn test_client_creation() {
        assert!(InferenceClient::new("http://127.0.0.1:8000/").is_ok());
    }
}

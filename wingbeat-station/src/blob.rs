//! Inline snapshot decoding
//!
//! The camera UI delivers its viewfinder snapshot as an inline
//! `data:image/jpeg;base64,...` string. This module converts that inline
//! representation into the raw byte payload handed to object storage.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

/// Snapshot decoding errors
#[derive(Debug, Error)]
pub enum BlobError {
    /// Input does not start with a `data:` scheme
    #[error("snapshot is not an inline data URL")]
    NotADataUrl,

    /// Data URL is not base64-encoded
    #[error("unsupported data URL encoding (expected base64)")]
    UnsupportedEncoding,

    /// Payload decodes to zero bytes
    #[error("snapshot payload is empty")]
    EmptyPayload,

    /// Payload is not valid base64
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// An encoded still-image snapshot held in memory.
///
/// Owned exclusively by the pipeline session until handed to upload, then
/// discarded on retake or after successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    bytes: Vec<u8>,
    content_type: String,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decode an inline data URL into a raw image payload.
///
/// Accepts `data:<mime>;base64,<payload>`. An empty payload is rejected so
/// a failed viewfinder grab never enters the pipeline.
pub fn decode_data_url(data_url: &str) -> Result<CapturedImage, BlobError> {
    let rest = data_url.strip_prefix("data:").ok_or(BlobError::NotADataUrl)?;

    let (header, payload) = rest.split_once(',').ok_or(BlobError::NotADataUrl)?;

    let mime = match header.strip_suffix(";base64") {
        Some(mime) => mime,
        None => return Err(BlobError::UnsupportedEncoding),
    };

    if payload.is_empty() {
        return Err(BlobError::EmptyPayload);
    }

    let bytes = STANDARD.decode(payload)?;
    if bytes.is_empty() {
        return Err(BlobError::EmptyPayload);
    }

    let content_type = if mime.is_empty() { "image/jpeg" } else { mime };
    Ok(CapturedImage::new(bytes, content_type))
}

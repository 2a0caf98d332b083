//! One-shot positioning provider
//!
//! The station requests the device coordinate exactly once per session,
//! at session start. There is no automatic retry: a failed acquisition
//! leaves the session without a coordinate until the user restarts the
//! flow, and the submit precondition keeps the pipeline from ever running
//! without a location.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use wingbeat_common::Coordinate;

/// Positioning errors
#[derive(Debug, Error)]
pub enum LocationError {
    /// Device coordinates could not be acquired
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Source of the device coordinate
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Acquire the current device coordinate. Called once per session.
    async fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Position response from the local positioning bridge
#[derive(Debug, Deserialize)]
struct PositionResponse {
    lat: f64,
    lon: f64,
}

/// Positioning provider backed by a local HTTP bridge (gpsd-style)
pub struct HttpLocationProvider {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpLocationProvider {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, LocationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .build()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl LocationProvider for HttpLocationProvider {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        tracing::debug!(endpoint = %self.endpoint, "Requesting device position");

        let response = self
            .http_client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!(
                "positioning service returned {}",
                status
            )));
        }

        let position: PositionResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        let coordinate = Coordinate::new(position.lat, position.lon);
        tracing::info!(lat = coordinate.lat, lon = coordinate.lon, "Position acquired");

        Ok(coordinate)
    }
}

//! Encyclopedia summary lookup for the record detail panel
//!
//! Fully decoupled from the submission pipeline: a lookup failure only
//! degrades the panel to a "no information available" display. A species
//! name equal to the "Unknown" sentinel is short-circuited to an error
//! before any network call.

use crate::normalize::UNKNOWN_SPECIES;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    /// The record carries the "Unknown" sentinel; nothing to look up
    #[error("no encyclopedia entry for an unidentified bird")]
    UnknownSpecies,

    /// Transport failure, non-2xx response, or unreadable body
    #[error("encyclopedia lookup failed: {0}")]
    Failed(String),
}

/// Page summary returned by the encyclopedia service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSummary {
    pub title: String,
    pub extract: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_urls: Option<ContentUrls>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<DesktopUrls>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopUrls {
    pub page: String,
}

/// Encyclopedia summary source
#[async_trait]
pub trait EncyclopediaApi: Send + Sync {
    async fn species_summary(&self, species_name: &str) -> Result<SpeciesSummary, LookupError>;
}

/// Client for a Wikipedia-style REST summary endpoint
pub struct WikiSummaryClient {
    http_client: reqwest::Client,
    summary_url: Url,
}

impl WikiSummaryClient {
    pub fn new(summary_url: &str) -> Result<Self, LookupError> {
        let summary_url = Url::parse(summary_url)
            .map_err(|e| LookupError::Failed(format!("invalid summary URL: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .build()
            .map_err(|e| LookupError::Failed(e.to_string()))?;

        Ok(Self {
            http_client,
            summary_url,
        })
    }

    /// Summary URL with the species name appended as one encoded segment
    fn summary_url_for(&self, species_name: &str) -> Result<Url, LookupError> {
        let mut url = self.summary_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::Failed("summary URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push(species_name);
        Ok(url)
    }
}

#[async_trait]
impl EncyclopediaApi for WikiSummaryClient {
    async fn species_summary(&self, species_name: &str) -> Result<SpeciesSummary, LookupError> {
        // Sentinel check before any network activity
        if species_name.eq_ignore_ascii_case(UNKNOWN_SPECIES) {
            return Err(LookupError::UnknownSpecies);
        }

        let url = self.summary_url_for(species_name)?;
        tracing::debug!(species = species_name, url = %url, "Fetching encyclopedia summary");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Failed(format!(
                "encyclopedia returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LookupError::Failed(format!("unreadable summary: {}", e)))
    }
}

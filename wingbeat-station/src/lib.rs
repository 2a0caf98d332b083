//! wingbeat-station library interface
//!
//! Exposes the pipeline, clients and router for integration testing.

pub mod api;
pub mod blob;
pub mod clients;
pub mod error;
pub mod map;
pub mod normalize;
pub mod pipeline;
pub mod slot;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::clients::{EncyclopediaApi, LocationProvider};
use crate::pipeline::SubmissionPipeline;
use crate::store::RecordStore;
use wingbeat_common::events::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The one submission pipeline for this station session
    pub pipeline: Arc<SubmissionPipeline>,
    /// Record store, read in bulk by the map
    pub records: Arc<dyn RecordStore>,
    /// Encyclopedia summary source for the lookup panel
    pub encyclopedia: Arc<dyn EncyclopediaApi>,
    /// Positioning provider, used once per session (re)start
    pub location: Arc<dyn LocationProvider>,
    /// Event bus feeding the SSE stream
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<SubmissionPipeline>,
        records: Arc<dyn RecordStore>,
        encyclopedia: Arc<dyn EncyclopediaApi>,
        location: Arc<dyn LocationProvider>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            pipeline,
            records,
            encyclopedia,
            location,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::station_routes())
        .merge(api::map_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state)
}

//! Map-page endpoints: bulk marker read and the lookup panel proxy

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::clients::SpeciesSummary;
use crate::map::{MapSnapshot, MapView};
use crate::AppState;

/// GET /api/lookup/:species response body
///
/// Lookup failures degrade to `available: false` rather than an error
/// status; the panel renders a "no information available" message.
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub species_name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SpeciesSummary>,
}

/// GET /api/map - markers plus the initial viewport
pub async fn get_map(State(state): State<AppState>) -> Json<MapSnapshot> {
    let view = MapView::new(state.records.clone(), state.pipeline.slot().subscribe());
    Json(view.mount().await)
}

/// GET /api/lookup/:species - encyclopedia summary for a selected marker
pub async fn get_lookup(
    State(state): State<AppState>,
    Path(species): Path<String>,
) -> Json<LookupResponse> {
    match state.encyclopedia.species_summary(&species).await {
        Ok(summary) => Json(LookupResponse {
            species_name: species,
            available: true,
            summary: Some(summary),
        }),
        Err(e) => {
            tracing::warn!(species = %species, "Encyclopedia lookup failed: {}", e);
            Json(LookupResponse {
                species_name: species,
                available: false,
                summary: None,
            })
        }
    }
}

/// Build map-page routes
pub fn map_routes() -> Router<AppState> {
    Router::new()
        .route("/api/map", get(get_map))
        .route("/api/lookup/:species", get(get_lookup))
}

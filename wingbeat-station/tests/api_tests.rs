//! Integration tests for the station API endpoints
//!
//! Covers the camera flow (capture → submit), its precondition and
//! conflict responses, the map read side with its default viewport, and
//! the degrading lookup proxy. External collaborators are in-process
//! fakes wired through AppState.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;
use wingbeat_common::events::EventBus;
use wingbeat_common::Coordinate;
use wingbeat_station::clients::{
    EncyclopediaApi, IdentifyError, InferenceApi, LocationError, LocationProvider, LookupError,
    ObjectStore, SpeciesSummary, StoreError, UploadedAsset,
};
use wingbeat_station::pipeline::SubmissionPipeline;
use wingbeat_station::store::{MapMarker, NewSubmission, RecordStore, RecordStoreError};
use wingbeat_station::{build_router, AppState};

// "AQID" is base64 for the bytes [1, 2, 3]
const SNAPSHOT: &str = "data:image/jpeg;base64,AQID";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeObjectStore;

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload(
        &self,
        path: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<UploadedAsset, StoreError> {
        Ok(UploadedAsset {
            path: path.to_string(),
            public_url: format!("https://storage.test/public/{}", path),
        })
    }
}

struct FakeInference {
    response: Value,
    fail_not_found: bool,
}

#[async_trait]
impl InferenceApi for FakeInference {
    async fn identify(
        &self,
        _image_url: &str,
        _location: Coordinate,
    ) -> Result<Value, IdentifyError> {
        if self.fail_not_found {
            return Err(IdentifyError::EndpointMissing);
        }
        Ok(self.response.clone())
    }
}

struct FakeRecordStore {
    rows: Mutex<Vec<MapMarker>>,
}

impl FakeRecordStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn insert(&self, row: NewSubmission) -> Result<Uuid, RecordStoreError> {
        let id = Uuid::new_v4();
        self.rows.lock().unwrap().push(MapMarker {
            id,
            species_name: row.species_name,
            geo: row.geo,
        });
        Ok(id)
    }

    async fn list_markers(&self) -> Result<Vec<MapMarker>, RecordStoreError> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

struct FakeEncyclopedia;

#[async_trait]
impl EncyclopediaApi for FakeEncyclopedia {
    async fn species_summary(&self, species_name: &str) -> Result<SpeciesSummary, LookupError> {
        if species_name.eq_ignore_ascii_case("unknown") {
            return Err(LookupError::UnknownSpecies);
        }
        if species_name == "Robin" {
            return Ok(serde_json::from_value(json!({
                "title": "European robin",
                "extract": "A small insectivorous passerine bird.",
            }))
            .unwrap());
        }
        Err(LookupError::Failed("summary not found".to_string()))
    }
}

struct FakeLocationProvider {
    calls: AtomicUsize,
    position: Option<Coordinate>,
}

impl FakeLocationProvider {
    fn new(position: Option<Coordinate>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            position,
        })
    }
}

#[async_trait]
impl LocationProvider for FakeLocationProvider {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.position
            .ok_or_else(|| LocationError::Unavailable("no position fix".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

struct TestApp {
    app: axum::Router,
    state: AppState,
    location: Arc<FakeLocationProvider>,
}

fn setup_app(inference: FakeInference) -> TestApp {
    let event_bus = EventBus::new(64);
    let records = FakeRecordStore::new();
    let location = FakeLocationProvider::new(Some(Coordinate::new(41.0, 29.0)));

    let pipeline = Arc::new(SubmissionPipeline::new(
        Arc::new(FakeObjectStore),
        Arc::new(inference),
        records.clone(),
        event_bus.clone(),
    ));

    let state = AppState::new(
        pipeline,
        records,
        Arc::new(FakeEncyclopedia),
        location.clone(),
        event_bus,
    );
    TestApp {
        app: build_router(state.clone()),
        state,
        location,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_endpoint() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });

    let response = harness.app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "wingbeat-station");
    assert!(body["version"].is_string());
}

// ---------------------------------------------------------------------------
// Camera flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_capture_then_submit_happy_path() {
    let harness = setup_app(FakeInference {
        response: json!({ "species_name": "Robin", "confidence": 0.92 }),
        fail_not_found: false,
    });
    harness
        .state
        .pipeline
        .set_location(Coordinate::new(41.0, 29.0))
        .await;

    let response = harness
        .app
        .clone()
        .oneshot(post_json("/api/capture", json!({ "image": SNAPSHOT })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["phase"], "CAPTURED");
    assert_eq!(body["has_image"], true);

    let response = harness
        .app
        .clone()
        .oneshot(post_empty("/api/submit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "Success! Bird: Robin");
    assert_eq!(body["outcome"]["identification"]["species_name"], "Robin");
    assert_eq!(body["outcome"]["coordinate"]["lat"], 41.0);

    let response = harness.app.oneshot(get("/api/session")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["phase"], "SUCCEEDED");
    assert_eq!(body["has_image"], false);
}

#[tokio::test]
async fn test_submit_without_capture_is_bad_request() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });
    harness
        .state
        .pipeline
        .set_location(Coordinate::new(41.0, 29.0))
        .await;

    let response = harness.app.oneshot(post_empty("/api/submit")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_submit_without_location_is_bad_request() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });

    let response = harness
        .app
        .clone()
        .oneshot(post_json("/api/capture", json!({ "image": SNAPSHOT })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness.app.oneshot(post_empty("/api/submit")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_capture_rejects_empty_snapshot() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });

    let response = harness
        .app
        .clone()
        .oneshot(post_json(
            "/api/capture",
            json!({ "image": "data:image/jpeg;base64," }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The session still has no held snapshot
    let response = harness.app.oneshot(get("/api/session")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["has_image"], false);
}

#[tokio::test]
async fn test_retake_clears_the_snapshot() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });

    harness
        .app
        .clone()
        .oneshot(post_json("/api/capture", json!({ "image": SNAPSHOT })))
        .await
        .unwrap();

    let response = harness
        .app
        .clone()
        .oneshot(post_empty("/api/retake"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["phase"], "AWAITINGCAPTURE");
    assert_eq!(body["has_image"], false);
}

#[tokio::test]
async fn test_inference_404_maps_to_upstream_error() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: true,
    });
    harness
        .state
        .pipeline
        .set_location(Coordinate::new(41.0, 29.0))
        .await;

    harness
        .app
        .clone()
        .oneshot(post_json("/api/capture", json!({ "image": SNAPSHOT })))
        .await
        .unwrap();

    let response = harness.app.clone().oneshot(post_empty("/api/submit")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("/api/v1/identify-url"));

    // No record was inserted
    let response = harness.app.oneshot(get("/api/map")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["markers"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_session_restart_runs_one_acquisition() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });
    assert_eq!(harness.location.calls.load(Ordering::SeqCst), 0);

    let response = harness
        .app
        .clone()
        .oneshot(post_empty("/api/session/restart"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["phase"], "AWAITINGCAPTURE");
    assert_eq!(body["coordinate"]["lat"], 41.0);

    assert_eq!(harness.location.calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Map and lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_map_defaults_with_no_records_and_no_slot() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });

    let response = harness.app.oneshot(get("/api/map")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["markers"].as_array().unwrap().len(), 0);
    assert_eq!(body["viewport"]["center"]["lat"], 39.0);
    assert_eq!(body["viewport"]["center"]["lon"], 35.0);
    assert_eq!(body["viewport"]["zoom"], 6);
}

#[tokio::test]
async fn test_map_recenters_after_submission() {
    let harness = setup_app(FakeInference {
        response: json!({ "species_name": "Robin" }),
        fail_not_found: false,
    });
    harness
        .state
        .pipeline
        .set_location(Coordinate::new(41.0, 29.0))
        .await;

    harness
        .app
        .clone()
        .oneshot(post_json("/api/capture", json!({ "image": SNAPSHOT })))
        .await
        .unwrap();
    let response = harness
        .app
        .clone()
        .oneshot(post_empty("/api/submit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness.app.oneshot(get("/api/map")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    let markers = body["markers"].as_array().unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0]["species_name"], "Robin");
    assert_eq!(markers[0]["geo"]["lat"], 41.0);

    assert_eq!(body["viewport"]["center"]["lat"], 41.0);
    assert_eq!(body["viewport"]["zoom"], 15);
}

#[tokio::test]
async fn test_lookup_returns_summary() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });

    let response = harness.app.oneshot(get("/api/lookup/Robin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["available"], true);
    assert_eq!(body["summary"]["title"], "European robin");
}

#[tokio::test]
async fn test_lookup_degrades_on_failure() {
    let harness = setup_app(FakeInference {
        response: json!({}),
        fail_not_found: false,
    });

    // Unknown sentinel and plain failures both degrade, never error
    for species in ["Unknown", "Nonexistent"] {
        let response = harness
            .app
            .clone()
            .oneshot(get(&format!("/api/lookup/{}", species)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["available"], false);
        assert!(body.get("summary").is_none());
    }
}

//! Submission pipeline
//!
//! Orchestrates one user-initiated submission through its stages:
//! upload the held snapshot to object storage, request identification for
//! the uploaded image, persist the normalized result, then overwrite the
//! shared location slot so the map recenters.
//!
//! The pipeline is an explicit state machine. Preconditions (a held
//! snapshot and an acquired coordinate) are checked synchronously before
//! any network call; a violated precondition aborts with zero side
//! effects. Each submit action performs at most one upload, one
//! identification call and one insert; no stage is ever re-executed
//! automatically, and a failed stage moves the session to the failed
//! phase until the user retakes or retries.

use crate::blob::CapturedImage;
use crate::clients::{IdentifyError, InferenceApi, ObjectStore, StoreError, UploadedAsset};
use crate::clients::object_store::capture_object_path;
use crate::clients::LocationProvider;
use crate::normalize::{self, IdentificationResult};
use crate::slot::LocationSlot;
use crate::store::{NewSubmission, RecordStore, RecordStoreError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;
use wingbeat_common::events::{EventBus, StationEvent, SubmissionPhase};
use wingbeat_common::Coordinate;

/// Submission errors, mapped one-to-one onto user-facing messages
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Submit action without a held snapshot; no side effect occurred
    #[error("take a photo before submitting")]
    MissingImage,

    /// Submit action without an acquired coordinate; no side effect occurred
    #[error("location is not available; allow location access and restart the flow")]
    MissingLocation,

    /// Object storage transport error or rejection
    #[error("image upload failed: {0}")]
    Upload(String),

    /// Identification endpoint missing (404)
    #[error("identification endpoint /api/v1/identify-url was not found; check the backend")]
    EndpointMissing,

    /// Identification request rejected as invalid (422)
    #[error("identification service rejected the request payload; check the JSON schema")]
    SchemaMismatch,

    /// Any other identification failure
    #[error("identification request failed: {0}")]
    RequestFailed(String),

    /// Record insert failed
    #[error("could not save the submission: {0}")]
    Persist(String),

    /// A submission is already being driven through its stages
    #[error("a submission is already in progress")]
    AlreadyRunning,
}

impl SubmitError {
    /// Stable reason code carried in failure events
    pub fn reason_code(&self) -> &'static str {
        match self {
            SubmitError::MissingImage => "MISSING_IMAGE",
            SubmitError::MissingLocation => "MISSING_LOCATION",
            SubmitError::Upload(_) => "UPLOAD_ERROR",
            SubmitError::EndpointMissing => "ENDPOINT_MISSING",
            SubmitError::SchemaMismatch => "SCHEMA_MISMATCH",
            SubmitError::RequestFailed(_) => "REQUEST_FAILED",
            SubmitError::Persist(_) => "PERSIST_ERROR",
            SubmitError::AlreadyRunning => "ALREADY_RUNNING",
        }
    }

    /// True for failures that occur before any side effect
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SubmitError::MissingImage | SubmitError::MissingLocation | SubmitError::AlreadyRunning
        )
    }
}

impl From<StoreError> for SubmitError {
    fn from(e: StoreError) -> Self {
        SubmitError::Upload(e.to_string())
    }
}

impl From<IdentifyError> for SubmitError {
    fn from(e: IdentifyError) -> Self {
        match e {
            IdentifyError::EndpointMissing => SubmitError::EndpointMissing,
            IdentifyError::SchemaMismatch => SubmitError::SchemaMismatch,
            IdentifyError::RequestFailed(msg) => SubmitError::RequestFailed(msg),
        }
    }
}

impl From<RecordStoreError> for SubmitError {
    fn from(e: RecordStoreError) -> Self {
        SubmitError::Persist(e.to_string())
    }
}

/// Result of one successful submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub record_id: Uuid,
    pub identification: IdentificationResult,
    pub image_path: String,
    pub image_url: String,
    pub coordinate: Coordinate,
}

/// Session view reported to the UI
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: SubmissionPhase,
    pub coordinate: Option<Coordinate>,
    pub has_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Per-session mutable state, guarded by one lock
#[derive(Debug)]
struct Session {
    phase: SubmissionPhase,
    image: Option<CapturedImage>,
    coordinate: Option<Coordinate>,
    location_error: Option<String>,
    failure: Option<String>,
}

impl Session {
    fn new() -> Self {
        Self {
            phase: SubmissionPhase::Idle,
            image: None,
            coordinate: None,
            location_error: None,
            failure: None,
        }
    }
}

/// Drives captures through upload → identify → persist
pub struct SubmissionPipeline {
    object_store: Arc<dyn ObjectStore>,
    inference: Arc<dyn InferenceApi>,
    records: Arc<dyn RecordStore>,
    slot: LocationSlot,
    event_bus: EventBus,
    session: Mutex<Session>,
    in_flight: AtomicBool,
}

impl SubmissionPipeline {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        inference: Arc<dyn InferenceApi>,
        records: Arc<dyn RecordStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            object_store,
            inference,
            records,
            slot: LocationSlot::new(),
            event_bus,
            session: Mutex::new(Session::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// The shared location slot written by this pipeline's success path
    pub fn slot(&self) -> &LocationSlot {
        &self.slot
    }

    /// Start the session: viewfinder live, one location acquisition.
    ///
    /// The acquisition is attempted exactly once; on failure the
    /// `LocationUnavailable` condition persists until `restart_session`.
    pub async fn begin_session(&self, provider: Arc<dyn LocationProvider>) {
        self.set_phase(SubmissionPhase::AwaitingCapture, "Viewfinder ready")
            .await;

        match provider.current_position().await {
            Ok(coordinate) => self.set_location(coordinate).await,
            Err(e) => self.location_unavailable(e.to_string()).await,
        }
    }

    /// Reload the flow: clear the session and run one new acquisition.
    pub async fn restart_session(
        &self,
        provider: Arc<dyn LocationProvider>,
    ) -> Result<(), SubmitError> {
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(SubmitError::AlreadyRunning);
        }

        {
            let mut session = self.session.lock().await;
            session.image = None;
            session.coordinate = None;
            session.location_error = None;
            session.failure = None;
        }

        self.begin_session(provider).await;
        Ok(())
    }

    /// Record the acquired coordinate for this session
    pub async fn set_location(&self, coordinate: Coordinate) {
        {
            let mut session = self.session.lock().await;
            session.coordinate = Some(coordinate);
            session.location_error = None;
        }
        tracing::info!(lat = coordinate.lat, lon = coordinate.lon, "Session location set");
        self.event_bus.emit_lossy(StationEvent::LocationAcquired {
            coordinate,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Record a failed acquisition; persists until session restart
    pub async fn location_unavailable(&self, message: String) {
        {
            let mut session = self.session.lock().await;
            session.coordinate = None;
            session.location_error = Some(message.clone());
        }
        tracing::warn!("Location unavailable: {}", message);
        self.event_bus.emit_lossy(StationEvent::LocationUnavailable {
            message,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Hold a snapshot for submission.
    ///
    /// An empty snapshot never enters the session: the phase stays where
    /// it was and the held image (if any) is untouched.
    pub async fn capture(&self, image: CapturedImage) -> Result<(), SubmitError> {
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(SubmitError::AlreadyRunning);
        }
        if image.is_empty() {
            return Err(SubmitError::MissingImage);
        }

        {
            let mut session = self.session.lock().await;
            session.image = Some(image);
            session.failure = None;
        }
        self.set_phase(SubmissionPhase::Captured, "Snapshot ready to submit")
            .await;
        Ok(())
    }

    /// Discard the held snapshot and return to the viewfinder
    pub async fn retake(&self) -> Result<(), SubmitError> {
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(SubmitError::AlreadyRunning);
        }

        {
            let mut session = self.session.lock().await;
            session.image = None;
            session.failure = None;
        }
        self.set_phase(SubmissionPhase::AwaitingCapture, "Viewfinder ready")
            .await;
        Ok(())
    }

    /// Current session view for the UI
    pub async fn status(&self) -> SessionStatus {
        let session = self.session.lock().await;
        SessionStatus {
            phase: session.phase,
            coordinate: session.coordinate,
            has_image: session.image.is_some(),
            location_error: session.location_error.clone(),
            failure: session.failure.clone(),
        }
    }

    /// Run one submission.
    ///
    /// At most one submission is in flight per session; a concurrent
    /// submit is rejected with `AlreadyRunning` and performs nothing.
    pub async fn submit(&self) -> Result<SubmissionOutcome, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SubmitError::AlreadyRunning);
        }

        let result = self.run_stages().await;
        self.in_flight.store(false, Ordering::SeqCst);

        if let Err(ref err) = result {
            if err.is_precondition() {
                // Aborted before any side effect; phase unchanged
                tracing::warn!(reason = err.reason_code(), "Submit rejected: {}", err);
            } else {
                self.fail(err).await;
            }
        }

        result
    }

    async fn run_stages(&self) -> Result<SubmissionOutcome, SubmitError> {
        // Preconditions, checked synchronously before any network call
        let (image, coordinate) = {
            let session = self.session.lock().await;
            let image = session.image.clone().ok_or(SubmitError::MissingImage)?;
            let coordinate = session.coordinate.ok_or(SubmitError::MissingLocation)?;
            (image, coordinate)
        };

        // Upload under a fresh time-derived path; never overwrites
        self.set_phase(SubmissionPhase::Uploading, "Uploading image to storage...")
            .await;
        let path = capture_object_path(chrono::Utc::now());
        let content_type = image.content_type().to_string();
        let asset: UploadedAsset = self
            .object_store
            .upload(&path, image.into_bytes(), &content_type)
            .await?;

        // Identify the uploaded image
        self.set_phase(SubmissionPhase::Identifying, "Requesting identification...")
            .await;
        let raw = self.inference.identify(&asset.public_url, coordinate).await?;

        // Normalization never fails
        let identification: IdentificationResult = normalize::normalize(&raw);

        // Persist one record built from the asset, the result and the
        // original coordinate
        self.set_phase(SubmissionPhase::Persisting, "Saving the result...")
            .await;
        let record_id = self
            .records
            .insert(NewSubmission {
                image_path: asset.path.clone(),
                image_url: asset.public_url.clone(),
                species_name: identification.species_name.clone(),
                species_id: identification.species_id.clone(),
                confidence: identification.confidence,
                geo: coordinate,
            })
            .await?;

        // Success path: single writer of the shared slot
        self.slot.publish(coordinate);
        self.event_bus.emit_lossy(StationEvent::MapRecenter {
            coordinate,
            timestamp: chrono::Utc::now(),
        });

        {
            let mut session = self.session.lock().await;
            session.image = None; // discard after successful submission
            session.failure = None;
        }
        self.set_phase(
            SubmissionPhase::Succeeded,
            &format!("Success! Bird: {}", identification.species_name),
        )
        .await;
        self.event_bus.emit_lossy(StationEvent::SubmissionSucceeded {
            record_id,
            species_name: identification.species_name.clone(),
            coordinate,
            timestamp: chrono::Utc::now(),
        });

        Ok(SubmissionOutcome {
            record_id,
            identification,
            image_path: asset.path,
            image_url: asset.public_url,
            coordinate,
        })
    }

    async fn set_phase(&self, new_phase: SubmissionPhase, status: &str) {
        let old_phase = {
            let mut session = self.session.lock().await;
            let old = session.phase;
            session.phase = new_phase;
            old
        };

        tracing::info!(?old_phase, ?new_phase, status, "Submission phase changed");
        self.event_bus
            .emit_lossy(StationEvent::SubmissionPhaseChanged {
                old_phase,
                new_phase,
                status: status.to_string(),
                timestamp: chrono::Utc::now(),
            });
    }

    async fn fail(&self, err: &SubmitError) {
        {
            let mut session = self.session.lock().await;
            session.failure = Some(err.to_string());
        }
        self.set_phase(SubmissionPhase::Failed, &err.to_string()).await;
        self.event_bus.emit_lossy(StationEvent::SubmissionFailed {
            reason: err.reason_code().to_string(),
            message: err.to_string(),
            timestamp: chrono::Utc::now(),
        });
        tracing::error!(reason = err.reason_code(), "Submission failed: {}", err);
    }
}

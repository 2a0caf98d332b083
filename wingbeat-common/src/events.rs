//! Event types for the Wingbeat event system
//!
//! Provides shared event definitions and the EventBus used to fan station
//! activity out to SSE clients (camera page status line, map recenter).

use crate::geo::Coordinate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Submission pipeline phase.
///
/// A submission progresses through the phases in order:
/// IDLE → AWAITINGCAPTURE → CAPTURED → UPLOADING → IDENTIFYING →
/// PERSISTING → SUCCEEDED, with FAILED reachable from any of the three
/// in-flight phases. The failure reason is carried separately, typed as
/// `SubmitError` in the station crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionPhase {
    /// Station started, location not yet requested
    Idle,
    /// Viewfinder live, no snapshot held
    AwaitingCapture,
    /// Snapshot held in memory, not yet submitted
    Captured,
    /// Image bytes being uploaded to object storage
    Uploading,
    /// Identification request in flight
    Identifying,
    /// Submission record being inserted
    Persisting,
    /// Record durable, map recentered
    Succeeded,
    /// Submission aborted at one of the in-flight phases
    Failed,
}

impl SubmissionPhase {
    /// True for phases from which no further stage runs without user action
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionPhase::Succeeded | SubmissionPhase::Failed)
    }

    /// True while a submit action is being driven through its stages
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            SubmissionPhase::Uploading
                | SubmissionPhase::Identifying
                | SubmissionPhase::Persisting
        )
    }
}

/// Wingbeat event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All station activity the UI reacts to flows through this one enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StationEvent {
    /// One-shot geolocation acquisition succeeded
    ///
    /// Triggers:
    /// - SSE: replace the "Locating..." badge with the coordinate
    LocationAcquired {
        coordinate: Coordinate,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One-shot geolocation acquisition failed
    ///
    /// The condition persists until the session is restarted; no automatic
    /// retry is attempted.
    LocationUnavailable {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Submission pipeline moved to a new phase
    ///
    /// Triggers:
    /// - SSE: update the staged status line on the camera page
    SubmissionPhaseChanged {
        old_phase: SubmissionPhase,
        new_phase: SubmissionPhase,
        /// Human-readable status line for the current phase
        status: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Submission persisted successfully
    ///
    /// Triggers:
    /// - SSE: show "Success! Bird: {species_name}"
    /// - Map: plot the new marker on next bulk read
    SubmissionSucceeded {
        record_id: Uuid,
        species_name: String,
        coordinate: Coordinate,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Submission aborted with a user-facing reason
    SubmissionFailed {
        /// Stable reason code (e.g. "UPLOAD_ERROR", "ENDPOINT_MISSING")
        reason: String,
        /// Human-readable message shown to the user
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The shared location slot was overwritten
    ///
    /// Triggers:
    /// - Map: recenter the viewport on the coordinate at close zoom
    MapRecenter {
        coordinate: Coordinate,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl StationEvent {
    /// Stable event name used as the SSE event type
    pub fn event_type(&self) -> &str {
        match self {
            StationEvent::LocationAcquired { .. } => "LocationAcquired",
            StationEvent::LocationUnavailable { .. } => "LocationUnavailable",
            StationEvent::SubmissionPhaseChanged { .. } => "SubmissionPhaseChanged",
            StationEvent::SubmissionSucceeded { .. } => "SubmissionSucceeded",
            StationEvent::SubmissionFailed { .. } => "SubmissionFailed",
            StationEvent::MapRecenter { .. } => "MapRecenter",
        }
    }
}

/// Broadcast bus for station events
///
/// Uses tokio::broadcast internally: every subscriber receives every event
/// emitted after its subscription; slow subscribers drop the oldest events
/// once the channel capacity is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<StationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    pub fn emit(
        &self,
        event: StationEvent,
    ) -> Result<usize, broadcast::error::SendError<StationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Station progress events are informational; no component fails when
    /// nothing is connected to the SSE stream.
    pub fn emit_lossy(&self, event: StationEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

//! Map reconciliation
//!
//! Renders persisted submissions back onto the shared map and keeps the
//! viewport in sync with the newest submission. On mount the map performs
//! one bulk read of all records; a failed read is logged and rendered as
//! zero records rather than an error page. While mounted, the map holds a
//! live subscription to the location slot and recenters on every change.

use crate::store::{MapMarker, RecordStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use wingbeat_common::Coordinate;

/// Fallback map center when no submission has happened this session
pub const DEFAULT_CENTER: Coordinate = Coordinate { lat: 39.0, lon: 35.0 };

/// Zoom level when centered on the latest submission
pub const CLOSE_ZOOM: u8 = 15;

/// Zoom level for the default wide view
pub const WIDE_ZOOM: u8 = 6;

/// Map viewport: center plus zoom level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: u8,
}

/// Everything the map needs to render once
#[derive(Debug, Clone, Serialize)]
pub struct MapSnapshot {
    pub viewport: Viewport,
    pub markers: Vec<MapMarker>,
}

/// Viewport rule: newest submission at close zoom, else the wide default
fn viewport_for(latest: Option<Coordinate>) -> Viewport {
    match latest {
        Some(center) => Viewport {
            center,
            zoom: CLOSE_ZOOM,
        },
        None => Viewport {
            center: DEFAULT_CENTER,
            zoom: WIDE_ZOOM,
        },
    }
}

/// Read-side view over the record store and the location slot
pub struct MapView {
    records: Arc<dyn RecordStore>,
    location: watch::Receiver<Option<Coordinate>>,
}

impl MapView {
    pub fn new(
        records: Arc<dyn RecordStore>,
        location: watch::Receiver<Option<Coordinate>>,
    ) -> Self {
        Self { records, location }
    }

    /// One-time mount read: all markers plus the initial viewport.
    ///
    /// A record read failure degrades to an empty marker set.
    pub async fn mount(&self) -> MapSnapshot {
        let markers = match self.records.list_markers().await {
            Ok(markers) => markers,
            Err(e) => {
                tracing::warn!("Record read failed, rendering empty map: {}", e);
                Vec::new()
            }
        };

        MapSnapshot {
            viewport: self.viewport(),
            markers,
        }
    }

    /// Viewport for the slot's current value
    pub fn viewport(&self) -> Viewport {
        viewport_for(*self.location.borrow())
    }

    /// Await the next slot overwrite and return the recentered viewport.
    ///
    /// Returns `None` once the slot's writer is gone (session shutdown).
    pub async fn next_recenter(&mut self) -> Option<Viewport> {
        self.location.changed().await.ok()?;
        let coordinate = (*self.location.borrow_and_update())?;
        Some(Viewport {
            center: coordinate,
            zoom: CLOSE_ZOOM,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::LocationSlot;
    use crate::store::{NewSubmission, RecordStoreError};
    use async_trait::async_trait;
    use uuid::Uuid;

    struct StubStore {
        markers: Vec<MapMarker>,
        fail_reads: bool,
    }

    #[async_trait]
    impl RecordStore for StubStore {
        async fn insert(&self, _row: NewSubmission) -> Result<Uuid, RecordStoreError> {
            unimplemented!("read-only stub")
        }

        async fn list_markers(&self) -> Result<Vec<MapMarker>, RecordStoreError> {
            if self.fail_reads {
                Err(RecordStoreError::Malformed("stub failure".to_string()))
            } else {
                Ok(self.markers.clone())
            }
        }
    }

    fn marker(lat: f64, lon: f64) -> MapMarker {
        MapMarker {
            id: Uuid::new_v4(),
            species_name: "Robin".to_string(),
            geo: Coordinate::new(lat, lon),
        }
    }

    #[tokio::test]
    async fn test_empty_map_uses_wide_default_viewport() {
        let slot = LocationSlot::new();
        let view = MapView::new(
            Arc::new(StubStore {
                markers: vec![],
                fail_reads: false,
            }),
            slot.subscribe(),
        );

        let snapshot = view.mount().await;
        assert!(snapshot.markers.is_empty());
        assert_eq!(snapshot.viewport.center, DEFAULT_CENTER);
        assert_eq!(snapshot.viewport.zoom, WIDE_ZOOM);
    }

    #[tokio::test]
    async fn test_read_failure_degrades_to_zero_records() {
        let slot = LocationSlot::new();
        let view = MapView::new(
            Arc::new(StubStore {
                markers: vec![marker(41.0, 29.0)],
                fail_reads: true,
            }),
            slot.subscribe(),
        );

        let snapshot = view.mount().await;
        assert!(snapshot.markers.is_empty());
        assert_eq!(snapshot.viewport.center, DEFAULT_CENTER);
    }

    #[tokio::test]
    async fn test_slot_value_centers_close() {
        let slot = LocationSlot::new();
        slot.publish(Coordinate::new(41.0, 29.0));

        let view = MapView::new(
            Arc::new(StubStore {
                markers: vec![marker(41.0, 29.0)],
                fail_reads: false,
            }),
            slot.subscribe(),
        );

        let snapshot = view.mount().await;
        assert_eq!(snapshot.markers.len(), 1);
        assert_eq!(snapshot.viewport.center, Coordinate::new(41.0, 29.0));
        assert_eq!(snapshot.viewport.zoom, CLOSE_ZOOM);
    }

    #[tokio::test]
    async fn test_live_subscription_recenters() {
        let slot = LocationSlot::new();
        let mut view = MapView::new(
            Arc::new(StubStore {
                markers: vec![],
                fail_reads: false,
            }),
            slot.subscribe(),
        );

        slot.publish(Coordinate::new(39.9, 32.8));
        let viewport = view.next_recenter().await.unwrap();
        assert_eq!(viewport.center, Coordinate::new(39.9, 32.8));
        assert_eq!(viewport.zoom, CLOSE_ZOOM);

        slot.publish(Coordinate::new(41.0, 29.0));
        let viewport = view.next_recenter().await.unwrap();
        assert_eq!(viewport.center, Coordinate::new(41.0, 29.0));
    }
}

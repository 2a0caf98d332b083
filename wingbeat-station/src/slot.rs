//! Shared location slot
//!
//! Process-wide single slot holding the coordinate of the most recent
//! successful submission. Exactly one writer role exists (the pipeline's
//! success path); the map holds any number of read subscriptions and
//! recenters whenever the slot changes. The slot has no persistence beyond
//! the current session.

use tokio::sync::watch;
use wingbeat_common::Coordinate;

/// Observable single-value container for the last submission coordinate.
///
/// Backed by a `tokio::sync::watch` channel: `publish` overwrites the slot
/// and wakes every subscriber; `subscribe` hands out an independent
/// receiver whose `changed()` future resolves on the next overwrite.
#[derive(Debug)]
pub struct LocationSlot {
    tx: watch::Sender<Option<Coordinate>>,
}

impl LocationSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Overwrite the slot with the newest submission coordinate
    pub fn publish(&self, coordinate: Coordinate) {
        // send_replace never fails even with zero receivers
        self.tx.send_replace(Some(coordinate));
    }

    /// Read the current value without subscribing
    pub fn current(&self) -> Option<Coordinate> {
        *self.tx.borrow()
    }

    /// New read subscription; sees every overwrite after this call
    pub fn subscribe(&self) -> watch::Receiver<Option<Coordinate>> {
        self.tx.subscribe()
    }
}

impl Default for LocationSlot {
    fn default() -> Self {
        Self::new()
    }
}

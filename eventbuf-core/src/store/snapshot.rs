//! Save/restore of the pending queue
//!
//! The snapshot lives in a single slot of the key-value store under
//! [`SAVED_EVENTS_KEY`], encoded as `{"events": [{"type": .., "data": ..}]}`.
//! It is written once at shutdown and read once at startup.

use std::sync::Arc;

use crate::error::Result;
use crate::types::{Event, EventsEnvelope, SavedEvents};

use super::KeyValueStore;

/// Well-known key of the persisted queue
pub const SAVED_EVENTS_KEY: &str = "savedEvents";

/// Adapter between the event queue and a [`KeyValueStore`]
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist the full queue, overwriting any previous snapshot
    pub fn save_snapshot(&self, events: &[Event]) -> Result<()> {
        let json = EventsEnvelope::new(events).to_json()?;
        self.store.set(SAVED_EVENTS_KEY, &json)?;

        tracing::info!(events = events.len(), "Saved event snapshot");
        Ok(())
    }

    /// Load the persisted queue.
    ///
    /// A missing snapshot yields an empty list. A snapshot that fails to decode
    /// is discarded with a warning rather than failing startup.
    pub fn load_snapshot(&self) -> Result<Vec<Event>> {
        let Some(json) = self.store.get(SAVED_EVENTS_KEY)? else {
            tracing::debug!("No event snapshot found");
            return Ok(Vec::new());
        };

        match serde_json::from_str::<SavedEvents>(&json) {
            Ok(saved) => {
                tracing::info!(events = saved.events.len(), "Restored event snapshot");
                Ok(saved.events)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bytes = json.len(),
                    "Discarding corrupt event snapshot"
                );
                Ok(Vec::new())
            }
        }
    }
}

//! Public entry point
//!
//! [`EventService`] ties the pieces together and owns the lifecycle:
//!
//! 1. [`EventService::start`] restores the persisted snapshot into the queue
//!    before anything can be tracked, then resumes delivery of restored events.
//! 2. [`EventService::track_event`] appends and returns immediately.
//! 3. [`EventService::shutdown`] stops the dispatch loop and writes whatever is
//!    still pending back to the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::collector::{EventSender, HttpTransport, Transport};
use crate::config::CollectorConfig;
use crate::dispatcher::{DispatchState, DispatchStats, Dispatcher};
use crate::error::Result;
use crate::queue::EventQueue;
use crate::store::{KeyValueStore, SnapshotStore};
use crate::types::Event;

/// Buffered, durable event delivery to one collector
#[derive(Clone)]
pub struct EventService {
    dispatcher: Dispatcher,
    snapshots: SnapshotStore,
    shutdown_grace: Duration,
}

impl EventService {
    /// Start with the `reqwest` transport described by `config`
    pub async fn start(config: &CollectorConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Self::start_with_transport(config, store, transport).await
    }

    /// Start with an explicit transport.
    ///
    /// Must be called from within a tokio runtime; the dispatch loop runs on it.
    pub async fn start_with_transport(
        config: &CollectorConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let endpoint = config.endpoint()?.to_string();
        let snapshots = SnapshotStore::new(store);

        let restored = snapshots.load_snapshot()?;
        let restored_count = restored.len();

        let sender = EventSender::new(transport, endpoint.clone());
        let dispatcher = Dispatcher::new(
            EventQueue::from_events(restored),
            sender,
            config.cooldown(),
            Handle::current(),
        );

        tracing::info!(
            endpoint = %endpoint,
            restored = restored_count,
            cooldown_ms = config.cooldown().as_millis() as u64,
            "Event service started"
        );

        dispatcher.resume();

        Ok(Self {
            dispatcher,
            snapshots,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    /// Record an event for delivery. Never blocks on I/O and never fails.
    pub fn track_event(&self, event_type: impl Into<String>, data: impl Into<String>) {
        let event = Event::new(event_type, data);
        tracing::trace!(event_type = %event.event_type, "Tracking event");
        self.dispatcher.enqueue(event);
    }

    /// Number of events not yet delivered
    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    pub fn state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Resolve once everything tracked so far has been delivered
    pub async fn wait_idle(&self) {
        self.dispatcher.wait_idle().await
    }

    /// Stop delivery and persist the pending events.
    ///
    /// Returns the number of events written to the snapshot.
    pub async fn shutdown(&self) -> Result<usize> {
        let remaining = self.dispatcher.stop(self.shutdown_grace).await;
        self.snapshots.save_snapshot(&remaining)?;

        tracing::info!(persisted = remaining.len(), "Event service stopped");
        Ok(remaining.len())
    }
}

//! Send/cooldown control loop
//!
//! The dispatcher owns the event queue. Producers append through
//! [`Dispatcher::enqueue`]; the dispatch loop is the only code that removes
//! events, and only after the collector acknowledged them.
//!
//! ## States
//!
//! ```text
//! Idle --enqueue--> Sending --result--> Cooldown --delay--> Sending (queue non-empty)
//!                                                      \--> Idle    (queue empty)
//! ```
//!
//! At most one loop runs per dispatcher. The queue and the state share one
//! lock, so the loop going idle and a concurrent enqueue can never both
//! conclude that the other one will do the sending.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::collector::{EventSender, SendOutcome};
use crate::queue::EventQueue;
use crate::types::Event;

/// Where the dispatch loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// No loop running
    Idle,
    /// Waiting for the collector to answer
    Sending,
    /// Waiting out the delay before the next attempt
    Cooldown,
}

/// Delivery counters
#[derive(Debug, Default, Clone)]
pub struct DispatchStats {
    /// Send attempts made
    pub batches_attempted: usize,
    /// Events acknowledged and removed from the queue
    pub events_delivered: usize,
    /// Attempts that ended in a failure
    pub send_failures: usize,
    /// Delivered batches whose acknowledgement was refused
    pub stale_acks: usize,
    /// Time of the last successful delivery
    pub last_delivery_at: Option<DateTime<Utc>>,
}

struct Inner {
    queue: EventQueue,
    state: DispatchState,
    stopped: bool,
    task: Option<JoinHandle<()>>,
    stats: DispatchStats,
}

struct Shared {
    inner: Mutex<Inner>,
    sender: EventSender,
    cooldown: Duration,
    runtime: Handle,
    state_tx: watch::Sender<DispatchState>,
    stop_tx: watch::Sender<bool>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, state: DispatchState) {
        if inner.state != state {
            tracing::trace!(from = ?inner.state, to = ?state, "Dispatch state change");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }
}

/// Handle to the dispatch loop and the queue it drains
///
/// Cloning is cheap; all clones share one queue and one loop.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Create an idle dispatcher over `queue`.
    ///
    /// Loops are spawned on `runtime`, so [`Dispatcher::enqueue`] can be called
    /// from any thread.
    pub fn new(queue: EventQueue, sender: EventSender, cooldown: Duration, runtime: Handle) -> Self {
        let (state_tx, _) = watch::channel(DispatchState::Idle);
        let (stop_tx, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    queue,
                    state: DispatchState::Idle,
                    stopped: false,
                    task: None,
                    stats: DispatchStats::default(),
                }),
                sender,
                cooldown,
                runtime,
                state_tx,
                stop_tx,
            }),
        }
    }

    /// Append an event, starting the loop if none is running
    pub fn enqueue(&self, event: Event) {
        let mut inner = self.shared.lock();
        inner.queue.enqueue(event);
        self.start_if_idle(&mut inner);
    }

    /// Start the loop if events are pending and it is not running.
    ///
    /// Used after restoring a snapshot, when events are present without any
    /// enqueue having happened.
    pub fn resume(&self) {
        let mut inner = self.shared.lock();
        self.start_if_idle(&mut inner);
    }

    fn start_if_idle(&self, inner: &mut Inner) {
        if inner.stopped || inner.state != DispatchState::Idle || inner.queue.is_empty() {
            return;
        }

        self.shared.set_state(inner, DispatchState::Sending);
        let shared = Arc::clone(&self.shared);
        inner.task = Some(self.shared.runtime.spawn(run(shared)));
    }

    pub fn state(&self) -> DispatchState {
        self.shared.lock().state
    }

    /// Number of events waiting for delivery
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Copy of the queue contents
    pub fn snapshot(&self) -> Vec<Event> {
        self.shared.lock().queue.snapshot().into_events()
    }

    pub fn stats(&self) -> DispatchStats {
        self.shared.lock().stats.clone()
    }

    /// Receiver of state transitions
    pub fn subscribe(&self) -> watch::Receiver<DispatchState> {
        self.shared.state_tx.subscribe()
    }

    /// Resolve once no loop is running.
    ///
    /// The loop only goes idle with an empty queue, so outside of shutdown this
    /// means everything enqueued so far was delivered.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|state| *state == DispatchState::Idle).await;
    }

    /// Stop dispatching and hand back whatever is still queued.
    ///
    /// A pending cooldown is cut short. An in-flight send gets `grace` to
    /// finish (and be acknowledged); past that it is abandoned and its events
    /// stay queued. Later enqueues still append but never start a loop.
    pub async fn stop(&self, grace: Duration) -> Vec<Event> {
        let task = {
            let mut inner = self.shared.lock();
            inner.stopped = true;
            inner.task.take()
        };
        self.shared.stop_tx.send_replace(true);

        if let Some(mut task) = task {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                tracing::warn!(
                    grace_ms = grace.as_millis() as u64,
                    "Abandoning in-flight send at shutdown"
                );
                task.abort();
                let _ = task.await;
            }
        }

        let mut inner = self.shared.lock();
        self.shared.set_state(&mut inner, DispatchState::Idle);
        inner.queue.snapshot().into_events()
    }
}

/// The dispatch loop: snapshot, send, acknowledge, cool down, repeat
async fn run(shared: Arc<Shared>) {
    let mut stop_rx = shared.stop_tx.subscribe();

    loop {
        let batch = {
            let mut inner = shared.lock();
            if inner.stopped || inner.queue.is_empty() {
                shared.set_state(&mut inner, DispatchState::Idle);
                return;
            }
            shared.set_state(&mut inner, DispatchState::Sending);
            inner.stats.batches_attempted += 1;
            inner.queue.snapshot()
        };

        let outcome = shared.sender.send(batch.events()).await;

        {
            let mut inner = shared.lock();
            match outcome {
                SendOutcome::Delivered => match inner.queue.ack_front(&batch) {
                    Ok(removed) => {
                        inner.stats.events_delivered += removed;
                        inner.stats.last_delivery_at = Some(Utc::now());
                        tracing::info!(
                            delivered = removed,
                            pending = inner.queue.len(),
                            "Delivered events to collector"
                        );
                    }
                    Err(e) => {
                        inner.stats.stale_acks += 1;
                        tracing::warn!(error = %e, "Delivered batch no longer matches queue");
                    }
                },
                SendOutcome::Failed(reason) => {
                    inner.stats.send_failures += 1;
                    tracing::warn!(
                        endpoint = %shared.sender.endpoint(),
                        batch = batch.len(),
                        reason = %reason,
                        "Failed to deliver events, will retry"
                    );
                }
            }

            if inner.stopped {
                shared.set_state(&mut inner, DispatchState::Idle);
                return;
            }
            shared.set_state(&mut inner, DispatchState::Cooldown);
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.cooldown) => {}
            _ = stop_rx.wait_for(|stopped| *stopped) => {}
        }
    }
}

//! Persistence seam
//!
//! The host's durable storage is modelled as a plain string key-value store
//! ([`KeyValueStore`]) and injected where it is needed. [`SnapshotStore`]
//! sits on top of it and owns the encoding of the queue snapshot.
//!
//! Implementations:
//! - [`MemoryStore`]: in-process map, for tests and hosts without disk
//! - [`crate::db::Database`]: SQLite-backed, survives restarts

mod memory;
mod snapshot;

pub use memory::MemoryStore;
pub use snapshot::{SnapshotStore, SAVED_EVENTS_KEY};

use crate::error::Result;

/// Get/set string storage provided by the host
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key was never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

//! # eventbuf-core
//!
//! Client-side telemetry event buffer.
//!
//! Application code records named events; the buffer batches them, ships
//! them to a remote collector over HTTP, and keeps unsent events across
//! restarts.
//!
//! This library provides:
//! - An ordered event queue with acknowledgement by snapshot
//! - A single-flight send/cooldown dispatch loop on tokio
//! - Snapshot persistence over a pluggable key-value store (SQLite or memory)
//! - Configuration management
//! - Logging infrastructure
//!
//! Delivery is at-least-once: a batch stays queued until the collector
//! answers 200, and failed batches are retried after a fixed cooldown.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use eventbuf_core::{Config, Database, EventService};
//!
//! # async fn demo() -> eventbuf_core::Result<()> {
//! let config = Config::load()?;
//!
//! let db = Database::open(&config.store_path())?;
//! db.migrate()?;
//!
//! let service = EventService::start(&config.collector, Arc::new(db)).await?;
//! service.track_event("level_complete", r#"{"level":3}"#);
//!
//! // On exit
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use dispatcher::{DispatchState, DispatchStats, Dispatcher};
pub use error::{Error, Result};
pub use queue::{Batch, EventQueue};
pub use service::EventService;
pub use store::{KeyValueStore, MemoryStore, SnapshotStore};
pub use types::*;

// Public modules
pub mod collector;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod queue;
pub mod service;
pub mod store;
pub mod types;

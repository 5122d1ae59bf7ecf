//! Database layer for eventbuf
//!
//! SQLite storage for the persisted queue snapshot:
//! - Schema migrations
//! - Key-value slots implementing [`crate::store::KeyValueStore`]

pub mod repo;
pub mod schema;

pub use repo::Database;

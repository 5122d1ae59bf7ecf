//! Collector delivery
//!
//! Events leave the process through this module:
//! - [`Transport`] performs one JSON POST and reports the HTTP status
//! - [`EventSender`] encodes a batch as `{"events": [...]}` and classifies
//!   the response: status 200 is [`SendOutcome::Delivered`], anything else,
//!   including a transport error, is [`SendOutcome::Failed`]
//!
//! Failures are never surfaced to producers. The dispatcher logs them and
//! retries the whole queue after the cooldown.

mod client;
mod sender;

pub use client::{HttpTransport, Transport, TransportResponse};
pub use sender::{EventSender, SendOutcome, DELIVERED_STATUS};

//! Batch sender
//!
//! Serializes one batch to the wire schema and performs a single exchange
//! with the collector. The outcome is binary: the batch was delivered (status
//! 200) or it was not.

use std::fmt;
use std::sync::Arc;

use crate::types::{Event, EventsEnvelope};

use super::client::Transport;

/// Status the collector returns for an accepted batch
pub const DELIVERED_STATUS: u16 = 200;

/// Result of one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Failed(String),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendOutcome::Delivered => write!(f, "delivered"),
            SendOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Sends batches to one collector endpoint
#[derive(Clone)]
pub struct EventSender {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl EventSender {
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `events` as one request
    pub async fn send(&self, events: &[Event]) -> SendOutcome {
        let body = match EventsEnvelope::new(events).to_json() {
            Ok(body) => body,
            Err(e) => return SendOutcome::Failed(format!("failed to encode batch: {}", e)),
        };

        match self.transport.post(&self.endpoint, body).await {
            Ok(response) if response.status == DELIVERED_STATUS => {
                tracing::debug!(events = events.len(), "Batch delivered");
                SendOutcome::Delivered
            }
            Ok(response) => SendOutcome::Failed(format!(
                "collector returned {}: {}",
                response.status,
                truncate(&response.body, 200)
            )),
            Err(e) => SendOutcome::Failed(e.to_string()),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

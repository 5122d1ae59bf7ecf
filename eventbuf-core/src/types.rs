//! Core domain types shared by the queue, the sender and the snapshot store.

use serde::{Deserialize, Serialize};

/// A single tracked occurrence.
///
/// Events are immutable once created and carry no identity beyond their
/// position in the queue. The payload is opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, serialized as `type`
    #[serde(rename = "type")]
    pub event_type: String,

    /// Opaque payload
    pub data: String,
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
        }
    }
}

/// `{"events": [...]}` envelope, borrowed for encoding.
///
/// The same shape is used for the request body and for the persisted snapshot.
#[derive(Debug, Serialize)]
pub struct EventsEnvelope<'a> {
    pub events: &'a [Event],
}

/// Owned counterpart of [`EventsEnvelope`] for decoding.
#[derive(Debug, Default, Deserialize)]
pub struct SavedEvents {
    #[serde(default)]
    pub events: Vec<Event>,
}

impl<'a> EventsEnvelope<'a> {
    pub fn new(events: &'a [Event]) -> Self {
        Self { events }
    }

    /// Encode as a JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

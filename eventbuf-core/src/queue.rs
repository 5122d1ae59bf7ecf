//! Ordered buffer of pending events
//!
//! The queue is FIFO: insertion order is send order. Events leave the queue
//! only through [`EventQueue::ack_front`], after the batch that carried them
//! was delivered.
//!
//! Every batch remembers the queue's head sequence at snapshot time (the
//! number of events acknowledged so far). Acknowledging checks that the head
//! has not moved, so events appended while a send is in flight are never
//! mistaken for part of the batch.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::types::Event;

/// Pending events in send order
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
    /// Total number of events acknowledged since this queue was created
    head_seq: u64,
}

/// Point-in-time copy of the queue, used as one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    events: Vec<Event>,
    head_seq: u64,
}

impl Batch {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Head sequence of the queue when this batch was taken
    pub fn head_seq(&self) -> u64 {
        self.head_seq
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize from a restored snapshot
    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
            head_seq: 0,
        }
    }

    /// Append to the tail
    pub fn enqueue(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Copy the current contents without mutating the queue
    pub fn snapshot(&self) -> Batch {
        Batch {
            events: self.events.iter().cloned().collect(),
            head_seq: self.head_seq,
        }
    }

    /// Remove the events of a delivered batch from the head.
    ///
    /// Returns the number of events removed. Fails without touching the queue
    /// if the head moved since `batch` was taken or the queue is shorter than
    /// the batch.
    pub fn ack_front(&mut self, batch: &Batch) -> Result<usize> {
        if batch.head_seq != self.head_seq {
            return Err(Error::StaleBatch {
                expected: batch.head_seq,
                found: self.head_seq,
            });
        }

        let n = batch.len();
        if n > self.events.len() {
            return Err(Error::StaleBatch {
                expected: batch.head_seq + n as u64,
                found: self.head_seq + self.events.len() as u64,
            });
        }

        self.events.drain(..n);
        self.head_seq += n as u64;
        Ok(n)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Head sequence number (events acknowledged so far)
    pub fn head_seq(&self) -> u64 {
        self.head_seq
    }

    /// Drain everything, used when handing the queue to the snapshot store
    pub fn into_events(self) -> Vec<Event> {
        self.events.into()
    }
}

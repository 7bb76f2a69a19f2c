//! Bounded FIFO of undelivered messages awaiting retry.
//!
//! Pure data structure: capacity enforcement and ordering live here,
//! retry policy lives in the publisher and the connection supervisor.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{UplinkError, UplinkResult};

/// A message that failed to publish and is waiting for redelivery.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    pub topic: String,
    pub payload: Value,
}

impl QueuedMessage {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// Bounded in-memory FIFO shared between producers and the drain loop.
///
/// Each operation holds the internal mutex for its full duration, so
/// enqueue, dequeue and the length queries are individually atomic.
/// The lock is never held across an await: callers publish only after
/// a message has left the queue.
#[derive(Debug)]
pub struct PendingQueue {
    inner: Mutex<VecDeque<QueuedMessage>>,
    capacity: usize,
}

impl PendingQueue {
    /// Create a queue holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a message at the tail.
    ///
    /// Fails with [`UplinkError::QueueFull`] at capacity. The rejected
    /// message is gone for good; callers must not retry the enqueue.
    pub fn enqueue(&self, msg: QueuedMessage) -> UplinkResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.len() >= self.capacity {
            return Err(UplinkError::QueueFull);
        }
        inner.push_back(msg);
        Ok(())
    }

    /// Remove and return the oldest message.
    pub fn dequeue(&self) -> UplinkResult<QueuedMessage> {
        self.inner
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(UplinkError::QueueEmpty)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().unwrap().len() >= self.capacity
    }

    /// Number of messages currently waiting.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

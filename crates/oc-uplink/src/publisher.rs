//! Delivery attempts and the enqueue-on-failure policy.
//!
//! The publisher decides each message's fate: delivered now, buffered
//! for retry, dropped because the buffer is full, or skipped because
//! messaging is disabled. It also owns the drain loop that flushes the
//! pending queue once the link recovers.

use std::sync::Arc;

use rumqttc::QoS;
use serde::Serialize;
use serde_json::Value;

use crate::error::{UplinkError, UplinkResult};
use crate::queue::{PendingQueue, QueuedMessage};
use crate::transport::Transport;

/// QoS for every uplink publish. At-least-once keeps the broker
/// acknowledgment that "delivered" is judged by.
const PUBLISH_QOS: QoS = QoS::AtLeastOnce;

/// Observable fate of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered to the broker.
    Sent,
    /// Messaging disabled; nothing was attempted and nothing queued.
    Skipped,
    /// Delivery failed; the message waits in the pending queue.
    Enqueued,
    /// Delivery failed with the queue at capacity; the message is lost.
    Dropped,
    /// Delivery failed in non-retryable mode; the message is lost.
    Discarded,
}

impl SendOutcome {
    /// Whether the message reached the broker.
    pub fn is_sent(self) -> bool {
        self == SendOutcome::Sent
    }
}

/// Whether a failed delivery attempt may land in the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryMode {
    Retryable,
    NonRetryable,
}

/// Publish-side client with enqueue-on-failure reliability.
///
/// Clones share the same transport and pending queue, so the agent can
/// hand one clone to each producer and another to the connection
/// supervisor. A publisher without a transport (disabled mode) skips
/// every send and never touches the queue.
pub struct Publisher<T: Transport> {
    transport: Option<Arc<T>>,
    queue: Arc<PendingQueue>,
}

impl<T: Transport> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T: Transport> Publisher<T> {
    /// Publisher backed by a live transport.
    pub fn new(transport: Arc<T>, queue: Arc<PendingQueue>) -> Self {
        Self {
            transport: Some(transport),
            queue,
        }
    }

    /// Publisher for deployments without a configured broker.
    pub fn disabled(queue: Arc<PendingQueue>) -> Self {
        Self {
            transport: None,
            queue,
        }
    }

    /// The shared pending queue, exposed for depth reporting.
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// Whether sends can produce anything besides `Skipped`.
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Deliver `payload` to `topic`, buffering it for retry on failure.
    ///
    /// Queued messages get a delivery attempt first, so a link that
    /// recovered since the last reconnect is caught up before new
    /// traffic goes out and ordering is preserved.
    pub async fn send(&self, topic: &str, payload: &Value) -> SendOutcome {
        let Some(transport) = &self.transport else {
            tracing::debug!(topic = %topic, "messaging disabled, skipping publish");
            return SendOutcome::Skipped;
        };

        self.drain_queue(transport).await;
        self.attempt(transport, topic, payload, DeliveryMode::Retryable)
            .await
    }

    /// Deliver `payload` to `topic` at most once, never buffering it.
    ///
    /// For point-in-time messages (presence, progress notes) that are
    /// worthless by the time the link recovers.
    pub async fn send_once(&self, topic: &str, payload: &Value) -> SendOutcome {
        let Some(transport) = &self.transport else {
            tracing::debug!(topic = %topic, "messaging disabled, skipping publish");
            return SendOutcome::Skipped;
        };

        self.drain_queue(transport).await;
        self.attempt(transport, topic, payload, DeliveryMode::NonRetryable)
            .await
    }

    /// Serialize a typed payload and [`send`](Publisher::send) it.
    ///
    /// Serialization failure is an error rather than an outcome: it
    /// cannot be retried away and points at a bug in the payload type.
    pub async fn send_typed<P: Serialize>(
        &self,
        topic: &str,
        payload: &P,
    ) -> UplinkResult<SendOutcome> {
        let value = serde_json::to_value(payload)
            .map_err(|e| UplinkError::Serialization(e.to_string()))?;
        Ok(self.send(topic, &value).await)
    }

    /// Serialize a typed payload and [`send_once`](Publisher::send_once) it.
    pub async fn send_once_typed<P: Serialize>(
        &self,
        topic: &str,
        payload: &P,
    ) -> UplinkResult<SendOutcome> {
        let value = serde_json::to_value(payload)
            .map_err(|e| UplinkError::Serialization(e.to_string()))?;
        Ok(self.send_once(topic, &value).await)
    }

    /// Flush as much of the pending queue as the link currently allows.
    ///
    /// Returns `true` iff the queue ended empty. Stops at the first
    /// failed attempt, leaving the remainder in order for the next
    /// trigger; nothing is ever requeued within a pass, so one pass
    /// cannot loop.
    pub async fn drain(&self) -> bool {
        match &self.transport {
            Some(transport) => self.drain_queue(transport).await,
            // Disabled mode never enqueues, so there is nothing to flush.
            None => self.queue.is_empty(),
        }
    }

    async fn drain_queue(&self, transport: &Arc<T>) -> bool {
        loop {
            if self.queue.is_empty() {
                return true;
            }
            // Popping while the link is down would shed messages that a
            // later reconnect could still deliver.
            if !transport.is_connected() {
                return false;
            }

            let Ok(msg) = self.queue.dequeue() else {
                return true;
            };

            tracing::debug!(topic = %msg.topic, "retrying queued message");
            let outcome = self
                .attempt(transport, &msg.topic, &msg.payload, DeliveryMode::NonRetryable)
                .await;
            if !outcome.is_sent() {
                return false;
            }
        }
    }

    async fn attempt(
        &self,
        transport: &Arc<T>,
        topic: &str,
        payload: &Value,
        mode: DeliveryMode,
    ) -> SendOutcome {
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                // A payload that cannot serialize can never deliver;
                // retrying would not change that.
                tracing::warn!(topic = %topic, error = %e, "payload serialization failed, discarding");
                return SendOutcome::Discarded;
            }
        };

        match transport.publish(topic, &bytes, PUBLISH_QOS).await {
            Ok(()) => {
                tracing::debug!(topic = %topic, "message sent");
                SendOutcome::Sent
            }
            Err(e) => self.absorb_failure(topic, payload, mode, &e),
        }
    }

    fn absorb_failure(
        &self,
        topic: &str,
        payload: &Value,
        mode: DeliveryMode,
        error: &UplinkError,
    ) -> SendOutcome {
        match mode {
            DeliveryMode::NonRetryable => {
                tracing::debug!(topic = %topic, error = %error, "message discarded");
                SendOutcome::Discarded
            }
            DeliveryMode::Retryable => {
                let msg = QueuedMessage::new(topic, payload.clone());
                match self.queue.enqueue(msg) {
                    Ok(()) => {
                        tracing::info!(
                            topic = %topic,
                            error = %error,
                            queued = self.queue.len(),
                            "message enqueued for retry"
                        );
                        SendOutcome::Enqueued
                    }
                    Err(_) => {
                        tracing::warn!(
                            topic = %topic,
                            error = %error,
                            capacity = self.queue.capacity(),
                            "pending queue full, message dropped"
                        );
                        SendOutcome::Dropped
                    }
                }
            }
        }
    }
}

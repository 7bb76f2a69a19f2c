//! Mock transport for exercising the uplink without a broker.
//!
//! Records publishes and subscriptions like a healthy link, and can be
//! switched offline (or into rejecting publishes) so tests can drive
//! the enqueue, drop and drain paths.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rumqttc::QoS;

use crate::error::{UplinkError, UplinkResult};
use crate::transport::Transport;

/// A recorded publish call.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

/// Mock implementation of the `Transport` trait.
///
/// Starts connected with all operations succeeding. Thread-safe via
/// `Mutex` (fine for test contexts).
pub struct MockTransport {
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<(String, QoS)>>,
    connected: AtomicBool,
    fail_publishes: AtomicBool,
    fail_subscribes: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            fail_publishes: AtomicBool::new(false),
            fail_subscribes: AtomicBool::new(false),
        }
    }

    /// A transport that starts with the link down.
    pub fn offline() -> Self {
        let mock = Self::new();
        mock.set_connected(false);
        mock
    }

    /// Flip the link up or down.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Make publishes fail even while the link reports connected,
    /// like a broker rejecting or timing out individual attempts.
    pub fn set_publishes_failing(&self, failing: bool) {
        self.fail_publishes.store(failing, Ordering::SeqCst);
    }

    /// Make subscribe calls fail.
    pub fn set_subscribes_failing(&self, failing: bool) {
        self.fail_subscribes.store(failing, Ordering::SeqCst);
    }

    /// Get all published messages.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    /// Get published messages for a specific topic.
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Get the last published message.
    pub fn last_published(&self) -> Option<PublishedMessage> {
        self.published.lock().unwrap().last().cloned()
    }

    /// Get all subscription filters.
    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Check whether a subscription was made to the given filter.
    pub fn is_subscribed_to(&self, filter: &str) -> bool {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .any(|(f, _)| f == filter)
    }

    /// Clear all recorded state.
    pub fn reset(&self) {
        self.published.lock().unwrap().clear();
        self.subscriptions.lock().unwrap().clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> UplinkResult<()> {
        if !self.is_connected() {
            return Err(UplinkError::Publish("not connected".into()));
        }
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(UplinkError::Publish("mock publish failure".into()));
        }
        self.published.lock().unwrap().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
        });
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> UplinkResult<()> {
        if self.fail_subscribes.load(Ordering::SeqCst) {
            return Err(UplinkError::Subscribe("mock subscribe failure".into()));
        }
        self.subscriptions
            .lock()
            .unwrap()
            .push((filter.to_string(), qos));
        Ok(())
    }
}

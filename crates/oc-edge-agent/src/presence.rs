//! Presence announcements on the hello topic.
//!
//! Publishes a `DeviceAnnounce` every time the uplink (re)connects so
//! operators see the device come back without polling. The broker does
//! not retain presence across reconnects, which is why this hangs off
//! the connection listener rather than running once at startup.

use async_trait::async_trait;
use chrono::Utc;

use oc_protocol::device::DeviceAnnounce;
use oc_protocol::topics::TOPIC_HELLO;
use oc_uplink::{ConnectionEvents, Publisher, Transport};

/// Announces the device on every successful (re)connection.
pub struct PresenceAnnouncer {
    device_name: String,
    description: String,
}

impl PresenceAnnouncer {
    pub fn new(device_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            description: description.into(),
        }
    }

    /// The announcement payload for this device.
    pub fn announcement(&self) -> DeviceAnnounce {
        DeviceAnnounce {
            device_name: self.device_name.clone(),
            description: self.description.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
impl<T: Transport> ConnectionEvents<T> for PresenceAnnouncer {
    async fn on_connected(&self, publisher: &Publisher<T>) {
        // Presence is point-in-time; a hello that misses the link is
        // worthless later, so it is never buffered for retry.
        match publisher
            .send_once_typed(TOPIC_HELLO, &self.announcement())
            .await
        {
            Ok(outcome) => {
                tracing::info!(device = %self.device_name, outcome = ?outcome, "presence announced");
            }
            Err(e) => {
                tracing::warn!(device = %self.device_name, error = %e, "presence announcement failed");
            }
        }
    }

    async fn on_disconnected(&self, reason: &str) {
        tracing::warn!(device = %self.device_name, reason = %reason, "uplink disconnected");
    }
}

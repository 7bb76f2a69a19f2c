//! Transport seam between the publisher and the broker.
//!
//! The `Transport` trait abstracts publish/subscribe so the
//! reliability layer can be exercised against [`MockTransport`] without
//! a broker. [`MqttTransport`] is the rumqttc-backed implementation
//! used on devices.
//!
//! [`MockTransport`]: crate::mock::MockTransport

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::watch;

use crate::config::UplinkConfig;
use crate::connection::ConnectionState;
use crate::error::{UplinkError, UplinkResult};

/// Abstraction over the broker link used for delivery attempts.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether the link is currently believed usable.
    ///
    /// The drain loop checks this before popping a queued message, so a
    /// down link never consumes the backlog.
    fn is_connected(&self) -> bool;

    /// Attempt exactly one delivery of `payload` to `topic`.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> UplinkResult<()>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, filter: &str, qos: QoS) -> UplinkResult<()>;
}

/// rumqttc-backed transport.
///
/// Publishing is refused outright while the connection state is not
/// `Connected`: rumqttc would otherwise buffer the request internally
/// and report success for a message that cannot currently leave the
/// device, hiding exactly the failures the pending queue exists to
/// absorb.
pub struct MqttTransport {
    client: AsyncClient,
    state_rx: watch::Receiver<ConnectionState>,
    publish_timeout: Duration,
}

impl MqttTransport {
    /// Floor for rumqttc's request channel capacity.
    const REQUEST_CHANNEL_FLOOR: usize = 64;

    /// Build the transport plus the event loop and the state
    /// transmitter the connection supervisor drives.
    ///
    /// Fails only on invalid configuration; reaching the broker is the
    /// supervisor's job and happens after this returns.
    pub fn new(
        config: &UplinkConfig,
    ) -> UplinkResult<(Self, EventLoop, watch::Sender<ConnectionState>)> {
        let host = config
            .broker_host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| UplinkError::Connect("broker address not configured".into()))?;
        let device_name = config
            .device_name
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| UplinkError::Connect("device name not configured".into()))?;

        let mut options = MqttOptions::new(device_name, host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs.into()));

        // The on-connect drain pushes a full backlog into the request
        // channel while the supervisor task is away from the event
        // loop, so the channel must hold the whole queue plus the
        // re-subscribes without blocking.
        let channel_capacity = config.queue_capacity.max(Self::REQUEST_CHANNEL_FLOOR)
            + config.subscriptions.len()
            + 4;
        let (client, eventloop) = AsyncClient::new(options, channel_capacity);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        Ok((
            Self {
                client,
                state_rx,
                publish_timeout: Duration::from_secs(config.publish_timeout_secs),
            },
            eventloop,
            state_tx,
        ))
    }
}

#[async_trait]
impl Transport for MqttTransport {
    fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> UplinkResult<()> {
        if !self.is_connected() {
            return Err(UplinkError::Publish("not connected".into()));
        }

        match tokio::time::timeout(
            self.publish_timeout,
            self.client.publish(topic, qos, false, payload),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(UplinkError::Publish(e.to_string())),
            Err(_) => Err(UplinkError::Publish(format!(
                "no acceptance within {:?}",
                self.publish_timeout
            ))),
        }
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> UplinkResult<()> {
        match tokio::time::timeout(self.publish_timeout, self.client.subscribe(filter, qos)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(UplinkError::Subscribe(e.to_string())),
            Err(_) => Err(UplinkError::Subscribe(format!(
                "no acceptance within {:?}",
                self.publish_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::Publisher;
    use crate::queue::{PendingQueue, QueuedMessage};
    use serde_json::json;
    use std::sync::Arc;

    fn config(host: Option<&str>, device: Option<&str>) -> UplinkConfig {
        UplinkConfig {
            broker_host: host.map(String::from),
            device_name: device.map(String::from),
            ..UplinkConfig::default()
        }
    }

    #[test]
    fn new_rejects_missing_broker_host() {
        let result = MqttTransport::new(&config(None, Some("owlcam-dock-01")));
        assert!(matches!(result, Err(UplinkError::Connect(_))));
    }

    #[test]
    fn new_rejects_missing_device_name() {
        let result = MqttTransport::new(&config(Some("10.0.0.5"), None));
        assert!(matches!(result, Err(UplinkError::Connect(_))));
    }

    #[test]
    fn new_starts_disconnected() {
        let (transport, _eventloop, _state_tx) =
            MqttTransport::new(&config(Some("10.0.0.5"), Some("owlcam-dock-01"))).unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn publish_refused_while_disconnected() {
        let (transport, _eventloop, _state_tx) =
            MqttTransport::new(&config(Some("10.0.0.5"), Some("owlcam-dock-01"))).unwrap();

        let err = transport
            .publish("device-stats", b"{}", QoS::AtLeastOnce)
            .await
            .unwrap_err();
        assert!(matches!(err, UplinkError::Publish(_)));
    }

    #[tokio::test]
    async fn state_transition_flips_is_connected() {
        let (transport, _eventloop, state_tx) =
            MqttTransport::new(&config(Some("10.0.0.5"), Some("owlcam-dock-01"))).unwrap();

        state_tx.send_replace(ConnectionState::Connected);
        assert!(transport.is_connected());

        state_tx.send_replace(ConnectionState::Disconnected);
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn drain_flushes_backlog_larger_than_channel_floor() {
        let config = UplinkConfig {
            broker_host: Some("10.0.0.5".into()),
            device_name: Some("owlcam-dock-01".into()),
            queue_capacity: 70,
            publish_timeout_secs: 1,
            ..UplinkConfig::default()
        };
        let (transport, eventloop, state_tx) = MqttTransport::new(&config).unwrap();
        // Hold the event loop without polling it, which is the
        // supervisor's situation while it awaits the on-connect drain.
        let _eventloop = eventloop;
        state_tx.send_replace(ConnectionState::Connected);

        let queue = Arc::new(PendingQueue::new(config.queue_capacity));
        for seq in 0..70 {
            queue
                .enqueue(QueuedMessage::new("device-stats", json!({ "seq": seq })))
                .unwrap();
        }
        let publisher = Publisher::new(Arc::new(transport), Arc::clone(&queue));

        // Every queued message must be admitted; a channel smaller
        // than the queue would stall the 65th publish until the
        // timeout and discard it despite the healthy link.
        assert!(publisher.drain().await);
        assert!(queue.is_empty());
    }
}

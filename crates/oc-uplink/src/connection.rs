//! Broker connection lifecycle: supervisor task, state tracking, and
//! the on-connect sequence (re-subscribe, notify, drain).
//!
//! The supervisor owns the rumqttc event loop and runs for the life of
//! the process. Connection loss is never surfaced as a hard error:
//! state flips to `Disconnected`, the loop keeps polling, and rumqttc
//! re-establishes the session when the broker comes back.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{Event, EventLoop, Packet, QoS};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::UplinkConfig;
use crate::error::UplinkResult;
use crate::publisher::Publisher;
use crate::queue::PendingQueue;
use crate::transport::{MqttTransport, Transport};

/// Broker connection state as seen by the uplink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Hooks invoked from the connection supervisor's task.
///
/// `on_connected` fires on every successful (re)connection, after the
/// subscription list has been re-applied and before the queued backlog
/// is flushed, so hook publishes go out ahead of retried traffic.
/// `on_disconnected` fires when an established connection drops, with
/// the transport's reason string. Both default to no-ops.
#[async_trait]
pub trait ConnectionEvents<T: Transport>: Send + Sync {
    async fn on_connected(&self, _publisher: &Publisher<T>) {}

    async fn on_disconnected(&self, _reason: &str) {}
}

/// Handle to a live broker connection.
///
/// Dropping the handle leaves the supervisor running; [`shutdown`]
/// stops it. Process exit abandons the pending queue either way.
///
/// [`shutdown`]: UplinkConnection::shutdown
pub struct UplinkConnection {
    state_rx: watch::Receiver<ConnectionState>,
    supervisor: JoinHandle<()>,
}

impl UplinkConnection {
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch receiver for state transitions, for callers that want to
    /// await readiness instead of polling.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Stop the supervisor task. In-flight work is abandoned.
    pub fn shutdown(self) {
        self.supervisor.abort();
    }
}

/// Connect to the broker and return a publisher plus the connection
/// handle, or a disabled publisher when the config has no broker
/// address or device name.
///
/// The supervisor task starts immediately and keeps the connection
/// alive on its own: initial connect failures and later disconnects
/// are logged and retried, never returned as errors. Must be called
/// from within a tokio runtime.
pub fn connect(
    config: &UplinkConfig,
    queue: Arc<PendingQueue>,
    listener: Option<Arc<dyn ConnectionEvents<MqttTransport>>>,
) -> UplinkResult<(Publisher<MqttTransport>, Option<UplinkConnection>)> {
    if !config.messaging_enabled() {
        tracing::warn!("broker address or device name not configured, messaging disabled");
        return Ok((Publisher::disabled(queue), None));
    }

    let (transport, eventloop, state_tx) = MqttTransport::new(config)?;
    let transport = Arc::new(transport);
    let publisher = Publisher::new(Arc::clone(&transport), queue);

    tracing::info!(
        broker = %config.broker_host.as_deref().unwrap_or_default(),
        port = config.broker_port,
        device = %config.device_name.as_deref().unwrap_or_default(),
        "uplink connecting"
    );

    let state_rx = state_tx.subscribe();
    let supervisor = tokio::spawn(supervise(
        eventloop,
        state_tx,
        transport,
        publisher.clone(),
        config.subscriptions.clone(),
        listener,
        Duration::from_secs(config.reconnect_delay_secs),
    ));

    Ok((
        publisher,
        Some(UplinkConnection {
            state_rx,
            supervisor,
        }),
    ))
}

/// Drive the event loop forever, tracking connection state and running
/// the on-connect sequence after every ConnAck.
async fn supervise(
    mut eventloop: EventLoop,
    state_tx: watch::Sender<ConnectionState>,
    transport: Arc<MqttTransport>,
    publisher: Publisher<MqttTransport>,
    subscriptions: Vec<String>,
    listener: Option<Arc<dyn ConnectionEvents<MqttTransport>>>,
    reconnect_delay: Duration,
) {
    state_tx.send_replace(ConnectionState::Connecting);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                state_tx.send_replace(ConnectionState::Connected);
                tracing::info!("connected to broker");
                handle_connected(
                    transport.as_ref(),
                    &publisher,
                    &subscriptions,
                    listener.as_deref(),
                )
                .await;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                state_tx.send_replace(ConnectionState::Disconnected);
                tracing::warn!("broker requested disconnect");
                notify_disconnected(listener.as_deref(), "server disconnect").await;
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                // Inbound dispatch lives with the pipeline process; the
                // uplink only keeps the subscription alive.
                tracing::debug!(topic = %publish.topic, "inbound message");
            }
            Ok(_) => {}
            Err(e) => {
                let was_connected = *state_tx.borrow() == ConnectionState::Connected;
                state_tx.send_replace(ConnectionState::Disconnected);

                if was_connected {
                    tracing::warn!(
                        error = %e,
                        delay_secs = reconnect_delay.as_secs(),
                        "connection lost, reconnecting"
                    );
                    notify_disconnected(listener.as_deref(), &e.to_string()).await;
                } else {
                    tracing::warn!(
                        error = %e,
                        delay_secs = reconnect_delay.as_secs(),
                        "broker unreachable, retrying"
                    );
                }

                tokio::time::sleep(reconnect_delay).await;
                state_tx.send_replace(ConnectionState::Connecting);
            }
        }
    }
}

/// The on-connect sequence: re-subscribe, notify, then drain.
///
/// Subscriptions are re-issued on every connection because the broker
/// is not assumed to retain session state across reconnects. A failed
/// subscribe or an incomplete drain is logged and the connection keeps
/// running.
async fn handle_connected<T: Transport>(
    transport: &T,
    publisher: &Publisher<T>,
    subscriptions: &[String],
    listener: Option<&dyn ConnectionEvents<T>>,
) {
    for filter in subscriptions {
        match transport.subscribe(filter, QoS::AtLeastOnce).await {
            Ok(()) => tracing::debug!(filter = %filter, "subscribed"),
            Err(e) => tracing::error!(filter = %filter, error = %e, "subscribe failed"),
        }
    }

    if let Some(listener) = listener {
        listener.on_connected(publisher).await;
    }

    if !publisher.drain().await {
        tracing::warn!(
            remaining = publisher.queue().len(),
            "pending queue not fully drained"
        );
    }
}

async fn notify_disconnected<T: Transport>(
    listener: Option<&dyn ConnectionEvents<T>>,
    reason: &str,
) {
    if let Some(listener) = listener {
        listener.on_disconnected(reason).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Listener that records how it was called.
    #[derive(Default)]
    struct Recorder {
        connects: AtomicUsize,
        queue_len_at_connect: AtomicUsize,
        disconnect_reasons: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConnectionEvents<MockTransport> for Recorder {
        async fn on_connected(&self, publisher: &Publisher<MockTransport>) {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.queue_len_at_connect
                .store(publisher.queue().len(), Ordering::SeqCst);
        }

        async fn on_disconnected(&self, reason: &str) {
            self.disconnect_reasons
                .lock()
                .unwrap()
                .push(reason.to_string());
        }
    }

    fn uplink_with_backlog() -> (Publisher<MockTransport>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::offline());
        let queue = Arc::new(PendingQueue::new(8));
        let publisher = Publisher::new(Arc::clone(&transport), queue);
        (publisher, transport)
    }

    #[tokio::test]
    async fn connect_sequence_resubscribes_notifies_then_drains() {
        let (publisher, transport) = uplink_with_backlog();
        publisher.send("alerts", &json!({"label": "zone"})).await;
        assert_eq!(publisher.queue().len(), 1);

        let recorder = Recorder::default();
        let filters = vec!["commands".to_string()];

        transport.set_connected(true);
        handle_connected(
            transport.as_ref(),
            &publisher,
            &filters,
            Some(&recorder as &dyn ConnectionEvents<MockTransport>),
        )
        .await;

        assert!(transport.is_subscribed_to("commands"));
        assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);
        // The listener ran before the backlog was flushed.
        assert_eq!(recorder.queue_len_at_connect.load(Ordering::SeqCst), 1);
        assert!(publisher.queue().is_empty());
        assert_eq!(transport.published_to("alerts").len(), 1);
    }

    #[tokio::test]
    async fn subscribe_failures_do_not_block_the_drain() {
        let (publisher, transport) = uplink_with_backlog();
        publisher.send("device-stats", &json!({"seq": 1})).await;

        transport.set_connected(true);
        transport.set_subscribes_failing(true);

        let recorder = Recorder::default();
        handle_connected(
            transport.as_ref(),
            &publisher,
            &["commands".to_string()],
            Some(&recorder as &dyn ConnectionEvents<MockTransport>),
        )
        .await;

        assert!(!transport.is_subscribed_to("commands"));
        assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);
        assert!(publisher.queue().is_empty());
    }

    #[tokio::test]
    async fn backlog_survives_when_link_drops_before_drain() {
        let (publisher, transport) = uplink_with_backlog();
        publisher.send("alerts", &json!(1)).await;
        publisher.send("alerts", &json!(2)).await;

        // ConnAck raced a fresh outage: the link is already down again
        // by the time the sequence runs.
        handle_connected(transport.as_ref(), &publisher, &[], None).await;

        assert_eq!(publisher.queue().len(), 2);
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn disconnect_notification_carries_reason() {
        let recorder = Recorder::default();
        notify_disconnected(
            Some(&recorder as &dyn ConnectionEvents<MockTransport>),
            "connection reset by peer",
        )
        .await;

        let reasons = recorder.disconnect_reasons.lock().unwrap();
        assert_eq!(*reasons, ["connection reset by peer"]);
    }

    #[tokio::test]
    async fn connect_with_disabled_config_skips_messaging() {
        let queue = Arc::new(PendingQueue::new(4));
        let (publisher, connection) =
            connect(&UplinkConfig::default(), Arc::clone(&queue), None).unwrap();

        assert!(connection.is_none());
        assert!(!publisher.is_enabled());
        assert_eq!(
            publisher.send("device-stats", &json!({})).await,
            crate::publisher::SendOutcome::Skipped
        );
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn connect_spawns_supervisor_and_reports_state() {
        let config = UplinkConfig {
            // Nothing listens here; the supervisor just retries in the
            // background until shutdown.
            broker_host: Some("127.0.0.1".into()),
            broker_port: 1,
            device_name: Some("owlcam-test".into()),
            reconnect_delay_secs: 1,
            ..UplinkConfig::default()
        };
        let queue = Arc::new(PendingQueue::new(4));

        let (publisher, connection) = connect(&config, queue, None).unwrap();
        let connection = connection.expect("enabled config must return a handle");

        assert!(publisher.is_enabled());
        assert!(!connection.is_connected());
        assert_eq!(
            publisher.send("device-stats", &json!({"seq": 1})).await,
            crate::publisher::SendOutcome::Enqueued
        );

        connection.shutdown();
    }

    #[tokio::test]
    async fn state_watch_reports_supervisor_transitions() {
        let config = UplinkConfig {
            broker_host: Some("127.0.0.1".into()),
            broker_port: 1,
            device_name: Some("owlcam-test".into()),
            reconnect_delay_secs: 1,
            ..UplinkConfig::default()
        };
        let queue = Arc::new(PendingQueue::new(4));
        let (_publisher, connection) = connect(&config, queue, None).unwrap();
        let connection = connection.expect("enabled config must return a handle");

        let mut state_watch = connection.state_watch();
        tokio::time::timeout(Duration::from_secs(5), state_watch.changed())
            .await
            .expect("supervisor reported no state transition")
            .expect("state channel closed");
        // Nothing listens on the port, so the supervisor cycles
        // between Connecting and Disconnected without ever reaching
        // Connected.
        assert_ne!(*state_watch.borrow(), ConnectionState::Connected);

        connection.shutdown();
    }
}

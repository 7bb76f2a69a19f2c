//! OwlCam Edge Agent — resilient telemetry uplink for the camera device.
//!
//! Wires configuration, the MQTT uplink and the producers this binary
//! owns (presence announcements, periodic device status). The video
//! and inference pipelines publish through the same uplink.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use oc_edge_agent::config::AgentConfig;
use oc_edge_agent::presence::PresenceAnnouncer;
use oc_edge_agent::status;
use oc_protocol::topics;
use oc_uplink::{ConnectionEvents, MqttTransport, PendingQueue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "oc-edge-agent starting");

    // ── Load config ─────────────────────────────────────────────
    let mut config = match std::env::args().nth(1) {
        Some(path) => AgentConfig::from_file(&path)?,
        None => AgentConfig::from_env(),
    };
    if config.uplink.subscriptions.is_empty() {
        config.uplink.subscriptions = topics::device_subscriptions();
    }

    let device_name = config
        .uplink
        .device_name
        .clone()
        .unwrap_or_else(|| "owlcam-edge".to_string());

    // ── Uplink ──────────────────────────────────────────────────
    let queue = Arc::new(PendingQueue::new(config.uplink.queue_capacity));
    let announcer: Arc<dyn ConnectionEvents<MqttTransport>> = Arc::new(PresenceAnnouncer::new(
        &device_name,
        &config.device_description,
    ));

    let (publisher, connection) = oc_uplink::connect(&config.uplink, queue, Some(announcer))?;

    if publisher.is_enabled() {
        tracing::info!(
            device = %device_name,
            queue_capacity = config.uplink.queue_capacity,
            "uplink enabled"
        );
    } else {
        tracing::warn!("uplink disabled, all publishes will be skipped");
    }

    // ── Start background tasks ──────────────────────────────────
    let start_time = tokio::time::Instant::now();

    tracing::info!("oc-edge-agent ready");

    tokio::select! {
        // Publish periodic device status
        () = status::run(
            &publisher,
            &device_name,
            Duration::from_secs(config.status_interval_secs),
            start_time,
        ) => {
            tracing::error!("status loop exited unexpectedly");
        }
        // Graceful shutdown on SIGINT/SIGTERM
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Some(connection) = connection {
        connection.shutdown();
    }

    tracing::info!("oc-edge-agent stopped");
    Ok(())
}

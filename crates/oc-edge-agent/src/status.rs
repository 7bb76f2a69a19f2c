//! Periodic device status publisher.
//!
//! Sends a `DeviceStatus` at a configurable interval so operators know
//! the device is alive even when the inference pipeline is quiet.

use std::time::Duration;

use chrono::Utc;
use tokio::time;

use oc_protocol::device::{DeviceStatus, StreamingState};
use oc_protocol::topics::TOPIC_STATS;
use oc_uplink::{Publisher, Transport};

/// Run the status loop, publishing at `interval`.
///
/// Runs forever until the task is cancelled. Delivery failures are
/// absorbed by the publisher's retry queue; this loop only reports the
/// outcome.
pub async fn run<T: Transport>(
    publisher: &Publisher<T>,
    device_name: &str,
    interval: Duration,
    start_time: tokio::time::Instant,
) {
    let mut ticker = time::interval(interval);
    // Skip the first tick (fires immediately).
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let status = snapshot(publisher, device_name, start_time);
        match publisher.send_typed(TOPIC_STATS, &status).await {
            Ok(outcome) => {
                tracing::debug!(
                    uptime_secs = status.uptime_secs,
                    queued = status.queued_messages,
                    outcome = ?outcome,
                    "status report"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize status report");
            }
        }
    }
}

fn snapshot<T: Transport>(
    publisher: &Publisher<T>,
    device_name: &str,
    start_time: tokio::time::Instant,
) -> DeviceStatus {
    DeviceStatus {
        device_name: device_name.to_string(),
        uptime_secs: start_time.elapsed().as_secs(),
        streaming: StreamingState::Unknown, // reported by the video pipeline once wired
        queued_messages: publisher.queue().len(),
        timestamp: Utc::now(),
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presence announcement published on the hello topic after every
/// successful (re)connection to the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAnnounce {
    /// Unique device name, also used as the MQTT client id.
    pub device_name: String,
    /// Human-readable description, e.g. "OwlCam @ loading dock".
    pub description: String,
    /// Agent version string.
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Periodic device status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_name: String,
    pub uptime_secs: u64,
    /// Whether the live video stream is currently being served.
    pub streaming: StreamingState,
    /// Messages waiting in the uplink retry queue.
    pub queued_messages: usize,
    pub timestamp: DateTime<Utc>,
}

/// Live-streaming state of the video pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingState {
    Active,
    Idle,
    Unknown,
}

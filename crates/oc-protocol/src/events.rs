use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert raised by the inference pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub device_name: String,
    /// Short machine-readable label, e.g. "person_in_zone".
    pub label: String,
    /// Human-readable explanation for dashboards.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Notification that a recorded video file is ready for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEvent {
    pub device_name: String,
    /// File name relative to the device's recording directory.
    pub file_name: String,
    /// Download URL when the device serves the file over HTTP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

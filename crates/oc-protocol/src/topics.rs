//! MQTT topic names shared by edge devices and their operators.
//!
//! OwlCam uses a flat topic namespace; each payload carries the name of
//! the device it belongs to rather than encoding it in the topic path.
//!
//! ```text
//! hello          device -> operators   presence announcements
//! device-stats   device -> operators   periodic status reports
//! alerts         device -> operators   inference alerts
//! video-files    device -> operators   recorded file notifications
//! commands       operators -> device   command dispatch
//! ```

/// Presence announcement, published once per successful (re)connection.
pub const TOPIC_HELLO: &str = "hello";

/// Periodic device status reports.
pub const TOPIC_STATS: &str = "device-stats";

/// Alerts raised by the inference pipeline.
pub const TOPIC_ALERTS: &str = "alerts";

/// Notifications about recorded video files ready for retrieval.
pub const TOPIC_FILES: &str = "video-files";

/// Operator commands addressed to devices.
pub const TOPIC_COMMANDS: &str = "commands";

/// Topic filters an edge device subscribes to on every connection.
pub fn device_subscriptions() -> Vec<String> {
    vec![TOPIC_COMMANDS.to_string()]
}

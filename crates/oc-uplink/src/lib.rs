//! Store-and-forward MQTT uplink for OwlCam edge devices.
//!
//! An OwlCam device publishes telemetry, alerts and video-file events
//! over a link that comes and goes. This crate keeps that best-effort:
//! publishes that fail while the broker is unreachable land in a
//! bounded in-memory queue and are redelivered in order once the
//! connection recovers.
//!
//! - `PendingQueue`: bounded FIFO of undelivered messages
//! - `Publisher`: delivery attempts plus the enqueue-on-failure policy
//! - `connect` / `UplinkConnection`: broker lifecycle and the
//!   reconnect-triggered drain
//! - `Transport` / `MockTransport`: broker seam, mockable in tests

pub mod config;
pub mod connection;
pub mod error;
pub mod mock;
pub mod publisher;
pub mod queue;
pub mod transport;

// Re-exports for convenience.
pub use config::UplinkConfig;
pub use connection::{ConnectionEvents, ConnectionState, UplinkConnection, connect};
pub use error::{UplinkError, UplinkResult};
pub use mock::MockTransport;
pub use publisher::{Publisher, SendOutcome};
pub use queue::{PendingQueue, QueuedMessage};
pub use transport::{MqttTransport, Transport};

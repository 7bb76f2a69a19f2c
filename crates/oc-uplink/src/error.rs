//! Uplink error types.

use thiserror::Error;

/// Errors that can occur during uplink operations.
///
/// None of these are fatal to the host process: the publisher folds
/// delivery failures into send outcomes, and the connection supervisor
/// logs transport errors and retries.
#[derive(Debug, Error)]
pub enum UplinkError {
    /// The pending queue is at capacity; the message was not stored.
    #[error("pending queue full")]
    QueueFull,

    /// The pending queue has no messages to hand out.
    #[error("pending queue empty")]
    QueueEmpty,

    #[error("connect error: {0}")]
    Connect(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for uplink results.
pub type UplinkResult<T> = Result<T, UplinkError>;

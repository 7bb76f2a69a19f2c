//! Command names operators send on the commands topic.
//!
//! Dispatch lives with the device's pipeline process; these constants
//! only fix the vocabulary so both sides agree on spelling.

/// Persist the current video buffer to a file.
pub const CMD_FILE_SAVE: &str = "save_file";

/// Start serving the live video stream.
pub const CMD_STREAMING_START: &str = "streaming_start";

/// Stop serving the live video stream.
pub const CMD_STREAMING_STOP: &str = "streaming_stop";

/// Restart the on-device inference pipeline.
pub const CMD_INFERENCE_RESTART: &str = "inference_restart";

//! OwlCam Edge Agent — library crate for the device-side runtime.
//!
//! Exposes the agent's modules so tests can exercise config loading,
//! presence announcements and the status loop without the binary.

pub mod config;
pub mod presence;
pub mod status;

//! Device control infrastructure.
//!
//! Each tile of the wall is driven by one encoder device reachable over
//! HTTP. The devices are heterogeneous and untrusted: a device may clamp a
//! requested resolution to the nearest mode it supports, so whatever it
//! reports back is treated as authoritative over what was asked for.
//!
//! # Testability
//!
//! The [`DeviceClient`] trait allows the negotiation coordinator and the
//! orchestrator to be unit tested against recording fakes, with the HTTP
//! backends (`magewell`, `kiloview`) injected only in the binary.

use async_trait::async_trait;
use thiserror::Error;

use wall_core::Resolution;

pub mod kiloview;
pub mod magewell;

/// Errors produced by a device control client.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device could not be reached at the transport level.
    #[error("device unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The device answered but refused the request.
    #[error("device rejected the request: {0}")]
    Rejected(String),

    /// Login failed or the session was not established.
    #[error("device authentication failed: {0}")]
    Auth(String),

    /// The device answered with something the client could not interpret.
    #[error("unexpected device response: {0}")]
    Protocol(String),
}

/// Properties of the input signal a device currently receives.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
    pub interlaced: Option<bool>,
}

/// Control capability required from every encoder device.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Requests `desired` as the device's output resolution and returns the
    /// resolution the device actually applied.
    async fn apply_resolution(&self, desired: Resolution) -> Result<Resolution, DeviceError>;

    /// Reads back the device's currently applied output resolution.
    async fn current_resolution(&self) -> Result<Resolution, DeviceError>;

    /// Reads the properties of the device's current input signal.
    async fn signal_info(&self) -> Result<SignalInfo, DeviceError>;
}

//! Infrastructure layer for the controller.
//!
//! Contains network-facing adapters: HTTP clients for the encoder devices,
//! the obs-websocket client for the visualization layer, and configuration
//! file persistence.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `wall_core`, but MUST NOT be imported by the domain layer.

pub mod device;
pub mod scene;
pub mod storage;

//! # wall-core
//!
//! Shared library for the video wall controller containing the tiling
//! geometry engine, layout-request validation, and the configuration-run
//! record types.
//!
//! This crate is used by the controller application and by anything that
//! wants to reason about wall geometry offline. It has zero dependencies on
//! OS APIs, async runtimes, or network sockets.
//!
//! The three modules:
//!
//! - **`domain::geometry`** – Pure 2-D tiling math. Computes the composed
//!   canvas size from a grid specification and a per-tile resolution,
//!   shrinks it into the physical output bounds, and lays out one transform
//!   per tile with a rotation-derived anchor corner.
//!
//! - **`domain::request`** – Pre-flight validation of a layout request
//!   (rotation + `"NxM"` grid string). Rejections happen before any device
//!   or scene I/O.
//!
//! - **`domain::run`** – The immutable record of one end-to-end
//!   configuration run: the plan, per-device negotiation results, scene
//!   bindings, and per-tile apply outcomes.

pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `wall_core::CanvasPlan` instead of `wall_core::domain::geometry::CanvasPlan`.
pub use domain::geometry::{
    compensate_rounding, compute_canvas, fit_to_bounds, layout_tiles, Alignment, CanvasPlan,
    GeometryError, GridSpec, Resolution, Rotation, TileTransform,
};
pub use domain::request::{LayoutRequest, RequestError};
pub use domain::run::{
    ConfigurationRun, DeviceEndpoint, DeviceFailure, DeviceId, NegotiationResult, RunStage,
    RunStatus, SceneBinding, StageRecord, StageStatus, TileOutcome,
};

//! Visualization-layer infrastructure.
//!
//! The composed wall is rendered by a compositing scene (OBS in production).
//! The controller needs exactly four capabilities from it: resize the output
//! canvas, enumerate scene items by source name, and set/read one item's
//! transform. Everything else about the compositor is out of scope.
//!
//! # Testability
//!
//! The [`SceneClient`] trait lets the binding resolver and the orchestrator
//! run against recording fakes; the obs-websocket backend (`obs`) is
//! injected only in the binary.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use wall_core::TileTransform;

pub mod obs;

/// Identifier of one scene item within the compositor's current scene.
pub type SceneItemId = u64;

/// Errors produced by the scene client.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The compositor could not be reached or the connection dropped.
    #[error("scene connection failed: {0}")]
    Connection(String),

    /// The compositor answered but refused the request.
    #[error("scene request rejected: {0}")]
    Rejected(String),

    /// The compositor answered with something the client could not interpret.
    #[error("unexpected scene response: {0}")]
    Protocol(String),
}

/// A scene item transform as reported back by the compositor.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTransform {
    pub rotation: f64,
    pub alignment: u8,
    pub scale_x: f64,
    pub scale_y: f64,
    pub position_x: f64,
    pub position_y: f64,
}

/// Capability required from the visualization layer.
#[async_trait]
pub trait SceneClient: Send + Sync {
    /// Resizes the output canvas. Transform coordinates applied afterwards
    /// are relative to this size.
    async fn set_canvas_size(
        &self,
        width: u32,
        height: u32,
        fps_denominator: u32,
    ) -> Result<(), SceneError>;

    /// Looks up scene items by source name. Names with no matching item are
    /// simply absent from the returned map.
    async fn resolve_scene_items(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, SceneItemId>, SceneError>;

    /// Applies one tile's transform to a scene item.
    async fn set_item_transform(
        &self,
        id: SceneItemId,
        transform: &TileTransform,
    ) -> Result<(), SceneError>;

    /// Reads back a scene item's current transform.
    async fn get_item_transform(&self, id: SceneItemId) -> Result<ItemTransform, SceneError>;
}

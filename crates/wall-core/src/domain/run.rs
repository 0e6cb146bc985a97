//! Configuration-run records.
//!
//! One configuration run is one end-to-end attempt to apply a layout across
//! all devices and the visualization layer. The run is built up while the
//! orchestrator advances through its stages and becomes immutable once
//! committed; a new request always starts a new run. Readers only ever see a
//! committed snapshot, never a run in progress.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::{CanvasPlan, GridSpec, Resolution};
use super::request::LayoutRequest;

/// Unique identifier for a controlled device, derived from UUID v4.
pub type DeviceId = Uuid;

/// One controlled display/encoder device.
///
/// Credentials stay with the transport client; the run record only carries
/// identity and address for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub id: DeviceId,
    pub name: String,
    pub host: String,
}

/// A device's response to a resolution request.
///
/// `actual` is what the device reports it applied, and is authoritative over
/// `requested` from the moment it is present: devices may clamp to the
/// nearest supported mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationResult {
    pub device_id: DeviceId,
    pub device_name: String,
    pub requested: Resolution,
    pub actual: Resolution,
}

/// A device that produced no usable result during negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFailure {
    pub device_id: DeviceId,
    pub device_name: String,
    pub error: String,
}

/// Mapping from a logical tile slot to a visualization-layer scene item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneBinding {
    pub tile_index: u32,
    pub source_name: String,
    pub scene_item_id: u64,
}

/// Outcome of applying one tile's transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileOutcome {
    pub tile_index: u32,
    pub scene_item_id: u64,
    /// `None` on success; the apply error otherwise.
    pub error: Option<String>,
}

impl TileOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Stages of a configuration run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStage {
    Validating,
    PlanningProvisional,
    NegotiatingDevices,
    PlanningFinal,
    ResolvingBindings,
    ApplyingCanvas,
    ApplyingTransforms,
    Committed,
    Failed,
}

/// How a stage concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Ok,
    /// The stage completed but attached at least one warning to the run.
    Warned,
    Failed,
}

/// One entry of the run's stage trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: RunStage,
    pub status: StageStatus,
}

/// Caller-visible result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every device, binding, and tile application succeeded.
    CommittedFull,
    /// The layout was committed, but at least one device, binding, or tile
    /// application did not succeed.
    CommittedPartial,
    /// The run aborted before any tile could be placed.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::CommittedFull => "Committed-Full",
            RunStatus::CommittedPartial => "Committed-Partial",
            RunStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// The full record of one configuration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationRun {
    pub id: Uuid,
    pub request: LayoutRequest,
    pub grid: GridSpec,
    /// The final canvas plan (authoritative resolution, fitted, compensated).
    pub plan: CanvasPlan,
    pub negotiation: Vec<NegotiationResult>,
    pub device_failures: Vec<DeviceFailure>,
    pub bindings: Vec<SceneBinding>,
    pub unresolved_sources: Vec<String>,
    pub tile_outcomes: Vec<TileOutcome>,
    pub warnings: Vec<String>,
    pub stages: Vec<StageRecord>,
    pub status: RunStatus,
}

impl ConfigurationRun {
    /// `true` when any per-device, binding, or per-tile failure was recorded.
    pub fn has_partial_outcome(&self) -> bool {
        !self.device_failures.is_empty()
            || !self.unresolved_sources.is_empty()
            || self.tile_outcomes.iter().any(|o| !o.succeeded())
    }

    pub fn succeeded_tiles(&self) -> usize {
        self.tile_outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed_tiles(&self) -> usize {
        self.tile_outcomes.len() - self.succeeded_tiles()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

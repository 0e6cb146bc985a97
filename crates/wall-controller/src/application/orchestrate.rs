//! The configuration state machine.
//!
//! One layout request drives one configuration run through a fixed sequence
//! of stages:
//!
//! ```text
//! Validating → PlanningProvisional → NegotiatingDevices ─┐
//!                                  → ResolvingBindings  ─┤ (concurrent)
//!                                                        ▼
//!                         PlanningFinal → ApplyingCanvas → ApplyingTransforms
//!                                                        ▼
//!                                                    Committed
//! ```
//!
//! Failure policy per stage:
//!
//! - A structurally invalid request is rejected during `Validating`, before
//!   any device or scene is touched.
//! - Per-device and per-tile failures are isolated: they are recorded on the
//!   run and the remaining devices/tiles proceed.
//! - A canvas resize failure is fatal — transform coordinates are relative
//!   to the new canvas, so nothing can be meaningfully placed on an unset
//!   one. The run is reported as `Failed` and applies no transforms.
//!
//! Runs are last-request-wins: each run takes a monotonically increasing
//! generation number, and a run that is no longer the newest by the time it
//! would touch the scene (or commit) discards itself. Only the orchestrator
//! writes the committed snapshot, exactly once per run, on entering
//! `Committed`; readers get an `Arc` snapshot and never observe a run in
//! progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use wall_core::{
    compensate_rounding, compute_canvas, fit_to_bounds, layout_tiles, CanvasPlan,
    ConfigurationRun, DeviceId, GeometryError, GridSpec, LayoutRequest, RequestError, Resolution,
    RunStage, RunStatus, SceneBinding, StageRecord, StageStatus, TileOutcome,
};

use crate::application::bindings::{resolve_bindings, tile_source_names};
use crate::application::negotiate::{negotiate, select_authoritative, DeviceHandle};
use crate::application::registry::{DeviceHealth, DeviceRegistry, DeviceRuntimeState};
use crate::infrastructure::scene::SceneClient;

/// Tunables for the orchestrator, typically built from the config file.
#[derive(Debug, Clone)]
pub struct WallSettings {
    /// Maximum output canvas size; plans are shrunk to fit inside it.
    pub output_bounds: Resolution,
    pub fps_denominator: u32,
    /// Canvas inflation after negotiation, in percent.
    pub margin_pct: f64,
    pub negotiation_timeout: Duration,
    /// Scene source name prefix (`"screen"` → `screen1`, `screen2`, …).
    pub source_prefix: String,
    /// Per-tile resolution assumed before any device has ever negotiated.
    pub default_tile_resolution: Resolution,
    /// Device whose reported resolution wins on disagreement.
    pub reference_device: Option<DeviceId>,
}

impl Default for WallSettings {
    fn default() -> Self {
        Self {
            output_bounds: Resolution::new(1920, 1080),
            fps_denominator: 30,
            margin_pct: 2.0,
            negotiation_timeout: Duration::from_secs(5),
            source_prefix: "screen".to_string(),
            default_tile_resolution: Resolution::new(1920, 1080),
            reference_device: None,
        }
    }
}

/// Errors that prevent a run from producing a reportable outcome.
///
/// Per-device and per-tile failures are *not* here — they are recorded on
/// the [`ConfigurationRun`] itself.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    /// The request failed pre-flight validation; nothing was touched.
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    /// A newer configuration request arrived while this run was in flight;
    /// its results were discarded and nothing was committed.
    #[error("superseded by a newer configuration request")]
    Superseded,

    /// Planning produced degenerate geometry (e.g. a zero default tile
    /// resolution in the settings).
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// The layout orchestrator.
pub struct LayoutOrchestrator {
    scene: Arc<dyn SceneClient>,
    devices: Vec<DeviceHandle>,
    settings: WallSettings,
    registry: Mutex<DeviceRegistry>,
    /// Snapshot of the most recently committed run.
    committed: RwLock<Option<Arc<ConfigurationRun>>>,
    /// Monotonic run counter backing the last-request-wins policy.
    generation: AtomicU64,
}

impl LayoutOrchestrator {
    pub fn new(
        scene: Arc<dyn SceneClient>,
        devices: Vec<DeviceHandle>,
        settings: WallSettings,
    ) -> Self {
        let mut registry = DeviceRegistry::new();
        for handle in &devices {
            registry.upsert(DeviceRuntimeState {
                id: handle.endpoint.id,
                name: handle.endpoint.name.clone(),
                health: DeviceHealth::Unknown,
                last_resolution: None,
            });
        }

        Self {
            scene,
            devices,
            settings,
            registry: Mutex::new(registry),
            committed: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// The most recently committed run, if any.
    pub fn latest_committed(&self) -> Option<Arc<ConfigurationRun>> {
        self.committed.read().expect("lock poisoned").clone()
    }

    /// Drives one configuration run from a layout request.
    ///
    /// # Errors
    ///
    /// - [`OrchestrateError::InvalidRequest`] for a malformed request
    ///   (synchronous, no side effects).
    /// - [`OrchestrateError::Superseded`] when a newer request took over
    ///   while this run was in flight.
    ///
    /// A canvas-apply failure is *not* an `Err`: the run is returned with
    /// [`RunStatus::Failed`] and its outcome lists attached.
    pub async fn configure(
        &self,
        request: LayoutRequest,
    ) -> Result<Arc<ConfigurationRun>, OrchestrateError> {
        // ── Validating ────────────────────────────────────────────────────────
        let grid = request.grid_spec()?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let run_id = Uuid::new_v4();
        let mut stages = vec![StageRecord {
            stage: RunStage::Validating,
            status: StageStatus::Ok,
        }];
        let mut warnings: Vec<String> = Vec::new();

        info!(
            %run_id,
            layout = %request.layout,
            rotation = request.rotation_degrees,
            "starting configuration run"
        );

        // ── PlanningProvisional ───────────────────────────────────────────────
        let provisional_tile = self.last_known_tile_resolution();
        let provisional = fit_to_bounds(
            &compute_canvas(&grid, provisional_tile)?,
            self.settings.output_bounds,
        )?;
        stages.push(StageRecord {
            stage: RunStage::PlanningProvisional,
            status: StageStatus::Ok,
        });
        debug!(
            %run_id,
            canvas = %provisional.canvas,
            per_tile = %provisional.per_tile,
            "provisional plan"
        );

        // ── NegotiatingDevices ∥ ResolvingBindings ────────────────────────────
        // Binding resolution depends only on the visualization layer, so it
        // overlaps the device round. PlanningFinal must not start before every
        // device has answered or timed out, which `negotiate` guarantees.
        let names = tile_source_names(&self.settings.source_prefix, grid.tile_count());
        let (report, binding_result) = tokio::join!(
            negotiate(
                &self.devices,
                provisional.per_tile,
                self.settings.negotiation_timeout
            ),
            resolve_bindings(&names, self.scene.as_ref()),
        );

        {
            let mut registry = self.registry.lock().expect("lock poisoned");
            for result in &report.results {
                registry.record_resolution(result.device_id, result.actual);
            }
            for failure in &report.failures {
                registry.set_health(failure.device_id, DeviceHealth::Excluded);
            }
        }
        stages.push(StageRecord {
            stage: RunStage::NegotiatingDevices,
            status: if report.failures.is_empty() {
                StageStatus::Ok
            } else {
                StageStatus::Warned
            },
        });

        let (bindings, unresolved) = match binding_result {
            Ok(pair) => pair,
            Err(e) => {
                warn!(%run_id, error = %e, "scene item enumeration failed; no tiles will bind");
                warnings.push(format!("scene item enumeration failed: {e}"));
                (Vec::new(), names.clone())
            }
        };
        stages.push(StageRecord {
            stage: RunStage::ResolvingBindings,
            status: if unresolved.is_empty() {
                StageStatus::Ok
            } else {
                StageStatus::Warned
            },
        });

        // ── PlanningFinal ─────────────────────────────────────────────────────
        let mut planning_warned = false;
        let authoritative =
            match select_authoritative(&report, self.settings.reference_device) {
                Some((resolution, inconsistency)) => {
                    if let Some(w) = inconsistency {
                        warn!(%run_id, "{w}");
                        warnings.push(w);
                        planning_warned = true;
                    }
                    resolution
                }
                None => {
                    warnings.push(
                        "no device completed negotiation; keeping provisional resolution"
                            .to_string(),
                    );
                    planning_warned = true;
                    provisional.per_tile
                }
            };
        let final_plan = compensate_rounding(
            &fit_to_bounds(
                &compute_canvas(&grid, authoritative)?,
                self.settings.output_bounds,
            )?,
            self.settings.margin_pct,
        );
        stages.push(StageRecord {
            stage: RunStage::PlanningFinal,
            status: if planning_warned {
                StageStatus::Warned
            } else {
                StageStatus::Ok
            },
        });
        debug!(%run_id, canvas = %final_plan.canvas, per_tile = %final_plan.per_tile, "final plan");

        // A newer request owns the scene from here on.
        if self.generation.load(Ordering::SeqCst) != generation {
            info!(%run_id, "run superseded before canvas apply; discarding results");
            return Err(OrchestrateError::Superseded);
        }

        // ── ApplyingCanvas ────────────────────────────────────────────────────
        if let Err(e) = self
            .scene
            .set_canvas_size(
                final_plan.canvas.width,
                final_plan.canvas.height,
                self.settings.fps_denominator,
            )
            .await
        {
            error!(%run_id, error = %e, "canvas resize failed; aborting run");
            warnings.push(format!("canvas apply failed: {e}"));
            stages.push(StageRecord {
                stage: RunStage::ApplyingCanvas,
                status: StageStatus::Failed,
            });
            stages.push(StageRecord {
                stage: RunStage::Failed,
                status: StageStatus::Failed,
            });
            return Ok(Arc::new(self.build_run(
                run_id,
                request,
                grid,
                final_plan,
                report.results,
                report.failures,
                bindings,
                unresolved,
                Vec::new(),
                warnings,
                stages,
                RunStatus::Failed,
            )));
        }
        stages.push(StageRecord {
            stage: RunStage::ApplyingCanvas,
            status: StageStatus::Ok,
        });

        // ── ApplyingTransforms ────────────────────────────────────────────────
        // The canvas resize above has been acknowledged; transform coordinates
        // are valid from this point. Tiles apply concurrently and
        // independently.
        let transforms = layout_tiles(&grid, &final_plan);
        let mut tasks: JoinSet<TileOutcome> = JoinSet::new();
        for binding in &bindings {
            let Some(transform) = transforms.get(binding.tile_index as usize) else {
                continue;
            };
            let scene = Arc::clone(&self.scene);
            let transform = transform.clone();
            let binding = binding.clone();
            tasks.spawn(async move { apply_tile(scene.as_ref(), &binding, &transform).await });
        }

        let mut tile_outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => tile_outcomes.push(outcome),
                Err(e) => warn!(%run_id, "tile apply task aborted: {e}"),
            }
        }
        tile_outcomes.sort_by_key(|o| o.tile_index);

        // Read back what the compositor actually stored, for diagnosing
        // walls that look wrong despite a clean apply.
        if tracing::enabled!(tracing::Level::DEBUG) {
            for outcome in tile_outcomes.iter().filter(|o| o.succeeded()) {
                if let Ok(applied) = self.scene.get_item_transform(outcome.scene_item_id).await {
                    debug!(
                        tile = outcome.tile_index,
                        x = applied.position_x,
                        y = applied.position_y,
                        rotation = applied.rotation,
                        alignment = applied.alignment,
                        "applied transform read back"
                    );
                }
            }
        }

        let any_tile_failed = tile_outcomes.iter().any(|o| !o.succeeded());
        stages.push(StageRecord {
            stage: RunStage::ApplyingTransforms,
            status: if any_tile_failed {
                StageStatus::Warned
            } else {
                StageStatus::Ok
            },
        });

        // ── Committed ─────────────────────────────────────────────────────────
        let partial = !report.failures.is_empty() || !unresolved.is_empty() || any_tile_failed;
        let status = if partial {
            RunStatus::CommittedPartial
        } else {
            RunStatus::CommittedFull
        };
        stages.push(StageRecord {
            stage: RunStage::Committed,
            status: StageStatus::Ok,
        });

        let run = Arc::new(self.build_run(
            run_id,
            request,
            grid,
            final_plan,
            report.results,
            report.failures,
            bindings,
            unresolved,
            tile_outcomes,
            warnings,
            stages,
            status,
        ));

        if self.generation.load(Ordering::SeqCst) != generation {
            info!(%run_id, "run superseded before commit; discarding results");
            return Err(OrchestrateError::Superseded);
        }
        *self.committed.write().expect("lock poisoned") = Some(Arc::clone(&run));

        info!(
            %run_id,
            status = %run.status,
            tiles_ok = run.succeeded_tiles(),
            tiles_failed = run.failed_tiles(),
            "configuration run committed"
        );
        Ok(run)
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    /// The per-tile resolution the provisional plan starts from: the
    /// reference device's last-known resolution, then any device's, then the
    /// configured default.
    fn last_known_tile_resolution(&self) -> Resolution {
        let registry = self.registry.lock().expect("lock poisoned");
        if let Some(id) = self.settings.reference_device {
            if let Some(resolution) = registry.last_known_resolution(id) {
                return resolution;
            }
        }
        self.devices
            .iter()
            .find_map(|d| registry.last_known_resolution(d.endpoint.id))
            .unwrap_or(self.settings.default_tile_resolution)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_run(
        &self,
        id: Uuid,
        request: LayoutRequest,
        grid: GridSpec,
        plan: CanvasPlan,
        negotiation: Vec<wall_core::NegotiationResult>,
        device_failures: Vec<wall_core::DeviceFailure>,
        bindings: Vec<SceneBinding>,
        unresolved_sources: Vec<String>,
        tile_outcomes: Vec<TileOutcome>,
        warnings: Vec<String>,
        stages: Vec<StageRecord>,
        status: RunStatus,
    ) -> ConfigurationRun {
        ConfigurationRun {
            id,
            request,
            grid,
            plan,
            negotiation,
            device_failures,
            bindings,
            unresolved_sources,
            tile_outcomes,
            warnings,
            stages,
            status,
        }
    }
}

async fn apply_tile(
    scene: &dyn SceneClient,
    binding: &SceneBinding,
    transform: &wall_core::TileTransform,
) -> TileOutcome {
    match scene.set_item_transform(binding.scene_item_id, transform).await {
        Ok(()) => TileOutcome {
            tile_index: binding.tile_index,
            scene_item_id: binding.scene_item_id,
            error: None,
        },
        Err(e) => {
            warn!(
                tile = binding.tile_index,
                source = %binding.source_name,
                error = %e,
                "tile transform apply failed"
            );
            TileOutcome {
                tile_index: binding.tile_index,
                scene_item_id: binding.scene_item_id,
                error: Some(e.to_string()),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Video wall controller entry point.
//!
//! Wires the configuration file, the device HTTP clients, and the
//! obs-websocket scene client into a [`LayoutOrchestrator`] and drives one
//! configuration run. The exit code reflects the run status: non-zero only
//! for a rejected request or a failed run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use wall_controller::application::negotiate::DeviceHandle;
use wall_controller::application::orchestrate::{LayoutOrchestrator, WallSettings};
use wall_controller::infrastructure::device::kiloview::KiloviewClient;
use wall_controller::infrastructure::device::magewell::MagewellClient;
use wall_controller::infrastructure::device::DeviceClient;
use wall_controller::infrastructure::scene::obs::ObsSceneClient;
use wall_controller::infrastructure::scene::SceneClient;
use wall_controller::infrastructure::storage::config::{
    load_config, load_config_from, AppConfig, DeviceKind,
};

use wall_core::{
    compute_canvas, fit_to_bounds, layout_tiles, ConfigurationRun, DeviceEndpoint, LayoutRequest,
    Resolution, RunStatus,
};

#[derive(Debug, Parser)]
#[command(
    name = "wall-controller",
    about = "Configures a tiled video wall: encoder devices plus the compositing scene"
)]
struct Args {
    /// Path to the TOML configuration file (defaults to the platform config directory)
    #[arg(long, env = "WALL_CONTROLLER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured grid layout, rows x columns (e.g. "2x2")
    #[arg(long)]
    layout: Option<String>,

    /// Override the configured rotation in degrees (0, 90, or 270)
    #[arg(long)]
    rotation: Option<u16>,

    /// Compute and log the plan without touching devices or the scene
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => load_config().context("loading config from the platform directory")?,
    };

    let request = LayoutRequest::new(
        args.rotation.unwrap_or(config.wall.rotation_degrees),
        args.layout
            .clone()
            .unwrap_or_else(|| config.wall.layout.clone()),
    );

    if args.dry_run {
        return dry_run(&config, &request);
    }

    if config.devices.is_empty() {
        warn!("no devices configured; the plan starts from defaults and only the scene is driven");
    }

    info!(
        url = %config.scene.url,
        scene = %config.scene.scene_name,
        "connecting to the visualization layer"
    );
    let scene = ObsSceneClient::connect(
        &config.scene.url,
        &config.scene.scene_name,
        config.scene.output_scale,
    )
    .await
    .context("connecting to obs-websocket")?;

    let devices = build_device_handles(&config);
    let settings = build_settings(&config, &devices);
    let orchestrator =
        LayoutOrchestrator::new(Arc::new(scene) as Arc<dyn SceneClient>, devices, settings);

    let run = orchestrator.configure(request).await?;
    report_run(&run);

    if run.status == RunStatus::Failed {
        anyhow::bail!("configuration run failed");
    }
    Ok(())
}

/// Builds one control client per configured device.
fn build_device_handles(config: &AppConfig) -> Vec<DeviceHandle> {
    config
        .devices
        .iter()
        .map(|entry| {
            let client: Arc<dyn DeviceClient> = match entry.kind {
                DeviceKind::Magewell => Arc::new(MagewellClient::new(
                    &entry.host,
                    &entry.username,
                    &entry.password,
                )),
                DeviceKind::Kiloview => Arc::new(KiloviewClient::new(&entry.host)),
            };
            DeviceHandle {
                endpoint: DeviceEndpoint {
                    id: Uuid::new_v4(),
                    name: entry.name.clone(),
                    host: entry.host.clone(),
                },
                client,
            }
        })
        .collect()
}

fn build_settings(config: &AppConfig, devices: &[DeviceHandle]) -> WallSettings {
    if let Some(name) = &config.wall.reference_device {
        if !devices.iter().any(|d| &d.endpoint.name == name) {
            warn!(
                reference = %name,
                "configured reference device not found; falling back to the first device"
            );
        }
    }
    let reference_device = config
        .wall
        .reference_device
        .as_ref()
        .and_then(|name| devices.iter().find(|d| &d.endpoint.name == name))
        .map(|d| d.endpoint.id)
        .or_else(|| devices.first().map(|d| d.endpoint.id));

    WallSettings {
        output_bounds: Resolution::new(config.wall.max_output_width, config.wall.max_output_height),
        fps_denominator: config.wall.fps_denominator,
        margin_pct: config.wall.margin_pct,
        negotiation_timeout: Duration::from_millis(config.wall.negotiation_timeout_ms),
        source_prefix: config.wall.source_prefix.clone(),
        default_tile_resolution: Resolution::new(
            config.wall.default_tile_width,
            config.wall.default_tile_height,
        ),
        reference_device,
    }
}

/// Computes and logs the plan without touching devices or the scene.
fn dry_run(config: &AppConfig, request: &LayoutRequest) -> anyhow::Result<()> {
    let grid = request.grid_spec()?;
    let bounds = Resolution::new(config.wall.max_output_width, config.wall.max_output_height);
    let tile = Resolution::new(
        config.wall.default_tile_width,
        config.wall.default_tile_height,
    );
    let plan = fit_to_bounds(&compute_canvas(&grid, tile)?, bounds)?;

    info!(
        canvas = %plan.canvas,
        per_tile = %plan.per_tile,
        scale = plan.scale_factor,
        "dry-run plan"
    );
    for tile in layout_tiles(&grid, &plan) {
        info!(
            index = tile.index,
            x = tile.position_x,
            y = tile.position_y,
            rotation = tile.rotation.degrees(),
            anchor = tile.anchor.0,
            "tile"
        );
    }
    Ok(())
}

fn report_run(run: &ConfigurationRun) {
    info!(
        status = %run.status,
        canvas = %run.plan.canvas,
        per_tile = %run.plan.per_tile,
        "configuration run finished"
    );
    for result in &run.negotiation {
        info!(
            device = %result.device_name,
            requested = %result.requested,
            actual = %result.actual,
            "device negotiated"
        );
    }
    for failure in &run.device_failures {
        warn!(device = %failure.device_name, error = %failure.error, "device excluded");
    }
    for name in &run.unresolved_sources {
        warn!(source = %name, "tile slot left empty");
    }
    for outcome in &run.tile_outcomes {
        match &outcome.error {
            None => info!(tile = outcome.tile_index, item = outcome.scene_item_id, "tile placed"),
            Some(e) => warn!(tile = outcome.tile_index, error = %e, "tile apply failed"),
        }
    }
    for warning in &run.warnings {
        warn!("{warning}");
    }
}

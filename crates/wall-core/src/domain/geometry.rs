//! Tiling geometry engine.
//!
//! The wall is a grid of physical displays composed onto one output canvas.
//! Geometry flows through three steps:
//!
//! 1. [`compute_canvas`] — multiply the per-tile resolution out to the full
//!    grid. Rotated tiles (90°/270°) occupy a transposed footprint, so the
//!    effective tile width/height used for tiling is swapped.
//! 2. [`fit_to_bounds`] — shrink the canvas uniformly into the physical
//!    output bounds. The engine only ever shrinks; a wall smaller than the
//!    output is left at native size.
//! 3. [`layout_tiles`] — one [`TileTransform`] per tile, row-major, each
//!    anchored at the corner that keeps its visible edge flush with its grid
//!    cell under the requested rotation.
//!
//! All functions are pure; errors are reported, never clamped away.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the geometry engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// A tile resolution with a zero dimension was supplied.
    #[error("tile resolution dimensions must be positive, got {width}x{height}")]
    ZeroResolution { width: u32, height: u32 },

    /// The grid has no tiles (zero columns or zero rows).
    #[error("grid must contain at least one tile, got {columns}x{rows}")]
    EmptyGrid { columns: u32, rows: u32 },

    /// The output bounds have a zero dimension.
    #[error("output bounds must be positive, got {width}x{height}")]
    ZeroBounds { width: u32, height: u32 },
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` when both dimensions are non-zero.
    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Physical rotation applied to every tile of the wall.
///
/// Only the three orientations the devices support are representable;
/// anything else is rejected at request validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg270,
}

impl Rotation {
    /// Maps a raw degree value to a rotation, `None` for unsupported values.
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg270 => 270,
        }
    }

    /// A rotated tile occupies a transposed footprint on the canvas.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// The anchor corner that keeps a tile's visible corner flush with its
    /// grid cell under this rotation, without any extra translation.
    pub fn anchor(self) -> Alignment {
        match self {
            Rotation::Deg0 => Alignment(Alignment::LEFT | Alignment::TOP),
            Rotation::Deg90 => Alignment(Alignment::LEFT | Alignment::BOTTOM),
            Rotation::Deg270 => Alignment(Alignment::RIGHT | Alignment::TOP),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Anchor corner bitmask used by the visualization layer.
///
/// Combine the edge bits to name a corner: `LEFT | TOP` (5) is the top-left
/// corner, `LEFT | BOTTOM` (9) the bottom-left. Zero is the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alignment(pub u8);

impl Alignment {
    pub const CENTER: u8 = 0;
    pub const LEFT: u8 = 1;
    pub const RIGHT: u8 = 2;
    pub const TOP: u8 = 4;
    pub const BOTTOM: u8 = 8;
}

/// The requested tiling: grid dimensions plus the shared tile rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub columns: u32,
    pub rows: u32,
    pub rotation: Rotation,
}

impl GridSpec {
    pub fn new(columns: u32, rows: u32, rotation: Rotation) -> Self {
        Self {
            columns,
            rows,
            rotation,
        }
    }

    pub fn tile_count(&self) -> u32 {
        self.columns * self.rows
    }
}

/// The aggregate output geometry for one configuration run.
///
/// `per_tile` is always the device's own orientation (un-swapped); the canvas
/// already accounts for the rotated footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasPlan {
    pub canvas: Resolution,
    pub per_tile: Resolution,
    /// Uniform shrink factor applied so far, in `(0, 1]`, quantized to two
    /// decimals.
    pub scale_factor: f64,
}

/// Placement of one tile on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileTransform {
    /// Row-major tile index, `0` at the top-left.
    pub index: u32,
    pub position_x: f64,
    pub position_y: f64,
    pub width: u32,
    pub height: u32,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: Rotation,
    pub anchor: Alignment,
}

// ── Plan construction ─────────────────────────────────────────────────────────

/// Computes the full-size canvas for `grid` tiled with `tile`-sized outputs.
///
/// With rotation 90 or 270 the effective per-tile footprint is transposed
/// before multiplying out: a 1920x1080 tile stood on its side contributes a
/// 1080-wide, 1920-tall cell.
///
/// # Errors
///
/// Returns [`GeometryError::ZeroResolution`] or [`GeometryError::EmptyGrid`]
/// for degenerate input; nothing is clamped silently.
pub fn compute_canvas(grid: &GridSpec, tile: Resolution) -> Result<CanvasPlan, GeometryError> {
    if !tile.is_positive() {
        return Err(GeometryError::ZeroResolution {
            width: tile.width,
            height: tile.height,
        });
    }
    if grid.tile_count() == 0 {
        return Err(GeometryError::EmptyGrid {
            columns: grid.columns,
            rows: grid.rows,
        });
    }

    let (effective_w, effective_h) = if grid.rotation.swaps_axes() {
        (tile.height, tile.width)
    } else {
        (tile.width, tile.height)
    };

    Ok(CanvasPlan {
        canvas: Resolution::new(grid.columns * effective_w, grid.rows * effective_h),
        per_tile: tile,
        scale_factor: 1.0,
    })
}

/// Shrinks `plan` uniformly so the canvas fits inside `bounds`.
///
/// The factor is `min(bounds.w / canvas.w, bounds.h / canvas.h)` capped at
/// `1.0` — the engine shrinks but never upscales past the physical output. The
/// factor is quantized to two decimals, always downward, which makes the
/// operation idempotent: a canvas that already fits re-fits with factor 1.0.
///
/// # Errors
///
/// Returns [`GeometryError::ZeroBounds`] if either bound dimension is zero.
pub fn fit_to_bounds(plan: &CanvasPlan, bounds: Resolution) -> Result<CanvasPlan, GeometryError> {
    if !bounds.is_positive() {
        return Err(GeometryError::ZeroBounds {
            width: bounds.width,
            height: bounds.height,
        });
    }

    let width_ratio = bounds.width as f64 / plan.canvas.width as f64;
    let height_ratio = bounds.height as f64 / plan.canvas.height as f64;
    let factor = quantize_factor(width_ratio.min(height_ratio).min(1.0));

    if (factor - 1.0).abs() < f64::EPSILON {
        return Ok(plan.clone());
    }

    Ok(CanvasPlan {
        canvas: scale_resolution(plan.canvas, factor),
        per_tile: scale_resolution(plan.per_tile, factor),
        scale_factor: quantize_factor(plan.scale_factor * factor),
    })
}

/// Inflates the canvas by `margin_pct` percent after resolution negotiation.
///
/// Devices may clamp to a supported mode a few pixels off the requested one;
/// a canvas sized to the exact sum can then clip the last row or column. Only
/// the canvas grows — per-tile geometry and the scale factor are untouched.
pub fn compensate_rounding(plan: &CanvasPlan, margin_pct: f64) -> CanvasPlan {
    let factor = 1.0 + margin_pct.max(0.0) / 100.0;
    CanvasPlan {
        canvas: Resolution::new(
            scale_dimension(plan.canvas.width, factor),
            scale_dimension(plan.canvas.height, factor),
        ),
        per_tile: plan.per_tile,
        scale_factor: plan.scale_factor,
    }
}

/// Lays out one transform per tile in row-major order (row 0 first, columns
/// left to right within a row).
///
/// Tile (row, col) sits at `(col * tile_w, row * tile_h)` using the
/// *un-swapped* per-tile dimensions: rotation determines orientation and
/// anchor, not the grid-position formula. `scale_x`/`scale_y` carry the
/// plan's global scale factor.
pub fn layout_tiles(grid: &GridSpec, plan: &CanvasPlan) -> Vec<TileTransform> {
    if grid.tile_count() == 0 {
        return Vec::new();
    }

    let tile_w = plan.per_tile.width;
    let tile_h = plan.per_tile.height;

    (0..grid.tile_count())
        .map(|index| {
            let col = index % grid.columns;
            let row = index / grid.columns;
            TileTransform {
                index,
                position_x: (col * tile_w) as f64,
                position_y: (row * tile_h) as f64,
                width: tile_w,
                height: tile_h,
                scale_x: plan.scale_factor,
                scale_y: plan.scale_factor,
                rotation: grid.rotation,
                anchor: grid.rotation.anchor(),
            }
        })
        .collect()
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Quantizes a scale factor to two decimals, rounding toward zero.
///
/// Truncation (rather than nearest-rounding) guarantees the quantized factor
/// never exceeds the exact ratio, so a canvas scaled by it always fits the
/// bounds it was computed from. The epsilon absorbs representation error in
/// inputs like `0.75 * 100 = 74.999…`. The floor keeps a pathological
/// canvas-to-bounds ratio from collapsing to zero.
fn quantize_factor(factor: f64) -> f64 {
    (((factor * 100.0 + 1e-9).floor()) / 100.0).max(0.01)
}

fn scale_resolution(res: Resolution, factor: f64) -> Resolution {
    Resolution::new(
        scale_dimension(res.width, factor),
        scale_dimension(res.height, factor),
    )
}

fn scale_dimension(dim: u32, factor: f64) -> u32 {
    (dim as f64 * factor).round() as u32
}

// ── Tests ─────────────────────────────────────────────────────────────────────

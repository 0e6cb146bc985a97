//! Integration tests for the geometry engine's public API.
//!
//! These exercise the crate the way the controller does — request string in,
//! plan and tile transforms out — including the two canonical wall shapes
//! used in deployment (a 2x2 square wall and a 1x4 ribbon) and a sweep over
//! small grids for the structural guarantees: exact tile counts, row-major
//! monotone positions, no overlapping tiles, and a scale factor that never
//! leaves `(0, 1]`.

use wall_core::{compute_canvas, fit_to_bounds, layout_tiles, Alignment, LayoutRequest, Resolution};

const OUTPUT_BOUNDS: Resolution = Resolution {
    width: 1920,
    height: 1080,
};

// ── Canonical wall shapes ─────────────────────────────────────────────────────

/// A 2x2 wall of 960x540 tiles fills the 1920x1080 output exactly: factor
/// 1.0, four tiles flush in each quadrant, all anchored top-left.
#[test]
fn test_square_wall_fills_output_exactly() {
    let grid = LayoutRequest::new(0, "2x2").grid_spec().unwrap();
    let plan = compute_canvas(&grid, Resolution::new(960, 540)).unwrap();
    let fitted = fit_to_bounds(&plan, OUTPUT_BOUNDS).unwrap();

    assert!((fitted.scale_factor - 1.0).abs() < f64::EPSILON);
    assert_eq!(fitted.canvas, Resolution::new(1920, 1080));

    let tiles = layout_tiles(&grid, &fitted);
    let positions: Vec<(f64, f64)> = tiles.iter().map(|t| (t.position_x, t.position_y)).collect();
    assert_eq!(
        positions,
        vec![(0.0, 0.0), (960.0, 0.0), (0.0, 540.0), (960.0, 540.0)]
    );
    assert!(tiles.iter().all(|t| t.anchor == Alignment(5)));
}

/// A 1x4 ribbon of 960x600 tiles overflows the output width (3840x600), so
/// the whole plan shrinks by exactly half.
#[test]
fn test_ribbon_wall_shrinks_to_output_width() {
    let grid = LayoutRequest::new(0, "1x4").grid_spec().unwrap();
    let plan = compute_canvas(&grid, Resolution::new(960, 600)).unwrap();
    assert_eq!(plan.canvas, Resolution::new(3840, 600));

    let fitted = fit_to_bounds(&plan, OUTPUT_BOUNDS).unwrap();
    assert!((fitted.scale_factor - 0.5).abs() < f64::EPSILON);
    assert_eq!(fitted.canvas, Resolution::new(1920, 300));
    assert_eq!(fitted.per_tile, Resolution::new(480, 300));
}

// ── Structural sweeps ─────────────────────────────────────────────────────────

#[test]
fn test_canvas_matches_grid_arithmetic_for_small_grids() {
    let tile = Resolution::new(800, 450);
    for columns in 1..=4u32 {
        for rows in 1..=4u32 {
            let grid = LayoutRequest::new(0, format!("{rows}x{columns}"))
                .grid_spec()
                .unwrap();
            let plan = compute_canvas(&grid, tile).unwrap();
            assert_eq!(plan.canvas.width, columns * tile.width);
            assert_eq!(plan.canvas.height, rows * tile.height);
        }
    }
}

#[test]
fn test_rotated_canvas_swaps_axes_before_multiplying() {
    let tile = Resolution::new(1920, 1080);
    for degrees in [90u16, 270] {
        let grid = LayoutRequest::new(degrees, "2x3").grid_spec().unwrap();
        let plan = compute_canvas(&grid, tile).unwrap();
        assert_eq!(plan.canvas.width, grid.columns * tile.height);
        assert_eq!(plan.canvas.height, grid.rows * tile.width);
    }
}

#[test]
fn test_scale_factor_always_in_unit_interval() {
    let bounds = OUTPUT_BOUNDS;
    for (w, h) in [(640, 480), (1920, 1080), (2560, 1440), (3840, 2160)] {
        for columns in 1..=5u32 {
            let grid = LayoutRequest::new(0, format!("1x{columns}"))
                .grid_spec()
                .unwrap();
            let plan = compute_canvas(&grid, Resolution::new(w, h)).unwrap();
            let fitted = fit_to_bounds(&plan, bounds).unwrap();
            assert!(fitted.scale_factor > 0.0, "factor must stay positive");
            assert!(fitted.scale_factor <= 1.0, "engine must never upscale");
        }
    }
}

#[test]
fn test_fit_to_bounds_is_idempotent_across_grid_sweep() {
    for columns in 1..=4u32 {
        for rows in 1..=3u32 {
            let grid = LayoutRequest::new(0, format!("{rows}x{columns}"))
                .grid_spec()
                .unwrap();
            let plan = compute_canvas(&grid, Resolution::new(1111, 777)).unwrap();
            let once = fit_to_bounds(&plan, OUTPUT_BOUNDS).unwrap();
            let twice = fit_to_bounds(&once, OUTPUT_BOUNDS).unwrap();
            assert_eq!(once, twice, "{rows}x{columns} must re-fit as a no-op");
        }
    }
}

#[test]
fn test_tiles_are_row_major_and_non_overlapping() {
    let grid = LayoutRequest::new(0, "3x4").grid_spec().unwrap();
    let plan = compute_canvas(&grid, Resolution::new(480, 270)).unwrap();
    let tiles = layout_tiles(&grid, &plan);

    assert_eq!(tiles.len(), (grid.columns * grid.rows) as usize);

    for pair in tiles.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let same_row = (a.position_y - b.position_y).abs() < f64::EPSILON;
        if same_row {
            assert!(b.position_x > a.position_x, "columns must increase left to right");
        } else {
            assert!(b.position_y > a.position_y, "rows must increase top to bottom");
        }
    }

    // With a scale factor of at most 1, tiles occupy disjoint cells.
    for (i, a) in tiles.iter().enumerate() {
        for b in tiles.iter().skip(i + 1) {
            let overlap_x = a.position_x < b.position_x + b.width as f64
                && b.position_x < a.position_x + a.width as f64;
            let overlap_y = a.position_y < b.position_y + b.height as f64
                && b.position_y < a.position_y + a.height as f64;
            assert!(!(overlap_x && overlap_y), "tiles {} and {} overlap", a.index, b.index);
        }
    }
}

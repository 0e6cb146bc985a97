//! Layout request validation.
//!
//! A layout request names a rotation and a grid string such as `"2x2"`. Both
//! are validated synchronously, before any device or scene I/O, so a
//! malformed request is rejected with zero side effects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{GridSpec, Rotation};

/// Rejection reasons for a malformed layout request.
///
/// The display strings are part of the control API contract and are returned
/// verbatim to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid rotation value. Must be 0, 90, or 270.")]
    InvalidRotation,

    #[error("Invalid layout format. Must be in the format 'NxM'.")]
    InvalidLayout,
}

/// A layout request as received from the caller.
///
/// The grid string reads rows then columns: `"1x4"` is one row of four
/// tiles, `"2x2"` a square of four.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRequest {
    pub rotation_degrees: u16,
    pub layout: String,
}

impl LayoutRequest {
    pub fn new(rotation_degrees: u16, layout: impl Into<String>) -> Self {
        Self {
            rotation_degrees,
            layout: layout.into(),
        }
    }

    /// Validates the request and produces the grid specification.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidRotation`] unless the rotation is one
    /// of 0, 90, or 270, and [`RequestError::InvalidLayout`] unless the
    /// layout string is `<digits>x<digits>` with both numbers at least 1.
    pub fn grid_spec(&self) -> Result<GridSpec, RequestError> {
        let rotation =
            Rotation::from_degrees(self.rotation_degrees).ok_or(RequestError::InvalidRotation)?;
        let (rows, columns) = parse_layout(&self.layout)?;
        Ok(GridSpec::new(columns, rows, rotation))
    }
}

/// Parses `"NxM"` into `(rows, columns)`.
fn parse_layout(layout: &str) -> Result<(u32, u32), RequestError> {
    let (rows_str, columns_str) = layout.split_once('x').ok_or(RequestError::InvalidLayout)?;
    let rows = parse_grid_number(rows_str)?;
    let columns = parse_grid_number(columns_str)?;
    Ok((rows, columns))
}

fn parse_grid_number(text: &str) -> Result<u32, RequestError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RequestError::InvalidLayout);
    }
    match text.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(RequestError::InvalidLayout),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request_produces_grid_spec() {
        let request = LayoutRequest::new(0, "2x2");
        let grid = request.grid_spec().unwrap();
        assert_eq!(grid.columns, 2);
        assert_eq!(grid.rows, 2);
        assert_eq!(grid.rotation, Rotation::Deg0);
    }

    #[test]
    fn test_layout_string_reads_rows_then_columns() {
        let grid = LayoutRequest::new(0, "1x4").grid_spec().unwrap();
        assert_eq!(grid.rows, 1);
        assert_eq!(grid.columns, 4);
    }

    #[test]
    fn test_rotation_90_and_270_are_accepted() {
        assert_eq!(
            LayoutRequest::new(90, "2x2").grid_spec().unwrap().rotation,
            Rotation::Deg90
        );
        assert_eq!(
            LayoutRequest::new(270, "2x2").grid_spec().unwrap().rotation,
            Rotation::Deg270
        );
    }

    #[test]
    fn test_rotation_180_is_rejected_with_exact_message() {
        let err = LayoutRequest::new(180, "2x2").grid_spec().unwrap_err();
        assert_eq!(err, RequestError::InvalidRotation);
        assert_eq!(
            err.to_string(),
            "Invalid rotation value. Must be 0, 90, or 270."
        );
    }

    #[test]
    fn test_malformed_layout_is_rejected_with_exact_message() {
        let err = LayoutRequest::new(0, "2by2").grid_spec().unwrap_err();
        assert_eq!(err, RequestError::InvalidLayout);
        assert_eq!(
            err.to_string(),
            "Invalid layout format. Must be in the format 'NxM'."
        );
    }

    #[test]
    fn test_layout_with_zero_dimension_is_rejected() {
        assert_eq!(
            LayoutRequest::new(0, "0x3").grid_spec(),
            Err(RequestError::InvalidLayout)
        );
        assert_eq!(
            LayoutRequest::new(0, "3x0").grid_spec(),
            Err(RequestError::InvalidLayout)
        );
    }

    #[test]
    fn test_layout_with_extra_segment_is_rejected() {
        assert_eq!(
            LayoutRequest::new(0, "2x2x2").grid_spec(),
            Err(RequestError::InvalidLayout)
        );
    }

    #[test]
    fn test_layout_with_missing_side_is_rejected() {
        assert_eq!(
            LayoutRequest::new(0, "x4").grid_spec(),
            Err(RequestError::InvalidLayout)
        );
        assert_eq!(
            LayoutRequest::new(0, "4x").grid_spec(),
            Err(RequestError::InvalidLayout)
        );
        assert_eq!(
            LayoutRequest::new(0, "4").grid_spec(),
            Err(RequestError::InvalidLayout)
        );
    }

    #[test]
    fn test_layout_with_negative_number_is_rejected() {
        assert_eq!(
            LayoutRequest::new(0, "-1x4").grid_spec(),
            Err(RequestError::InvalidLayout)
        );
    }

    #[test]
    fn test_multi_digit_grid_dimensions_parse() {
        let grid = LayoutRequest::new(0, "2x12").grid_spec().unwrap();
        assert_eq!(grid.rows, 2);
        assert_eq!(grid.columns, 12);
    }
}

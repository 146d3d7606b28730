//! Stress field resolution.
//!
//! A grid exported from an FEA post-processor usually carries several point
//! arrays (displacement magnitude, principal stresses, von Mises stress, ...).
//! [`prepare_stress_field`] picks the one to segment on:
//!
//! 1. an explicitly requested label, if given (missing label is fatal)
//! 2. the first array whose name matches a known stress-label convention
//! 3. the first point array, with a warning
//!
//! A grid with no point arrays at all, no nodes or no cells fails with
//! `DataUnavailable`; the caller must not continue to partitioning.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{StressError, StressResult};
use crate::grid::{ScalarField, VolumetricGrid};

/// Name fragments recognized as stress arrays, in priority order.
///
/// Matching is case-insensitive after dropping spaces, underscores and dashes.
pub const STRESS_LABEL_PATTERNS: &[&str] = &["vonmises", "mises", "equivalentstress", "stress"];

/// How the stress array was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSelection {
    /// The caller named the array.
    Requested,
    /// The name matched a stress-label convention.
    MatchedConvention,
    /// No name matched; the first array was used.
    FallbackFirst,
}

/// A resolved stress array on a grid.
#[derive(Debug, Clone)]
pub struct StressField<'a> {
    grid: &'a VolumetricGrid,
    field: &'a ScalarField,
    selection: FieldSelection,
    min: f64,
    max: f64,
}

impl<'a> StressField<'a> {
    /// The grid the field lives on.
    #[inline]
    pub fn grid(&self) -> &'a VolumetricGrid {
        self.grid
    }

    /// Array name.
    #[inline]
    pub fn label(&self) -> &'a str {
        &self.field.name
    }

    /// One value per grid node.
    #[inline]
    pub fn values(&self) -> &'a [f64] {
        &self.field.values
    }

    /// How the array was chosen.
    #[inline]
    pub fn selection(&self) -> FieldSelection {
        self.selection
    }

    /// Smallest finite node value.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest finite node value.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }
}

fn normalize_label(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Find the first array matching a stress-label convention.
pub fn find_conventional_field(grid: &VolumetricGrid) -> Option<&ScalarField> {
    STRESS_LABEL_PATTERNS.iter().find_map(|pattern| {
        grid.point_data
            .iter()
            .find(|field| normalize_label(&field.name).contains(pattern))
    })
}

/// Resolve the stress array and its finite range.
///
/// Validates the grid first; structural problems fail with `InvalidGrid`.
pub fn prepare_stress_field<'a>(
    grid: &'a VolumetricGrid,
    requested: Option<&str>,
) -> StressResult<StressField<'a>> {
    if grid.points.is_empty() || grid.cells.is_empty() {
        return Err(StressError::data_unavailable(format!(
            "grid is empty ({} nodes, {} cells)",
            grid.point_count(),
            grid.cell_count()
        )));
    }
    if grid.point_data.is_empty() {
        return Err(StressError::data_unavailable(
            "grid has no point-scalar arrays",
        ));
    }
    grid.validate()?;

    let (field, selection) = match requested {
        Some(label) => {
            let field = grid.field(label).ok_or_else(|| {
                StressError::data_unavailable(format!(
                    "point array '{}' not found (available: {})",
                    label,
                    grid.field_names().collect::<Vec<_>>().join(", ")
                ))
            })?;
            (field, FieldSelection::Requested)
        }
        None => match find_conventional_field(grid) {
            Some(field) => (field, FieldSelection::MatchedConvention),
            None => {
                let field = &grid.point_data[0];
                warn!(
                    field = field.name.as_str(),
                    "No stress-labelled point array found, falling back to the first array"
                );
                (field, FieldSelection::FallbackFirst)
            }
        },
    };

    let (min, max) = field.finite_range().ok_or_else(|| {
        StressError::data_unavailable(format!("point array '{}' has no finite values", field.name))
    })?;

    info!(
        field = field.name.as_str(),
        selection = ?selection,
        min,
        max,
        "Resolved stress field"
    );

    Ok(StressField {
        grid,
        field,
        selection,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use nalgebra::Point3;

    fn tetra_grid() -> VolumetricGrid {
        VolumetricGrid::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![Cell::tetra([0, 1, 2, 3])],
        )
    }

    #[test]
    fn test_no_point_arrays_is_data_unavailable() {
        let err = prepare_stress_field(&tetra_grid(), None).unwrap_err();
        assert!(matches!(err, StressError::DataUnavailable { .. }));
    }

    #[test]
    fn test_empty_grid_is_data_unavailable() {
        let grid = VolumetricGrid::default();
        assert!(matches!(
            prepare_stress_field(&grid, None),
            Err(StressError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_prefers_conventional_label() {
        let grid = tetra_grid()
            .with_point_field("Displacement", vec![0.0, 1.0, 2.0, 3.0])
            .unwrap()
            .with_point_field("Von Mises Stress", vec![5.0, 7.0, 6.0, 9.0])
            .unwrap();
        let field = prepare_stress_field(&grid, None).unwrap();
        assert_eq!(field.label(), "Von Mises Stress");
        assert_eq!(field.selection(), FieldSelection::MatchedConvention);
        assert_eq!(field.min(), 5.0);
        assert_eq!(field.max(), 9.0);
    }

    #[test]
    fn test_falls_back_to_first_array() {
        let grid = tetra_grid()
            .with_point_field("temperature", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .with_point_field("strain", vec![0.0; 4])
            .unwrap();
        let field = prepare_stress_field(&grid, None).unwrap();
        assert_eq!(field.label(), "temperature");
        assert_eq!(field.selection(), FieldSelection::FallbackFirst);
    }

    #[test]
    fn test_requested_label_must_exist() {
        let grid = tetra_grid()
            .with_point_field("stress", vec![1.0; 4])
            .unwrap();
        let err = prepare_stress_field(&grid, Some("S_Mises")).unwrap_err();
        assert!(matches!(err, StressError::DataUnavailable { .. }));
        assert!(err.to_string().contains("stress"));

        let field = prepare_stress_field(&grid, Some("stress")).unwrap();
        assert_eq!(field.selection(), FieldSelection::Requested);
    }

    #[test]
    fn test_all_nan_field_is_data_unavailable() {
        let grid = tetra_grid()
            .with_point_field("stress", vec![f64::NAN; 4])
            .unwrap();
        assert!(prepare_stress_field(&grid, None).is_err());
    }
}

//! Volume fractions over equal-width stress bins.
//!
//! Independent of the partitioner's thresholds: the stress range
//! `[stress_min, stress_max]` is split into `num_divisions` equal bins and
//! every supported cell adds its volume to the bin of its mean node stress.
//! Values outside the range are clamped into the first or last bin.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{StressError, StressResult};
use crate::grid::VolumetricGrid;
use crate::tracing_ext::{OperationTimer, log_fraction_table};
use crate::volume::{cell_volume, representative_value};

/// Default number of bins.
pub const DEFAULT_NUM_DIVISIONS: usize = 20;

/// Fraction of processed volume per stress bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeFractionTable {
    /// Name of the point array the table was computed from.
    pub stress_label: String,

    /// Lower edge of the first bin.
    pub stress_min: f64,

    /// Upper edge of the last bin.
    pub stress_max: f64,

    /// Fraction of `total_volume` per bin, each in `[0, 1]`.
    pub fractions: Vec<f64>,

    /// Absolute volume per bin.
    pub bin_volumes: Vec<f64>,

    /// Sum of all supported cell volumes.
    pub total_volume: f64,

    /// Cells that contributed a volume (possibly zero).
    pub processed_cells: usize,

    /// Cells of unsupported type; they contribute nothing.
    pub skipped_cells: usize,

    /// Supported cells whose mean stress is not finite; they contribute nothing.
    pub non_finite_cells: usize,
}

impl VolumeFractionTable {
    /// Number of bins.
    #[inline]
    pub fn num_divisions(&self) -> usize {
        self.fractions.len()
    }

    /// Width of one bin.
    #[inline]
    pub fn bin_width(&self) -> f64 {
        (self.stress_max - self.stress_min) / self.fractions.len() as f64
    }

    /// Stress interval of bin `index`.
    pub fn bin_range(&self, index: usize) -> Option<(f64, f64)> {
        (index < self.fractions.len()).then(|| {
            let width = self.bin_width();
            (
                self.stress_min + width * index as f64,
                self.stress_min + width * (index + 1) as f64,
            )
        })
    }

    /// Whether any volume was accumulated.
    ///
    /// When false, every fraction is zero and a report should show "no data".
    #[inline]
    pub fn has_volume(&self) -> bool {
        self.total_volume > 0.0
    }

    /// Sum of all fractions; 1 within rounding when [`Self::has_volume`].
    pub fn sum(&self) -> f64 {
        self.fractions.iter().sum()
    }
}

/// Bin index of a stress value, clamped to `[0, num_divisions - 1]`.
#[inline]
pub fn bin_index(value: f64, stress_min: f64, bin_width: f64, num_divisions: usize) -> usize {
    let raw = ((value - stress_min) / bin_width).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(num_divisions - 1)
    }
}

/// Compute volume fractions of a named point array.
///
/// Fails with `InvalidConfiguration` if `stress_min >= stress_max`, either
/// bound is not finite or `num_divisions` is zero, and with `DataUnavailable`
/// if the array is missing or the grid has no cells. No partial table is
/// produced on failure.
///
/// Accumulation runs in cell order, so identical inputs give bit-identical
/// tables.
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use stress_regions::{Cell, VolumetricGrid, compute_volume_fractions};
///
/// let grid = VolumetricGrid::new(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(0.0, 0.0, 1.0),
///     ],
///     vec![Cell::tetra([0, 1, 2, 3])],
/// )
/// .with_point_field("stress", vec![30.0; 4])
/// .unwrap();
///
/// let table = compute_volume_fractions(&grid, "stress", 0.0, 100.0, 4).unwrap();
/// assert_eq!(table.fractions, vec![0.0, 1.0, 0.0, 0.0]);
/// ```
pub fn compute_volume_fractions(
    grid: &VolumetricGrid,
    stress_label: &str,
    stress_min: f64,
    stress_max: f64,
    num_divisions: usize,
) -> StressResult<VolumeFractionTable> {
    if !(stress_min.is_finite() && stress_max.is_finite()) || stress_min >= stress_max {
        return Err(StressError::invalid_configuration(format!(
            "stress range [{}, {}] is not a positive finite interval",
            stress_min, stress_max
        )));
    }
    if num_divisions == 0 {
        return Err(StressError::invalid_configuration(
            "num_divisions must be at least 1",
        ));
    }
    if grid.cells.is_empty() {
        return Err(StressError::data_unavailable("grid has no cells"));
    }
    let field = grid.field(stress_label).ok_or_else(|| {
        StressError::data_unavailable(format!("point array '{}' not found", stress_label))
    })?;
    grid.validate()?;

    let _timer = OperationTimer::with_context("volume_fractions", grid.cell_count(), num_divisions);
    let bin_width = (stress_max - stress_min) / num_divisions as f64;

    // (bin, volume) per cell; None for unsupported, Some(None) for non-finite stress.
    let measured: Vec<Option<Option<(usize, f64)>>> = grid
        .cells
        .par_iter()
        .map(|cell| {
            let volume = cell_volume(grid, cell)?;
            let value = representative_value(&field.values, cell).filter(|v| v.is_finite());
            Some(value.map(|v| (bin_index(v, stress_min, bin_width, num_divisions), volume)))
        })
        .collect();

    let mut bin_volumes = vec![0.0; num_divisions];
    let mut total_volume = 0.0;
    let mut processed_cells = 0;
    let mut skipped_cells = 0;
    let mut non_finite_cells = 0;

    for entry in measured {
        match entry {
            Some(Some((bin, volume))) => {
                bin_volumes[bin] += volume;
                total_volume += volume;
                processed_cells += 1;
            }
            Some(None) => non_finite_cells += 1,
            None => skipped_cells += 1,
        }
    }

    let fractions = if total_volume > 0.0 {
        bin_volumes.iter().map(|v| v / total_volume).collect()
    } else {
        info!(
            stress_label,
            processed_cells, "Total processed volume is zero; all fractions are zero"
        );
        vec![0.0; num_divisions]
    };

    if skipped_cells > 0 {
        debug!(skipped_cells, "Skipped cells of unsupported type");
    }

    let table = VolumeFractionTable {
        stress_label: stress_label.to_string(),
        stress_min,
        stress_max,
        fractions,
        bin_volumes,
        total_volume,
        processed_cells,
        skipped_cells,
        non_finite_cells,
    };
    log_fraction_table(&table);
    Ok(table)
}

//! End-to-end segmentation run.
//!
//! [`SegmentationPipeline`] chains the engine stages for one grid:
//!
//! 1. resolve the stress field
//! 2. compute the volume-fraction table over the field's range
//! 3. partition by the configured thresholds
//! 4. persist the regions in a freshly cleared registry directory
//! 5. assign an infill density to each registered mesh
//!
//! Any fatal error aborts the run; the registry rolls back the batch it was
//! writing, so no partial `MeshInfo` list is left behind.
//!
//! # Example
//!
//! ```no_run
//! use stress_regions::{SegmentationConfig, SegmentationPipeline, load_grid};
//!
//! let grid = load_grid("bracket.json".as_ref()).unwrap();
//! let config = SegmentationConfig::with_thresholds(vec![0.0, 50.0, 120.0, 250.0]);
//! let report = SegmentationPipeline::new(config).run(&grid).unwrap();
//!
//! for mesh in &report.meshes {
//!     println!("{} -> {}", mesh.mesh_id, mesh.file_path.display());
//! }
//! ```

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::band::normalize_thresholds;
use crate::config::SegmentationConfig;
use crate::density::{DensityAssignment, assign_densities};
use crate::error::StressResult;
use crate::field::{FieldSelection, StressField, prepare_stress_field};
use crate::fraction::{VolumeFractionTable, compute_volume_fractions};
use crate::grid::{GridStats, VolumetricGrid};
use crate::io::load_grid;
use crate::partition::{BandOutcome, PartitionParams, partition_with_params};
use crate::registry::{MeshInfo, RegionMeshRegistry};
use crate::tracing_ext::log_grid_stats;

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationReport {
    pub stress_label: String,
    pub field_selection: FieldSelection,
    pub stress_min: f64,
    pub stress_max: f64,
    pub grid: GridStats,
    pub fractions: VolumeFractionTable,
    pub bands: Vec<BandOutcome>,
    pub meshes: Vec<MeshInfo>,
    pub densities: Vec<DensityAssignment>,
    pub skipped_cells: usize,
    pub non_finite_cells: usize,
    pub elapsed_ms: f64,

    /// Human-readable stage log.
    pub operations: Vec<String>,
}

impl SegmentationReport {
    /// Number of bands that produced no region.
    pub fn empty_bands(&self) -> usize {
        self.bands.len() - self.meshes.len()
    }
}

/// Runs the full segmentation for a configuration.
#[derive(Debug, Clone)]
pub struct SegmentationPipeline {
    config: SegmentationConfig,
    sequential: bool,
}

impl SegmentationPipeline {
    pub fn new(config: SegmentationConfig) -> Self {
        Self {
            config,
            sequential: false,
        }
    }

    /// Extract bands one after another instead of on the rayon pool.
    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Load a grid document and run on it.
    pub fn run_file(&self, path: &Path) -> StressResult<SegmentationReport> {
        let grid = load_grid(path)?;
        self.run(&grid)
    }

    /// Run all stages on a grid.
    pub fn run(&self, grid: &VolumetricGrid) -> StressResult<SegmentationReport> {
        let start = Instant::now();
        let mut operations = Vec::new();

        self.config.validate()?;
        log_grid_stats(grid, "segmentation input");

        let field = prepare_stress_field(grid, self.config.stress_label.as_deref())?;
        operations.push(format!(
            "Resolved field '{}' ({:?}), range [{}, {}]",
            field.label(),
            field.selection(),
            field.min(),
            field.max()
        ));

        let (range_min, range_max) = fraction_range(&field, &self.config.thresholds)?;
        let fractions = compute_volume_fractions(
            grid,
            field.label(),
            range_min,
            range_max,
            self.config.num_divisions,
        )?;
        operations.push(format!(
            "Volume fractions: {} bins, total volume {:.6}",
            fractions.num_divisions(),
            fractions.total_volume
        ));

        let params = PartitionParams {
            cleanup: self.config.cleanup.clone(),
            sequential: self.sequential,
        };
        let partitioned = partition_with_params(&field, &self.config.thresholds, &params)?;
        operations.push(format!(
            "Partitioned into {} regions over {} bands ({} empty, {} failed)",
            partitioned.regions.len(),
            partitioned.bands.len(),
            partitioned.empty_bands(),
            partitioned.failed_bands()
        ));

        let mut registry = RegionMeshRegistry::create(&self.config.output_dir, self.config.format)?;
        let meshes = registry.register_all(partitioned.regions)?.to_vec();
        operations.push(format!(
            "Registered {} meshes in {}",
            meshes.len(),
            registry.dir().display()
        ));

        let densities = assign_densities(&meshes, field.min(), field.max(), &self.config.density)?;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            regions = meshes.len(),
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Segmentation complete"
        );

        Ok(SegmentationReport {
            stress_label: field.label().to_string(),
            field_selection: field.selection(),
            stress_min: field.min(),
            stress_max: field.max(),
            grid: grid.stats(),
            fractions,
            bands: partitioned.outcomes,
            meshes,
            densities,
            skipped_cells: partitioned.skipped_cells,
            non_finite_cells: partitioned.non_finite_cells,
            elapsed_ms,
            operations,
        })
    }
}

/// Histogram range for a run: the field's own spread, or the threshold span
/// when the field is uniform.
fn fraction_range(field: &StressField<'_>, thresholds: &[f64]) -> StressResult<(f64, f64)> {
    if field.min() < field.max() {
        return Ok((field.min(), field.max()));
    }
    let sorted = normalize_thresholds(thresholds)?;
    let (lo, hi) = match (sorted.first(), sorted.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => (field.min(), field.max()),
    };
    info!(
        value = field.min(),
        range_min = lo,
        range_max = hi,
        "Stress field is uniform; binning over the threshold span"
    );
    Ok((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StressError;
    use crate::grid::Cell;
    use nalgebra::Point3;
    use tempfile::TempDir;

    /// Two unit hexes along x with per-node stress rising along x.
    fn two_hex_grid() -> VolumetricGrid {
        let mut points = Vec::new();
        for x in 0..3 {
            for (y, z) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                points.push(Point3::new(x as f64, y, z));
            }
        }
        let hex = |i: u32| {
            let a = i * 4;
            let b = a + 4;
            Cell::hexahedron([a, b, b + 1, a + 1, a + 3, b + 3, b + 2, a + 2])
        };
        let stress: Vec<f64> = (0..3).flat_map(|x| [x as f64 * 10.0; 4]).collect();
        VolumetricGrid::new(points, vec![hex(0), hex(1)])
            .with_point_field("von_mises", stress)
            .unwrap()
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = TempDir::new().unwrap();
        let mut config = SegmentationConfig::with_thresholds(vec![0.0, 10.0, 20.0, 30.0]);
        config.output_dir = dir.path().join("regions");
        config.num_divisions = 4;

        let report = SegmentationPipeline::new(config).run(&two_hex_grid()).unwrap();

        // Cell means 5 and 15.
        assert_eq!(report.stress_label, "von_mises");
        assert_eq!(report.meshes.len(), 2);
        assert_eq!(report.bands.len(), 3);
        assert_eq!(report.empty_bands(), 1);
        assert_eq!(report.fractions.fractions, vec![0.0, 0.5, 0.0, 0.5]);
        assert!(report.meshes.iter().all(|m| m.file_path.is_file()));
        assert_eq!(report.densities.len(), 2);
        assert!(report.densities[0].density < report.densities[1].density);
    }

    #[test]
    fn test_uniform_field_still_partitions() {
        let dir = TempDir::new().unwrap();
        let mut grid = two_hex_grid();
        grid.point_data[0].values = vec![5.0; grid.points.len()];

        let mut config = SegmentationConfig::with_thresholds(vec![0.0, 10.0]);
        config.output_dir = dir.path().join("regions");
        config.num_divisions = 2;

        let report = SegmentationPipeline::new(config).run(&grid).unwrap();

        assert_eq!(report.stress_min, 5.0);
        assert_eq!(report.stress_max, 5.0);
        assert_eq!(report.fractions.stress_min, 0.0);
        assert_eq!(report.fractions.stress_max, 10.0);
        assert_eq!(report.fractions.fractions, vec![0.0, 1.0]);
        assert_eq!(report.meshes.len(), 1);
        assert!(report.meshes[0].file_path.is_file());
    }

    #[test]
    fn test_invalid_config_aborts_before_writing() {
        let dir = TempDir::new().unwrap();
        let mut config = SegmentationConfig::with_thresholds(vec![10.0]);
        config.output_dir = dir.path().join("regions");

        let err = SegmentationPipeline::new(config).run(&two_hex_grid()).unwrap_err();
        assert!(matches!(err, StressError::InvalidConfiguration { .. }));
        assert!(!dir.path().join("regions").exists());
    }

    #[test]
    fn test_missing_field_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = SegmentationConfig::with_thresholds(vec![0.0, 10.0]);
        config.output_dir = dir.path().to_path_buf();
        config.stress_label = Some("S11".into());

        let err = SegmentationPipeline::new(config).run(&two_hex_grid()).unwrap_err();
        assert!(matches!(err, StressError::DataUnavailable { .. }));
    }
}

//! stressmap partition command - write one region mesh per stress band.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use stress_regions::{
    BandOutcome, BandStatus, MeshInfo, PartitionParams, RegionMeshRegistry, SurfaceFormat,
    bands_from_thresholds, load_grid, partition_with_params, prepare_stress_field,
};

use tracing::debug;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct PartitionReport {
    input: String,
    output: String,
    stress_label: String,
    bands: Vec<BandOutcome>,
    meshes: Vec<MeshInfo>,
    skipped_cells: usize,
    non_finite_cells: usize,
}

pub fn run(
    input: &Path,
    thresholds: &[f64],
    output_dir: &Path,
    label: Option<&str>,
    format: SurfaceFormat,
    weld_tolerance: Option<f64>,
    cli: &Cli,
) -> Result<()> {
    let mut params = PartitionParams::default();
    if let Some(tolerance) = weld_tolerance {
        params.cleanup.weld_epsilon = tolerance;
    }
    params.cleanup.validate()?;
    let band_count = bands_from_thresholds(thresholds)?.len();

    let grid =
        load_grid(input).with_context(|| format!("Failed to load grid from {:?}", input))?;
    let field = prepare_stress_field(&grid, label)?;

    debug!(?thresholds, ?weld_tolerance, "Partition arguments");

    output::info(
        &format!("Partitioning '{}' into {} bands", field.label(), band_count),
        cli.format,
        cli.quiet,
    );
    let result = partition_with_params(&field, thresholds, &params)?;

    let mut registry = RegionMeshRegistry::create(output_dir, format)
        .with_context(|| format!("Failed to prepare output directory {:?}", output_dir))?;
    let meshes = registry
        .register_all(result.regions)
        .with_context(|| format!("Failed to write region meshes to {:?}", output_dir))?
        .to_vec();

    let report = PartitionReport {
        input: input.display().to_string(),
        output: output_dir.display().to_string(),
        stress_label: field.label().to_string(),
        bands: result.outcomes,
        meshes,
        skipped_cells: result.skipped_cells,
        non_finite_cells: result.non_finite_cells,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&report, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(
                    &format!(
                        "Wrote {} region meshes to {}",
                        report.meshes.len(),
                        output_dir.display()
                    ),
                    cli.format,
                    cli.quiet,
                );
                print_bands(&report.bands);
                if report.skipped_cells > 0 {
                    println!(
                        "  {}: {} cells of unsupported type",
                        "Skipped".yellow(),
                        report.skipped_cells
                    );
                }
            }
        }
    }

    Ok(())
}

pub(crate) fn print_bands(bands: &[BandOutcome]) {
    for outcome in bands {
        match &outcome.status {
            BandStatus::Emitted { mesh_id } => println!(
                "  {} {:<24} mesh {} ({} cells, {} triangles)",
                "●".green(),
                outcome.band.to_string(),
                mesh_id,
                outcome.cell_count,
                outcome.face_count
            ),
            BandStatus::Empty => println!(
                "  {} {:<24} empty",
                "○".dimmed(),
                outcome.band.to_string()
            ),
            BandStatus::Failed { reason } => println!(
                "  {} {:<24} skipped: {}",
                "✗".red(),
                outcome.band.to_string(),
                reason
            ),
        }
    }
}

//! stressmap run command - full segmentation from a configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use stress_regions::{SegmentationConfig, SegmentationPipeline, load_grid};

use crate::commands::partition::print_bands;
use crate::{Cli, OutputFormat, output};

pub fn run(input: &Path, config_path: &Path, output_dir: Option<&Path>, cli: &Cli) -> Result<()> {
    let mut config = SegmentationConfig::from_toml_file(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    if let Some(dir) = output_dir {
        config.output_dir = dir.to_path_buf();
    }

    let grid =
        load_grid(input).with_context(|| format!("Failed to load grid from {:?}", input))?;

    output::info(
        &format!(
            "Running segmentation with {} thresholds",
            config.thresholds.len()
        ),
        cli.format,
        cli.quiet,
    );
    let report = SegmentationPipeline::new(config).run(&grid)?;

    match cli.format {
        OutputFormat::Json => {
            output::print(&report, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(
                    &format!(
                        "Segmented '{}' into {} regions in {:.1} ms",
                        report.stress_label,
                        report.meshes.len(),
                        report.elapsed_ms
                    ),
                    cli.format,
                    cli.quiet,
                );
                print_bands(&report.bands);

                println!("{}", "Infill".bold());
                for (mesh, density) in report.meshes.iter().zip(&report.densities) {
                    println!(
                        "  mesh {}: {:.1}% ({})",
                        mesh.mesh_id,
                        density.density,
                        mesh.file_path.display()
                    );
                }

                println!("{}", "Steps".bold());
                for step in &report.operations {
                    println!("  - {}", step);
                }
            }
        }
    }

    Ok(())
}

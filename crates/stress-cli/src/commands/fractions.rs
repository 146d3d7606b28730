//! stressmap fractions command - volume fraction per stress bin.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use stress_regions::{compute_volume_fractions, load_grid, prepare_stress_field};

use crate::{Cli, OutputFormat, output};

const BAR_WIDTH: f64 = 40.0;

pub fn run(
    input: &Path,
    label: Option<&str>,
    min: Option<f64>,
    max: Option<f64>,
    divisions: usize,
    cli: &Cli,
) -> Result<()> {
    let grid =
        load_grid(input).with_context(|| format!("Failed to load grid from {:?}", input))?;
    let field = prepare_stress_field(&grid, label)?;

    let stress_min = min.unwrap_or(field.min());
    let stress_max = max.unwrap_or(field.max());
    let table = compute_volume_fractions(&grid, field.label(), stress_min, stress_max, divisions)
        .with_context(|| format!("Failed to compute volume fractions of '{}'", field.label()))?;

    match cli.format {
        OutputFormat::Json => {
            output::print(&table, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Volume Fractions".bold().underline());
                println!("  {}: {}", "Field".cyan(), table.stress_label);
                println!("  {}: {:.6}", "Total volume".cyan(), table.total_volume);
                if table.skipped_cells > 0 {
                    println!(
                        "  {}: {} cells of unsupported type",
                        "Skipped".yellow(),
                        table.skipped_cells
                    );
                }
                if table.non_finite_cells > 0 {
                    println!(
                        "  {}: {} cells with non-finite stress",
                        "Skipped".yellow(),
                        table.non_finite_cells
                    );
                }

                if !table.has_volume() {
                    println!("  {}", "No volume to distribute (all cells degenerate or skipped)".red());
                    return Ok(());
                }

                for i in 0..table.num_divisions() {
                    let Some((lo, hi)) = table.bin_range(i) else {
                        continue;
                    };
                    let fraction = table.fractions[i];
                    let bar = "█".repeat((fraction * BAR_WIDTH).round() as usize);
                    println!(
                        "  {:>10.3} - {:<10.3} {:>6.2}% {}",
                        lo,
                        hi,
                        fraction * 100.0,
                        bar.green()
                    );
                }
            }
        }
    }

    Ok(())
}

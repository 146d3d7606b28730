//! stressmap info command - display grid statistics and the stress field.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use stress_regions::{FieldSelection, GridStats, load_grid, prepare_stress_field};

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct GridInfo {
    path: String,
    #[serde(flatten)]
    stats: GridStats,
    fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stress: Option<StressInfo>,
}

#[derive(Serialize)]
struct StressInfo {
    label: String,
    selection: FieldSelection,
    min: f64,
    max: f64,
}

pub fn run(input: &Path, label: Option<&str>, cli: &Cli) -> Result<()> {
    let grid =
        load_grid(input).with_context(|| format!("Failed to load grid from {:?}", input))?;

    // A grid without a usable field is still worth describing.
    let stress = match prepare_stress_field(&grid, label) {
        Ok(field) => Some(StressInfo {
            label: field.label().to_string(),
            selection: field.selection(),
            min: field.min(),
            max: field.max(),
        }),
        Err(e) if label.is_some() => return Err(e.into()),
        Err(e) => {
            output::warning(&e.to_string(), cli.format, cli.quiet);
            None
        }
    };

    let info = GridInfo {
        path: input.display().to_string(),
        stats: grid.stats(),
        fields: grid.field_names().map(str::to_string).collect(),
        stress,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                let s = &info.stats;
                println!("{}", "Grid Information".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("  {}: {}", "Nodes".cyan(), s.point_count);
                println!("  {}: {}", "Cells".cyan(), s.cell_count);
                println!(
                    "    tetra {} | tetra10 {} | hexahedron {} | hexahedron20 {} | other {}",
                    s.tetra, s.quadratic_tetra, s.hexahedron, s.quadratic_hexahedron, s.other
                );

                if let Some((min, max)) = s.bounds {
                    let dims = max - min;
                    println!(
                        "  {}: {:.2} x {:.2} x {:.2}",
                        "Dimensions".cyan(),
                        dims.x,
                        dims.y,
                        dims.z
                    );
                }

                println!("  {}: {}", "Point arrays".cyan(), info.fields.join(", "));

                match &info.stress {
                    Some(stress) => {
                        let how = match stress.selection {
                            FieldSelection::Requested => "requested",
                            FieldSelection::MatchedConvention => "matched by name",
                            FieldSelection::FallbackFirst => "fallback to first array",
                        };
                        println!(
                            "  {}: {} ({}), range [{:.4}, {:.4}]",
                            "Stress field".cyan(),
                            stress.label,
                            how,
                            stress.min,
                            stress.max
                        );
                    }
                    None => println!("  {}: {}", "Stress field".cyan(), "unavailable".red()),
                }
            }
        }
    }

    Ok(())
}

//! stressmap: Command-line interface for stress-driven region segmentation.
//!
//! Reads a volumetric grid document, resolves its stress field and turns it
//! into per-band region meshes and volume-fraction tables, suitable for
//! scripting and CI pipelines.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=stress_regions=info` - Basic operation logging
//! - `RUST_LOG=stress_regions=debug` - Per-band detail
//! - `RUST_LOG=stress_regions::timing=debug` - Performance timing
//!
//! # Example
//!
//! ```bash
//! stressmap info bracket.json
//! stressmap fractions bracket.json --divisions 10
//! stressmap partition bracket.json --thresholds 0,50,120,250 -o regions
//! RUST_LOG=stress_regions=debug stressmap run bracket.json --config run.toml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{fractions, info, partition, run};

/// stressmap - Segment FEA stress results into printable regions.
#[derive(Parser)]
#[command(name = "stressmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MeshFormat {
    /// Binary STL
    Stl,
    /// Wavefront OBJ
    Obj,
}

impl From<MeshFormat> for stress_regions::SurfaceFormat {
    fn from(format: MeshFormat) -> Self {
        match format {
            MeshFormat::Stl => stress_regions::SurfaceFormat::Stl,
            MeshFormat::Obj => stress_regions::SurfaceFormat::Obj,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Display grid statistics and the resolved stress field
    Info {
        /// Input grid document (JSON)
        input: PathBuf,

        /// Stress array to resolve (default: by naming convention)
        #[arg(long)]
        label: Option<String>,
    },

    /// Compute the volume fraction per stress bin
    Fractions {
        /// Input grid document (JSON)
        input: PathBuf,

        /// Stress array (default: by naming convention)
        #[arg(long)]
        label: Option<String>,

        /// Lower edge of the first bin (default: field minimum)
        #[arg(long)]
        min: Option<f64>,

        /// Upper edge of the last bin (default: field maximum)
        #[arg(long)]
        max: Option<f64>,

        /// Number of equal-width bins
        #[arg(long, short, default_value = "20")]
        divisions: usize,
    },

    /// Partition the grid into region meshes by stress thresholds
    Partition {
        /// Input grid document (JSON)
        input: PathBuf,

        /// Comma-separated thresholds, e.g. 0,50,120,250
        #[arg(long, short, value_delimiter = ',', required = true)]
        thresholds: Vec<f64>,

        /// Output directory for region files and regions.json
        #[arg(short, long)]
        output: PathBuf,

        /// Stress array (default: by naming convention)
        #[arg(long)]
        label: Option<String>,

        /// Region file format
        #[arg(long, default_value = "stl")]
        mesh_format: MeshFormat,

        /// Vertex welding tolerance
        #[arg(long)]
        weld_tolerance: Option<f64>,
    },

    /// Run the full segmentation from a configuration file
    Run {
        /// Input grid document (JSON)
        input: PathBuf,

        /// Configuration file (TOML)
        #[arg(long, short)]
        config: PathBuf,

        /// Override the configured output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "stress_regions=info,stressmap=info",
            2 => "stress_regions=debug,stressmap=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Info { input, label } => info::run(input, label.as_deref(), &cli),
        Commands::Fractions {
            input,
            label,
            min,
            max,
            divisions,
        } => fractions::run(input, label.as_deref(), *min, *max, *divisions, &cli),
        Commands::Partition {
            input,
            thresholds,
            output,
            label,
            mesh_format,
            weld_tolerance,
        } => partition::run(
            input,
            thresholds,
            output,
            label.as_deref(),
            (*mesh_format).into(),
            *weld_tolerance,
            &cli,
        ),
        Commands::Run {
            input,
            config,
            output,
        } => run::run(input, config, output.as_deref(), &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(stress_err) = e.downcast_ref::<stress_regions::StressError>() {
                eprintln!("{}: {}", "Error".red().bold(), stress_err);
                eprintln!("  {}: {}", "Code".cyan(), stress_err.code());
                eprintln!(
                    "  {}: {}",
                    "Suggestion".green(),
                    stress_err.recovery_suggestion()
                );
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

//! Stress-driven segmentation of volumetric FEA results.
//!
//! This crate turns a volumetric grid carrying a per-node stress field into
//! region surfaces, one per stress band, for use as 3D-print modifier shapes
//! (for example, denser infill where the part is loaded hardest). It also
//! reports how the part's volume is distributed over stress.
//!
//! # Features
//!
//! - **Field resolution**: pick the stress array by name or naming convention
//! - **Partitioning**: threshold bands, boundary surface extraction, cleanup
//! - **Volume fractions**: share of the part volume per equal-width stress bin
//! - **Registry**: index-named region files plus a `regions.json` side-table
//! - **Density mapping**: band midpoint to infill percentage
//!
//! # Cells
//!
//! Supported cell types are linear and quadratic tetrahedra and hexahedra
//! (VTK codes 10, 24, 12, 25). Other cells are kept in the grid but contribute
//! no volume and join no region; they are counted as skipped.
//!
//! A cell's representative value is the mean of all its node values,
//! including mid-edge nodes of quadratic cells. Volume and faces use the
//! corner nodes only.
//!
//! # Bands
//!
//! N distinct thresholds give N-1 bands. Every band is half-open
//! `[min, max)` except the last, which is closed `[min, max]`. A value on an
//! interior boundary belongs to the band it starts.
//!
//! # Quick Start
//!
//! ```no_run
//! use stress_regions::{RegionMeshRegistry, SurfaceFormat, load_grid, partition, prepare_stress_field};
//!
//! let grid = load_grid("bracket.json".as_ref()).unwrap();
//! let field = prepare_stress_field(&grid, None).unwrap();
//!
//! let result = partition(&field, &[0.0, 50.0, 120.0, 250.0]).unwrap();
//!
//! let mut registry = RegionMeshRegistry::create("regions", SurfaceFormat::Stl).unwrap();
//! for info in registry.register_all(result.regions).unwrap() {
//!     println!("{} [{}, {}] -> {}", info.mesh_id, info.stress_min, info.stress_max,
//!         info.file_path.display());
//! }
//! ```
//!
//! ## Volume fractions
//!
//! ```no_run
//! use stress_regions::{compute_volume_fractions, load_grid};
//!
//! let grid = load_grid("bracket.json".as_ref()).unwrap();
//! let table = compute_volume_fractions(&grid, "von_mises", 0.0, 250.0, 20).unwrap();
//! for i in 0..table.num_divisions() {
//!     let (lo, hi) = table.bin_range(i).unwrap();
//!     println!("{lo:>8.1} - {hi:>8.1}: {:5.1}%", table.fractions[i] * 100.0);
//! }
//! ```
//!
//! ## Whole run from a config file
//!
//! ```no_run
//! use stress_regions::{SegmentationConfig, SegmentationPipeline};
//!
//! let config = SegmentationConfig::from_toml_file("segmentation.toml").unwrap();
//! let report = SegmentationPipeline::new(config)
//!     .run_file("bracket.json".as_ref())
//!     .unwrap();
//! println!("{} regions", report.meshes.len());
//! ```

mod error;
mod pipeline;
pub mod tracing_ext;
mod types;

pub mod band;
pub mod cleanup;
pub mod config;
pub mod density;
pub mod field;
pub mod fraction;
pub mod grid;
pub mod io;
pub mod partition;
pub mod registry;
pub mod volume;

// Re-export core types at crate root
pub use error::{ErrorCode, RecoverySuggestion, StressError, StressResult};
pub use grid::{Cell, CellType, GridStats, ScalarField, VolumetricGrid};
pub use types::{RegionMesh, SurfaceMesh, Triangle};

pub use band::{StressBand, bands_from_thresholds};
pub use cleanup::{CleanupParams, CleanupStats, cleanup_surface};
pub use config::SegmentationConfig;
pub use density::{DensityAssignment, InfillDensityConfig, assign_densities};
pub use field::{FieldSelection, StressField, prepare_stress_field};
pub use fraction::{VolumeFractionTable, compute_volume_fractions};
pub use io::{SurfaceFormat, load_grid, save_grid, save_surface};
pub use partition::{
    BandOutcome, BandStatus, PartitionParams, PartitionResult, partition, partition_with_params,
};
pub use pipeline::{SegmentationPipeline, SegmentationReport};
pub use registry::{MeshInfo, RegionMeshRegistry};

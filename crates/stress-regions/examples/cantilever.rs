//! Example: Infill regions for a loaded cantilever
//!
//! Builds a hexahedral cantilever beam with an analytic bending stress
//! (highest at the clamped root, zero at the free tip), segments it into
//! stress bands and prints the volume distribution and per-region infill.
//!
//! Run with: `cargo run --example cantilever -p stress-regions`

use nalgebra::Point3;
use stress_regions::{Cell, SegmentationConfig, SegmentationPipeline, VolumetricGrid};

/// Beam dimensions in mm and elements per axis.
struct Beam {
    length: f64,
    height: f64,
    width: f64,
    nx: u32,
    ny: u32,
    nz: u32,
}

impl Beam {
    fn grid(&self, tip_load: f64) -> VolumetricGrid {
        let node = |i: u32, j: u32, k: u32| i + (self.nx + 1) * (j + (self.ny + 1) * k);
        let (dx, dy, dz) = (
            self.length / self.nx as f64,
            self.width / self.ny as f64,
            self.height / self.nz as f64,
        );

        let mut points = Vec::new();
        for k in 0..=self.nz {
            for j in 0..=self.ny {
                for i in 0..=self.nx {
                    points.push(Point3::new(i as f64 * dx, j as f64 * dy, k as f64 * dz));
                }
            }
        }

        let mut cells = Vec::new();
        for k in 0..self.nz {
            for j in 0..self.ny {
                for i in 0..self.nx {
                    cells.push(Cell::hexahedron([
                        node(i, j, k),
                        node(i + 1, j, k),
                        node(i + 1, j + 1, k),
                        node(i, j + 1, k),
                        node(i, j, k + 1),
                        node(i + 1, j, k + 1),
                        node(i + 1, j + 1, k + 1),
                        node(i, j + 1, k + 1),
                    ]));
                }
            }
        }

        // sigma = M * c / I with M = F * (L - x), |c| = distance from the neutral axis
        let inertia = self.width * self.height.powi(3) / 12.0;
        let stress = points
            .iter()
            .map(|p| {
                let moment = tip_load * (self.length - p.x);
                (moment * (p.z - self.height / 2.0) / inertia).abs()
            })
            .collect();

        VolumetricGrid::new(points, cells)
            .with_point_field("von_mises", stress)
            .expect("one stress value per node")
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("stress_regions=info")
        .init();

    let beam = Beam {
        length: 120.0,
        height: 12.0,
        width: 10.0,
        nx: 24,
        ny: 4,
        nz: 6,
    };
    let grid = beam.grid(40.0);

    let out_dir = std::env::temp_dir().join("stress-regions-cantilever");
    let mut config = SegmentationConfig::with_thresholds(vec![0.0, 4.0, 8.0, 12.0, 16.0, 20.0]);
    config.output_dir = out_dir.clone();
    config.num_divisions = 10;

    let report = match SegmentationPipeline::new(config).run(&grid) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Segmentation failed [{}]: {}", e.code(), e);
            eprintln!("  {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    println!(
        "Stress '{}' in [{:.1}, {:.1}] MPa over {} cells",
        report.stress_label, report.stress_min, report.stress_max, report.grid.cell_count
    );

    println!("\nVolume distribution:");
    for i in 0..report.fractions.num_divisions() {
        if let Some((lo, hi)) = report.fractions.bin_range(i) {
            let pct = report.fractions.fractions[i] * 100.0;
            println!("  {lo:7.1} - {hi:7.1}  {pct:5.1}%  {}", "#".repeat(pct.round() as usize / 2));
        }
    }

    println!("\nRegions in {}:", out_dir.display());
    for (mesh, density) in report.meshes.iter().zip(&report.densities) {
        println!(
            "  mesh {} [{:6.1}, {:6.1}] -> infill {:5.1}%  {}",
            mesh.mesh_id,
            mesh.stress_min,
            mesh.stress_max,
            density.density,
            mesh.file_path.display()
        );
    }
}

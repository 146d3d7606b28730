//! End-to-end integration tests for stress-regions.
//!
//! These exercise grid -> field -> partition/fractions -> registry together,
//! on small structured hexahedral blocks with known stress layouts.

use approx::assert_relative_eq;
use nalgebra::Point3;
use stress_regions::io::load_stl;
use stress_regions::{
    Cell, CellType, RegionMeshRegistry, SegmentationConfig, SegmentationPipeline, StressBand,
    StressError, SurfaceFormat, VolumetricGrid, compute_volume_fractions, load_grid, partition,
    prepare_stress_field, save_grid,
};
use tempfile::TempDir;

/// An `nx * ny * nz` block of unit hexahedra with stress given per node.
fn hex_block(nx: u32, ny: u32, nz: u32, stress: impl Fn(&Point3<f64>) -> f64) -> VolumetricGrid {
    let node = |i: u32, j: u32, k: u32| i + (nx + 1) * (j + (ny + 1) * k);

    let mut points = Vec::new();
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                points.push(Point3::new(i as f64, j as f64, k as f64));
            }
        }
    }

    let mut cells = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
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

    let values = points.iter().map(&stress).collect();
    VolumetricGrid::new(points, cells)
        .with_point_field("von_mises", values)
        .unwrap()
}

/// Disjoint unit-corner tetrahedra, one per value, each with uniform node stress.
fn tetra_cloud(values: &[f64]) -> VolumetricGrid {
    let mut points = Vec::new();
    let mut cells = Vec::new();
    let mut stress = Vec::new();
    for (i, &value) in values.iter().enumerate() {
        let x = 3.0 * i as f64;
        let base = points.len() as u32;
        points.push(Point3::new(x, 0.0, 0.0));
        points.push(Point3::new(x + 1.0, 0.0, 0.0));
        points.push(Point3::new(x, 1.0, 0.0));
        points.push(Point3::new(x, 0.0, 1.0));
        cells.push(Cell::tetra([base, base + 1, base + 2, base + 3]));
        stress.extend([value; 4]);
    }
    VolumetricGrid::new(points, cells)
        .with_point_field("stress", stress)
        .unwrap()
}

// =============================================================================
// Partitioning
// =============================================================================

#[test]
fn test_three_bands_over_full_range() {
    // Stress 10 * x over a 3x1x1 block: cell means 5, 15, 25.
    let grid = hex_block(3, 1, 1, |p| 10.0 * p.x);
    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 10.0, 20.0, 30.0]).unwrap();

    assert_eq!(result.regions.len(), 3);
    let bands: Vec<StressBand> = result.regions.iter().map(|r| r.band).collect();
    assert_eq!(
        bands,
        vec![
            StressBand::half_open(0.0, 10.0),
            StressBand::half_open(10.0, 20.0),
            StressBand::closed(20.0, 30.0),
        ]
    );
    for region in &result.regions {
        assert_eq!(region.cell_count, 1);
        assert_relative_eq!(region.mesh.signed_volume(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_low_stress_grid_yields_single_region() {
    // All stress below 10.
    let grid = hex_block(3, 2, 1, |p| p.x + p.y);
    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 10.0, 20.0, 30.0]).unwrap();

    assert_eq!(result.regions.len(), 1);
    assert_eq!(result.regions[0].mesh_id, 0);
    assert_eq!(result.regions[0].band, StressBand::half_open(0.0, 10.0));
    assert_eq!(result.regions[0].cell_count, 6);
    assert_relative_eq!(result.regions[0].mesh.signed_volume(), 6.0, epsilon = 1e-9);
    assert_eq!(result.empty_bands(), 2);
}

#[test]
fn test_boundary_ties() {
    let grid = tetra_cloud(&[0.0, 10.0, 20.0, 30.0]);
    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 10.0, 20.0, 30.0]).unwrap();

    // 0 -> band 0; 10 -> band 1; 20 and 30 -> closed last band.
    let counts: Vec<(usize, usize)> = result
        .regions
        .iter()
        .map(|r| (r.band_index, r.cell_count))
        .collect();
    assert_eq!(counts, vec![(0, 1), (1, 1), (2, 2)]);
}

#[test]
fn test_values_outside_thresholds_join_no_band() {
    let grid = tetra_cloud(&[-5.0, 5.0, 35.0]);
    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 10.0, 30.0]).unwrap();

    assert_eq!(result.regions.len(), 1);
    assert_eq!(result.regions[0].cell_count, 1);
}

#[test]
fn test_far_from_origin_tetra_partitions() {
    let mut grid = tetra_cloud(&[5.0]);
    for point in &mut grid.points {
        point.x += 1e11;
    }
    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 10.0]).unwrap();

    assert_eq!(result.regions.len(), 1);
    assert_eq!(result.regions[0].mesh.face_count(), 4);
    assert_eq!(result.regions[0].mesh.vertex_count(), 4);
}

#[test]
fn test_region_volumes_match_cell_volumes() {
    let grid = hex_block(4, 3, 2, |p| 3.0 * p.x + p.y * p.z);
    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 4.0, 9.0, 20.0]).unwrap();

    let assigned: usize = result.regions.iter().map(|r| r.cell_count).sum();
    let volume: f64 = result.regions.iter().map(|r| r.mesh.signed_volume()).sum();
    assert_eq!(assigned, grid.cell_count());
    assert_relative_eq!(volume, grid.cell_count() as f64, epsilon = 1e-9);
}

#[test]
fn test_unsupported_only_grid() {
    let mut grid = tetra_cloud(&[1.0, 2.0, 3.0]);
    for cell in &mut grid.cells {
        cell.cell_type = CellType::Other(14);
    }

    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 10.0]).unwrap();
    assert!(result.regions.is_empty());
    assert_eq!(result.skipped_cells, 3);

    let table = compute_volume_fractions(&grid, "stress", 0.0, 10.0, 20).unwrap();
    assert!(table.fractions.iter().all(|&f| f == 0.0));
    assert_eq!(table.skipped_cells, grid.cell_count());
}

#[test]
fn test_quadratic_tetra_uses_all_nodes_for_value() {
    // Corners at stress 0, mid-edge nodes at 10: mean is 6.
    let mut points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ];
    let edges = [(0, 1), (1, 2), (2, 0), (0, 3), (1, 3), (2, 3)];
    for (a, b) in edges {
        points.push(Point3::from((points[a].coords + points[b].coords) / 2.0));
    }
    let mut values = vec![0.0; 4];
    values.extend([10.0; 6]);
    let grid = VolumetricGrid::new(
        points,
        vec![Cell::new(CellType::QuadraticTetra, (0..10).collect())],
    )
    .with_point_field("stress", values)
    .unwrap();

    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 5.0, 10.0]).unwrap();
    assert_eq!(result.regions.len(), 1);
    assert_eq!(result.regions[0].band_index, 1);
    assert_eq!(result.regions[0].mesh.face_count(), 4);

    let table = compute_volume_fractions(&grid, "stress", 0.0, 10.0, 2).unwrap();
    assert_eq!(table.fractions, vec![0.0, 1.0]);
    assert_relative_eq!(table.total_volume, 1.0 / 6.0, epsilon = 1e-12);
}

// =============================================================================
// Volume fractions
// =============================================================================

#[test]
fn test_fractions_of_graded_block() {
    let grid = hex_block(4, 1, 1, |p| 25.0 * p.x);
    // Cell means 12.5, 37.5, 62.5, 87.5.
    let table = compute_volume_fractions(&grid, "von_mises", 0.0, 100.0, 4).unwrap();
    for fraction in &table.fractions {
        assert_relative_eq!(*fraction, 0.25, epsilon = 1e-12);
    }
    assert_relative_eq!(table.total_volume, 4.0, epsilon = 1e-12);
    assert_relative_eq!(table.sum(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_fractions_missing_label() {
    let grid = hex_block(1, 1, 1, |_| 1.0);
    let err = compute_volume_fractions(&grid, "S11", 0.0, 1.0, 4).unwrap_err();
    assert!(matches!(err, StressError::DataUnavailable { .. }));
}

// =============================================================================
// Registry and pipeline
// =============================================================================

#[test]
fn test_registry_round_trip() {
    let dir = TempDir::new().unwrap();
    let grid = hex_block(3, 1, 1, |p| 10.0 * p.x);
    let field = prepare_stress_field(&grid, None).unwrap();
    let result = partition(&field, &[0.0, 10.0, 20.0, 30.0]).unwrap();

    let mut registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Stl).unwrap();
    let infos = registry.register_all(result.regions).unwrap().to_vec();
    assert_eq!(infos.len(), 3);

    let reopened = RegionMeshRegistry::open_existing(dir.path()).unwrap();
    assert_eq!(reopened.entries(), infos.as_slice());
    for info in &infos {
        let surface = load_stl(&info.file_path).unwrap();
        assert_eq!(surface.face_count(), 12);
        assert_eq!(reopened.get(info.mesh_id), Some(info));
    }
    assert_eq!(infos[1].stress_min, 10.0);
    assert_eq!(infos[1].stress_max, 20.0);
}

#[test]
fn test_rerun_with_fewer_bands_clears_stale_files() {
    let dir = TempDir::new().unwrap();
    let grid = hex_block(3, 1, 1, |p| 10.0 * p.x);

    let mut config = SegmentationConfig::with_thresholds(vec![0.0, 10.0, 20.0, 30.0]);
    config.output_dir = dir.path().to_path_buf();
    let first = SegmentationPipeline::new(config.clone()).run(&grid).unwrap();
    assert_eq!(first.meshes.len(), 3);

    config.thresholds = vec![0.0, 30.0];
    let second = SegmentationPipeline::new(config).run(&grid).unwrap();
    assert_eq!(second.meshes.len(), 1);
    assert!(dir.path().join("region_0000.stl").exists());
    assert!(!dir.path().join("region_0001.stl").exists());
    assert!(!dir.path().join("region_0002.stl").exists());
}

#[test]
fn test_pipeline_from_grid_file() {
    let dir = TempDir::new().unwrap();
    let grid_path = dir.path().join("grid.json");
    save_grid(&hex_block(2, 2, 2, |p| p.x + p.y + p.z), &grid_path).unwrap();
    let grid = load_grid(&grid_path).unwrap();
    assert_eq!(grid.cell_count(), 8);

    let mut config = SegmentationConfig::with_thresholds(vec![0.0, 3.0, 6.0]);
    config.output_dir = dir.path().join("out");
    config.format = SurfaceFormat::Obj;
    let report = SegmentationPipeline::new(config)
        .sequential(true)
        .run_file(&grid_path)
        .unwrap();

    // Cell means are 1.5 + i + j + k: 1.5, 2.5 (x3), 3.5 (x3), 4.5.
    assert_eq!(report.meshes.len(), 2);
    assert!(report.meshes[0].file_path.ends_with("region_0000.obj"));
    assert_relative_eq!(report.fractions.sum(), 1.0, epsilon = 1e-12);
    assert_eq!(report.grid.hexahedron, 8);
}

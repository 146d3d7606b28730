//! End-to-end tests of the stressmap binary.

use std::path::Path;
use std::process::{Command, Output};

use stress_regions::{Cell, VolumetricGrid, save_grid};
use tempfile::TempDir;

fn stressmap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stressmap"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run stressmap")
}

/// Three unit tetrahedra with uniform stresses 5, 15 and 25.
fn write_grid(dir: &Path) -> String {
    let mut points = Vec::new();
    let mut cells = Vec::new();
    let mut values = Vec::new();
    for (i, stress) in [5.0, 15.0, 25.0].into_iter().enumerate() {
        let x = 2.0 * i as f64;
        let base = points.len() as u32;
        points.push(nalgebra::Point3::new(x, 0.0, 0.0));
        points.push(nalgebra::Point3::new(x + 1.0, 0.0, 0.0));
        points.push(nalgebra::Point3::new(x, 1.0, 0.0));
        points.push(nalgebra::Point3::new(x, 0.0, 1.0));
        cells.push(Cell::tetra([base, base + 1, base + 2, base + 3]));
        values.extend([stress; 4]);
    }
    let grid = VolumetricGrid::new(points, cells)
        .with_point_field("von_mises", values)
        .unwrap();

    let path = dir.join("grid.json");
    save_grid(&grid, &path).unwrap();
    path.display().to_string()
}

#[test]
fn test_info_json() {
    let dir = TempDir::new().unwrap();
    let grid = write_grid(dir.path());

    let out = stressmap(&["info", &grid, "--format", "json"]);
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["cell_count"], 3);
    assert_eq!(json["stress"]["label"], "von_mises");
    assert_eq!(json["stress"]["max"], 25.0);
}

#[test]
fn test_partition_writes_registry() {
    let dir = TempDir::new().unwrap();
    let grid = write_grid(dir.path());
    let out_dir = dir.path().join("regions");

    let out = stressmap(&[
        "partition",
        &grid,
        "--thresholds",
        "0,10,20",
        "-o",
        out_dir.to_str().unwrap(),
        "--format",
        "json",
    ]);
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["meshes"].as_array().unwrap().len(), 2);
    assert_eq!(json["meshes"][1]["meshID"], 1);
    assert!(out_dir.join("regions.json").is_file());
    assert!(out_dir.join("region_0001.stl").is_file());
}

#[test]
fn test_single_threshold_fails() {
    let dir = TempDir::new().unwrap();
    let grid = write_grid(dir.path());

    let out = stressmap(&["partition", &grid, "--thresholds", "10", "-o", "unused"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("STRESS-3001"));
}

#[test]
fn test_partition_reports_distinct_band_count() {
    let dir = TempDir::new().unwrap();
    let grid = write_grid(dir.path());
    let out_dir = dir.path().join("regions");

    let out = stressmap(&[
        "partition",
        &grid,
        "--thresholds",
        "0,10,10,20",
        "-o",
        out_dir.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("into 2 bands"));
}

#[test]
fn test_invalid_weld_tolerance_rejected() {
    let dir = TempDir::new().unwrap();
    let grid = write_grid(dir.path());
    let out_dir = dir.path().join("regions");

    for tolerance in ["--weld-tolerance=NaN", "--weld-tolerance=inf", "--weld-tolerance=-1"] {
        let args = [
            "partition",
            grid.as_str(),
            "--thresholds",
            "0,10,20",
            "-o",
            out_dir.to_str().unwrap(),
            tolerance,
        ];

        let out = stressmap(&args);
        assert!(!out.status.success());
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("STRESS-3001"));
        assert!(!out_dir.exists());
    }
}

//! Per-cell volume and representative value.
//!
//! Quadratic cells are measured by their corner nodes only; mid-edge nodes
//! affect the representative value but not the volume.

use nalgebra::Point3;

use crate::grid::{Cell, CellType, VolumetricGrid};

/// Fixed split of a VTK-ordered hexahedron into five tetrahedra: four corner
/// tetrahedra at nodes 0, 2, 5, 7 and the central one.
pub const HEX_TETRA_SPLIT: [[usize; 4]; 5] = [
    [0, 1, 3, 4],
    [1, 2, 3, 6],
    [1, 4, 5, 6],
    [3, 4, 6, 7],
    [1, 3, 4, 6],
];

/// Unsigned volume of the tetrahedron spanned by four points.
#[inline]
pub fn tetra_volume(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    ((b - a).dot(&(c - a).cross(&(d - a))) / 6.0).abs()
}

/// Volume of a cell, or None for unsupported cell types.
///
/// Assumes the grid passed [`VolumetricGrid::validate`].
pub fn cell_volume(grid: &VolumetricGrid, cell: &Cell) -> Option<f64> {
    let corners = cell.corners()?;
    let p = |i: usize| &grid.points[corners[i] as usize];

    match cell.cell_type {
        CellType::Tetra | CellType::QuadraticTetra => Some(tetra_volume(p(0), p(1), p(2), p(3))),
        CellType::Hexahedron | CellType::QuadraticHexahedron => Some(
            HEX_TETRA_SPLIT
                .iter()
                .map(|&[a, b, c, d]| tetra_volume(p(a), p(b), p(c), p(d)))
                .sum(),
        ),
        CellType::Other(_) => None,
    }
}

/// Arithmetic mean of the field values at all of a cell's nodes.
///
/// Returns None for a cell without nodes.
pub fn representative_value(values: &[f64], cell: &Cell) -> Option<f64> {
    if cell.nodes.is_empty() {
        return None;
    }
    let sum: f64 = cell.nodes.iter().map(|&n| values[n as usize]).sum();
    Some(sum / cell.nodes.len() as f64)
}

/// Centroid of a cell's corner nodes.
pub fn cell_centroid(grid: &VolumetricGrid, cell: &Cell) -> Option<Point3<f64>> {
    let corners = cell.corners()?;
    let sum = corners
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, &n| {
            acc + grid.points[n as usize].coords
        });
    Some(Point3::from(sum / corners.len() as f64))
}

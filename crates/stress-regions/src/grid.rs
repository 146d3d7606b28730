//! Unstructured volumetric grid with named point-scalar arrays.
//!
//! Cells use VTK connectivity ordering and cell-type codes so that grids
//! exported by common FEA post-processors can be mapped without reordering:
//!
//! | Cell type             | VTK code | Nodes | Corner nodes |
//! |-----------------------|----------|-------|--------------|
//! | Linear tetrahedron    | 10       | 4     | 0..4         |
//! | Quadratic tetrahedron | 24       | 10    | 0..4         |
//! | Linear hexahedron     | 12       | 8     | 0..8         |
//! | Quadratic hexahedron  | 25       | 20    | 0..8         |
//!
//! Any other code is kept as [`CellType::Other`]. Such cells are valid grid
//! members but contribute no volume and never join a region.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{StressError, StressResult};

/// Cell type of a volumetric cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum CellType {
    /// 4-node tetrahedron.
    Tetra,
    /// 10-node tetrahedron (corners first, then mid-edge nodes).
    QuadraticTetra,
    /// 8-node hexahedron (bottom face 0..4, top face 4..8).
    Hexahedron,
    /// 20-node hexahedron (corners first, then mid-edge nodes).
    QuadraticHexahedron,
    /// Any other cell, carried by its VTK code.
    Other(u8),
}

impl CellType {
    /// Map a VTK cell-type code.
    pub fn from_vtk_code(code: u8) -> Self {
        match code {
            10 => CellType::Tetra,
            24 => CellType::QuadraticTetra,
            12 => CellType::Hexahedron,
            25 => CellType::QuadraticHexahedron,
            other => CellType::Other(other),
        }
    }

    /// The VTK cell-type code.
    pub fn vtk_code(&self) -> u8 {
        match self {
            CellType::Tetra => 10,
            CellType::QuadraticTetra => 24,
            CellType::Hexahedron => 12,
            CellType::QuadraticHexahedron => 25,
            CellType::Other(code) => *code,
        }
    }

    /// Whether the cell contributes volume and can join a region.
    #[inline]
    pub fn is_supported(&self) -> bool {
        !matches!(self, CellType::Other(_))
    }

    /// Exact node count for supported types.
    pub fn node_count(&self) -> Option<usize> {
        match self {
            CellType::Tetra => Some(4),
            CellType::QuadraticTetra => Some(10),
            CellType::Hexahedron => Some(8),
            CellType::QuadraticHexahedron => Some(20),
            CellType::Other(_) => None,
        }
    }

    /// Number of leading corner nodes that define the cell geometry.
    pub fn corner_count(&self) -> Option<usize> {
        match self {
            CellType::Tetra | CellType::QuadraticTetra => Some(4),
            CellType::Hexahedron | CellType::QuadraticHexahedron => Some(8),
            CellType::Other(_) => None,
        }
    }

    /// Short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            CellType::Tetra => "tetra",
            CellType::QuadraticTetra => "quadratic_tetra",
            CellType::Hexahedron => "hexahedron",
            CellType::QuadraticHexahedron => "quadratic_hexahedron",
            CellType::Other(_) => "other",
        }
    }
}

impl From<u8> for CellType {
    fn from(code: u8) -> Self {
        CellType::from_vtk_code(code)
    }
}

impl From<CellType> for u8 {
    fn from(cell_type: CellType) -> Self {
        cell_type.vtk_code()
    }
}

/// A single volumetric cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell type.
    #[serde(rename = "type")]
    pub cell_type: CellType,

    /// Node indices into the grid's point array, in VTK order.
    pub nodes: Vec<u32>,
}

impl Cell {
    /// Create a new cell.
    pub fn new(cell_type: CellType, nodes: Vec<u32>) -> Self {
        Self { cell_type, nodes }
    }

    /// Linear tetrahedron from four corner nodes.
    pub fn tetra(nodes: [u32; 4]) -> Self {
        Self::new(CellType::Tetra, nodes.to_vec())
    }

    /// Linear hexahedron from eight corner nodes.
    pub fn hexahedron(nodes: [u32; 8]) -> Self {
        Self::new(CellType::Hexahedron, nodes.to_vec())
    }

    /// Corner nodes for supported types, None otherwise.
    pub fn corners(&self) -> Option<&[u32]> {
        let count = self.cell_type.corner_count()?;
        self.nodes.get(..count)
    }
}

/// A named array with one scalar per grid node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    pub name: String,
    pub values: Vec<f64>,
}

impl ScalarField {
    /// Create a named field.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Min and max over finite values, None if there are none.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// An unstructured mesh of 3D cells with named point-scalar arrays.
///
/// Read-only for the segmentation engine; all operations take `&VolumetricGrid`
/// and can share it across threads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumetricGrid {
    /// Node positions.
    pub points: Vec<Point3<f64>>,

    /// Cells referencing nodes by index.
    pub cells: Vec<Cell>,

    /// Named point-scalar arrays, in the order they were added.
    #[serde(default)]
    pub point_data: Vec<ScalarField>,
}

impl VolumetricGrid {
    /// Create a grid from nodes and cells with no point data.
    pub fn new(points: Vec<Point3<f64>>, cells: Vec<Cell>) -> Self {
        Self {
            points,
            cells,
            point_data: Vec::new(),
        }
    }

    /// Add a point-scalar array.
    ///
    /// Fails with `InvalidGrid` if the length differs from the node count or
    /// the name is already taken.
    pub fn add_point_field(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> StressResult<()> {
        let name = name.into();
        if values.len() != self.points.len() {
            return Err(StressError::invalid_grid(format!(
                "field '{}' has {} values but grid has {} nodes",
                name,
                values.len(),
                self.points.len()
            )));
        }
        if self.field(&name).is_some() {
            return Err(StressError::invalid_grid(format!(
                "field '{}' already exists",
                name
            )));
        }
        self.point_data.push(ScalarField::new(name, values));
        Ok(())
    }

    /// Builder-style variant of [`VolumetricGrid::add_point_field`].
    pub fn with_point_field(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> StressResult<Self> {
        self.add_point_field(name, values)?;
        Ok(self)
    }

    /// Number of nodes.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Check if the grid has no nodes or no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() || self.cells.is_empty()
    }

    /// Look up a point-scalar array by exact name.
    pub fn field(&self, name: &str) -> Option<&ScalarField> {
        self.point_data.iter().find(|f| f.name == name)
    }

    /// Names of all point-scalar arrays.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.point_data.iter().map(|f| f.name.as_str())
    }

    /// Check structural invariants.
    ///
    /// - node coordinates are finite
    /// - every cell references existing nodes
    /// - supported cell types carry their exact node count
    /// - every point array has one value per node
    pub fn validate(&self) -> StressResult<()> {
        for (idx, p) in self.points.iter().enumerate() {
            if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                return Err(StressError::invalid_grid(format!(
                    "node {} has a non-finite coordinate",
                    idx
                )));
            }
        }

        let point_count = self.points.len();
        for (cell_idx, cell) in self.cells.iter().enumerate() {
            if let Some(expected) = cell.cell_type.node_count() {
                if cell.nodes.len() != expected {
                    return Err(StressError::invalid_grid(format!(
                        "cell {} ({}) has {} nodes, expected {}",
                        cell_idx,
                        cell.cell_type.name(),
                        cell.nodes.len(),
                        expected
                    )));
                }
            }
            if let Some(&bad) = cell.nodes.iter().find(|&&n| n as usize >= point_count) {
                return Err(StressError::invalid_grid(format!(
                    "cell {} references node {}, but grid only has {} nodes",
                    cell_idx, bad, point_count
                )));
            }
        }

        for field in &self.point_data {
            if field.values.len() != point_count {
                return Err(StressError::invalid_grid(format!(
                    "field '{}' has {} values but grid has {} nodes",
                    field.name,
                    field.values.len(),
                    point_count
                )));
            }
        }

        Ok(())
    }

    /// Axis-aligned bounds of all nodes.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.points.first()?;
        Some(self.points[1..].iter().fold((*first, *first), |(lo, hi), p| {
            (
                Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        }))
    }

    /// Cell counts by type plus bounds.
    pub fn stats(&self) -> GridStats {
        let mut stats = GridStats {
            point_count: self.points.len(),
            cell_count: self.cells.len(),
            field_count: self.point_data.len(),
            bounds: self.bounds(),
            ..GridStats::default()
        };
        for cell in &self.cells {
            match cell.cell_type {
                CellType::Tetra => stats.tetra += 1,
                CellType::QuadraticTetra => stats.quadratic_tetra += 1,
                CellType::Hexahedron => stats.hexahedron += 1,
                CellType::QuadraticHexahedron => stats.quadratic_hexahedron += 1,
                CellType::Other(_) => stats.other += 1,
            }
        }
        stats
    }
}

/// Summary counts for a grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridStats {
    pub point_count: usize,
    pub cell_count: usize,
    pub field_count: usize,
    pub tetra: usize,
    pub quadratic_tetra: usize,
    pub hexahedron: usize,
    pub quadratic_hexahedron: usize,
    pub other: usize,
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,
}

impl GridStats {
    /// Number of cells with a supported type.
    pub fn supported_cells(&self) -> usize {
        self.tetra + self.quadratic_tetra + self.hexahedron + self.quadratic_hexahedron
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_tetra() -> VolumetricGrid {
        VolumetricGrid::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![Cell::tetra([0, 1, 2, 3])],
        )
    }

    #[test]
    fn test_vtk_code_mapping() {
        assert_eq!(CellType::from_vtk_code(10), CellType::Tetra);
        assert_eq!(CellType::from_vtk_code(24), CellType::QuadraticTetra);
        assert_eq!(CellType::from_vtk_code(12), CellType::Hexahedron);
        assert_eq!(CellType::from_vtk_code(25), CellType::QuadraticHexahedron);
        assert_eq!(CellType::from_vtk_code(13), CellType::Other(13));
        assert_eq!(CellType::Other(14).vtk_code(), 14);
        assert!(!CellType::Other(5).is_supported());
    }

    #[test]
    fn test_add_point_field_length_mismatch() {
        let mut grid = single_tetra();
        let err = grid.add_point_field("stress", vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StressError::InvalidGrid { .. }));

        grid.add_point_field("stress", vec![1.0; 4]).unwrap();
        let dup = grid.add_point_field("stress", vec![1.0; 4]).unwrap_err();
        assert!(matches!(dup, StressError::InvalidGrid { .. }));
    }

    #[test]
    fn test_validate_rejects_dangling_node() {
        let mut grid = single_tetra();
        grid.cells.push(Cell::tetra([0, 1, 2, 9]));
        let err = grid.validate().unwrap_err();
        assert!(err.to_string().contains("node 9"));
    }

    #[test]
    fn test_validate_rejects_wrong_node_count() {
        let mut grid = single_tetra();
        grid.cells.push(Cell::new(CellType::Hexahedron, vec![0, 1, 2, 3]));
        assert!(grid.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_other_cells_of_any_size() {
        let mut grid = single_tetra();
        grid.cells.push(Cell::new(CellType::Other(5), vec![0, 1, 2]));
        assert!(grid.validate().is_ok());
        assert_eq!(grid.stats().other, 1);
        assert_eq!(grid.stats().supported_cells(), 1);
    }

    #[test]
    fn test_finite_range_ignores_nan() {
        let field = ScalarField::new("s", vec![f64::NAN, 3.0, -1.0, f64::INFINITY]);
        assert_eq!(field.finite_range(), Some((-1.0, 3.0)));
        assert_eq!(ScalarField::new("e", vec![f64::NAN]).finite_range(), None);
    }

    #[test]
    fn test_serde_cell_type_as_code() {
        let cell = Cell::hexahedron([0, 1, 2, 3, 4, 5, 6, 7]);
        let json = serde_json::to_string(&cell).unwrap();
        assert!(json.contains("\"type\":12"));
        let back: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cell);
    }
}

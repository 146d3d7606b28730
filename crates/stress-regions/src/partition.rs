//! Threshold partitioning of a stress field into region meshes.
//!
//! Each band is extracted independently against the full grid:
//!
//! 1. select every supported cell whose representative value (mean of its
//!    node values) lies in the band
//! 2. collect the faces of the selected cells and keep those that belong to
//!    exactly one selected cell (the boundary of the selection)
//! 3. orient each boundary face away from its cell, triangulate quads
//! 4. run light-weight cleanup
//!
//! Bands run in parallel over the shared read-only grid. Mesh ids are
//! assigned afterwards in a single ordered pass, so they form a dense range
//! over non-empty bands in ascending band order whatever the scheduling.
//!
//! Quadratic cells contribute their corner faces only.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::band::{StressBand, bands_from_thresholds};
use crate::cleanup::{CleanupParams, CleanupStats, cleanup_surface};
use crate::error::{StressError, StressResult};
use crate::field::StressField;
use crate::grid::{Cell, CellType, VolumetricGrid};
use crate::tracing_ext::{OperationTimer, log_band_outcome};
use crate::types::{RegionMesh, SurfaceMesh};
use crate::volume::{cell_centroid, representative_value};

/// Local corner indices of tetrahedron faces.
const TETRA_FACES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [1, 2, 3], [0, 2, 3]];

/// Local corner indices of hexahedron faces, each in cyclic order.
const HEX_FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// Parameters for [`partition_with_params`].
#[derive(Debug, Clone, Default)]
pub struct PartitionParams {
    /// Cleanup applied to each band surface.
    pub cleanup: CleanupParams,

    /// Run bands sequentially instead of on the rayon pool.
    pub sequential: bool,
}

/// What happened to one band.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BandStatus {
    /// The band produced a region mesh with this id.
    Emitted { mesh_id: usize },
    /// No cells, or no triangles after cleanup.
    Empty,
    /// Extraction failed; the band was skipped.
    Failed { reason: String },
}

/// Per-band diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandOutcome {
    pub band_index: usize,
    pub band: StressBand,
    pub cell_count: usize,
    pub face_count: usize,
    pub status: BandStatus,
}

/// Result of partitioning a stress field.
#[derive(Debug, Clone)]
pub struct PartitionResult {
    /// One region mesh per non-empty band, ascending band order, ids `0..k`.
    pub regions: Vec<RegionMesh>,

    /// All bands derived from the thresholds.
    pub bands: Vec<StressBand>,

    /// Diagnostics for every band, including empty and failed ones.
    pub outcomes: Vec<BandOutcome>,

    /// Cells of unsupported type, never assigned to any band.
    pub skipped_cells: usize,

    /// Supported cells whose representative value is not finite.
    pub non_finite_cells: usize,
}

impl PartitionResult {
    /// Number of bands that produced no region mesh.
    pub fn empty_bands(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == BandStatus::Empty)
            .count()
    }

    /// Number of bands skipped after an extraction failure.
    pub fn failed_bands(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BandStatus::Failed { .. }))
            .count()
    }
}

/// Partition a stress field by thresholds with default parameters.
///
/// Fails with `InvalidConfiguration` if fewer than two distinct thresholds
/// remain after deduplication. Band-local extraction failures are logged and
/// the band is treated as empty.
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use stress_regions::{Cell, VolumetricGrid, partition, prepare_stress_field};
///
/// let grid = VolumetricGrid::new(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(0.0, 0.0, 1.0),
///     ],
///     vec![Cell::tetra([0, 1, 2, 3])],
/// )
/// .with_point_field("stress", vec![1.0, 2.0, 3.0, 4.0])
/// .unwrap();
///
/// let field = prepare_stress_field(&grid, None).unwrap();
/// let result = partition(&field, &[0.0, 2.0, 10.0]).unwrap();
///
/// // Mean stress 2.5 lands in the second band, which becomes mesh 0.
/// assert_eq!(result.regions.len(), 1);
/// assert_eq!(result.regions[0].mesh_id, 0);
/// assert_eq!(result.regions[0].band_index, 1);
/// assert_eq!(result.regions[0].mesh.face_count(), 4);
/// ```
pub fn partition(field: &StressField<'_>, thresholds: &[f64]) -> StressResult<PartitionResult> {
    partition_with_params(field, thresholds, &PartitionParams::default())
}

/// Partition a stress field by thresholds.
pub fn partition_with_params(
    field: &StressField<'_>,
    thresholds: &[f64],
    params: &PartitionParams,
) -> StressResult<PartitionResult> {
    let bands = bands_from_thresholds(thresholds)?;
    let grid = field.grid();
    let _timer = OperationTimer::with_context("partition", grid.cell_count(), bands.len());

    let cell_values = classify_cells(grid, field.values());
    let skipped_cells = grid
        .cells
        .iter()
        .filter(|c| !c.cell_type.is_supported())
        .count();
    let non_finite_cells = grid
        .cells
        .iter()
        .zip(&cell_values)
        .filter(|(c, v)| c.cell_type.is_supported() && v.is_none())
        .count();

    if skipped_cells > 0 {
        info!(
            skipped_cells,
            "Cells of unsupported type do not join any region"
        );
    }

    let extract = |(band_index, band): (usize, &StressBand)| {
        extract_band(grid, &cell_values, band_index, band, &params.cleanup)
    };
    let extracted: Vec<StressResult<BandSurface>> = if params.sequential {
        bands.iter().enumerate().map(extract).collect()
    } else {
        bands.par_iter().enumerate().map(extract).collect()
    };

    // Ordered id assignment over completed results.
    let mut regions = Vec::new();
    let mut outcomes = Vec::with_capacity(bands.len());
    for (band_index, (band, result)) in bands.iter().zip(extracted).enumerate() {
        let outcome = match result {
            Ok(surface) if !surface.mesh.is_empty() => {
                let mesh_id = regions.len();
                let outcome = BandOutcome {
                    band_index,
                    band: *band,
                    cell_count: surface.cell_count,
                    face_count: surface.mesh.face_count(),
                    status: BandStatus::Emitted { mesh_id },
                };
                regions.push(RegionMesh {
                    mesh_id,
                    band_index,
                    band: *band,
                    cell_count: surface.cell_count,
                    mesh: surface.mesh,
                });
                outcome
            }
            Ok(surface) => BandOutcome {
                band_index,
                band: *band,
                cell_count: surface.cell_count,
                face_count: 0,
                status: BandStatus::Empty,
            },
            Err(err) if !err.is_fatal() => {
                warn!(band_index, band = %band, error = %err, "Skipping band after extraction failure");
                BandOutcome {
                    band_index,
                    band: *band,
                    cell_count: 0,
                    face_count: 0,
                    status: BandStatus::Failed {
                        reason: err.to_string(),
                    },
                }
            }
            Err(err) => return Err(err),
        };
        log_band_outcome(&outcome);
        outcomes.push(outcome);
    }

    info!(
        bands = bands.len(),
        regions = regions.len(),
        "Partitioned stress field"
    );

    Ok(PartitionResult {
        regions,
        bands,
        outcomes,
        skipped_cells,
        non_finite_cells,
    })
}

/// Representative value per cell; None for unsupported cells and non-finite means.
fn classify_cells(grid: &VolumetricGrid, values: &[f64]) -> Vec<Option<f64>> {
    grid.cells
        .par_iter()
        .map(|cell| {
            if !cell.cell_type.is_supported() {
                return None;
            }
            representative_value(values, cell).filter(|v| v.is_finite())
        })
        .collect()
}

struct BandSurface {
    cell_count: usize,
    mesh: SurfaceMesh,
}

fn extract_band(
    grid: &VolumetricGrid,
    cell_values: &[Option<f64>],
    band_index: usize,
    band: &StressBand,
    cleanup: &CleanupParams,
) -> StressResult<BandSurface> {
    let selected: Vec<usize> = cell_values
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| value.filter(|v| band.contains(*v)).map(|_| idx))
        .collect();

    if selected.is_empty() {
        return Ok(BandSurface {
            cell_count: 0,
            mesh: SurfaceMesh::new(),
        });
    }

    let mut mesh = boundary_surface(grid, &selected)
        .map_err(|details| StressError::extraction_failed(band_index, details))?;
    let before = mesh.face_count();
    let stats: CleanupStats = cleanup_surface(&mut mesh, cleanup);

    debug!(
        band_index,
        cells = selected.len(),
        boundary_faces = before,
        faces = mesh.face_count(),
        welded = stats.vertices_welded,
        degenerates = stats.degenerates_removed,
        duplicates = stats.duplicates_removed,
        "Extracted band surface"
    );

    Ok(BandSurface {
        cell_count: selected.len(),
        mesh,
    })
}

/// Sorted node ids of a face; triangles are padded with `u32::MAX`.
type FaceKey = [u32; 4];

struct FaceRecord {
    nodes: [u32; 4],
    corners: usize,
    cell_centroid: Point3<f64>,
    count: usize,
}

fn face_key(nodes: &[u32]) -> FaceKey {
    let mut key = [u32::MAX; 4];
    key[..nodes.len()].copy_from_slice(nodes);
    key.sort_unstable();
    key
}

/// Outer faces of a cell selection as an oriented triangle surface.
///
/// Fails if a face is shared by more than two selected cells, which only
/// happens with overlapping cells.
fn boundary_surface(grid: &VolumetricGrid, selected: &[usize]) -> Result<SurfaceMesh, String> {
    // Insertion order keeps the output deterministic.
    let mut records: Vec<FaceRecord> = Vec::new();
    let mut lookup: HashMap<FaceKey, usize> = HashMap::new();

    for &cell_idx in selected {
        let cell = &grid.cells[cell_idx];
        let (Some(corners), Some(centroid)) = (cell.corners(), cell_centroid(grid, cell)) else {
            continue;
        };

        for_each_face(cell, corners, |nodes| {
            let key = face_key(nodes);
            match lookup.get(&key) {
                Some(&slot) => records[slot].count += 1,
                None => {
                    let mut padded = [u32::MAX; 4];
                    padded[..nodes.len()].copy_from_slice(nodes);
                    lookup.insert(key, records.len());
                    records.push(FaceRecord {
                        nodes: padded,
                        corners: nodes.len(),
                        cell_centroid: centroid,
                        count: 1,
                    });
                }
            }
        });
    }

    if let Some(record) = records.iter().find(|r| r.count > 2) {
        return Err(format!(
            "face {:?} is shared by {} selected cells",
            &record.nodes[..record.corners],
            record.count
        ));
    }

    let mut mesh = SurfaceMesh::new();
    let mut node_to_vertex: HashMap<u32, u32> = HashMap::new();
    let mut vertex_of = |node: u32, mesh: &mut SurfaceMesh| -> u32 {
        *node_to_vertex.entry(node).or_insert_with(|| {
            mesh.vertices.push(grid.points[node as usize]);
            (mesh.vertices.len() - 1) as u32
        })
    };

    for record in records.iter().filter(|r| r.count == 1) {
        let mut nodes = record.nodes;
        let ring = &mut nodes[..record.corners];
        if !faces_outward(grid, ring, &record.cell_centroid) {
            ring.reverse();
        }

        let v: Vec<u32> = ring.iter().map(|&n| vertex_of(n, &mut mesh)).collect();
        mesh.faces.push([v[0], v[1], v[2]]);
        if v.len() == 4 {
            mesh.faces.push([v[0], v[2], v[3]]);
        }
    }

    Ok(mesh)
}

fn for_each_face(cell: &Cell, corners: &[u32], mut visit: impl FnMut(&[u32])) {
    match cell.cell_type {
        CellType::Tetra | CellType::QuadraticTetra => {
            for face in TETRA_FACES {
                visit(&face.map(|i| corners[i]));
            }
        }
        CellType::Hexahedron | CellType::QuadraticHexahedron => {
            for face in HEX_FACES {
                visit(&face.map(|i| corners[i]));
            }
        }
        CellType::Other(_) => {}
    }
}

/// Whether the ring's right-hand normal points away from the cell centroid.
fn faces_outward(grid: &VolumetricGrid, ring: &[u32], cell_centroid: &Point3<f64>) -> bool {
    let p = |i: usize| grid.points[ring[i] as usize];
    let normal: Vector3<f64> = if ring.len() == 4 {
        (p(2) - p(0)).cross(&(p(3) - p(1)))
    } else {
        (p(1) - p(0)).cross(&(p(2) - p(0)))
    };
    let face_centroid =
        ring.iter().fold(Vector3::zeros(), |acc, &n| acc + grid.points[n as usize].coords)
            / ring.len() as f64;
    normal.dot(&(face_centroid - cell_centroid.coords)) >= 0.0
}

//! Light-weight surface cleanup for extracted region meshes.
//!
//! Region surfaces are used as slicer modifier shapes, which tolerate small
//! seams. Cleanup therefore only merges coincident points, drops zero-area
//! and coincident triangles, and compacts the vertex buffer. It does not try
//! to make the surface watertight.

use hashbrown::HashMap;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StressError, StressResult};
use crate::types::{SurfaceMesh, Triangle};

/// Cleanup tolerances, in model units.
///
/// # Example
///
/// ```
/// use stress_regions::CleanupParams;
///
/// let params = CleanupParams {
///     weld_epsilon: 1e-6,
///     ..Default::default()
/// };
/// assert!(params.remove_duplicate_faces);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupParams {
    /// Vertices closer than this are merged. `0.0` disables welding.
    ///
    /// Default: `1e-9`
    pub weld_epsilon: f64,

    /// Triangles with smaller area are removed.
    ///
    /// Default: `1e-12`
    pub degenerate_area_threshold: f64,

    /// Whether to remove coincident triangles.
    ///
    /// Same-orientation copies collapse to one; opposite-orientation pairs are
    /// internal seams and are removed together.
    ///
    /// Default: `true`
    pub remove_duplicate_faces: bool,
}

impl Default for CleanupParams {
    fn default() -> Self {
        Self {
            weld_epsilon: 1e-9,
            degenerate_area_threshold: 1e-12,
            remove_duplicate_faces: true,
        }
    }
}

impl CleanupParams {
    /// Tolerances must be finite and non-negative.
    pub fn validate(&self) -> StressResult<()> {
        let valid = |t: f64| t.is_finite() && t >= 0.0;
        if !valid(self.weld_epsilon) {
            return Err(StressError::invalid_configuration(format!(
                "weld tolerance {} must be finite and non-negative",
                self.weld_epsilon
            )));
        }
        if !valid(self.degenerate_area_threshold) {
            return Err(StressError::invalid_configuration(format!(
                "degenerate area threshold {} must be finite and non-negative",
                self.degenerate_area_threshold
            )));
        }
        Ok(())
    }
}

/// Counts of what cleanup changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub vertices_welded: usize,
    pub degenerates_removed: usize,
    pub duplicates_removed: usize,
    pub unreferenced_removed: usize,
}

/// Run all cleanup steps in order: weld, degenerate removal, duplicate
/// removal, vertex compaction.
pub fn cleanup_surface(mesh: &mut SurfaceMesh, params: &CleanupParams) -> CleanupStats {
    let vertices_welded = weld_vertices(mesh, params.weld_epsilon);
    let degenerates_removed = remove_degenerate_triangles(mesh, params.degenerate_area_threshold);
    let duplicates_removed = if params.remove_duplicate_faces {
        remove_duplicate_faces(mesh)
    } else {
        0
    };
    let unreferenced_removed = remove_unreferenced_vertices(mesh);

    CleanupStats {
        vertices_welded,
        degenerates_removed,
        duplicates_removed,
        unreferenced_removed,
    }
}

/// Remove triangles with area below threshold.
///
/// Returns the number of triangles removed.
pub fn remove_degenerate_triangles(mesh: &mut SurfaceMesh, area_threshold: f64) -> usize {
    let original_count = mesh.faces.len();
    let vertices = &mesh.vertices;

    mesh.faces.retain(|&[i0, i1, i2]| {
        if i0 == i1 || i1 == i2 || i0 == i2 {
            return false;
        }
        let tri = Triangle::new(
            vertices[i0 as usize],
            vertices[i1 as usize],
            vertices[i2 as usize],
        );
        tri.area() >= area_threshold
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        debug!(
            "Removed {} degenerate triangles (area < {:.2e})",
            removed, area_threshold
        );
    }
    removed
}

/// Weld vertices that are within epsilon distance of each other.
///
/// Uses spatial hashing. Faces that collapse are removed. Returns the number
/// of vertices merged; merged vertices stay in the buffer until
/// [`remove_unreferenced_vertices`] runs.
pub fn weld_vertices(mesh: &mut SurfaceMesh, epsilon: f64) -> usize {
    if mesh.vertices.is_empty() || !(epsilon > 0.0 && epsilon.is_finite()) {
        return 0;
    }

    let cell_size = epsilon * 2.0;

    let mut spatial_hash: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, position) in mesh.vertices.iter().enumerate() {
        spatial_hash
            .entry(pos_to_cell(position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    // Each vertex maps to the smallest index in its cluster.
    let mut vertex_remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut merged_count = 0;

    for (idx, position) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if vertex_remap[idx as usize] != idx {
            continue;
        }

        let cell = pos_to_cell(position, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = (
                        cell.0.saturating_add(dx),
                        cell.1.saturating_add(dy),
                        cell.2.saturating_add(dz),
                    );
                    let Some(candidates) = spatial_hash.get(&key) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || vertex_remap[other as usize] != other {
                            continue;
                        }
                        if (position - mesh.vertices[other as usize]).norm() < epsilon {
                            vertex_remap[other as usize] = idx;
                            merged_count += 1;
                        }
                    }
                }
            }
        }
    }

    if merged_count == 0 {
        return 0;
    }

    for face in &mut mesh.faces {
        for index in face.iter_mut() {
            *index = vertex_remap[*index as usize];
        }
    }
    mesh.faces
        .retain(|&[i0, i1, i2]| i0 != i1 && i1 != i2 && i0 != i2);

    debug!(
        "Welded {} vertices (epsilon = {:.2e})",
        merged_count, epsilon
    );
    merged_count
}

/// Float-to-int casts saturate, so far-off coordinates share the end cells.
fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

/// Split a face into its vertex-set key and orientation sign.
fn face_key(face: [u32; 3]) -> ([u32; 3], i64) {
    let min_idx = (0..3).min_by_key(|&i| face[i]).unwrap_or(0);
    let a = face[min_idx];
    let b = face[(min_idx + 1) % 3];
    let c = face[(min_idx + 2) % 3];
    if b < c { ([a, b, c], 1) } else { ([a, c, b], -1) }
}

/// Remove coincident triangles.
///
/// Faces over the same three vertices cancel by orientation: equal numbers of
/// opposite windings remove the whole group, otherwise one face with the
/// majority winding survives. Returns the number of faces removed.
pub fn remove_duplicate_faces(mesh: &mut SurfaceMesh) -> usize {
    let original_count = mesh.faces.len();

    let mut balance: HashMap<[u32; 3], i64> = HashMap::new();
    for face in &mesh.faces {
        let (key, sign) = face_key(*face);
        *balance.entry(key).or_default() += sign;
    }

    if balance.len() == original_count {
        return 0;
    }

    let mut emitted: hashbrown::HashSet<[u32; 3]> = hashbrown::HashSet::new();
    mesh.faces.retain(|face| {
        let (key, sign) = face_key(*face);
        let net = balance.get(&key).copied().unwrap_or(0);
        net.signum() == sign && emitted.insert(key)
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        debug!("Removed {} coincident faces", removed);
    }
    removed
}

/// Drop vertices no face references and compact the vertex buffer.
///
/// Returns the number of vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut SurfaceMesh) -> usize {
    let original_count = mesh.vertices.len();

    let mut remap: Vec<Option<u32>> = vec![None; original_count];
    let mut new_vertices = Vec::with_capacity(original_count);
    for face in &mut mesh.faces {
        for index in face.iter_mut() {
            let slot = &mut remap[*index as usize];
            let new_index = *slot.get_or_insert_with(|| {
                new_vertices.push(mesh.vertices[*index as usize]);
                (new_vertices.len() - 1) as u32
            });
            *index = new_index;
        }
    }

    let removed = original_count - new_vertices.len();
    mesh.vertices = new_vertices;
    if removed > 0 {
        debug!("Removed {} unreferenced vertices", removed);
    }
    removed
}

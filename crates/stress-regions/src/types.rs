//! Core surface and region data types.

use nalgebra::{Point3, Vector3};

use crate::band::StressBand;

/// A triangulated surface with owned vertex and index buffers.
///
/// Each region mesh owns exactly one of these; nothing is shared between
/// bands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,

    /// Triangle faces as indices into the vertex array.
    /// Each face is [v0, v1, v2] with counter-clockwise winding seen from outside.
    pub faces: Vec<[u32; 3]>,
}

impl SurfaceMesh {
    /// Create a new empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the surface has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Compute the axis-aligned bounding box.
    /// Returns (min_corner, max_corner) or None if there are no vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        let mut min = *first;
        let mut max = *first;

        for p in &self.vertices[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }

    /// Iterate over triangles with concrete vertex positions.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&face| self.triangle_of(face))
    }

    fn triangle_of(&self, [i0, i1, i2]: [u32; 3]) -> Triangle {
        Triangle {
            v0: self.vertices[i0 as usize],
            v1: self.vertices[i1 as usize],
            v2: self.vertices[i2 as usize],
        }
    }

    /// Compute the signed enclosed volume via the divergence theorem.
    ///
    /// Positive for closed surfaces with outward-facing triangles. Not
    /// meaningful for open surfaces.
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|tri| tri.v0.coords.dot(&tri.v1.coords.cross(&tri.v2.coords)))
            .sum::<f64>()
            / 6.0
    }

    /// Absolute value of [`SurfaceMesh::signed_volume`].
    #[inline]
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }
}

/// A triangle with concrete vertex positions.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unnormalized face normal via cross product (length = 2 * area).
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit face normal, or None for zero-area triangles.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        if len_sq > f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        }
    }

    /// Area of the triangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }
}

/// The boundary surface of all cells belonging to one non-empty stress band.
///
/// Owned by the partition run that produced it until it is handed to
/// [`crate::RegionMeshRegistry::register`], which consumes it.
#[derive(Debug, Clone)]
pub struct RegionMesh {
    /// Dense id over non-empty bands, ascending band order, starting at 0.
    pub mesh_id: usize,

    /// Index of the band among all bands (including empty ones).
    pub band_index: usize,

    /// Stress bounds of the band.
    pub band: StressBand,

    /// Number of grid cells that fell into the band.
    pub cell_count: usize,

    /// Triangulated boundary geometry.
    pub mesh: SurfaceMesh,
}

impl RegionMesh {
    /// Lower stress bound of the band.
    #[inline]
    pub fn stress_min(&self) -> f64 {
        self.band.min
    }

    /// Upper stress bound of the band.
    #[inline]
    pub fn stress_max(&self) -> f64 {
        self.band.max
    }
}

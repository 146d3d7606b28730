//! File I/O for grids and region surfaces.
//!
//! Grids are stored as JSON documents mirroring [`VolumetricGrid`]'s serde
//! layout. Region surfaces are written as binary STL or ASCII OBJ.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StressError, StressResult};
use crate::grid::VolumetricGrid;
use crate::tracing_ext::log_io_operation;
use crate::types::SurfaceMesh;

/// Supported surface file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceFormat {
    #[default]
    Stl,
    Obj,
}

impl SurfaceFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse a bare extension, case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "stl" => Some(SurfaceFormat::Stl),
            "obj" => Some(SurfaceFormat::Obj),
            _ => None,
        }
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            SurfaceFormat::Stl => "stl",
            SurfaceFormat::Obj => "obj",
        }
    }
}

impl std::str::FromStr for SurfaceFormat {
    type Err = StressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| StressError::UnsupportedFormat {
            extension: Some(s.to_string()),
        })
    }
}

impl std::fmt::Display for SurfaceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Load a grid from a JSON document.
pub fn load_grid(path: &Path) -> StressResult<VolumetricGrid> {
    info!("Loading grid from {:?}", path);

    let file = File::open(path).map_err(|e| StressError::io_read(path, e))?;
    let grid: VolumetricGrid = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| StressError::parse_error(path, e.to_string()))?;

    debug!(
        "Grid contains {} nodes, {} cells, {} point arrays",
        grid.point_count(),
        grid.cell_count(),
        grid.point_data.len()
    );
    log_io_operation("load_grid", path, Some("json"), true);
    Ok(grid)
}

/// Save a grid as a pretty-printed JSON document.
pub fn save_grid(grid: &VolumetricGrid, path: &Path) -> StressResult<()> {
    let file = File::create(path).map_err(|e| StressError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, grid)
        .map_err(|e| StressError::io_write(path, std::io::Error::other(e.to_string())))?;
    writer.flush().map_err(|e| StressError::io_write(path, e))?;

    log_io_operation("save_grid", path, Some("json"), true);
    Ok(())
}

/// Save a surface, choosing the writer by `format`.
pub fn save_surface(mesh: &SurfaceMesh, path: &Path, format: SurfaceFormat) -> StressResult<()> {
    match format {
        SurfaceFormat::Stl => save_stl(mesh, path),
        SurfaceFormat::Obj => save_obj(mesh, path),
    }
}

/// Save a surface as binary STL.
pub fn save_stl(mesh: &SurfaceMesh, path: &Path) -> StressResult<()> {
    let file = File::create(path).map_err(|e| StressError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = mesh
        .faces
        .iter()
        .map(|&[i0, i1, i2]| {
            let v0 = &mesh.vertices[i0 as usize];
            let v1 = &mesh.vertices[i1 as usize];
            let v2 = &mesh.vertices[i2 as usize];
            let n = (v1 - v0).cross(&(v2 - v0));
            let n = n.try_normalize(f64::EPSILON).unwrap_or(n);

            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [
                    stl_io::Vertex::new([v0.x as f32, v0.y as f32, v0.z as f32]),
                    stl_io::Vertex::new([v1.x as f32, v1.y as f32, v1.z as f32]),
                    stl_io::Vertex::new([v2.x as f32, v2.y as f32, v2.z as f32]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter())
        .map_err(|e| StressError::io_write(path, e))?;
    writer.flush().map_err(|e| StressError::io_write(path, e))?;

    debug!("Saved {} triangles to {:?}", mesh.face_count(), path);
    log_io_operation("save_surface", path, Some("stl"), true);
    Ok(())
}

/// Save a surface as ASCII OBJ. Vertex indices are preserved.
pub fn save_obj(mesh: &SurfaceMesh, path: &Path) -> StressResult<()> {
    let file = File::create(path).map_err(|e| StressError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    write_obj(mesh, &mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| StressError::io_write(path, e))?;

    debug!("Saved {} triangles to {:?}", mesh.face_count(), path);
    log_io_operation("save_surface", path, Some("obj"), true);
    Ok(())
}

fn write_obj<W: Write>(mesh: &SurfaceMesh, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "# stress region surface")?;
    writeln!(writer, "# Vertices: {}", mesh.vertices.len())?;
    writeln!(writer, "# Faces: {}", mesh.faces.len())?;
    writeln!(writer)?;
    for v in &mesh.vertices {
        writeln!(writer, "v {:.9} {:.9} {:.9}", v.x, v.y, v.z)?;
    }
    for [a, b, c] in &mesh.faces {
        // OBJ indices are 1-based
        writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    Ok(())
}

/// Load an STL file back into an indexed surface.
pub fn load_stl(path: &Path) -> StressResult<SurfaceMesh> {
    let file = File::open(path).map_err(|e| StressError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    let stl = stl_io::read_stl(&mut reader)
        .map_err(|e| StressError::parse_error(path, e.to_string()))?;

    let mut mesh = SurfaceMesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.vertices
            .push(Point3::new(v.0[0] as f64, v.0[1] as f64, v.0[2] as f64));
    }
    for face in &stl.faces {
        mesh.faces.push([
            face.vertices[0] as u32,
            face.vertices[1] as u32,
            face.vertices[2] as u32,
        ]);
    }

    log_io_operation("load_surface", path, Some("stl"), true);
    Ok(mesh)
}

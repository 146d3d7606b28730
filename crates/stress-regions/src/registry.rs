//! Durable storage for region meshes.
//!
//! Each registered [`RegionMesh`] is written to `region_NNNN.<ext>` inside the
//! registry directory, named by mesh id only. Stress bounds travel in the
//! `regions.json` side-table, never in the file name.
//!
//! Ordering rules keep readers of the directory consistent:
//!
//! - a surface file is fully written (temp file + rename) before its entry is
//!   added to the index
//! - the index is rewritten atomically after every change
//! - on removal the index is rewritten first and files are deleted after, so
//!   an index entry never points at a missing file

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StressError, StressResult};
use crate::io::{SurfaceFormat, save_surface};
use crate::types::RegionMesh;

/// Name of the side-table inside the registry directory.
pub const INDEX_FILE_NAME: &str = "regions.json";

const REGION_FILE_PREFIX: &str = "region_";

/// Registry entry for one persisted region mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshInfo {
    #[serde(rename = "meshID")]
    pub mesh_id: usize,
    #[serde(rename = "stressMin")]
    pub stress_min: f64,
    #[serde(rename = "stressMax")]
    pub stress_max: f64,
    #[serde(rename = "filePath")]
    pub file_path: PathBuf,
}

impl MeshInfo {
    /// Midpoint of the stress band.
    #[inline]
    pub fn stress_midpoint(&self) -> f64 {
        0.5 * (self.stress_min + self.stress_max)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryIndex {
    format: SurfaceFormat,
    meshes: Vec<MeshInfo>,
}

/// File name for a mesh id, e.g. `region_0003.stl`.
pub fn region_file_name(mesh_id: usize, format: SurfaceFormat) -> String {
    format!("{}{:04}.{}", REGION_FILE_PREFIX, mesh_id, format.extension())
}

fn is_region_artifact(name: &str) -> bool {
    (name.starts_with(REGION_FILE_PREFIX) || name.starts_with(".region_"))
        && (name.ends_with(".stl") || name.ends_with(".obj") || name.ends_with(".tmp"))
}

/// Registry of region meshes persisted in one working directory.
#[derive(Debug)]
pub struct RegionMeshRegistry {
    dir: PathBuf,
    format: SurfaceFormat,
    entries: Vec<MeshInfo>,
}

impl RegionMeshRegistry {
    /// Create a fresh registry, removing the index and any region files left
    /// by a previous run.
    pub fn create(dir: impl Into<PathBuf>, format: SurfaceFormat) -> StressResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StressError::io_write(&dir, e))?;

        let mut registry = Self {
            dir,
            format,
            entries: Vec::new(),
        };
        registry.clear()?;
        info!(dir = ?registry.dir, format = %format, "Created region registry");
        Ok(registry)
    }

    /// Reopen a registry from its `regions.json` side-table.
    ///
    /// Fails with `RegistryConflict` if any entry's file is missing or the
    /// mesh ids are not the contiguous range `0..n`.
    pub fn open_existing(dir: impl Into<PathBuf>) -> StressResult<Self> {
        let dir = dir.into();
        let index_path = dir.join(INDEX_FILE_NAME);
        let text = fs::read_to_string(&index_path)
            .map_err(|e| StressError::io_read(&index_path, e))?;
        let index: RegistryIndex = serde_json::from_str(&text)
            .map_err(|e| StressError::parse_error(&index_path, e.to_string()))?;

        for (expected, entry) in index.meshes.iter().enumerate() {
            if entry.mesh_id != expected {
                return Err(StressError::registry_conflict(format!(
                    "index lists mesh id {} at position {}",
                    entry.mesh_id, expected
                )));
            }
            if !entry.file_path.is_file() {
                return Err(StressError::registry_conflict(format!(
                    "mesh {} refers to missing file {}",
                    entry.mesh_id,
                    entry.file_path.display()
                )));
            }
        }

        debug!(dir = ?dir, meshes = index.meshes.len(), "Opened region registry");
        Ok(Self {
            dir,
            format: index.format,
            entries: index.meshes,
        })
    }

    /// Registry directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Surface format used for new files.
    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    /// Path of the side-table.
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    /// Path a mesh id is (or would be) stored at.
    pub fn file_path_for(&self, mesh_id: usize) -> PathBuf {
        self.dir.join(region_file_name(mesh_id, self.format))
    }

    /// All entries, ascending mesh id.
    pub fn entries(&self) -> &[MeshInfo] {
        &self.entries
    }

    /// Entry for a mesh id.
    pub fn get(&self, mesh_id: usize) -> Option<&MeshInfo> {
        self.entries.get(mesh_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist one region mesh and append its entry.
    ///
    /// The region must carry the next mesh id (`len()`), so ids stay dense.
    /// The in-memory geometry is dropped once the file is written.
    pub fn register(&mut self, region: RegionMesh) -> StressResult<&MeshInfo> {
        if region.mesh_id != self.entries.len() {
            return Err(StressError::registry_conflict(format!(
                "expected mesh id {}, got {}",
                self.entries.len(),
                region.mesh_id
            )));
        }
        if region.mesh.is_empty() {
            return Err(StressError::registry_conflict(format!(
                "mesh {} has no triangles",
                region.mesh_id
            )));
        }

        let path = self.file_path_for(region.mesh_id);
        let tmp = self.dir.join(format!(
            ".{}.tmp",
            region_file_name(region.mesh_id, self.format)
        ));
        if let Err(e) = save_surface(&region.mesh, &tmp, self.format) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StressError::io_write(&path, e)
        })?;

        self.entries.push(MeshInfo {
            mesh_id: region.mesh_id,
            stress_min: region.stress_min(),
            stress_max: region.stress_max(),
            file_path: path.clone(),
        });
        if let Err(e) = self.write_index() {
            self.entries.pop();
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        debug!(
            mesh_id = region.mesh_id,
            band = %region.band,
            faces = region.mesh.face_count(),
            path = ?path,
            "Registered region mesh"
        );
        Ok(&self.entries[region.mesh_id])
    }

    /// Persist all regions, or none.
    ///
    /// On the first failure, files and entries added by this call are removed
    /// before the error is returned.
    pub fn register_all(&mut self, regions: Vec<RegionMesh>) -> StressResult<&[MeshInfo]> {
        let start = self.entries.len();
        for region in regions {
            let registered = self.register(region).map(|_| ());
            if let Err(e) = registered {
                warn!(
                    rolled_back = self.entries.len() - start,
                    error = %e,
                    "Registration failed, rolling back this batch"
                );
                self.truncate(start)?;
                return Err(e);
            }
        }
        Ok(&self.entries[start..])
    }

    /// Remove all entries, the index and every region file in the directory.
    pub fn clear(&mut self) -> StressResult<()> {
        self.entries.clear();

        let index_path = self.index_path();
        match fs::remove_file(&index_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StressError::io_write(&index_path, e)),
        }

        let listing = fs::read_dir(&self.dir).map_err(|e| StressError::io_read(&self.dir, e))?;
        let mut removed = 0usize;
        for entry in listing {
            let entry = entry.map_err(|e| StressError::io_read(&self.dir, e))?;
            let name = entry.file_name();
            if !name.to_str().is_some_and(is_region_artifact) {
                continue;
            }
            let path = entry.path();
            fs::remove_file(&path).map_err(|e| StressError::io_write(&path, e))?;
            removed += 1;
        }

        if removed > 0 {
            debug!(dir = ?self.dir, removed, "Removed stale region files");
        }
        Ok(())
    }

    /// Drop entries from `len` onwards: index first, files after.
    fn truncate(&mut self, len: usize) -> StressResult<()> {
        let removed: Vec<MeshInfo> = self.entries.drain(len..).collect();
        self.write_index()?;
        for info in removed {
            if let Err(e) = fs::remove_file(&info.file_path) {
                warn!(path = ?info.file_path, error = %e, "Failed to remove rolled-back file");
            }
        }
        Ok(())
    }

    fn write_index(&self) -> StressResult<()> {
        let index = RegistryIndex {
            format: self.format,
            meshes: self.entries.clone(),
        };
        let path = self.index_path();
        let tmp = self.dir.join(format!(".{}.tmp", INDEX_FILE_NAME));
        let json = serde_json::to_string_pretty(&index)
            .map_err(|e| StressError::io_write(&path, std::io::Error::other(e.to_string())))?;
        fs::write(&tmp, json).map_err(|e| StressError::io_write(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StressError::io_write(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::StressBand;
    use crate::types::SurfaceMesh;
    use nalgebra::Point3;
    use tempfile::TempDir;

    fn region(mesh_id: usize, min: f64, max: f64) -> RegionMesh {
        let mesh = SurfaceMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            faces: vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        };
        RegionMesh {
            mesh_id,
            band_index: mesh_id,
            band: StressBand::half_open(min, max),
            cell_count: 1,
            mesh,
        }
    }

    #[test]
    fn test_index_based_names() {
        assert_eq!(region_file_name(3, SurfaceFormat::Stl), "region_0003.stl");
        assert_eq!(region_file_name(12, SurfaceFormat::Obj), "region_0012.obj");
    }

    #[test]
    fn test_register_writes_file_and_index() {
        let dir = TempDir::new().unwrap();
        let mut registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Stl).unwrap();

        let info = registry.register(region(0, 0.0, 10.0)).unwrap().clone();
        assert_eq!(info.mesh_id, 0);
        assert_eq!(info.stress_min, 0.0);
        assert_eq!(info.stress_max, 10.0);
        assert!(info.file_path.is_file());
        assert!(info.file_path.ends_with("region_0000.stl"));

        let reopened = RegionMeshRegistry::open_existing(dir.path()).unwrap();
        assert_eq!(reopened.entries(), registry.entries());
    }

    #[test]
    fn test_index_uses_wire_names() {
        let dir = TempDir::new().unwrap();
        let mut registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Stl).unwrap();
        registry.register(region(0, 0.0, 10.0)).unwrap();

        let text = std::fs::read_to_string(registry.index_path()).unwrap();
        for key in ["\"meshID\"", "\"stressMin\"", "\"stressMax\"", "\"filePath\""] {
            assert!(text.contains(key), "missing {key}");
        }
    }

    #[test]
    fn test_out_of_order_id_is_conflict() {
        let dir = TempDir::new().unwrap();
        let mut registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Stl).unwrap();
        let err = registry.register(region(1, 0.0, 10.0)).unwrap_err();
        assert!(matches!(err, StressError::RegistryConflict { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_all_rolls_back() {
        let dir = TempDir::new().unwrap();
        let mut registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Stl).unwrap();

        let batch = vec![
            region(0, 0.0, 10.0),
            region(1, 10.0, 20.0),
            region(5, 20.0, 30.0),
        ];
        assert!(registry.register_all(batch).is_err());
        assert!(registry.is_empty());
        assert!(!registry.file_path_for(0).exists());
        assert!(!registry.file_path_for(1).exists());

        let reopened = RegionMeshRegistry::open_existing(dir.path()).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_create_clears_stale_files() {
        let dir = TempDir::new().unwrap();
        {
            let mut registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Stl).unwrap();
            registry
                .register_all(vec![region(0, 0.0, 1.0), region(1, 1.0, 2.0)])
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Stl).unwrap();
        assert!(registry.is_empty());
        assert!(!dir.path().join("region_0000.stl").exists());
        assert!(!dir.path().join("region_0001.stl").exists());
        assert!(!dir.path().join(INDEX_FILE_NAME).exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_open_existing_rejects_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Obj).unwrap();
        registry.register(region(0, 0.0, 1.0)).unwrap();
        std::fs::remove_file(registry.file_path_for(0)).unwrap();

        let err = RegionMeshRegistry::open_existing(dir.path()).unwrap_err();
        assert!(matches!(err, StressError::RegistryConflict { .. }));
    }

    #[test]
    fn test_clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        let mut registry = RegionMeshRegistry::create(dir.path(), SurfaceFormat::Stl).unwrap();
        registry.register(region(0, 0.0, 1.0)).unwrap();
        registry.clear().unwrap();

        assert!(registry.get(0).is_none());
        assert!(!registry.index_path().exists());
        assert!(!registry.file_path_for(0).exists());
    }
}

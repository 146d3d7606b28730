//! Infill density per region.
//!
//! Each registered mesh gets a density percentage by mapping its band
//! midpoint linearly from the part's stress range onto
//! `[min_density, max_density]`. Higher stress means denser infill.

use serde::{Deserialize, Serialize};

use crate::error::{StressError, StressResult};
use crate::registry::MeshInfo;

/// Density range for region modifiers, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfillDensityConfig {
    /// Density at the lowest stress.
    ///
    /// Default: `10.0`
    pub min_density: f64,

    /// Density at the highest stress.
    ///
    /// Default: `100.0`
    pub max_density: f64,
}

impl Default for InfillDensityConfig {
    fn default() -> Self {
        Self {
            min_density: 10.0,
            max_density: 100.0,
        }
    }
}

impl InfillDensityConfig {
    /// Check `0 <= min_density <= max_density <= 100`.
    pub fn validate(&self) -> StressResult<()> {
        let ok = self.min_density.is_finite()
            && self.max_density.is_finite()
            && (0.0..=100.0).contains(&self.min_density)
            && (0.0..=100.0).contains(&self.max_density)
            && self.min_density <= self.max_density;
        if ok {
            Ok(())
        } else {
            Err(StressError::invalid_configuration(format!(
                "infill density range [{}, {}] must lie within [0, 100] and be ascending",
                self.min_density, self.max_density
            )))
        }
    }

    /// Density for a stress value, clamped to the configured range.
    pub fn density_for(&self, stress: f64, stress_min: f64, stress_max: f64) -> f64 {
        let span = stress_max - stress_min;
        let t = if span > 0.0 {
            ((stress - stress_min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.min_density + t * (self.max_density - self.min_density)
    }
}

/// Density chosen for one mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityAssignment {
    #[serde(rename = "meshID")]
    pub mesh_id: usize,
    pub density: f64,
}

/// Assign a density to every mesh from its band midpoint.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use stress_regions::{InfillDensityConfig, MeshInfo, assign_densities};
///
/// let meshes = vec![MeshInfo {
///     mesh_id: 0,
///     stress_min: 40.0,
///     stress_max: 60.0,
///     file_path: PathBuf::from("region_0000.stl"),
/// }];
/// let out = assign_densities(&meshes, 0.0, 100.0, &InfillDensityConfig::default()).unwrap();
/// assert_eq!(out[0].density, 55.0);
/// ```
pub fn assign_densities(
    meshes: &[MeshInfo],
    stress_min: f64,
    stress_max: f64,
    config: &InfillDensityConfig,
) -> StressResult<Vec<DensityAssignment>> {
    config.validate()?;
    if !(stress_min.is_finite() && stress_max.is_finite()) || stress_min > stress_max {
        return Err(StressError::invalid_configuration(format!(
            "stress range [{}, {}] is not a finite ascending interval",
            stress_min, stress_max
        )));
    }

    Ok(meshes
        .iter()
        .map(|info| DensityAssignment {
            mesh_id: info.mesh_id,
            density: config.density_for(info.stress_midpoint(), stress_min, stress_max),
        })
        .collect())
}

//! Run configuration.
//!
//! A [`SegmentationConfig`] captures everything a segmentation run needs
//! besides the grid itself, so runs can be saved and repeated from TOML or
//! JSON files.
//!
//! # Example TOML
//!
//! ```toml
//! stress_label = "von_mises"
//! thresholds = [0.0, 50.0, 120.0, 250.0]
//! num_divisions = 20
//! output_dir = "regions"
//! format = "stl"
//!
//! [cleanup]
//! weld_epsilon = 1e-6
//!
//! [density]
//! min_density = 15.0
//! max_density = 80.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::band::normalize_thresholds;
use crate::cleanup::CleanupParams;
use crate::density::InfillDensityConfig;
use crate::error::{StressError, StressResult};
use crate::fraction::DEFAULT_NUM_DIVISIONS;
use crate::io::SurfaceFormat;

/// Settings for one segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Point array to segment on; `None` picks by naming convention.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_label: Option<String>,

    /// Band thresholds; deduplicated and sorted before use.
    pub thresholds: Vec<f64>,

    /// Number of equal-width bins in the volume-fraction table.
    ///
    /// Default: `20`
    pub num_divisions: usize,

    /// Directory receiving region files and `regions.json`.
    ///
    /// Default: `regions`
    pub output_dir: PathBuf,

    /// Surface file format.
    ///
    /// Default: `stl`
    pub format: SurfaceFormat,

    /// Cleanup applied to every region surface.
    pub cleanup: CleanupParams,

    /// Infill density range for the density assignment.
    pub density: InfillDensityConfig,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            stress_label: None,
            thresholds: Vec::new(),
            num_divisions: DEFAULT_NUM_DIVISIONS,
            output_dir: PathBuf::from("regions"),
            format: SurfaceFormat::Stl,
            cleanup: CleanupParams::default(),
            density: InfillDensityConfig::default(),
        }
    }
}

impl SegmentationConfig {
    /// Config with the given thresholds and defaults elsewhere.
    pub fn with_thresholds(thresholds: impl Into<Vec<f64>>) -> Self {
        Self {
            thresholds: thresholds.into(),
            ..Default::default()
        }
    }

    /// Check everything that can be checked without a grid.
    pub fn validate(&self) -> StressResult<()> {
        let distinct = normalize_thresholds(&self.thresholds)?;
        if distinct.len() < 2 {
            return Err(StressError::invalid_configuration(format!(
                "need at least two distinct thresholds, got {}",
                distinct.len()
            )));
        }
        if self.num_divisions == 0 {
            return Err(StressError::invalid_configuration(
                "num_divisions must be at least 1",
            ));
        }
        self.cleanup.validate()?;
        self.density.validate()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> StressResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| StressError::io_read(path, e))?;
        toml::from_str(&contents).map_err(|e| StressError::parse_error(path, e.to_string()))
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> StressResult<()> {
        let path = path.as_ref();
        let text = self.to_toml().map_err(|e| {
            StressError::io_write(path, std::io::Error::other(e.to_string()))
        })?;
        std::fs::write(path, text).map_err(|e| StressError::io_write(path, e))
    }

    /// Parse from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

//! Error types for stress segmentation with rich diagnostics.
//!
//! This module provides:
//! - Machine-readable error codes for programmatic handling
//! - Context on which precondition failed (field name, band, path)
//! - Recovery suggestions for common issues
//! - Terminal display via miette
//!
//! # Error Codes
//!
//! Each error has a unique code in the format `STRESS-XXXX`:
//! - `STRESS-1xxx`: I/O errors (reading grids, writing region meshes)
//! - `STRESS-2xxx`: Data errors (missing fields, malformed grids)
//! - `STRESS-3xxx`: Configuration errors (thresholds, stress range)
//! - `STRESS-4xxx`: Processing errors (band extraction, registry)
//!
//! Empty bands and unsupported cell types are not errors. They are reported
//! through counters on [`crate::PartitionResult`] and
//! [`crate::VolumeFractionTable`].

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stress segmentation operations.
pub type StressResult<T> = Result<T, StressError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // I/O errors (1xxx)
    /// STRESS-1001: Failed to read file
    IoRead = 1001,
    /// STRESS-1002: Failed to write file
    IoWrite = 1002,
    /// STRESS-1003: Failed to parse file contents
    ParseError = 1003,
    /// STRESS-1004: Unsupported file format
    UnsupportedFormat = 1004,

    // Data errors (2xxx)
    /// STRESS-2001: Required scalar field or geometry is missing
    DataUnavailable = 2001,
    /// STRESS-2002: Grid violates a structural invariant
    InvalidGrid = 2002,

    // Configuration errors (3xxx)
    /// STRESS-3001: Thresholds, stress range or bin count are unusable
    InvalidConfiguration = 3001,

    // Processing errors (4xxx)
    /// STRESS-4001: Extracting one band's surface failed
    ExtractionFailed = 4001,
    /// STRESS-4002: Registry entry does not match the expected mesh id
    RegistryConflict = 4002,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `STRESS-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "STRESS-1001",
            ErrorCode::IoWrite => "STRESS-1002",
            ErrorCode::ParseError => "STRESS-1003",
            ErrorCode::UnsupportedFormat => "STRESS-1004",
            ErrorCode::DataUnavailable => "STRESS-2001",
            ErrorCode::InvalidGrid => "STRESS-2002",
            ErrorCode::InvalidConfiguration => "STRESS-3001",
            ErrorCode::ExtractionFailed => "STRESS-4001",
            ErrorCode::RegistryConflict => "STRESS-4002",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for stress segmentation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Re-export the analysis result with the expected contents.
    ReexportResult { missing: String },
    /// Check the input file or directory.
    CheckPath { checks: Vec<String> },
    /// Adjust configuration values.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// Clear the output directory and run again.
    ResetOutput,
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::ReexportResult { missing } => {
                write!(
                    f,
                    "Re-export the analysis result so that it contains {}",
                    missing
                )
            }
            RecoverySuggestion::CheckPath { checks } => {
                write!(f, "Check the path for: {}", checks.join(", "))
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::ResetOutput => {
                write!(f, "Clear the region output directory and run again")
            }
            RecoverySuggestion::None => write!(f, "No automatic recovery available"),
        }
    }
}

/// Errors that can occur while preparing, partitioning or persisting a stress field.
#[derive(Debug, Error, Diagnostic)]
pub enum StressError {
    /// Error reading from a file.
    #[error("failed to read {path}")]
    #[diagnostic(
        code(stress::io::read),
        help("Check that the file exists and is readable")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write {path}")]
    #[diagnostic(
        code(stress::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing file contents.
    #[error("failed to parse {path}: {details}")]
    #[diagnostic(
        code(stress::parse::error),
        help("The file may be truncated or written by an incompatible exporter.")
    )]
    ParseError { path: PathBuf, details: String },

    /// Unsupported file format.
    #[error("unsupported file format: {extension:?}")]
    #[diagnostic(
        code(stress::format::unsupported),
        help("Supported surface formats: STL, OBJ. Grids are read from JSON documents.")
    )]
    UnsupportedFormat { extension: Option<String> },

    /// A required scalar field or the grid geometry is missing.
    #[error("data unavailable: {details}")]
    #[diagnostic(
        code(stress::data::unavailable),
        help("The grid must carry at least one point-scalar array and one cell.")
    )]
    DataUnavailable { details: String },

    /// The grid violates a structural invariant.
    #[error("invalid grid: {details}")]
    #[diagnostic(
        code(stress::data::grid),
        help("Every cell must reference existing nodes and every array must have one value per node.")
    )]
    InvalidGrid { details: String },

    /// Thresholds, stress range or bin count are unusable.
    #[error("invalid configuration: {details}")]
    #[diagnostic(
        code(stress::config::invalid),
        help("Provide at least two distinct finite thresholds and a positive stress range.")
    )]
    InvalidConfiguration { details: String },

    /// Extracting the surface of a single band failed.
    #[error("extraction of band {band_index} failed: {details}")]
    #[diagnostic(
        code(stress::partition::extraction),
        help("The band is skipped; remaining bands are still produced.")
    )]
    ExtractionFailed { band_index: usize, details: String },

    /// Registry bookkeeping does not match the mesh being registered.
    #[error("registry conflict: {details}")]
    #[diagnostic(
        code(stress::registry::conflict),
        help("Reset the registry before registering a new partition run.")
    )]
    RegistryConflict { details: String },
}

impl StressError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            StressError::IoRead { .. } => ErrorCode::IoRead,
            StressError::IoWrite { .. } => ErrorCode::IoWrite,
            StressError::ParseError { .. } => ErrorCode::ParseError,
            StressError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            StressError::DataUnavailable { .. } => ErrorCode::DataUnavailable,
            StressError::InvalidGrid { .. } => ErrorCode::InvalidGrid,
            StressError::InvalidConfiguration { .. } => ErrorCode::InvalidConfiguration,
            StressError::ExtractionFailed { .. } => ErrorCode::ExtractionFailed,
            StressError::RegistryConflict { .. } => ErrorCode::RegistryConflict,
        }
    }

    /// Whether this error aborts the whole operation.
    ///
    /// Only band extraction failures are local: the partitioner logs them and
    /// treats the band as empty.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StressError::ExtractionFailed { .. })
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            StressError::IoRead { .. } => RecoverySuggestion::CheckPath {
                checks: vec!["file exists".into(), "file permissions".into()],
            },
            StressError::IoWrite { .. } => RecoverySuggestion::CheckPath {
                checks: vec!["directory exists".into(), "write permissions".into()],
            },
            StressError::ParseError { .. } => RecoverySuggestion::ReexportResult {
                missing: "a well-formed grid document".into(),
            },
            StressError::UnsupportedFormat { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![("format".into(), "stl or obj".into())],
            },
            StressError::DataUnavailable { .. } => RecoverySuggestion::ReexportResult {
                missing: "a point-scalar stress array".into(),
            },
            StressError::InvalidGrid { .. } => RecoverySuggestion::ReexportResult {
                missing: "consistent cell connectivity".into(),
            },
            StressError::InvalidConfiguration { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![
                    ("thresholds".into(), "at least two distinct values".into()),
                    ("stress range".into(), "min < max".into()),
                ],
            },
            StressError::ExtractionFailed { .. } => RecoverySuggestion::None,
            StressError::RegistryConflict { .. } => RecoverySuggestion::ResetOutput,
        }
    }

    // Constructor helpers for common error patterns

    /// Create an IoRead error.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StressError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Create an IoWrite error.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StressError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseError.
    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        StressError::ParseError {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Create a DataUnavailable error.
    pub fn data_unavailable(details: impl Into<String>) -> Self {
        StressError::DataUnavailable {
            details: details.into(),
        }
    }

    /// Create an InvalidGrid error.
    pub fn invalid_grid(details: impl Into<String>) -> Self {
        StressError::InvalidGrid {
            details: details.into(),
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration(details: impl Into<String>) -> Self {
        StressError::InvalidConfiguration {
            details: details.into(),
        }
    }

    /// Create an ExtractionFailed error.
    pub fn extraction_failed(band_index: usize, details: impl Into<String>) -> Self {
        StressError::ExtractionFailed {
            band_index,
            details: details.into(),
        }
    }

    /// Create a RegistryConflict error.
    pub fn registry_conflict(details: impl Into<String>) -> Self {
        StressError::RegistryConflict {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = StressError::data_unavailable("no point arrays");
        assert_eq!(err.code(), ErrorCode::DataUnavailable);
        assert_eq!(err.code().as_str(), "STRESS-2001");

        let err = StressError::invalid_configuration("one threshold");
        assert_eq!(err.code().to_string(), "STRESS-3001");
    }

    #[test]
    fn test_fatality() {
        assert!(StressError::data_unavailable("x").is_fatal());
        assert!(StressError::invalid_configuration("x").is_fatal());
        assert!(!StressError::extraction_failed(2, "x").is_fatal());
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = StressError::invalid_configuration("stress_min >= stress_max");
        match err.recovery_suggestion() {
            RecoverySuggestion::AdjustParameters { parameters } => {
                assert!(!parameters.is_empty());
            }
            other => panic!("Expected AdjustParameters suggestion, got {:?}", other),
        }
    }

    #[test]
    fn test_error_display() {
        let err = StressError::extraction_failed(3, "vertex index overflow");
        let display = format!("{}", err);
        assert!(display.contains("band 3"));
        assert!(display.contains("vertex index overflow"));
    }
}

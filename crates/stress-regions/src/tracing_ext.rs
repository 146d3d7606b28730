//! Tracing extensions for segmentation operations.
//!
//! Structured logging helpers used across the crate. Timing events go to the
//! `stress_regions::timing` target, grid summaries to
//! `stress_regions::grid_state`, band diagnostics to `stress_regions::bands`
//! and file operations to `stress_regions::io`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! // RUST_LOG=stress_regions=debug for per-band output
//! ```
//!
//! # Log Levels
//!
//! - **ERROR**: Fatal failures surfaced to the caller
//! - **WARN**: Band-local failures, fallback field selection
//! - **INFO**: Operation summaries, timing
//! - **DEBUG**: Per-band outcomes, grid state
//! - **TRACE**: Fraction tables bin by bin

use std::time::Instant;
use tracing::{Span, debug, info, trace, warn};

use crate::fraction::VolumeFractionTable;
use crate::grid::VolumetricGrid;
use crate::partition::{BandOutcome, BandStatus};

/// A performance timer that logs duration on drop.
///
/// ```rust,ignore
/// use stress_regions::tracing_ext::OperationTimer;
///
/// fn expensive_operation() {
///     let _timer = OperationTimer::new("expensive_operation");
///     // ... do work ...
/// } // logs elapsed time here
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    /// Create a new operation timer.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("stress_operation", operation = name);
        debug!(target: "stress_regions::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Create a timer that also records how many cells and groups (bands or
    /// bins) the operation covers.
    pub fn with_context(name: &'static str, cell_count: usize, group_count: usize) -> Self {
        let span = tracing::info_span!(
            "stress_operation",
            operation = name,
            cells = cell_count,
            groups = group_count
        );
        debug!(
            target: "stress_regions::timing",
            operation = name,
            cells = cell_count,
            groups = group_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// The span for this timer.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        info!(
            target: "stress_regions::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log grid statistics at debug level.
pub fn log_grid_stats(grid: &VolumetricGrid, context: &str) {
    let stats = grid.stats();
    let dims = stats
        .bounds
        .map(|(lo, hi)| hi - lo)
        .unwrap_or_default();

    debug!(
        target: "stress_regions::grid_state",
        context = context,
        points = stats.point_count,
        cells = stats.cell_count,
        supported_cells = stats.supported_cells(),
        unsupported_cells = stats.other,
        fields = stats.field_count,
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Grid state"
    );
}

/// Log the outcome of one band.
pub fn log_band_outcome(outcome: &BandOutcome) {
    let band = outcome.band.to_string();
    match &outcome.status {
        BandStatus::Emitted { mesh_id } => debug!(
            target: "stress_regions::bands",
            band_index = outcome.band_index,
            band = band.as_str(),
            mesh_id = *mesh_id,
            cells = outcome.cell_count,
            faces = outcome.face_count,
            "Band emitted"
        ),
        BandStatus::Empty => debug!(
            target: "stress_regions::bands",
            band_index = outcome.band_index,
            band = band.as_str(),
            cells = outcome.cell_count,
            "Band empty"
        ),
        BandStatus::Failed { reason } => warn!(
            target: "stress_regions::bands",
            band_index = outcome.band_index,
            band = band.as_str(),
            cells = outcome.cell_count,
            reason = reason.as_str(),
            "Band extraction failed, skipping"
        ),
    }
}

/// Log a computed fraction table.
pub fn log_fraction_table(table: &VolumeFractionTable) {
    info!(
        target: "stress_regions::fractions",
        label = table.stress_label.as_str(),
        divisions = table.num_divisions(),
        total_volume = table.total_volume,
        processed = table.processed_cells,
        skipped = table.skipped_cells,
        non_finite = table.non_finite_cells,
        "Volume fractions computed"
    );
    for (i, fraction) in table.fractions.iter().enumerate() {
        trace!(
            target: "stress_regions::fractions",
            bin = i,
            fraction = *fraction,
            volume = table.bin_volumes[i],
            "Bin"
        );
    }
}

/// Log a file I/O operation.
pub fn log_io_operation(
    operation: &str,
    path: &std::path::Path,
    format: Option<&str>,
    success: bool,
) {
    if success {
        info!(
            target: "stress_regions::io",
            operation = operation,
            path = path.display().to_string(),
            format = format.unwrap_or("auto"),
            "I/O operation completed"
        );
    } else {
        warn!(
            target: "stress_regions::io",
            operation = operation,
            path = path.display().to_string(),
            format = format.unwrap_or("auto"),
            "I/O operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::StressBand;

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::with_context("test_operation", 10, 3);
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }

    #[test]
    fn test_log_helpers_do_not_panic() {
        log_grid_stats(&VolumetricGrid::default(), "test");
        for status in [
            BandStatus::Emitted { mesh_id: 0 },
            BandStatus::Empty,
            BandStatus::Failed {
                reason: "non-manifold".into(),
            },
        ] {
            log_band_outcome(&BandOutcome {
                band_index: 0,
                band: StressBand::closed(0.0, 1.0),
                cell_count: 0,
                face_count: 0,
                status,
            });
        }
        log_io_operation("save", std::path::Path::new("x.stl"), Some("stl"), false);
    }
}

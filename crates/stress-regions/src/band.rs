//! Stress bands derived from threshold lists.
//!
//! N distinct thresholds produce N-1 consecutive bands. Every band is
//! half-open `[min, max)` except the last, which is closed `[min, max]` so
//! that a value equal to the highest threshold is kept.

use serde::{Deserialize, Serialize};

use crate::error::{StressError, StressResult};

/// An interval of stress values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressBand {
    /// Inclusive lower bound.
    pub min: f64,
    /// Upper bound; inclusive only when `closed` is set.
    pub max: f64,
    /// Whether `max` belongs to the band.
    pub closed: bool,
}

impl StressBand {
    /// A half-open band `[min, max)`.
    pub fn half_open(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            closed: false,
        }
    }

    /// A closed band `[min, max]`.
    pub fn closed(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            closed: true,
        }
    }

    /// Whether a value falls inside the band.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && (value < self.max || (self.closed && value == self.max))
    }
}

impl std::fmt::Display for StressBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let close = if self.closed { ']' } else { ')' };
        write!(f, "[{}, {}{}", self.min, self.max, close)
    }
}

/// Deduplicate and sort thresholds ascending.
///
/// Fails with `InvalidConfiguration` on non-finite values.
pub fn normalize_thresholds(thresholds: &[f64]) -> StressResult<Vec<f64>> {
    if let Some(bad) = thresholds.iter().find(|t| !t.is_finite()) {
        return Err(StressError::invalid_configuration(format!(
            "threshold {} is not a finite number",
            bad
        )));
    }
    let mut sorted = thresholds.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    Ok(sorted)
}

/// Build consecutive bands from a threshold list.
///
/// Fails with `InvalidConfiguration` if fewer than two distinct finite values
/// remain after deduplication.
pub fn bands_from_thresholds(thresholds: &[f64]) -> StressResult<Vec<StressBand>> {
    let sorted = normalize_thresholds(thresholds)?;
    if sorted.len() < 2 {
        return Err(StressError::invalid_configuration(format!(
            "need at least two distinct thresholds to form a band, got {}",
            sorted.len()
        )));
    }

    let last = sorted.len() - 2;
    Ok(sorted
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            if i == last {
                StressBand::closed(pair[0], pair[1])
            } else {
                StressBand::half_open(pair[0], pair[1])
            }
        })
        .collect())
}

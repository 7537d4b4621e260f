use super::compositor::VFM_INDEX_COLUMN;
use crate::domain::errors::VfmError;
use crate::domain::horizon::Horizon;
use crate::domain::table::UnitTable;
use crate::domain::valuation::{PredictionSource, VfmTier};
use serde::Serialize;
use std::fmt;

/// Engine status at the time a batch was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Ready,
    /// Scorer unavailable; VFM is the plain price ratio
    Degraded,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Ready => f.write_str("ready"),
            EngineStatus::Degraded => f.write_str("degraded"),
        }
    }
}

/// Output of one `calculate_vfm` call.
///
/// `table` is the input batch with the result columns appended. The per-row
/// sources are parallel to its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct VfmReport {
    pub table: UnitTable,
    pub horizon: Horizon,
    pub forecast_sources: Vec<PredictionSource>,
    pub score_sources: Vec<PredictionSource>,
    pub scorer_applied: bool,
    pub status: EngineStatus,
}

impl VfmReport {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn forecast_fallback_rows(&self) -> usize {
        count(&self.forecast_sources, PredictionSource::Fallback)
    }

    pub fn score_fallback_rows(&self) -> usize {
        count(&self.score_sources, PredictionSource::Fallback)
    }

    /// Reads a result column back out of the table.
    pub fn values(&self, column: &str) -> Result<Vec<f64>, VfmError> {
        Ok(self.table.numeric_values(column, f64::NAN)?.values)
    }

    pub fn tiers(&self) -> Result<Vec<VfmTier>, VfmError> {
        Ok(self
            .values(VFM_INDEX_COLUMN)?
            .into_iter()
            .map(VfmTier::classify)
            .collect())
    }
}

fn count(sources: &[PredictionSource], wanted: PredictionSource) -> usize {
    sources.iter().filter(|s| **s == wanted).count()
}

//! Batch-level statistics over a [`VfmReport`].

use super::compositor::{PRICE_CHANGE_PCT_COLUMN, VFM_INDEX_COLUMN};
use super::report::VfmReport;
use crate::domain::errors::VfmError;
use crate::domain::valuation::VfmTier;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Min};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub records: usize,
    pub unique_units: Option<usize>,
    pub vfm_min: Option<f64>,
    pub vfm_max: Option<f64>,
    pub vfm_mean: Option<f64>,
    pub vfm_std: Option<f64>,
    pub mean_price_change_pct: Option<f64>,
    pub forecast_fallback_rows: usize,
    pub score_fallback_rows: usize,
    pub tier_counts: BTreeMap<VfmTier, usize>,
}

impl BatchSummary {
    /// Summarises `report`. `unit_id_column` is optional in the batch; when it
    /// is absent `unique_units` is `None`.
    pub fn from_report(report: &VfmReport, unit_id_column: &str) -> Result<Self, VfmError> {
        let vfm: Vec<f64> = report
            .values(VFM_INDEX_COLUMN)?
            .into_iter()
            .filter(|v| v.is_finite())
            .collect();
        let pct: Vec<f64> = report
            .values(PRICE_CHANGE_PCT_COLUMN)?
            .into_iter()
            .filter(|v| v.is_finite())
            .collect();

        let unique_units = report.table.column(unit_id_column).map(|column| {
            (0..report.len())
                .map(|row| column.data.cell_text(row))
                .collect::<HashSet<_>>()
                .len()
        });

        let mut tier_counts: BTreeMap<VfmTier, usize> =
            VfmTier::all().into_iter().map(|t| (t, 0)).collect();
        for value in &vfm {
            *tier_counts.entry(VfmTier::classify(*value)).or_default() += 1;
        }

        let (vfm_min, vfm_max, vfm_mean, vfm_std) = if vfm.is_empty() {
            (None, None, None, None)
        } else {
            let data = Data::new(vfm);
            (
                Some(data.min()),
                Some(data.max()),
                data.mean(),
                data.std_dev().filter(|s| s.is_finite()),
            )
        };
        let mean_price_change_pct = if pct.is_empty() {
            None
        } else {
            Data::new(pct).mean()
        };

        Ok(Self {
            records: report.len(),
            unique_units,
            vfm_min,
            vfm_max,
            vfm_mean,
            vfm_std,
            mean_price_change_pct,
            forecast_fallback_rows: report.forecast_fallback_rows(),
            score_fallback_rows: report.score_fallback_rows(),
            tier_counts,
        })
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "n/a".to_string())
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records={} units={} vfm[min={} max={} mean={} std={}] mean_change={}% fallbacks[forecast={} score={}]",
            self.records,
            self.unique_units
                .map(|u| u.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            opt(self.vfm_min),
            opt(self.vfm_max),
            opt(self.vfm_mean),
            opt(self.vfm_std),
            opt(self.mean_price_change_pct),
            self.forecast_fallback_rows,
            self.score_fallback_rows,
        )?;
        for tier in VfmTier::all() {
            write!(
                f,
                " {}={}",
                tier,
                self.tier_counts.get(&tier).copied().unwrap_or(0)
            )?;
        }
        Ok(())
    }
}

use super::forecaster::Forecast;
use super::scorer::LocationScores;
use crate::domain::errors::VfmError;
use crate::domain::horizon::Horizon;
use crate::domain::table::UnitTable;
use crate::domain::valuation::{VfmWeights, compose};

pub const FUTURE_PRICE_COLUMN: &str = "future_price";
pub const LOCATION_SCORE_COLUMN: &str = "location_score";
pub const VFM_INDEX_COLUMN: &str = "vfm_index";
pub const PRICE_CHANGE_PCT_COLUMN: &str = "price_change_pct";
pub const HORIZON_COLUMN: &str = "horizon";

/// Per-row VFM values, column-wise.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedBatch {
    pub future_price: Vec<f64>,
    pub location_score: Option<Vec<f64>>,
    pub vfm_index: Vec<f64>,
    pub price_change_pct: Vec<f64>,
    pub horizon: Horizon,
}

impl ComposedBatch {
    pub fn len(&self) -> usize {
        self.vfm_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vfm_index.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VfmCompositor {
    weights: VfmWeights,
}

impl VfmCompositor {
    pub fn new(weights: VfmWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> VfmWeights {
        self.weights
    }

    /// Blends forecasts and scores row by row.
    ///
    /// The scorer term is included only when `scores.applied` is set.
    pub fn compose_batch(
        &self,
        current_prices: &[f64],
        forecast: &Forecast,
        scores: &LocationScores,
        horizon: Horizon,
    ) -> ComposedBatch {
        let rows = current_prices.len();
        let mut vfm_index = Vec::with_capacity(rows);
        let mut price_change_pct = Vec::with_capacity(rows);

        for (row, current) in current_prices.iter().enumerate() {
            let future = forecast.prices.get(row).copied().unwrap_or(*current);
            let score = scores.values.get(row).copied().unwrap_or(0.0);
            let valuation = compose(*current, future, score, scores.applied, self.weights);
            vfm_index.push(valuation.vfm_index);
            price_change_pct.push(valuation.price_change_pct);
        }

        ComposedBatch {
            future_price: forecast.prices.clone(),
            location_score: scores.applied.then(|| scores.values.clone()),
            vfm_index,
            price_change_pct,
            horizon,
        }
    }

    /// Writes the result columns onto `table`, keeping its column order.
    pub fn append_columns(table: &mut UnitTable, batch: &ComposedBatch) -> Result<(), VfmError> {
        table.set_numeric(FUTURE_PRICE_COLUMN, batch.future_price.clone())?;
        if let Some(scores) = &batch.location_score {
            table.set_numeric(LOCATION_SCORE_COLUMN, scores.clone())?;
        }
        table.set_numeric(VFM_INDEX_COLUMN, batch.vfm_index.clone())?;
        table.set_numeric(PRICE_CHANGE_PCT_COLUMN, batch.price_change_pct.clone())?;
        table.set_numeric(
            HORIZON_COLUMN,
            vec![f64::from(batch.horizon.months()); batch.len()],
        )
    }
}

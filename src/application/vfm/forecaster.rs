use super::feature_scaling::ScaledSequence;
use crate::application::ml::SequenceModel;
use crate::domain::errors::{Component, VfmError};
use crate::domain::horizon::Horizon;
use crate::domain::ml::ScalerState;
use crate::domain::valuation::PredictionSource;
use ndarray::{Array2, Array3, Axis};
use tracing::warn;

/// Future prices at the selected horizon with per-row provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub prices: Vec<f64>,
    pub sources: Vec<PredictionSource>,
}

impl Forecast {
    /// Every row passes its current price through.
    pub fn passthrough(current_prices: &[f64]) -> Self {
        Self {
            prices: current_prices.to_vec(),
            sources: vec![PredictionSource::Fallback; current_prices.len()],
        }
    }

    pub fn fallback_rows(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| **s == PredictionSource::Fallback)
            .count()
    }
}

/// Multi-horizon price forecaster.
///
/// Without a model or output scaler every forecast is the current price.
pub struct SequenceForecaster {
    model: Option<Box<dyn SequenceModel>>,
    output_scaler: Option<ScalerState>,
}

impl SequenceForecaster {
    pub fn new(model: Box<dyn SequenceModel>, output_scaler: ScalerState) -> Self {
        Self {
            model: Some(model),
            output_scaler: Some(output_scaler),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            model: None,
            output_scaler: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some() && self.output_scaler.is_some()
    }

    pub fn input_width(&self) -> Option<usize> {
        self.model.as_ref().and_then(|m| m.input_width())
    }

    /// Prices for all horizons in currency units, `[units, 4]` ordered 3/6/9/12 months.
    ///
    /// Each unit becomes a one-step sequence `[units, 1, features]`.
    pub fn predict(&self, input: &ScaledSequence) -> Result<Array2<f64>, VfmError> {
        let (model, output_scaler) = match (&self.model, &self.output_scaler) {
            (Some(model), Some(scaler)) => (model, scaler),
            _ => {
                return Err(VfmError::inference(
                    Component::Forecaster,
                    "model or output scaler not loaded",
                ));
            }
        };

        let sequence: Array3<f64> = input.view().insert_axis(Axis(1)).to_owned();
        let scaled = model
            .predict(sequence.view())
            .map_err(|e| VfmError::inference(Component::Forecaster, e))?;

        if scaled.nrows() != input.rows() {
            return Err(VfmError::inference(
                Component::Forecaster,
                format!("{} predictions for {} units", scaled.nrows(), input.rows()),
            ));
        }

        output_scaler
            .inverse_transform(scaled.view())
            .map_err(|e| VfmError::inference(Component::Forecaster, e))
    }

    /// Forecast at `horizon`, falling back to the current price for every row
    /// the model could not produce a finite value for.
    pub fn forecast(&self, input: &ScaledSequence, current_prices: &[f64], horizon: Horizon) -> Forecast {
        if current_prices.is_empty() {
            return Forecast {
                prices: Vec::new(),
                sources: Vec::new(),
            };
        }
        if !self.is_available() {
            warn!(
                "Forecaster model not loaded. Passing {} current prices through.",
                current_prices.len()
            );
            return Forecast::passthrough(current_prices);
        }

        let all_horizons = match self.predict(input) {
            Ok(prices) => prices,
            Err(e) => {
                warn!("{}. Passing {} current prices through.", e, current_prices.len());
                return Forecast::passthrough(current_prices);
            }
        };

        // Narrow models only carry the first horizon
        let column = if all_horizons.ncols() > horizon.column_index() {
            horizon.column_index()
        } else {
            0
        };

        let mut forecast = Forecast {
            prices: Vec::with_capacity(current_prices.len()),
            sources: Vec::with_capacity(current_prices.len()),
        };
        for (predicted, current) in all_horizons.column(column).iter().zip(current_prices) {
            if predicted.is_finite() {
                forecast.prices.push(*predicted);
                forecast.sources.push(PredictionSource::Model);
            } else {
                forecast.prices.push(*current);
                forecast.sources.push(PredictionSource::Fallback);
            }
        }

        let fallback = forecast.fallback_rows();
        if fallback > 0 {
            warn!(
                "Forecaster produced non-finite prices for {} rows; current price used",
                fallback
            );
        }
        forecast
    }
}

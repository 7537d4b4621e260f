#![allow(dead_code)]

use ndarray::{Array1, Array2, ArrayView2, ArrayView3};
use vfm_engine::application::ml::{ScoringModel, SequenceModel};
use vfm_engine::application::vfm::{EngineComponents, ScorerComponents, VfmEngine};
use vfm_engine::domain::ml::{FeatureSchema, ScalerKind, ScalerState};
use vfm_engine::domain::table::{Column, ColumnData, UnitTable};
use vfm_engine::domain::valuation::VfmWeights;

/// Forecast = current price times a fixed factor per horizon.
pub struct ProportionalForecaster {
    pub factors: [f64; 4],
}

impl SequenceModel for ProportionalForecaster {
    fn predict(&self, input: ArrayView3<f64>) -> Result<Array2<f64>, String> {
        let batch = input.dim().0;
        let mut out = Array2::zeros((batch, 4));
        for b in 0..batch {
            let price = input[[b, 0, 0]];
            for (h, factor) in self.factors.iter().enumerate() {
                out[[b, h]] = price * factor;
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "proportional"
    }
}

/// Same prices for every unit.
pub struct ConstantForecaster {
    pub prices: [f64; 4],
}

impl SequenceModel for ConstantForecaster {
    fn predict(&self, input: ArrayView3<f64>) -> Result<Array2<f64>, String> {
        let batch = input.dim().0;
        let mut out = Array2::zeros((batch, 4));
        for mut row in out.rows_mut() {
            row.assign(&Array1::from(self.prices.to_vec()));
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "constant"
    }
}

pub struct FailingForecaster;

impl SequenceModel for FailingForecaster {
    fn predict(&self, _input: ArrayView3<f64>) -> Result<Array2<f64>, String> {
        Err("session crashed".to_string())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Raw score = first location feature.
pub struct EchoScorer;

impl ScoringModel for EchoScorer {
    fn predict(&self, input: ArrayView2<f64>) -> Result<Array1<f64>, String> {
        Ok(input.column(0).to_owned())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

pub fn identity_scaler(names: &[String]) -> ScalerState {
    ScalerState {
        kind: ScalerKind::Standard,
        feature_names: Some(names.to_vec()),
        center: vec![0.0; names.len()],
        spread: vec![1.0; names.len()],
    }
}

pub fn target_identity() -> ScalerState {
    ScalerState {
        kind: ScalerKind::Standard,
        feature_names: None,
        center: vec![0.0; 4],
        spread: vec![1.0; 4],
    }
}

pub fn components(model: Box<dyn SequenceModel>, with_scorer: bool) -> EngineComponents {
    let schema = FeatureSchema::default();
    EngineComponents {
        sequence_model: model,
        sequence_scaler: identity_scaler(&schema.sequence_features),
        target_scaler: target_identity(),
        scorer: with_scorer.then(|| ScorerComponents {
            model: Box::new(EchoScorer),
            scaler: identity_scaler(&schema.location_features),
        }),
    }
}

pub fn standard_engine(use_scorer: bool, weights: VfmWeights) -> VfmEngine {
    VfmEngine::from_components(
        FeatureSchema::default(),
        weights,
        use_scorer,
        components(
            Box::new(ProportionalForecaster {
                factors: [1.01, 1.05, 1.08, 1.12],
            }),
            use_scorer,
        ),
    )
}

/// Batch with every schema column. The first location column carries `scores`,
/// all other features are zero.
pub fn batch(prices: &[Option<f64>], scores: &[f64]) -> UnitTable {
    let schema = FeatureSchema::default();
    let rows = prices.len();
    let mut columns = vec![Column {
        name: schema.unit_id_column.clone(),
        data: ColumnData::Text((0..rows).map(|i| format!("{:05}", 2028 + i)).collect()),
    }];
    for name in &schema.sequence_features {
        let data = if *name == schema.price_column {
            prices.to_vec()
        } else {
            vec![Some(0.0); rows]
        };
        columns.push(Column {
            name: name.clone(),
            data: ColumnData::Numeric(data),
        });
    }
    for (idx, name) in schema.location_features.iter().enumerate() {
        let data = if idx == 0 {
            scores.iter().map(|s| Some(*s)).collect()
        } else {
            vec![Some(0.0); rows]
        };
        columns.push(Column {
            name: name.clone(),
            data: ColumnData::Numeric(data),
        });
    }
    UnitTable::from_columns(columns).unwrap()
}

pub fn without_columns(table: &UnitTable, dropped: &[&str]) -> UnitTable {
    let kept = table
        .columns()
        .iter()
        .filter(|c| !dropped.contains(&c.name.as_str()))
        .cloned()
        .collect();
    UnitTable::from_columns(kept).unwrap()
}

/// Replaces the named columns with text cells.
pub fn with_text_columns(table: &UnitTable, names: &[&str], cell: &str) -> UnitTable {
    let columns = table
        .columns()
        .iter()
        .map(|c| {
            if names.contains(&c.name.as_str()) {
                Column {
                    name: c.name.clone(),
                    data: ColumnData::Text(vec![cell.to_string(); table.len()]),
                }
            } else {
                c.clone()
            }
        })
        .collect();
    UnitTable::from_columns(columns).unwrap()
}

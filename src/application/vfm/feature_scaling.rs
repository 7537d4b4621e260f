//! Feature scaler adapter.
//!
//! Holds the forecaster-input and scorer-input scalers, each bound to its own
//! column list at construction. The scaled matrices are wrapped in distinct types
//! so a location matrix can never reach the forecaster or vice versa.

use crate::application::ml::load_scaler;
use crate::domain::errors::{ArtifactKind, VfmError};
use crate::domain::ml::{FeatureSchema, ScalerKind, ScalerState};
use crate::domain::table::UnitTable;
use ndarray::{Array2, ArrayView2};
use std::path::PathBuf;
use tracing::debug;

/// Substituted for blank feature cells before scaling.
pub const MISSING_VALUE_DEFAULT: f64 = 0.0;

/// Scaled forecaster input, `[units, sequence features]`
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledSequence(Array2<f64>);

/// Scaled scorer input, `[units, location features]`
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledLocation(Array2<f64>);

impl ScaledSequence {
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    pub fn rows(&self) -> usize {
        self.0.nrows()
    }
}

impl ScaledLocation {
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    pub fn rows(&self) -> usize {
        self.0.nrows()
    }
}

/// Where scaler parameters come from.
#[derive(Debug, Clone)]
pub enum ScalerSource {
    Artifact(ArtifactKind, PathBuf),
    Fit {
        kind: ScalerKind,
        feature_names: Vec<String>,
        data: Array2<f64>,
    },
}

/// Loads stored scaler parameters or fits new ones on the given data.
pub fn fit_or_load(source: ScalerSource) -> Result<ScalerState, VfmError> {
    match source {
        ScalerSource::Artifact(kind, path) => load_scaler(kind, &path),
        ScalerSource::Fit {
            kind,
            feature_names,
            data,
        } => {
            if feature_names.len() != data.ncols() {
                return Err(VfmError::schema(
                    format!(
                        "{} feature names for {} columns",
                        feature_names.len(),
                        data.ncols()
                    ),
                    feature_names,
                ));
            }
            Ok(ScalerState::fit(kind, Some(feature_names), data.view()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureScalerAdapter {
    sequence_columns: Vec<String>,
    location_columns: Vec<String>,
    sequence: ScalerState,
    location: Option<ScalerState>,
}

impl FeatureScalerAdapter {
    /// Binds the sequence scaler to the schema's sequence columns.
    pub fn new(schema: &FeatureSchema, sequence: ScalerState) -> Result<Self, VfmError> {
        check_schema("sequence scaler", &sequence, &schema.sequence_features)?;
        Ok(Self {
            sequence_columns: schema.sequence_features.clone(),
            location_columns: schema.location_features.clone(),
            sequence,
            location: None,
        })
    }

    /// Binds the location scaler to the schema's location columns.
    pub fn with_location(mut self, location: ScalerState) -> Result<Self, VfmError> {
        check_schema("location scaler", &location, &self.location_columns)?;
        self.location = Some(location);
        Ok(self)
    }

    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }

    pub fn scale_sequence(&self, table: &UnitTable) -> Result<ScaledSequence, VfmError> {
        let scaled = scale(table, &self.sequence_columns, &self.sequence)?;
        Ok(ScaledSequence(scaled))
    }

    /// `None` when no location scaler is bound.
    pub fn scale_location(&self, table: &UnitTable) -> Result<Option<ScaledLocation>, VfmError> {
        match &self.location {
            Some(scaler) => Ok(Some(ScaledLocation(scale(
                table,
                &self.location_columns,
                scaler,
            )?))),
            None => Ok(None),
        }
    }
}

fn check_schema(context: &str, scaler: &ScalerState, expected: &[String]) -> Result<(), VfmError> {
    let diff = scaler.schema_diff(expected);
    if diff.is_empty() {
        Ok(())
    } else {
        Err(VfmError::schema(context, diff))
    }
}

fn scale(table: &UnitTable, columns: &[String], scaler: &ScalerState) -> Result<Array2<f64>, VfmError> {
    let (raw, filled) = table.select_matrix(columns, MISSING_VALUE_DEFAULT)?;
    if filled > 0 {
        debug!(
            "Filled {} blank feature cells with {}",
            filled, MISSING_VALUE_DEFAULT
        );
    }
    scaler.transform(raw.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::{Column, ColumnData};
    use ndarray::array;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            price_column: "p".to_string(),
            unit_id_column: "id".to_string(),
            sequence_features: vec!["p".to_string(), "q".to_string()],
            location_features: vec!["loc".to_string()],
        }
    }

    fn scaler(names: &[&str], center: Vec<f64>, spread: Vec<f64>) -> ScalerState {
        ScalerState {
            kind: ScalerKind::Standard,
            feature_names: Some(names.iter().map(|s| s.to_string()).collect()),
            center,
            spread,
        }
    }

    fn table() -> UnitTable {
        UnitTable::from_columns(vec![
            Column {
                name: "loc".to_string(),
                data: ColumnData::Numeric(vec![Some(50.0), Some(70.0)]),
            },
            Column {
                name: "q".to_string(),
                data: ColumnData::Numeric(vec![Some(4.0), None]),
            },
            Column {
                name: "p".to_string(),
                data: ColumnData::Numeric(vec![Some(100.0), Some(300.0)]),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_sequence_scaling_uses_schema_order_and_fills_blanks() {
        let adapter =
            FeatureScalerAdapter::new(&schema(), scaler(&["p", "q"], vec![200.0, 2.0], vec![100.0, 2.0]))
                .unwrap();

        let scaled = adapter.scale_sequence(&table()).unwrap();
        assert_eq!(scaled.view(), array![[-1.0, 1.0], [1.0, -1.0]].view());
    }

    #[test]
    fn test_location_scaler_must_match_location_schema() {
        let adapter =
            FeatureScalerAdapter::new(&schema(), scaler(&["p", "q"], vec![0.0, 0.0], vec![1.0, 1.0]))
                .unwrap();

        // A sequence scaler cannot be bound as the location scaler
        let err = adapter
            .clone()
            .with_location(scaler(&["p", "q"], vec![0.0, 0.0], vec![1.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, VfmError::SchemaMismatch { .. }));

        let adapter = adapter
            .with_location(scaler(&["loc"], vec![50.0], vec![10.0]))
            .unwrap();
        let scaled = adapter.scale_location(&table()).unwrap().unwrap();
        assert_eq!(scaled.view(), array![[0.0], [2.0]].view());
    }

    #[test]
    fn test_unseen_column_rejected_at_bind_time() {
        let err = FeatureScalerAdapter::new(
            &schema(),
            scaler(&["p", "r"], vec![0.0, 0.0], vec![1.0, 1.0]),
        )
        .unwrap_err();
        match err {
            VfmError::SchemaMismatch { columns, .. } => {
                assert!(columns.contains(&"q".to_string()));
                assert!(columns.contains(&"r".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fit_source_requires_matching_names() {
        let fitted = fit_or_load(ScalerSource::Fit {
            kind: ScalerKind::MinMax,
            feature_names: vec!["loc".to_string()],
            data: array![[0.0], [10.0]],
        })
        .unwrap();
        assert_eq!(fitted.spread, vec![10.0]);

        assert!(
            fit_or_load(ScalerSource::Fit {
                kind: ScalerKind::MinMax,
                feature_names: vec![],
                data: array![[0.0], [10.0]],
            })
            .is_err()
        );
    }
}

//! Column-wise feature scaling with statistics frozen at training time.
//!
//! Both supported transforms reduce to `(x - center) / spread`:
//! - `standard`: center = mean, spread = population standard deviation
//! - `min_max`: center = column minimum, spread = column range (output in [0, 1])
//!
//! Statistics are never recomputed at inference time.

use crate::domain::errors::VfmError;
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    #[default]
    Standard,
    MinMax,
}

/// Stored parameters of a fitted scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    #[serde(default)]
    pub kind: ScalerKind,
    /// Column names seen at fit time, in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub center: Vec<f64>,
    pub spread: Vec<f64>,
}

impl ScalerState {
    /// Fits a scaler on `data` (rows = samples, columns = features).
    pub fn fit(kind: ScalerKind, feature_names: Option<Vec<String>>, data: ArrayView2<f64>) -> Self {
        let (center, spread): (Vec<f64>, Vec<f64>) = data
            .axis_iter(Axis(1))
            .map(|column| match kind {
                ScalerKind::Standard => {
                    let n = column.len().max(1) as f64;
                    let mean = column.sum() / n;
                    let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                    (mean, var.sqrt())
                }
                ScalerKind::MinMax => {
                    let min = column.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    if min.is_finite() && max.is_finite() {
                        (min, max - min)
                    } else {
                        (0.0, 1.0)
                    }
                }
            })
            .unzip();

        Self {
            kind,
            feature_names,
            center,
            spread,
        }
    }

    /// Number of columns this scaler was fit on
    pub fn width(&self) -> usize {
        self.center.len()
    }

    /// Checks internal consistency of loaded parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.center.is_empty() {
            return Err("scaler has no columns".to_string());
        }
        if self.center.len() != self.spread.len() {
            return Err(format!(
                "center has {} values but spread has {}",
                self.center.len(),
                self.spread.len()
            ));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.center.len() {
                return Err(format!(
                    "{} feature names for {} columns",
                    names.len(),
                    self.center.len()
                ));
            }
        }
        if let Some(idx) = self
            .center
            .iter()
            .chain(self.spread.iter())
            .position(|v| !v.is_finite())
        {
            return Err(format!("non-finite parameter at position {}", idx));
        }
        Ok(())
    }

    /// Compares the fit-time columns with `expected`.
    ///
    /// Returns the offending column names: expected columns the scaler never saw
    /// and fit-time columns not in `expected`. Scalers stored without names only
    /// have their width checked.
    pub fn schema_diff(&self, expected: &[String]) -> Vec<String> {
        match &self.feature_names {
            Some(names) if names.as_slice() == expected => Vec::new(),
            Some(names) => {
                let mut diff: Vec<String> = expected
                    .iter()
                    .filter(|e| !names.contains(e))
                    .chain(names.iter().filter(|n| !expected.contains(n)))
                    .cloned()
                    .collect();
                if diff.is_empty() {
                    // Same columns, different order
                    diff = expected.to_vec();
                }
                diff
            }
            None if self.width() == expected.len() => Vec::new(),
            None => expected.to_vec(),
        }
    }

    /// Applies `(x - center) / spread` column-wise.
    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>, VfmError> {
        self.check_width(data.ncols())?;
        let mut out = data.to_owned();
        for (mut column, (center, spread)) in out
            .axis_iter_mut(Axis(1))
            .zip(self.center.iter().zip(self.spread.iter()))
        {
            let spread = effective_spread(*spread);
            column.mapv_inplace(|v| (v - center) / spread);
        }
        Ok(out)
    }

    /// Maps scaled values back into original units: `x * spread + center`.
    pub fn inverse_transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>, VfmError> {
        self.check_width(data.ncols())?;
        let mut out = data.to_owned();
        for (mut column, (center, spread)) in out
            .axis_iter_mut(Axis(1))
            .zip(self.center.iter().zip(self.spread.iter()))
        {
            let spread = effective_spread(*spread);
            column.mapv_inplace(|v| v * spread + center);
        }
        Ok(out)
    }

    fn check_width(&self, ncols: usize) -> Result<(), VfmError> {
        if ncols == self.width() {
            return Ok(());
        }
        Err(VfmError::schema(
            format!("scaler fit on {} columns, got {}", self.width(), ncols),
            self.feature_names.clone().unwrap_or_default(),
        ))
    }
}

/// Constant columns are fit with zero spread; they scale by 1.
fn effective_spread(spread: f64) -> f64 {
    if spread == 0.0 { 1.0 } else { spread }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_standard_fit_and_transform() {
        let data = array![[1.0, 10.0], [3.0, 10.0]];
        let scaler = ScalerState::fit(ScalerKind::Standard, None, data.view());

        assert_eq!(scaler.center, vec![2.0, 10.0]);
        assert_eq!(scaler.spread, vec![1.0, 0.0]);

        let scaled = scaler.transform(data.view()).unwrap();
        assert_eq!(scaled, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_min_max_fit() {
        let data = array![[2.0], [4.0], [6.0]];
        let scaler = ScalerState::fit(ScalerKind::MinMax, None, data.view());
        let scaled = scaler.transform(data.view()).unwrap();
        assert_eq!(scaled, array![[0.0], [0.5], [1.0]]);
    }

    #[test]
    fn test_transform_uses_stored_statistics() {
        let scaler = ScalerState {
            kind: ScalerKind::Standard,
            feature_names: None,
            center: vec![100.0],
            spread: vec![20.0],
        };
        // A single-row batch must not be re-centred on itself
        let scaled = scaler.transform(array![[140.0]].view()).unwrap();
        assert_eq!(scaled[[0, 0]], 2.0);

        let restored = scaler.inverse_transform(scaled.view()).unwrap();
        assert_eq!(restored[[0, 0]], 140.0);
    }

    #[test]
    fn test_width_mismatch_is_schema_error() {
        let scaler = ScalerState {
            kind: ScalerKind::Standard,
            feature_names: Some(names(&["a", "b"])),
            center: vec![0.0, 0.0],
            spread: vec![1.0, 1.0],
        };
        let err = scaler.transform(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert!(matches!(err, VfmError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_schema_diff_reports_unseen_columns() {
        let scaler = ScalerState {
            kind: ScalerKind::Standard,
            feature_names: Some(names(&["trans_index", "grid_crime_index"])),
            center: vec![0.0, 0.0],
            spread: vec![1.0, 1.0],
        };

        assert!(scaler.schema_diff(&names(&["trans_index", "grid_crime_index"])).is_empty());

        let diff = scaler.schema_diff(&names(&["trans_index", "hospital_index"]));
        assert!(diff.contains(&"hospital_index".to_string()));
        assert!(diff.contains(&"grid_crime_index".to_string()));

        let reordered = scaler.schema_diff(&names(&["grid_crime_index", "trans_index"]));
        assert_eq!(reordered.len(), 2);
    }

    #[test]
    fn test_validate_rejects_inconsistent_parameters() {
        let mut scaler = ScalerState {
            kind: ScalerKind::MinMax,
            feature_names: None,
            center: vec![0.0, 1.0],
            spread: vec![1.0],
        };
        assert!(scaler.validate().is_err());

        scaler.spread = vec![1.0, f64::NAN];
        assert!(scaler.validate().is_err());

        scaler.spread = vec![1.0, 2.0];
        assert!(scaler.validate().is_ok());
    }

    #[test]
    fn test_deserialize_without_kind_defaults_to_standard() {
        let json = r#"{"center": [1.0], "spread": [2.0]}"#;
        let scaler: ScalerState = serde_json::from_str(json).unwrap();
        assert_eq!(scaler.kind, ScalerKind::Standard);
        assert!(scaler.feature_names.is_none());
    }
}

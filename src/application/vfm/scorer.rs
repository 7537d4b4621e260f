use super::feature_scaling::ScaledLocation;
use crate::application::ml::ScoringModel;
use crate::domain::errors::{Component, VfmError};
use crate::domain::valuation::{MAX_LOCATION_SCORE, PredictionSource};
use ndarray::Array1;
use tracing::warn;

/// Location scores with per-row provenance.
///
/// `applied` tells the compositor whether the scorer term takes part in the
/// blend; the score values themselves are never inspected for that.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationScores {
    pub values: Vec<f64>,
    pub sources: Vec<PredictionSource>,
    pub applied: bool,
}

impl LocationScores {
    /// Zero vector for a disabled scorer.
    pub fn skipped(rows: usize) -> Self {
        Self {
            values: vec![0.0; rows],
            sources: vec![PredictionSource::Skipped; rows],
            applied: false,
        }
    }

    /// Zero vector for a scorer that could not run; the blend still applies.
    pub fn failed(rows: usize) -> Self {
        Self {
            values: vec![0.0; rows],
            sources: vec![PredictionSource::Fallback; rows],
            applied: true,
        }
    }

    pub fn fallback_rows(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| **s == PredictionSource::Fallback)
            .count()
    }
}

/// Feed-forward location scorer, clamped to [0, 100].
pub struct LocationScorer {
    model: Option<Box<dyn ScoringModel>>,
    enabled: bool,
}

impl LocationScorer {
    pub fn new(model: Box<dyn ScoringModel>) -> Self {
        Self {
            model: Some(model),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            model: None,
            enabled: false,
        }
    }

    /// Scorer will contribute to the VFM blend.
    pub fn is_active(&self) -> bool {
        self.enabled && self.model.is_some()
    }

    pub fn input_width(&self) -> Option<usize> {
        self.model.as_ref().and_then(|m| m.input_width())
    }

    /// Raw scores clamped element-wise to [0, 100].
    pub fn predict(&self, input: &ScaledLocation) -> Result<Array1<f64>, VfmError> {
        let model = self
            .model
            .as_ref()
            .filter(|_| self.enabled)
            .ok_or_else(|| VfmError::inference(Component::Scorer, "scorer disabled or not loaded"))?;

        let raw = model
            .predict(input.view())
            .map_err(|e| VfmError::inference(Component::Scorer, e))?;
        if raw.len() != input.rows() {
            return Err(VfmError::inference(
                Component::Scorer,
                format!("{} scores for {} units", raw.len(), input.rows()),
            ));
        }
        Ok(raw.mapv(|v| v.clamp(0.0, MAX_LOCATION_SCORE)))
    }

    /// Scores for a batch of `rows` units. Failed rows score 0.
    pub fn score(&self, input: Option<&ScaledLocation>, rows: usize) -> LocationScores {
        if !self.is_active() {
            return LocationScores::skipped(rows);
        }
        let input = match input {
            Some(input) => input,
            None => {
                warn!("Scorer active but no location features were scaled; scoring 0");
                return LocationScores::failed(rows);
            }
        };
        if rows == 0 {
            return LocationScores {
                values: Vec::new(),
                sources: Vec::new(),
                applied: true,
            };
        }

        match self.predict(input) {
            Ok(scores) => {
                let mut out = LocationScores {
                    values: Vec::with_capacity(rows),
                    sources: Vec::with_capacity(rows),
                    applied: true,
                };
                // clamp() keeps NaN, so those rows still need replacing
                for score in scores.iter() {
                    if score.is_nan() {
                        out.values.push(0.0);
                        out.sources.push(PredictionSource::Fallback);
                    } else {
                        out.values.push(*score);
                        out.sources.push(PredictionSource::Model);
                    }
                }
                let fallback = out.fallback_rows();
                if fallback > 0 {
                    warn!("Scorer produced NaN for {} rows; scored 0", fallback);
                }
                out
            }
            Err(e) => {
                warn!("{}. Scoring {} rows as 0.", e, rows);
                LocationScores::failed(rows)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::vfm::feature_scaling::FeatureScalerAdapter;
    use crate::domain::ml::{FeatureSchema, ScalerKind, ScalerState};
    use crate::domain::table::{Column, ColumnData, UnitTable};
    use ndarray::ArrayView2;

    /// Echoes the first feature as the raw score.
    struct EchoModel;

    impl ScoringModel for EchoModel {
        fn predict(&self, input: ArrayView2<f64>) -> Result<Array1<f64>, String> {
            Ok(input.column(0).to_owned())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct BrokenModel;

    impl ScoringModel for BrokenModel {
        fn predict(&self, _input: ArrayView2<f64>) -> Result<Array1<f64>, String> {
            Err("malformed numeric data".to_string())
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn location_input(values: &[f64]) -> ScaledLocation {
        let table = UnitTable::from_columns(vec![Column {
            name: "loc".to_string(),
            data: ColumnData::Numeric(values.iter().map(|v| Some(*v)).collect()),
        }])
        .unwrap();
        let schema = FeatureSchema {
            price_column: "p".to_string(),
            unit_id_column: "id".to_string(),
            sequence_features: vec!["loc".to_string()],
            location_features: vec!["loc".to_string()],
        };
        let identity = ScalerState {
            kind: ScalerKind::Standard,
            feature_names: None,
            center: vec![0.0],
            spread: vec![1.0],
        };
        FeatureScalerAdapter::new(&schema, identity.clone())
            .and_then(|a| a.with_location(identity))
            .and_then(|a| a.scale_location(&table))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_scores_clamped_to_bounds() {
        let scorer = LocationScorer::new(Box::new(EchoModel));
        let scores = scorer.score(Some(&location_input(&[-12.0, 42.5, 180.0])), 3);

        assert_eq!(scores.values, vec![0.0, 42.5, 100.0]);
        assert!(scores.applied);
        assert_eq!(scores.fallback_rows(), 0);
    }

    #[test]
    fn test_disabled_scorer_returns_zero_vector_and_flag() {
        let scorer = LocationScorer::disabled();
        assert!(!scorer.is_active());

        let scores = scorer.score(Some(&location_input(&[55.0, 60.0])), 2);
        assert_eq!(scores.values, vec![0.0, 0.0]);
        assert!(!scores.applied);
        assert_eq!(scores.sources, vec![PredictionSource::Skipped; 2]);
    }

    #[test]
    fn test_inference_failure_scores_zero() {
        let scorer = LocationScorer::new(Box::new(BrokenModel));
        let scores = scorer.score(Some(&location_input(&[10.0])), 1);
        assert_eq!(scores.values, vec![0.0]);
        assert_eq!(scores.sources, vec![PredictionSource::Fallback]);
        assert!(scores.applied);
    }

    #[test]
    fn test_nan_rows_score_zero() {
        let scorer = LocationScorer::new(Box::new(EchoModel));
        let scores = scorer.score(Some(&location_input(&[f64::NAN, 30.0])), 2);
        assert_eq!(scores.values, vec![0.0, 30.0]);
        assert_eq!(scores.fallback_rows(), 1);
    }
}

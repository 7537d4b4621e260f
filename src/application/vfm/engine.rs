//! VFM engine facade.
//!
//! Loads the forecaster and scorer once, then serves any number of
//! `calculate_vfm` calls through `&self`. The lifecycle is an explicit state
//! machine:
//!
//! ```text
//! Uninitialized -> Loading -> Ready | Degraded | Failed
//! ```
//!
//! There is no retry. A `Failed` engine re-raises its load error on every call.

use super::compositor::VfmCompositor;
use super::feature_scaling::FeatureScalerAdapter;
use super::forecaster::{Forecast, SequenceForecaster};
use super::report::{EngineStatus, VfmReport};
use super::scorer::{LocationScorer, LocationScores};
use crate::application::ml::{
    ScoringModel, SequenceModel, load_scaler, load_scoring_model, load_sequence_model,
};
use crate::config::EngineConfig;
use crate::domain::errors::{ArtifactKind, Component, VfmError};
use crate::domain::horizon::Horizon;
use crate::domain::ml::{FeatureSchema, ScalerState};
use crate::domain::table::UnitTable;
use crate::domain::valuation::{PredictionSource, VfmWeights};
use crate::infrastructure::observability::EngineMetrics;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    /// Scorer unavailable for the engine's life
    Degraded { reasons: Vec<VfmError> },
    /// Required artifact unusable; holds the original load error
    Failed(VfmError),
}

impl EngineState {
    pub fn can_transition_to(&self, next: &EngineState) -> bool {
        matches!(
            (self, next),
            (EngineState::Uninitialized, EngineState::Loading)
                | (EngineState::Loading, EngineState::Ready)
                | (EngineState::Loading, EngineState::Degraded { .. })
                | (EngineState::Loading, EngineState::Failed(_))
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Degraded { .. } => "degraded",
            EngineState::Failed(_) => "failed",
        }
    }

    /// Numeric code exported through the state gauge
    pub fn code(&self) -> u8 {
        match self {
            EngineState::Uninitialized => 0,
            EngineState::Loading => 1,
            EngineState::Ready => 2,
            EngineState::Degraded { .. } => 3,
            EngineState::Failed(_) => 4,
        }
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, EngineState::Ready | EngineState::Degraded { .. })
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Degraded { reasons } => {
                write!(f, "degraded ({} scorer issues)", reasons.len())
            }
            EngineState::Failed(e) => write!(f, "failed: {}", e),
            other => f.write_str(other.name()),
        }
    }
}

/// Already-loaded scorer parts.
pub struct ScorerComponents {
    pub model: Box<dyn ScoringModel>,
    pub scaler: ScalerState,
}

/// Already-loaded engine parts, for callers that build models in memory.
pub struct EngineComponents {
    pub sequence_model: Box<dyn SequenceModel>,
    pub sequence_scaler: ScalerState,
    pub target_scaler: ScalerState,
    pub scorer: Option<ScorerComponents>,
}

pub struct VfmEngine {
    state: EngineState,
    schema: FeatureSchema,
    use_scorer: bool,
    scaler: Option<FeatureScalerAdapter>,
    forecaster: SequenceForecaster,
    scorer: LocationScorer,
    compositor: VfmCompositor,
    metrics: Option<EngineMetrics>,
}

impl VfmEngine {
    fn uninitialized(schema: FeatureSchema, weights: VfmWeights, use_scorer: bool) -> Self {
        Self {
            state: EngineState::Uninitialized,
            schema,
            use_scorer,
            scaler: None,
            forecaster: SequenceForecaster::unavailable(),
            scorer: LocationScorer::disabled(),
            compositor: VfmCompositor::new(weights),
            metrics: None,
        }
    }

    /// Loads all artifacts named by `config`.
    ///
    /// Always returns an engine. Load failures are recorded in its state.
    pub fn new(config: &EngineConfig) -> Self {
        let mut engine = Self::uninitialized(config.schema(), config.weights(), config.use_scorer);
        engine.transition(EngineState::Loading);
        info!(
            "Loading VFM engine for {} contracts (scorer {})",
            config.contract,
            if config.use_scorer { "on" } else { "off" }
        );

        let required = match load_required(config) {
            Ok(required) => required,
            Err(e) => {
                engine.fail(e);
                return engine;
            }
        };

        let (scorer, mut reasons) = if config.use_scorer {
            load_scorer(config)
        } else {
            (None, Vec::new())
        };
        let (sequence_model, sequence_scaler, target_scaler) = required;
        let components = EngineComponents {
            sequence_model,
            sequence_scaler,
            target_scaler,
            scorer,
        };
        engine.install(components, &mut reasons);
        engine
    }

    /// Like [`VfmEngine::new`], but a `Failed` engine is returned as its error.
    pub fn load(config: &EngineConfig) -> Result<Self, VfmError> {
        let engine = Self::new(config);
        match &engine.state {
            EngineState::Failed(e) => Err(e.clone()),
            _ => Ok(engine),
        }
    }

    /// Builds an engine from components that are already in memory.
    pub fn from_components(
        schema: FeatureSchema,
        weights: VfmWeights,
        use_scorer: bool,
        components: EngineComponents,
    ) -> Self {
        let mut engine = Self::uninitialized(schema, weights, use_scorer);
        engine.transition(EngineState::Loading);

        let mut reasons = Vec::new();
        if use_scorer && components.scorer.is_none() {
            reasons.push(VfmError::ArtifactMissing {
                artifact: ArtifactKind::ScorerModel,
                path: PathBuf::new(),
            });
        }
        engine.install(components, &mut reasons);
        engine
    }

    /// Attaches a metrics registry; the current state is exported immediately.
    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        metrics.set_state_code(self.state.code());
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn weights(&self) -> VfmWeights {
        self.compositor.weights()
    }

    /// Whether the scorer contributes to VFM for this engine's life.
    pub fn scorer_enabled(&self) -> bool {
        self.scorer.is_active()
    }

    pub fn metrics(&self) -> Option<&EngineMetrics> {
        self.metrics.as_ref()
    }

    fn transition(&mut self, next: EngineState) {
        if !self.state.can_transition_to(&next) {
            // Unreachable through the public constructors
            error!("Refusing engine transition {} -> {}", self.state.name(), next.name());
            return;
        }
        debug!("Engine state {} -> {}", self.state.name(), next.name());
        self.state = next;
        if let Some(metrics) = &self.metrics {
            metrics.set_state_code(self.state.code());
        }
    }

    fn fail(&mut self, e: VfmError) {
        error!("VFM engine failed to load: {}", e);
        self.transition(EngineState::Failed(e));
    }

    fn install(&mut self, components: EngineComponents, reasons: &mut Vec<VfmError>) {
        let EngineComponents {
            sequence_model,
            sequence_scaler,
            target_scaler,
            scorer,
        } = components;

        if let Some(width) = sequence_model.input_width() {
            if width != sequence_scaler.width() {
                self.fail(VfmError::schema(
                    format!(
                        "forecaster expects {} features, scaler has {}",
                        width,
                        sequence_scaler.width()
                    ),
                    self.schema.sequence_features.clone(),
                ));
                return;
            }
        }

        let mut adapter = match FeatureScalerAdapter::new(&self.schema, sequence_scaler) {
            Ok(adapter) => adapter,
            Err(e) => {
                self.fail(e);
                return;
            }
        };
        self.forecaster = SequenceForecaster::new(sequence_model, target_scaler);

        if self.use_scorer {
            if let Some(ScorerComponents { model, scaler }) = scorer {
                match bind_scorer(&adapter, model.as_ref(), scaler) {
                    Ok(with_location) => {
                        adapter = with_location;
                        self.scorer = LocationScorer::new(model);
                    }
                    Err(e) => reasons.push(e),
                }
            }
        }
        self.scaler = Some(adapter);

        if self.use_scorer && !self.scorer.is_active() {
            for reason in reasons.iter() {
                warn!("Location scorer unavailable: {}", reason);
            }
            warn!("VFM engine degraded: scorer disabled, VFM falls back to price ratio");
            let reasons = std::mem::take(reasons);
            self.transition(EngineState::Degraded { reasons });
        } else {
            info!("VFM engine ready");
            self.transition(EngineState::Ready);
        }
    }

    /// Computes VFM for every row of `table` at the given horizon.
    ///
    /// Unsupported horizons use the 6-month forecast. Missing required columns
    /// fail this call only; the engine stays usable. Malformed cells in a
    /// present column degrade the affected component instead.
    pub fn calculate_vfm(&self, table: &UnitTable, horizon_months: u32) -> Result<VfmReport, VfmError> {
        let started = Instant::now();
        let status = match &self.state {
            EngineState::Ready => EngineStatus::Ready,
            EngineState::Degraded { .. } => EngineStatus::Degraded,
            EngineState::Failed(e) => return Err(e.clone()),
            other => {
                return Err(VfmError::NotReady {
                    state: other.name().to_string(),
                });
            }
        };
        let scaler = self.scaler.as_ref().ok_or_else(|| VfmError::NotReady {
            state: self.state.name().to_string(),
        })?;

        let horizon = Horizon::from_months(horizon_months);
        let scorer_active = self.scorer.is_active();
        let missing = table.missing_columns(&self.schema.required_columns(scorer_active));
        if !missing.is_empty() {
            let err = VfmError::schema(
                "input batch",
                missing.into_iter().map(str::to_string).collect(),
            );
            warn!("Rejected batch of {} rows: {}", table.len(), err);
            return Err(err);
        }

        let prices = table.parsed_values(&self.schema.price_column, 0.0)?;
        if prices.filled > 0 {
            debug!("{} rows without a current price, using 0", prices.filled);
        }

        // Columns are present at this point; a scaling error means malformed cells
        let forecast = match scaler.scale_sequence(table) {
            Ok(sequence) => self.forecaster.forecast(&sequence, &prices.values, horizon),
            Err(e) => {
                warn!(
                    "{}. Passing {} current prices through.",
                    VfmError::inference(Component::Forecaster, e),
                    table.len()
                );
                Forecast::passthrough(&prices.values)
            }
        };
        let scores = if scorer_active {
            match scaler.scale_location(table) {
                Ok(location) => self.scorer.score(location.as_ref(), table.len()),
                Err(e) => {
                    warn!(
                        "{}. Scoring {} rows as 0.",
                        VfmError::inference(Component::Scorer, e),
                        table.len()
                    );
                    LocationScores::failed(table.len())
                }
            }
        } else {
            LocationScores::skipped(table.len())
        };
        let composed = self
            .compositor
            .compose_batch(&prices.values, &forecast, &scores, horizon);

        let mut output = table.clone();
        VfmCompositor::append_columns(&mut output, &composed)?;

        let report = VfmReport {
            table: output,
            horizon,
            forecast_sources: forecast.sources,
            score_sources: scores.sources,
            scorer_applied: scores.applied,
            status,
        };

        if let Some(metrics) = &self.metrics {
            record_batch(metrics, &report, &composed.vfm_index, started);
        }
        info!(
            "Computed VFM for {} rows at {} horizon ({} forecast fallbacks, scorer {})",
            report.len(),
            horizon,
            report.forecast_fallback_rows(),
            if report.scorer_applied { "applied" } else { "off" }
        );
        Ok(report)
    }
}

type RequiredParts = (Box<dyn SequenceModel>, ScalerState, ScalerState);

fn load_required(config: &EngineConfig) -> Result<RequiredParts, VfmError> {
    let sequence_model = load_sequence_model(&config.forecaster_model)?;
    let sequence_scaler = load_scaler(
        ArtifactKind::ForecasterInputScaler,
        &config.forecaster_input_scaler,
    )?;
    let target_scaler = load_scaler(
        ArtifactKind::ForecasterOutputScaler,
        &config.forecaster_output_scaler,
    )?;
    Ok((sequence_model, sequence_scaler, target_scaler))
}

fn configured_path(artifact: ArtifactKind, path: Option<&Path>) -> Result<&Path, VfmError> {
    path.ok_or_else(|| VfmError::ArtifactMissing {
        artifact,
        path: PathBuf::new(),
    })
}

/// Loads both scorer artifacts, collecting every failure.
fn load_scorer(config: &EngineConfig) -> (Option<ScorerComponents>, Vec<VfmError>) {
    let model = configured_path(ArtifactKind::ScorerModel, config.scorer_model.as_deref())
        .and_then(load_scoring_model);
    let scaler = configured_path(
        ArtifactKind::ScorerInputScaler,
        config.scorer_input_scaler.as_deref(),
    )
    .and_then(|path| load_scaler(ArtifactKind::ScorerInputScaler, path));

    match (model, scaler) {
        (Ok(model), Ok(scaler)) => (Some(ScorerComponents { model, scaler }), Vec::new()),
        (model, scaler) => {
            let reasons = [model.err(), scaler.err()].into_iter().flatten().collect();
            (None, reasons)
        }
    }
}

fn bind_scorer(
    adapter: &FeatureScalerAdapter,
    model: &dyn ScoringModel,
    scaler: ScalerState,
) -> Result<FeatureScalerAdapter, VfmError> {
    if let Some(width) = model.input_width() {
        if width != scaler.width() {
            return Err(VfmError::schema(
                format!(
                    "scorer expects {} features, scaler has {}",
                    width,
                    scaler.width()
                ),
                Vec::new(),
            ));
        }
    }
    adapter.clone().with_location(scaler)
}

fn record_batch(metrics: &EngineMetrics, report: &VfmReport, vfm_index: &[f64], started: Instant) {
    metrics.batches_total.inc();
    metrics
        .batch_duration_seconds
        .observe(started.elapsed().as_secs_f64());
    for source in [
        PredictionSource::Model,
        PredictionSource::Fallback,
        PredictionSource::Skipped,
    ] {
        let forecast_rows = report.forecast_sources.iter().filter(|s| **s == source).count();
        let score_rows = report.score_sources.iter().filter(|s| **s == source).count();
        metrics.inc_rows("forecaster", source.label(), forecast_rows);
        metrics.inc_rows("scorer", source.label(), score_rows);
    }
    if !vfm_index.is_empty() {
        let mean = vfm_index.iter().sum::<f64>() / vfm_index.len() as f64;
        metrics.last_batch_mean_vfm.set(mean);
    }
}

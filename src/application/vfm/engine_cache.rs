use super::engine::VfmEngine;
use crate::config::{ContractType, EngineConfig};
use crate::domain::errors::VfmError;
use crate::domain::ml::LocationSchemaVersion;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Every config field that changes what an engine loads or computes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    contract: ContractType,
    forecaster_model: PathBuf,
    forecaster_input_scaler: PathBuf,
    forecaster_output_scaler: PathBuf,
    scorer_model: Option<PathBuf>,
    scorer_input_scaler: Option<PathBuf>,
    use_scorer: bool,
    alpha_bits: u64,
    beta_bits: u64,
    location_schema: LocationSchemaVersion,
}

impl CacheKey {
    fn of(config: &EngineConfig) -> Self {
        Self {
            contract: config.contract,
            forecaster_model: config.forecaster_model.clone(),
            forecaster_input_scaler: config.forecaster_input_scaler.clone(),
            forecaster_output_scaler: config.forecaster_output_scaler.clone(),
            scorer_model: config.scorer_model.clone(),
            scorer_input_scaler: config.scorer_input_scaler.clone(),
            use_scorer: config.use_scorer,
            alpha_bits: config.alpha.to_bits(),
            beta_bits: config.beta.to_bits(),
            location_schema: config.location_schema,
        }
    }
}

/// Caller-owned memoization of loaded engines, one per distinct config
/// (contract type, artifact paths, blend setting, location schema).
/// Failed loads are returned but not cached.
#[derive(Default)]
pub struct EngineCache {
    engines: Mutex<HashMap<CacheKey, Arc<VfmEngine>>>,
}

impl EngineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, config: &EngineConfig) -> Result<Arc<VfmEngine>, VfmError> {
        self.get_or_insert_with(config, || VfmEngine::load(config))
    }

    /// Returns the cached engine for `config` or builds one with `build`.
    pub fn get_or_insert_with<F>(&self, config: &EngineConfig, build: F) -> Result<Arc<VfmEngine>, VfmError>
    where
        F: FnOnce() -> Result<VfmEngine, VfmError>,
    {
        let key = CacheKey::of(config);
        let mut engines = self.lock();
        if let Some(engine) = engines.get(&key) {
            return Ok(Arc::clone(engine));
        }

        let engine = Arc::new(build()?);
        info!(
            "Cached VFM engine for {} contracts ({})",
            config.contract,
            engine.state()
        );
        engines.insert(key, Arc::clone(&engine));
        Ok(engine)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<VfmEngine>>> {
        self.engines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

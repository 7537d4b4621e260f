//! Engine configuration: artifact paths, scorer toggle and blend weights.
//!
//! Sources, in order of precedence:
//! 1. `VFM_*` environment variables
//! 2. a TOML file named by `VFM_CONFIG_FILE`
//! 3. the conventional artifact layout for `VFM_CONTRACT_TYPE` under `VFM_MODEL_ROOT`

use crate::domain::ml::{FeatureSchema, LocationSchemaVersion};
use crate::domain::valuation::VfmWeights;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Rental contract the models were trained for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    /// Monthly rent with deposit
    #[default]
    Monthly,
    /// Lump-sum deposit lease
    Jeonse,
}

impl ContractType {
    /// Suffix used in forecaster artifact file names
    pub fn artifact_suffix(&self) -> &'static str {
        match self {
            ContractType::Monthly => "",
            ContractType::Jeonse => "_jeonse",
        }
    }
}

impl FromStr for ContractType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" | "wolse" => Ok(ContractType::Monthly),
            "jeonse" => Ok(ContractType::Jeonse),
            _ => anyhow::bail!(
                "Invalid contract type: {}. Must be 'monthly' or 'jeonse'",
                s
            ),
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractType::Monthly => f.write_str("monthly"),
            ContractType::Jeonse => f.write_str("jeonse"),
        }
    }
}

/// Constructor-time engine configuration. Immutable once an engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub contract: ContractType,
    pub forecaster_model: PathBuf,
    pub forecaster_input_scaler: PathBuf,
    pub forecaster_output_scaler: PathBuf,
    pub scorer_model: Option<PathBuf>,
    pub scorer_input_scaler: Option<PathBuf>,
    pub use_scorer: bool,
    pub alpha: f64,
    pub beta: f64,
    pub location_schema: LocationSchemaVersion,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_contract(ContractType::default(), Path::new("models"))
    }
}

impl EngineConfig {
    /// Conventional layout under `model_root`:
    ///
    /// ```text
    /// lstm/vfm_lstm_time_split{suffix}_v1.onnx
    /// lstm/scaler_X_time{suffix}.json
    /// lstm/scaler_y_time{suffix}.json
    /// mlp/vfm_mlp.json
    /// mlp/mlp_scaler.json
    /// ```
    pub fn for_contract(contract: ContractType, model_root: &Path) -> Self {
        let suffix = contract.artifact_suffix();
        let lstm = model_root.join("lstm");
        let mlp = model_root.join("mlp");
        let weights = VfmWeights::default();

        Self {
            contract,
            forecaster_model: lstm.join(format!("vfm_lstm_time_split{}_v1.onnx", suffix)),
            forecaster_input_scaler: lstm.join(format!("scaler_X_time{}.json", suffix)),
            forecaster_output_scaler: lstm.join(format!("scaler_y_time{}.json", suffix)),
            scorer_model: Some(mlp.join("vfm_mlp.json")),
            scorer_input_scaler: Some(mlp.join("mlp_scaler.json")),
            use_scorer: true,
            alpha: weights.alpha,
            beta: weights.beta,
            location_schema: LocationSchemaVersion::default(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("VFM_CONFIG_FILE") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                let contract = match lookup("VFM_CONTRACT_TYPE") {
                    Some(raw) => raw.parse::<ContractType>()?,
                    None => ContractType::default(),
                };
                let root = lookup("VFM_MODEL_ROOT").unwrap_or_else(|| "models".to_string());
                Self::for_contract(contract, Path::new(&root))
            }
        };

        if let Some(path) = lookup("VFM_FORECASTER_MODEL") {
            config.forecaster_model = PathBuf::from(path);
        }
        if let Some(path) = lookup("VFM_FORECASTER_INPUT_SCALER") {
            config.forecaster_input_scaler = PathBuf::from(path);
        }
        if let Some(path) = lookup("VFM_FORECASTER_OUTPUT_SCALER") {
            config.forecaster_output_scaler = PathBuf::from(path);
        }
        if let Some(path) = lookup("VFM_SCORER_MODEL") {
            config.scorer_model = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("VFM_SCORER_INPUT_SCALER") {
            config.scorer_input_scaler = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("VFM_USE_SCORER") {
            config.use_scorer = parse_bool("VFM_USE_SCORER", &raw)?;
        }
        if let Some(raw) = lookup("VFM_ALPHA") {
            config.alpha = parse_f64("VFM_ALPHA", &raw)?;
        }
        if let Some(raw) = lookup("VFM_BETA") {
            config.beta = parse_f64("VFM_BETA", &raw)?;
        }
        if let Some(raw) = lookup("VFM_LOCATION_SCHEMA") {
            config.location_schema = raw.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse engine config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid engine config {}", path.display()))
    }

    pub fn weights(&self) -> VfmWeights {
        VfmWeights {
            alpha: self.alpha,
            beta: self.beta,
        }
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::for_location_version(self.location_schema)
    }

    /// Weights must be finite. They are not required to sum to 1.
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() {
            anyhow::bail!("alpha must be finite, got {}", self.alpha);
        }
        if !self.beta.is_finite() {
            anyhow::bail!("beta must be finite, got {}", self.beta);
        }
        Ok(())
    }
}

fn parse_f64(key: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Failed to parse {}: '{}' is not a boolean", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_contract_layout() {
        let monthly = EngineConfig::for_contract(ContractType::Monthly, Path::new("m"));
        assert_eq!(
            monthly.forecaster_model,
            PathBuf::from("m/lstm/vfm_lstm_time_split_v1.onnx")
        );
        assert_eq!(
            monthly.forecaster_output_scaler,
            PathBuf::from("m/lstm/scaler_y_time.json")
        );

        let jeonse = EngineConfig::for_contract(ContractType::Jeonse, Path::new("m"));
        assert_eq!(
            jeonse.forecaster_input_scaler,
            PathBuf::from("m/lstm/scaler_X_time_jeonse.json")
        );
        assert_eq!(jeonse.scorer_model, Some(PathBuf::from("m/mlp/vfm_mlp.json")));
        assert!(jeonse.use_scorer);
    }

    #[test]
    fn test_env_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).expect("Should parse with defaults");
        assert_eq!(config.contract, ContractType::Monthly);
        assert_eq!(config.alpha, 0.6);
        assert_eq!(config.beta, 0.4);
        assert!(config.use_scorer);
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("VFM_CONTRACT_TYPE", "jeonse"),
            ("VFM_MODEL_ROOT", "/opt/vfm"),
            ("VFM_USE_SCORER", "false"),
            ("VFM_ALPHA", "0.7"),
            ("VFM_BETA", "0.5"),
            ("VFM_LOCATION_SCHEMA", "hospital"),
        ]))
        .unwrap();

        assert_eq!(config.contract, ContractType::Jeonse);
        assert!(!config.use_scorer);
        assert_eq!(config.weights(), VfmWeights { alpha: 0.7, beta: 0.5 });
        assert_eq!(
            config.forecaster_model,
            PathBuf::from("/opt/vfm/lstm/vfm_lstm_time_split_jeonse_v1.onnx")
        );
        assert_eq!(
            config.schema().location_features.last().map(String::as_str),
            Some("hospital_index")
        );
    }

    #[test]
    fn test_env_parse_errors_name_variable() {
        let err = EngineConfig::from_lookup(lookup_from(&[("VFM_ALPHA", "heavy")])).unwrap_err();
        assert!(format!("{:#}", err).contains("VFM_ALPHA"));

        let err = EngineConfig::from_lookup(lookup_from(&[("VFM_USE_SCORER", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("VFM_USE_SCORER"));

        assert!(EngineConfig::from_lookup(lookup_from(&[("VFM_CONTRACT_TYPE", "lease")])).is_err());
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            contract = "jeonse"
            forecaster_model = "custom/forecaster.json"
            use_scorer = false
            beta = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(config.contract, ContractType::Jeonse);
        assert_eq!(config.forecaster_model, PathBuf::from("custom/forecaster.json"));
        assert!(!config.use_scorer);
        assert_eq!(config.alpha, 0.6);
        assert_eq!(config.beta, 1.0);
    }

    #[test]
    fn test_non_finite_weights_rejected() {
        let mut config = EngineConfig::default();
        config.alpha = f64::NAN;
        assert!(config.validate().is_err());
    }
}

//! Loading of model and scaler artifacts from disk.
//!
//! Each artifact is read into memory in one call and the file handle is closed
//! before parsing starts, so a failed load never leaves a handle open.

use super::lstm_predictor::{LstmPredictor, LstmSpec};
use super::mlp_predictor::{MlpPredictor, MlpSpec};
use super::onnx_predictor::{OnnxScoringModel, OnnxSequenceModel, build_session};
use super::predictor::{ScoringModel, SequenceModel};
use crate::domain::errors::{ArtifactKind, VfmError};
use crate::domain::ml::ScalerState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info};

/// Native network artifact, tagged by architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "architecture", rename_all = "lowercase")]
pub enum NativeModelSpec {
    Lstm(LstmSpec),
    Mlp(MlpSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Onnx,
    NativeJson,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "onnx" => Some(ModelFormat::Onnx),
            "json" => Some(ModelFormat::NativeJson),
            _ => None,
        }
    }
}

fn read_artifact(artifact: ArtifactKind, path: &Path) -> Result<Vec<u8>, VfmError> {
    fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            VfmError::ArtifactMissing {
                artifact,
                path: path.to_path_buf(),
            }
        } else {
            VfmError::ArtifactInvalid {
                artifact,
                path: path.to_path_buf(),
                reason: format!("read failed: {}", e),
            }
        }
    })
}

fn invalid(artifact: ArtifactKind, path: &Path, reason: impl Into<String>) -> VfmError {
    let err = VfmError::ArtifactInvalid {
        artifact,
        path: path.to_path_buf(),
        reason: reason.into(),
    };
    error!("{}", err);
    err
}

pub fn load_scaler(artifact: ArtifactKind, path: &Path) -> Result<ScalerState, VfmError> {
    let bytes = read_artifact(artifact, path)?;
    let scaler: ScalerState = serde_json::from_slice(&bytes)
        .map_err(|e| invalid(artifact, path, format!("scaler JSON: {}", e)))?;
    scaler.validate().map_err(|reason| invalid(artifact, path, reason))?;

    info!(
        "Loaded {} from {:?} ({} columns)",
        artifact,
        path,
        scaler.width()
    );
    Ok(scaler)
}

fn model_format(artifact: ArtifactKind, path: &Path) -> Result<ModelFormat, VfmError> {
    if !path.exists() {
        return Err(VfmError::ArtifactMissing {
            artifact,
            path: path.to_path_buf(),
        });
    }
    ModelFormat::from_path(path).ok_or_else(|| {
        invalid(
            artifact,
            path,
            "unsupported model format, expected .onnx or .json",
        )
    })
}

fn parse_native(artifact: ArtifactKind, path: &Path, bytes: &[u8]) -> Result<NativeModelSpec, VfmError> {
    serde_json::from_slice(bytes).map_err(|e| invalid(artifact, path, format!("model JSON: {}", e)))
}

pub fn load_sequence_model(path: &Path) -> Result<Box<dyn SequenceModel>, VfmError> {
    let artifact = ArtifactKind::ForecasterModel;
    let format = model_format(artifact, path)?;
    let bytes = read_artifact(artifact, path)?;

    let model: Box<dyn SequenceModel> = match format {
        ModelFormat::Onnx => {
            let session = build_session(&bytes).map_err(|e| invalid(artifact, path, e))?;
            Box::new(OnnxSequenceModel::new(session))
        }
        ModelFormat::NativeJson => match parse_native(artifact, path, &bytes)? {
            NativeModelSpec::Lstm(spec) => {
                Box::new(LstmPredictor::from_spec(spec).map_err(|e| invalid(artifact, path, e))?)
            }
            NativeModelSpec::Mlp(_) => {
                return Err(invalid(artifact, path, "forecaster must be an lstm network"));
            }
        },
    };

    info!("Successfully loaded {} from {:?}", model.name(), path);
    Ok(model)
}

pub fn load_scoring_model(path: &Path) -> Result<Box<dyn ScoringModel>, VfmError> {
    let artifact = ArtifactKind::ScorerModel;
    let format = model_format(artifact, path)?;
    let bytes = read_artifact(artifact, path)?;

    let model: Box<dyn ScoringModel> = match format {
        ModelFormat::Onnx => {
            let session = build_session(&bytes).map_err(|e| invalid(artifact, path, e))?;
            Box::new(OnnxScoringModel::new(session))
        }
        ModelFormat::NativeJson => match parse_native(artifact, path, &bytes)? {
            NativeModelSpec::Mlp(spec) => {
                Box::new(MlpPredictor::from_spec(spec).map_err(|e| invalid(artifact, path, e))?)
            }
            NativeModelSpec::Lstm(_) => {
                return Err(invalid(artifact, path, "scorer must be an mlp network"));
            }
        },
    };

    info!("Successfully loaded {} from {:?}", model.name(), path);
    Ok(model)
}

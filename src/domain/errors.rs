use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Artifacts the engine loads at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ForecasterModel,
    ForecasterInputScaler,
    ForecasterOutputScaler,
    ScorerModel,
    ScorerInputScaler,
}

impl ArtifactKind {
    /// Required artifacts put the engine in `Failed` when they cannot be loaded.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            ArtifactKind::ForecasterModel
                | ArtifactKind::ForecasterInputScaler
                | ArtifactKind::ForecasterOutputScaler
        )
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::ForecasterModel => "forecaster model",
            ArtifactKind::ForecasterInputScaler => "forecaster input scaler",
            ArtifactKind::ForecasterOutputScaler => "forecaster output scaler",
            ArtifactKind::ScorerModel => "scorer model",
            ArtifactKind::ScorerInputScaler => "scorer input scaler",
        };
        f.write_str(name)
    }
}

/// Inference components, used to attribute inference failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Forecaster,
    Scorer,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Forecaster => f.write_str("forecaster"),
            Component::Scorer => f.write_str("scorer"),
        }
    }
}

/// Errors raised by the VFM engine and its components
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VfmError {
    #[error("Artifact missing: {artifact} not found at {path:?}")]
    ArtifactMissing { artifact: ArtifactKind, path: PathBuf },

    #[error("Artifact invalid: {artifact} at {path:?}: {reason}")]
    ArtifactInvalid {
        artifact: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error("Schema mismatch ({context}): missing or unexpected columns {columns:?}")]
    SchemaMismatch { context: String, columns: Vec<String> },

    #[error("Inference failed in {component}: {reason}")]
    InferenceFailure { component: Component, reason: String },

    #[error("Engine not ready: state is {state}")]
    NotReady { state: String },
}

impl VfmError {
    pub fn schema(context: impl Into<String>, columns: Vec<String>) -> Self {
        VfmError::SchemaMismatch {
            context: context.into(),
            columns,
        }
    }

    pub fn inference(component: Component, reason: impl fmt::Display) -> Self {
        VfmError::InferenceFailure {
            component,
            reason: reason.to_string(),
        }
    }
}

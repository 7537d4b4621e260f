pub mod artifact_loader;
pub mod layers;
pub mod lstm_predictor;
pub mod mlp_predictor;
pub mod onnx_predictor;
pub mod predictor;

pub use artifact_loader::{NativeModelSpec, load_scaler, load_scoring_model, load_sequence_model};
pub use predictor::{ScoringModel, SequenceModel};

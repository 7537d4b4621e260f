use super::predictor::{ScoringModel, SequenceModel};
use ndarray::{Array1, Array2, ArrayView2, ArrayView3};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use std::sync::Mutex;
use tracing::debug;

/// Builds a session from in-memory model bytes.
///
/// Single intra-op thread keeps float reductions in a fixed order across runs.
pub fn build_session(model_bytes: &[u8]) -> Result<Session, String> {
    Session::builder()
        .map_err(|e| format!("Failed to create ONNX session builder: {}", e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| e.to_string())?
        .with_intra_threads(1)
        .map_err(|e| e.to_string())?
        .commit_from_memory(model_bytes)
        .map_err(|e| format!("Failed to load ONNX model: {}", e))
}

/// Runs the first model input with an f32 tensor and returns the first output
/// flattened.
fn run_first_output(
    session: &Mutex<Session>,
    shape: Vec<usize>,
    data: Vec<f32>,
) -> Result<Vec<f64>, String> {
    let mut session = session
        .lock()
        .map_err(|e| format!("Mutex lock failed: {}", e))?;

    let input_value = ort::value::Value::from_array((shape.as_slice(), data))
        .map_err(|e| format!("Input value creation failed: {}", e))?;

    let inputs = ort::inputs![input_value];

    let outputs = session.run(inputs).map_err(|e| e.to_string())?;
    let output_value = outputs
        .iter()
        .next()
        .map(|(_, v)| v)
        .ok_or("No output found")?;
    let data = output_value
        .try_extract_tensor::<f32>()
        .map_err(|e| e.to_string())?;
    Ok(data.1.iter().map(|v| *v as f64).collect())
}

/// Sequence forecaster exported to ONNX (`[batch, timesteps, features]` input)
pub struct OnnxSequenceModel {
    session: Mutex<Session>,
}

impl OnnxSequenceModel {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl SequenceModel for OnnxSequenceModel {
    fn predict(&self, input: ArrayView3<f64>) -> Result<Array2<f64>, String> {
        let (batch, steps, features) = input.dim();
        let flat: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let values = run_first_output(&self.session, vec![batch, steps, features], flat)?;

        if batch == 0 || values.is_empty() || values.len() % batch != 0 {
            return Err(format!(
                "ONNX output of {} values does not split into {} rows",
                values.len(),
                batch
            ));
        }
        let outputs = values.len() / batch;
        debug!("ONNX forecaster returned {}x{}", batch, outputs);
        Array2::from_shape_vec((batch, outputs), values).map_err(|e| e.to_string())
    }

    fn name(&self) -> &str {
        "ONNX Runtime (LSTM)"
    }
}

/// Location scorer exported to ONNX (`[batch, features]` input, one output per row)
pub struct OnnxScoringModel {
    session: Mutex<Session>,
}

impl OnnxScoringModel {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl ScoringModel for OnnxScoringModel {
    fn predict(&self, input: ArrayView2<f64>) -> Result<Array1<f64>, String> {
        let (batch, features) = input.dim();
        let flat: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let values = run_first_output(&self.session, vec![batch, features], flat)?;

        if values.len() != batch {
            return Err(format!(
                "ONNX scorer returned {} values for {} rows",
                values.len(),
                batch
            ));
        }
        Ok(Array1::from(values))
    }

    fn name(&self) -> &str {
        "ONNX Runtime (MLP)"
    }
}

use ndarray::{Array1, Array2, ArrayView2, ArrayView3};

/// Interface for sequence forecasting models
pub trait SequenceModel: Send + Sync {
    /// Maps `[batch, timesteps, features]` to `[batch, outputs]`.
    fn predict(&self, input: ArrayView3<f64>) -> Result<Array2<f64>, String>;

    /// Expected feature width, when the artifact declares one
    fn input_width(&self) -> Option<usize> {
        None
    }

    /// Get model name/type
    fn name(&self) -> &str;
}

/// Interface for static feature scorers
pub trait ScoringModel: Send + Sync {
    /// Maps `[batch, features]` to one raw score per row.
    fn predict(&self, input: ArrayView2<f64>) -> Result<Array1<f64>, String>;

    fn input_width(&self) -> Option<usize> {
        None
    }

    fn name(&self) -> &str;
}

//! Dense building blocks shared by the native networks.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
        }
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Serialized dense layer. `weights` is `[inputs][outputs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayerSpec {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    pub fn from_spec(spec: DenseLayerSpec) -> Result<Self, String> {
        let weights = matrix_from_rows(&spec.weights)?;
        if spec.bias.len() != weights.ncols() {
            return Err(format!(
                "dense bias has {} values for {} outputs",
                spec.bias.len(),
                weights.ncols()
            ));
        }
        Ok(Self {
            weights,
            bias: Array1::from(spec.bias),
            activation: spec.activation,
        })
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// `[batch, inputs]` -> `[batch, outputs]`
    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let activation = self.activation;
        let mut out = x.dot(&self.weights) + &self.bias;
        out.mapv_inplace(|v| activation.apply(v));
        out
    }
}

/// Builds a matrix from row vectors, rejecting ragged input.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>, String> {
    let nrows = rows.len();
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if nrows == 0 || ncols == 0 {
        return Err("empty weight matrix".to_string());
    }
    if let Some(idx) = rows.iter().position(|r| r.len() != ncols) {
        return Err(format!(
            "ragged weight matrix: row {} has {} values, expected {}",
            idx,
            rows[idx].len(),
            ncols
        ));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((nrows, ncols), flat).map_err(|e| e.to_string())
}

/// Chains dense layers, checking that adjacent widths agree.
pub fn build_dense_stack(specs: Vec<DenseLayerSpec>, input_size: usize) -> Result<Vec<DenseLayer>, String> {
    let mut width = input_size;
    let mut layers = Vec::with_capacity(specs.len());
    for (idx, spec) in specs.into_iter().enumerate() {
        let layer = DenseLayer::from_spec(spec)?;
        if layer.input_size() != width {
            return Err(format!(
                "dense layer {} expects {} inputs, previous layer yields {}",
                idx,
                layer.input_size(),
                width
            ));
        }
        width = layer.output_size();
        layers.push(layer);
    }
    Ok(layers)
}

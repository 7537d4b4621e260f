//! Native stacked-LSTM forecaster.
//!
//! Weights use the Keras layout: `kernel` is `[inputs][4 * units]`,
//! `recurrent_kernel` is `[units][4 * units]`, gates ordered input, forget,
//! cell candidate, output. Every LSTM layer but the last feeds its full hidden
//! sequence to the next; the last hidden state goes through the dense head.

use super::layers::{DenseLayer, DenseLayerSpec, build_dense_stack, matrix_from_rows, sigmoid};
use super::predictor::SequenceModel;
use ndarray::{Array1, Array2, Array3, ArrayView3, Axis, s};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayerSpec {
    pub units: usize,
    pub kernel: Vec<Vec<f64>>,
    pub recurrent_kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmSpec {
    pub input_size: usize,
    pub lstm_layers: Vec<LstmLayerSpec>,
    pub dense_layers: Vec<DenseLayerSpec>,
}

#[derive(Debug, Clone)]
struct LstmLayer {
    units: usize,
    kernel: Array2<f64>,
    recurrent_kernel: Array2<f64>,
    bias: Array1<f64>,
}

impl LstmLayer {
    fn from_spec(spec: LstmLayerSpec, input_size: usize) -> Result<Self, String> {
        let gates = 4 * spec.units;
        let kernel = matrix_from_rows(&spec.kernel)?;
        let recurrent_kernel = matrix_from_rows(&spec.recurrent_kernel)?;
        if kernel.dim() != (input_size, gates) {
            return Err(format!(
                "lstm kernel is {:?}, expected ({}, {})",
                kernel.dim(),
                input_size,
                gates
            ));
        }
        if recurrent_kernel.dim() != (spec.units, gates) {
            return Err(format!(
                "lstm recurrent kernel is {:?}, expected ({}, {})",
                recurrent_kernel.dim(),
                spec.units,
                gates
            ));
        }
        if spec.bias.len() != gates {
            return Err(format!(
                "lstm bias has {} values, expected {}",
                spec.bias.len(),
                gates
            ));
        }
        Ok(Self {
            units: spec.units,
            kernel,
            recurrent_kernel,
            bias: Array1::from(spec.bias),
        })
    }

    /// `[batch, timesteps, inputs]` -> `[batch, timesteps, units]`, zero initial state.
    fn forward(&self, input: ArrayView3<f64>) -> Array3<f64> {
        let (batch, steps, _) = input.dim();
        let u = self.units;
        let mut h = Array2::<f64>::zeros((batch, u));
        let mut c = Array2::<f64>::zeros((batch, u));
        let mut hidden = Array3::<f64>::zeros((batch, steps, u));

        for t in 0..steps {
            let x_t = input.index_axis(Axis(1), t);
            let z = x_t.dot(&self.kernel) + h.dot(&self.recurrent_kernel) + &self.bias;

            let i_gate = z.slice(s![.., 0..u]).mapv(sigmoid);
            let f_gate = z.slice(s![.., u..2 * u]).mapv(sigmoid);
            let g = z.slice(s![.., 2 * u..3 * u]).mapv(f64::tanh);
            let o_gate = z.slice(s![.., 3 * u..4 * u]).mapv(sigmoid);

            c = &f_gate * &c + &i_gate * &g;
            h = &o_gate * &c.mapv(f64::tanh);
            hidden.index_axis_mut(Axis(1), t).assign(&h);
        }
        hidden
    }
}

/// LSTM stack plus dense head, loaded from a JSON artifact
#[derive(Debug, Clone)]
pub struct LstmPredictor {
    input_size: usize,
    layers: Vec<LstmLayer>,
    head: Vec<DenseLayer>,
}

impl LstmPredictor {
    pub fn from_spec(spec: LstmSpec) -> Result<Self, String> {
        if spec.lstm_layers.is_empty() {
            return Err("lstm model has no recurrent layers".to_string());
        }
        let mut width = spec.input_size;
        let mut layers = Vec::with_capacity(spec.lstm_layers.len());
        for layer in spec.lstm_layers {
            let layer = LstmLayer::from_spec(layer, width)?;
            width = layer.units;
            layers.push(layer);
        }
        let head = build_dense_stack(spec.dense_layers, width)?;
        Ok(Self {
            input_size: spec.input_size,
            layers,
            head,
        })
    }

    pub fn output_size(&self) -> usize {
        self.head
            .last()
            .map(DenseLayer::output_size)
            .or_else(|| self.layers.last().map(|l| l.units))
            .unwrap_or(0)
    }
}

impl SequenceModel for LstmPredictor {
    fn predict(&self, input: ArrayView3<f64>) -> Result<Array2<f64>, String> {
        let (batch, steps, features) = input.dim();
        if features != self.input_size {
            return Err(format!(
                "input has {} features, model expects {}",
                features, self.input_size
            ));
        }
        if steps == 0 {
            return Err("input sequence has no timesteps".to_string());
        }

        let mut sequence = input.to_owned();
        for layer in &self.layers {
            sequence = layer.forward(sequence.view());
        }

        let mut out = sequence.index_axis(Axis(1), steps - 1).to_owned();
        for layer in &self.head {
            out = layer.forward(&out);
        }

        if out.nrows() != batch {
            return Err(format!("model returned {} rows for {}", out.nrows(), batch));
        }
        Ok(out)
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.input_size)
    }

    fn name(&self) -> &str {
        "Native LSTM"
    }
}

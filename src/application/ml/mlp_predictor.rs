use super::layers::{DenseLayer, DenseLayerSpec, build_dense_stack};
use super::predictor::ScoringModel;
use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpSpec {
    pub input_size: usize,
    pub layers: Vec<DenseLayerSpec>,
}

/// Feed-forward location scorer. Dropout is a training-time concern and has no
/// counterpart here.
#[derive(Debug, Clone)]
pub struct MlpPredictor {
    input_size: usize,
    layers: Vec<DenseLayer>,
}

impl MlpPredictor {
    pub fn from_spec(spec: MlpSpec) -> Result<Self, String> {
        if spec.layers.is_empty() {
            return Err("mlp model has no layers".to_string());
        }
        let layers = build_dense_stack(spec.layers, spec.input_size)?;
        let outputs = layers.last().map(DenseLayer::output_size).unwrap_or(0);
        if outputs != 1 {
            return Err(format!("mlp scorer must have 1 output, found {}", outputs));
        }
        Ok(Self {
            input_size: spec.input_size,
            layers,
        })
    }
}

impl ScoringModel for MlpPredictor {
    fn predict(&self, input: ArrayView2<f64>) -> Result<Array1<f64>, String> {
        if input.ncols() != self.input_size {
            return Err(format!(
                "input has {} features, model expects {}",
                input.ncols(),
                self.input_size
            ));
        }
        let mut out = input.to_owned();
        for layer in &self.layers {
            out = layer.forward(&out);
        }
        Ok(out.index_axis(Axis(1), 0).to_owned())
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.input_size)
    }

    fn name(&self) -> &str {
        "Native MLP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::layers::Activation;
    use ndarray::array;

    fn sum_scorer() -> MlpPredictor {
        MlpPredictor::from_spec(MlpSpec {
            input_size: 2,
            layers: vec![
                DenseLayerSpec {
                    weights: vec![vec![1.0], vec![1.0]],
                    bias: vec![0.0],
                    activation: Activation::Relu,
                },
                DenseLayerSpec {
                    weights: vec![vec![10.0]],
                    bias: vec![5.0],
                    activation: Activation::Linear,
                },
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_forward_pass() {
        let scores = sum_scorer().predict(array![[1.0, 2.0], [-4.0, 1.0]].view()).unwrap();
        assert_eq!(scores, array![35.0, 5.0]);
    }

    #[test]
    fn test_multi_output_rejected() {
        let spec = MlpSpec {
            input_size: 1,
            layers: vec![DenseLayerSpec {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![0.0, 0.0],
                activation: Activation::Linear,
            }],
        };
        assert!(MlpPredictor::from_spec(spec).is_err());
    }

    #[test]
    fn test_width_mismatch() {
        assert!(sum_scorer().predict(array![[1.0, 2.0, 3.0]].view()).is_err());
    }
}

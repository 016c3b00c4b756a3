//! Dense layers and activations
//!
//! A layer maps `in` inputs to `out` outputs:
//!
//! ```text
//! y[j] = act( sum_i weights[j][i] * x[i] + bias[j] )     j in 0..out
//! ```
//!
//! Weights are stored row-major, one row per output unit, which is also how
//! they appear in the JSON artifact.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Element-wise (or, for softmax, vector-wise) output transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Linear,
    /// Normalizes the layer output into a probability vector
    Softmax,
}

impl Activation {
    /// Apply in place
    pub fn apply(&self, values: &mut [f32]) {
        match self {
            Self::Relu => {
                for v in values.iter_mut() {
                    *v = v.max(0.0);
                }
            }
            Self::Linear => {}
            Self::Softmax => softmax(values),
        }
    }
}

/// Numerically stable softmax
pub fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut total = 0.0f32;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        total += *v;
    }
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}

/// Fully connected layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `[out][in]`
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>, activation: Activation) -> Self {
        Self {
            weights,
            bias,
            activation,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.weights.len()
    }

    /// Check internal consistency; `index` is used in error messages
    pub fn validate(&self, index: usize) -> ModelResult<()> {
        let shape = |reason: String| ModelError::Shape {
            layer: index,
            reason,
        };

        if self.weights.is_empty() || self.input_dim() == 0 {
            return Err(shape("empty weight matrix".to_string()));
        }
        let cols = self.input_dim();
        if let Some((row, w)) = self.weights.iter().enumerate().find(|(_, w)| w.len() != cols) {
            return Err(shape(format!("row {row} has {} weights, expected {cols}", w.len())));
        }
        if self.bias.len() != self.output_dim() {
            return Err(shape(format!(
                "bias has {} entries, expected {}",
                self.bias.len(),
                self.output_dim()
            )));
        }
        let finite = self
            .weights
            .iter()
            .flatten()
            .chain(self.bias.iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err(shape("non-finite parameter".to_string()));
        }
        Ok(())
    }

    /// Forward pass for one input; `input.len()` must equal `input_dim()`
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out: Vec<f32> = self
            .weights
            .iter()
            .zip(self.bias.iter())
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();
        self.activation.apply(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clamps_negatives() {
        let mut v = [-1.0, 0.0, 2.5];
        Activation::Relu.apply(&mut v);
        assert_eq!(v, [0.0, 0.0, 2.5]);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let mut v = [1000.0, 1000.0, -1000.0];
        softmax(&mut v);
        assert!((v[0] - 0.5).abs() < 1e-6);
        assert!((v[1] - 0.5).abs() < 1e-6);
        assert_eq!(v[2], 0.0);
    }

    #[test]
    fn forward_matches_hand_computation() {
        let layer = DenseLayer::new(
            vec![vec![1.0, 2.0], vec![-1.0, 0.5]],
            vec![0.5, -3.0],
            Activation::Relu,
        );
        assert!(layer.validate(0).is_ok());
        // [1*1 + 2*2 + 0.5, -1*1 + 0.5*2 - 3] = [5.5, -3] -> relu
        assert_eq!(layer.forward(&[1.0, 2.0]), vec![5.5, 0.0]);
    }

    #[test]
    fn ragged_weights_are_rejected() {
        let layer = DenseLayer::new(vec![vec![1.0, 2.0], vec![1.0]], vec![0.0, 0.0], Activation::Linear);
        assert!(matches!(layer.validate(2), Err(ModelError::Shape { layer: 2, .. })));

        let bad_bias = DenseLayer::new(vec![vec![1.0]], vec![0.0, 1.0], Activation::Linear);
        assert!(bad_bias.validate(0).is_err());

        let nan = DenseLayer::new(vec![vec![f32::NAN]], vec![0.0], Activation::Linear);
        assert!(nan.validate(0).is_err());
    }

    #[test]
    fn activation_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Activation::Softmax).unwrap(), "\"softmax\"");
        let relu: Activation = serde_json::from_str("\"relu\"").unwrap();
        assert_eq!(relu, Activation::Relu);
    }
}

//! Inference models behind the decision policy.

use optiloop_core::{Observation, ACTION_COUNT, OBSERVATION_DIM};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors from loading or running a policy model.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed model file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Layer dimensions do not line up
    #[error("Invalid model shape: {0}")]
    Shape(String),

    /// Model produced an unusable distribution
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// A trained policy head mapping observations to action probabilities.
///
/// Implementations are loaded once and shared read-only.
pub trait ActionModel: Send + Sync {
    /// Identifier reported in meta-actions.
    fn id(&self) -> &str;

    /// Probability of each of the seven actions.
    fn probabilities(&self, observation: &Observation) -> Result<[f64; ACTION_COUNT]>;
}

/// Layer activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Hyperbolic tangent
    Tanh,
    /// Rectified linear unit
    Relu,
    /// Identity
    #[default]
    Linear,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::Linear => x,
        }
    }
}

/// A fully connected layer; `weights` is `outputs x inputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weight matrix, one row per output
    pub weights: Vec<Vec<f64>>,
    /// Bias per output
    pub bias: Vec<f64>,
    /// Activation applied to each output
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                let sum: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                self.activation.apply(sum + bias)
            })
            .collect()
    }
}

/// Feed-forward policy head exported from training as JSON.
///
/// The last layer emits one logit per action; probabilities are the
/// softmax of those logits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpPolicyModel {
    /// Model identifier
    pub id: String,
    /// Layers, input first
    pub layers: Vec<DenseLayer>,
}

impl MlpPolicyModel {
    /// Load and validate a model file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a model from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Check that layer shapes chain from 64 inputs to 7 outputs.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(PolicyError::Shape("model has no layers".to_string()));
        }

        let mut expected = OBSERVATION_DIM;
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.weights.is_empty() {
                return Err(PolicyError::Shape(format!("layer {} has no outputs", index)));
            }
            if layer.weights.len() != layer.bias.len() {
                return Err(PolicyError::Shape(format!(
                    "layer {}: {} weight rows but {} biases",
                    index,
                    layer.weights.len(),
                    layer.bias.len()
                )));
            }
            if let Some(row) = layer.weights.iter().position(|r| r.len() != expected) {
                return Err(PolicyError::Shape(format!(
                    "layer {} row {}: expected {} inputs, found {}",
                    index,
                    row,
                    expected,
                    layer.weights[row].len()
                )));
            }
            let finite = layer.weights.iter().flatten().chain(&layer.bias).all(|v| v.is_finite());
            if !finite {
                return Err(PolicyError::Shape(format!("layer {} has non-finite values", index)));
            }
            expected = layer.weights.len();
        }

        if expected != ACTION_COUNT {
            return Err(PolicyError::Shape(format!(
                "expected {} outputs, found {}",
                ACTION_COUNT, expected
            )));
        }
        Ok(())
    }

    /// Input width of the first layer.
    pub fn input_dim(&self) -> usize {
        self.layers.first().map(DenseLayer::inputs).unwrap_or(0)
    }

    fn logits(&self, observation: &Observation) -> Vec<f64> {
        let mut activations: Vec<f64> = observation.as_slice().iter().map(|v| *v as f64).collect();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        activations
    }
}

impl ActionModel for MlpPolicyModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn probabilities(&self, observation: &Observation) -> Result<[f64; ACTION_COUNT]> {
        let logits = self.logits(observation);
        if logits.len() != ACTION_COUNT {
            return Err(PolicyError::Inference(format!(
                "expected {} logits, got {}",
                ACTION_COUNT,
                logits.len()
            )));
        }
        softmax(&logits)
    }
}

/// Numerically stable softmax over exactly seven logits.
pub fn softmax(logits: &[f64]) -> Result<[f64; ACTION_COUNT]> {
    let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max_logit.is_finite() {
        return Err(PolicyError::Inference("non-finite logits".to_string()));
    }

    let mut probs = [0.0; ACTION_COUNT];
    for (slot, logit) in probs.iter_mut().zip(logits) {
        *slot = (logit - max_logit).exp();
    }
    let sum: f64 = probs.iter().sum();
    for p in &mut probs {
        *p /= sum;
    }
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// A single linear layer whose bias alone decides the logits.
    fn bias_only_model(bias: [f64; ACTION_COUNT]) -> MlpPolicyModel {
        MlpPolicyModel {
            id: "bias-only".to_string(),
            layers: vec![DenseLayer {
                weights: vec![vec![0.0; OBSERVATION_DIM]; ACTION_COUNT],
                bias: bias.to_vec(),
                activation: Activation::Linear,
            }],
        }
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, 0.0, -1.0, 0.5, 0.0]).unwrap();
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_rejects_nan() {
        assert!(softmax(&[f64::NAN; 7]).is_err());
    }

    #[test]
    fn test_bias_only_model_prefers_largest_bias() {
        let model = bias_only_model([0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0]);
        model.validate().unwrap();
        let probs = model.probabilities(&Observation::zeros()).unwrap();
        let best = probs
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probs[best] { i } else { best });
        assert_eq!(best, 3);
    }

    #[test]
    fn test_hidden_layer_shapes() {
        let model = MlpPolicyModel {
            id: "two-layer".to_string(),
            layers: vec![
                DenseLayer {
                    weights: vec![vec![0.1; OBSERVATION_DIM]; 16],
                    bias: vec![0.0; 16],
                    activation: Activation::Tanh,
                },
                DenseLayer {
                    weights: vec![vec![0.2; 16]; ACTION_COUNT],
                    bias: vec![0.0; ACTION_COUNT],
                    activation: Activation::Linear,
                },
            ],
        };
        model.validate().unwrap();
        assert_eq!(model.input_dim(), OBSERVATION_DIM);
        let probs = model.probabilities(&Observation::from_slice(&[1.0; 64])).unwrap();
        // identical rows give a uniform distribution
        for p in probs {
            assert!((p - 1.0 / 7.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_validate_rejects_wrong_output_width() {
        let model = MlpPolicyModel {
            id: "bad".to_string(),
            layers: vec![DenseLayer {
                weights: vec![vec![0.0; OBSERVATION_DIM]; 5],
                bias: vec![0.0; 5],
                activation: Activation::Linear,
            }],
        };
        assert!(matches!(model.validate(), Err(PolicyError::Shape(_))));
    }

    #[test]
    fn test_validate_rejects_wrong_input_width() {
        let model = MlpPolicyModel {
            id: "bad".to_string(),
            layers: vec![DenseLayer {
                weights: vec![vec![0.0; 32]; ACTION_COUNT],
                bias: vec![0.0; ACTION_COUNT],
                activation: Activation::Linear,
            }],
        };
        assert!(matches!(model.validate(), Err(PolicyError::Shape(_))));
    }

    #[test]
    fn test_load_from_file() {
        let model = bias_only_model([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&model).unwrap().as_bytes())
            .unwrap();

        let loaded = MlpPolicyModel::load(file.path()).unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.id(), "bias-only");
    }

    #[test]
    fn test_load_missing_file() {
        let err = MlpPolicyModel::load("/nonexistent/policy.json").unwrap_err();
        assert!(matches!(err, PolicyError::Io(_)));
    }

    #[test]
    fn test_activation_defaults_to_linear() {
        let json = format!(
            r#"{{"id":"m","layers":[{{"weights":{},"bias":{}}}]}}"#,
            serde_json::to_string(&vec![vec![0.0; OBSERVATION_DIM]; ACTION_COUNT]).unwrap(),
            serde_json::to_string(&vec![0.0; ACTION_COUNT]).unwrap()
        );
        let model = MlpPolicyModel::from_json(&json).unwrap();
        assert_eq!(model.layers[0].activation, Activation::Linear);
    }
}

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use super::layer::{Layer, LayerSpec};
use super::{LayerInfo, Model, ModelError};

// ---------------------------------------------------------------------------
// Serialized model description
// ---------------------------------------------------------------------------

/// Expected JSON schema:
///
/// ```json
/// {
///   "input_shape": [28, 28, 3],
///   "layers": [
///     { "type": "conv2d", "name": "conv1", "filters": 4, "kernel_size": [3, 3],
///       "kernel": [ ... ], "bias": [ ... ] },
///     { "type": "relu" },
///     { "type": "max_pool2d", "pool_size": [2, 2] },
///     { "type": "flatten" },
///     { "type": "dense", "units": 10, "kernel": [ ... ] },
///     { "type": "softmax" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Input shape without the batch axis, channels last.
    pub input_shape: Vec<usize>,
    pub layers: Vec<LayerSpec>,
}

// ---------------------------------------------------------------------------
// Sequential
// ---------------------------------------------------------------------------

/// A single-input feed-forward network with named layers.
#[derive(Debug, Clone)]
pub struct Sequential {
    input_shape: Vec<usize>,
    layers: Vec<Layer>,
    info: Vec<LayerInfo>,
}

impl Sequential {
    /// Load a model description from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let spec: ModelSpec = serde_json::from_str(text)?;
        Self::from_spec(&spec)
    }

    /// Validate every layer, assign names, and infer output shapes.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self, ModelError> {
        let mut counters: HashMap<&'static str, usize> = HashMap::new();
        let mut seen = BTreeSet::new();
        let mut layers = Vec::with_capacity(spec.layers.len());
        let mut info = Vec::with_capacity(spec.layers.len());
        let mut shape = spec.input_shape.clone();

        for layer_spec in &spec.layers {
            let kind = layer_spec.kind();
            let counter = counters.entry(kind.name_prefix()).or_insert(0);
            *counter += 1;
            let name = match layer_spec.name() {
                Some(n) => n.to_string(),
                None => format!("{}_{}", kind.name_prefix(), counter),
            };
            if !seen.insert(name.clone()) {
                return Err(ModelError::DuplicateName(name));
            }

            let (layer, out_shape) = Layer::build(layer_spec, &name, &shape)?;
            log::debug!("Built layer {name} ({kind}) -> {out_shape:?}");

            info.push(LayerInfo {
                name,
                kind,
                output_shape: out_shape.clone(),
            });
            layers.push(layer);
            shape = out_shape;
        }

        Ok(Sequential {
            input_shape: spec.input_shape.clone(),
            layers,
            info,
        })
    }

    /// Input shape without the batch axis.
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }
}

impl Model for Sequential {
    fn layers(&self) -> Vec<LayerInfo> {
        self.info.clone()
    }

    fn evaluate(
        &self,
        inputs: &[ArrayD<f32>],
        layer_indices: &[usize],
    ) -> Result<Vec<ArrayD<f32>>, ModelError> {
        let [input] = inputs else {
            return Err(ModelError::InputCount {
                expected: 1,
                got: inputs.len(),
            });
        };
        if input.shape().get(1..) != Some(self.input_shape.as_slice()) {
            return Err(ModelError::InputShape {
                expected: self.input_shape.clone(),
                got: input.shape().to_vec(),
            });
        }
        if let Some(&bad) = layer_indices.iter().find(|&&i| i >= self.layers.len()) {
            return Err(ModelError::LayerIndex(bad));
        }

        let Some(&deepest) = layer_indices.iter().max() else {
            return Ok(Vec::new());
        };

        // Run up to the deepest requested layer, keeping only what was asked for.
        let wanted: BTreeSet<usize> = layer_indices.iter().copied().collect();
        let mut captured: HashMap<usize, ArrayD<f32>> = HashMap::new();
        let mut x = input.clone();
        for (i, layer) in self.layers[..=deepest].iter().enumerate() {
            x = layer.forward(&x)?;
            if wanted.contains(&i) {
                captured.insert(i, x.clone());
            }
        }

        layer_indices
            .iter()
            .map(|i| captured.get(i).cloned().ok_or(ModelError::LayerIndex(*i)))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::LayerKind;
    use ndarray::IxDyn;

    /// A 6x6x3 → conv(2 filters, 3x3) → relu → pool 2x2 → flatten → dense(3)
    /// → dropout → softmax network with deterministic weights.
    pub(crate) fn tiny_model_json() -> String {
        let conv_kernel: Vec<f32> = (0..3 * 3 * 3 * 2)
            .map(|i| ((i % 5) as f32 - 2.0) * 0.1)
            .collect();
        let dense_kernel: Vec<f32> = (0..8 * 3)
            .map(|i| ((i % 3) as f32 - 1.0) * 0.2)
            .collect();
        serde_json::json!({
            "input_shape": [6, 6, 3],
            "layers": [
                { "type": "conv2d", "name": "conv1", "filters": 2, "kernel_size": [3, 3],
                  "kernel": conv_kernel, "bias": [0.1, -0.1] },
                { "type": "relu" },
                { "type": "max_pool2d", "pool_size": [2, 2] },
                { "type": "flatten" },
                { "type": "dense", "units": 3, "kernel": dense_kernel },
                { "type": "dropout", "rate": 0.5 },
                { "type": "softmax", "name": "predictions" }
            ]
        })
        .to_string()
    }

    #[test]
    fn unnamed_layers_get_kind_counters() {
        let model = Sequential::from_json(&tiny_model_json()).unwrap();
        let names: Vec<String> = model.layers().into_iter().map(|l| l.name).collect();
        assert_eq!(
            names,
            vec![
                "conv1",
                "re_lu_1",
                "max_pooling2d_1",
                "flatten_1",
                "dense_1",
                "dropout_1",
                "predictions",
            ]
        );
        assert_eq!(model.layers()[0].kind, LayerKind::Conv2D);
    }

    #[test]
    fn declared_shapes_follow_inference() {
        let model = Sequential::from_json(&tiny_model_json()).unwrap();
        let shapes: Vec<Vec<usize>> = model
            .layers()
            .into_iter()
            .map(|l| l.output_shape)
            .collect();
        assert_eq!(shapes[0], vec![4, 4, 2]);
        assert_eq!(shapes[2], vec![2, 2, 2]);
        assert_eq!(shapes[3], vec![8]);
        assert_eq!(shapes[6], vec![3]);
    }

    #[test]
    fn evaluated_shapes_match_declared_shapes() {
        let model = Sequential::from_json(&tiny_model_json()).unwrap();
        let input = ArrayD::from_elem(IxDyn(&[1, 6, 6, 3]), 0.5_f32);
        let all: Vec<usize> = (0..model.layers().len()).collect();
        let outputs = model.evaluate(&[input], &all).unwrap();
        for (out, info) in outputs.iter().zip(model.layers()) {
            assert_eq!(out.shape(), info.batched_shape(1).as_slice(), "{}", info.name);
        }
    }

    #[test]
    fn repeated_indices_are_returned_in_request_order() {
        let model = Sequential::from_json(&tiny_model_json()).unwrap();
        let input = ArrayD::from_elem(IxDyn(&[1, 6, 6, 3]), 0.5_f32);
        let outputs = model.evaluate(&[input], &[6, 0, 6]).unwrap();
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].shape(), &[1, 3]);
        assert_eq!(outputs[1].shape(), &[1, 4, 4, 2]);
        assert_eq!(outputs[0], outputs[2]);
    }

    #[test]
    fn wrong_input_is_rejected() {
        let model = Sequential::from_json(&tiny_model_json()).unwrap();
        let bad = ArrayD::<f32>::zeros(IxDyn(&[1, 5, 6, 3]));
        assert!(matches!(
            model.evaluate(&[bad.clone()], &[0]),
            Err(ModelError::InputShape { .. })
        ));
        assert!(matches!(
            model.evaluate(&[bad.clone(), bad], &[0]),
            Err(ModelError::InputCount {
                expected: 1,
                got: 2,
            })
        ));
    }

    #[test]
    fn duplicate_names_fail_to_load() {
        let json = r#"{
            "input_shape": [4],
            "layers": [
                { "type": "relu", "name": "act" },
                { "type": "softmax", "name": "act" }
            ]
        }"#;
        assert!(matches!(
            Sequential::from_json(json),
            Err(ModelError::DuplicateName(n)) if n == "act"
        ));
    }
}

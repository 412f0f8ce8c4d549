use ndarray::ArrayD;

use crate::model::{Model, ModelError};

// ---------------------------------------------------------------------------
// Inputs and layer selection
// ---------------------------------------------------------------------------

/// What gets fed to the model: one tensor, or one per model input.
#[derive(Debug, Clone)]
pub enum ModelInputs {
    Single(ArrayD<f32>),
    Multi(Vec<ArrayD<f32>>),
}

impl ModelInputs {
    fn into_list(self) -> Vec<ArrayD<f32>> {
        match self {
            ModelInputs::Single(x) => vec![x],
            ModelInputs::Multi(xs) => xs,
        }
    }
}

impl From<ArrayD<f32>> for ModelInputs {
    fn from(x: ArrayD<f32>) -> Self {
        ModelInputs::Single(x)
    }
}

impl From<Vec<ArrayD<f32>>> for ModelInputs {
    fn from(xs: Vec<ArrayD<f32>>) -> Self {
        ModelInputs::Multi(xs)
    }
}

/// Which layers to extract. `All` means every layer of the model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayerSelection {
    #[default]
    All,
    Named(Vec<String>),
}

impl From<&str> for LayerSelection {
    fn from(name: &str) -> Self {
        LayerSelection::Named(vec![name.to_string()])
    }
}

impl From<String> for LayerSelection {
    fn from(name: String) -> Self {
        LayerSelection::Named(vec![name])
    }
}

impl From<Vec<String>> for LayerSelection {
    fn from(names: Vec<String>) -> Self {
        LayerSelection::Named(names)
    }
}

impl From<&[&str]> for LayerSelection {
    fn from(names: &[&str]) -> Self {
        LayerSelection::Named(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<T: Into<LayerSelection>> From<Option<T>> for LayerSelection {
    fn from(selection: Option<T>) -> Self {
        selection.map(Into::into).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Evaluate `model` on `inputs` and return the activation maps of the
/// selected layers.
///
/// Maps come back in the model's layer order. A name listed twice yields its
/// layer twice; names that match no layer are skipped. With `shape_only` the
/// shape of every map is logged at info level.
pub fn get_activations<M: Model + ?Sized>(
    model: &M,
    inputs: impl Into<ModelInputs>,
    selection: impl Into<LayerSelection>,
    shape_only: bool,
) -> Result<Vec<ArrayD<f32>>, ModelError> {
    let inputs = inputs.into().into_list();
    if inputs.len() != model.input_count() {
        return Err(ModelError::InputCount {
            expected: model.input_count(),
            got: inputs.len(),
        });
    }

    let layers = model.layers();
    let indices: Vec<usize> = match selection.into() {
        LayerSelection::All => (0..layers.len()).collect(),
        LayerSelection::Named(names) => {
            for name in &names {
                if !layers.iter().any(|l| &l.name == name) {
                    log::warn!("No layer named '{name}' in model, skipping");
                }
            }
            layers
                .iter()
                .enumerate()
                .flat_map(|(i, layer)| {
                    names
                        .iter()
                        .filter(move |n| **n == layer.name)
                        .map(move |_| i)
                })
                .collect()
        }
    };

    let activations = model.evaluate(&inputs, &indices)?;

    if shape_only {
        for (&i, act) in indices.iter().zip(&activations) {
            log::info!("{}: {:?}", layers[i].name, act.shape());
        }
    }

    Ok(activations)
}

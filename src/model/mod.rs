/// Model layer: a minimal inference-only network abstraction.
///
/// Architecture:
/// ```text
///   model.json
///        │
///        ▼
///   ┌────────────┐
///   │ Sequential │  named layers, shape inference at load time
///   └────────────┘
///        │  implements
///        ▼
///   ┌────────────┐
///   │   Model    │  layers() / evaluate(inputs, layer indices)
///   └────────────┘
/// ```

pub mod layer;
pub mod sequential;

use std::fmt;

use ndarray::ArrayD;
use thiserror::Error;

pub use layer::LayerKind;
pub use sequential::Sequential;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model expects {expected} input(s), got {got}")]
    InputCount { expected: usize, got: usize },

    #[error("input shape {got:?} does not match declared {expected:?}")]
    InputShape {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("layer '{layer}': {reason}")]
    InvalidLayer { layer: String, reason: String },

    #[error("duplicate layer name '{0}'")]
    DuplicateName(String),

    #[error("layer index {0} out of range")]
    LayerIndex(usize),

    #[error("array shape error")]
    Shape(#[from] ndarray::ShapeError),

    #[error("parsing model description")]
    Parse(#[from] serde_json::Error),

    #[error("reading model file")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// LayerInfo – what a model reports about each of its layers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    pub kind: LayerKind,
    /// Declared output shape, batch axis excluded.
    pub output_shape: Vec<usize>,
}

impl LayerInfo {
    /// Output shape with the batch axis filled in.
    pub fn batched_shape(&self, batch: usize) -> Vec<usize> {
        std::iter::once(batch)
            .chain(self.output_shape.iter().copied())
            .collect()
    }
}

impl fmt::Display for LayerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.name, self.kind, format_shape(&self.output_shape))
    }
}

/// Render a batch-less shape the way framework summaries do: `(None, 4, 4, 8)`.
pub fn format_shape(shape: &[usize]) -> String {
    let mut parts = vec!["None".to_string()];
    parts.extend(shape.iter().map(|d| d.to_string()));
    format!("({})", parts.join(", "))
}

// ---------------------------------------------------------------------------
// Model trait
// ---------------------------------------------------------------------------

/// A trained network whose intermediate layers can be evaluated.
pub trait Model {
    /// Number of input tensors the model consumes.
    fn input_count(&self) -> usize {
        1
    }

    /// Every layer, in evaluation order.
    fn layers(&self) -> Vec<LayerInfo>;

    /// Run the model in inference mode and return the outputs of the layers
    /// at `layer_indices`, in the order given (repeats allowed).
    fn evaluate(
        &self,
        inputs: &[ArrayD<f32>],
        layer_indices: &[usize],
    ) -> Result<Vec<ArrayD<f32>>, ModelError>;
}

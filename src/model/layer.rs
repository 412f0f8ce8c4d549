use std::fmt;

use ndarray::{s, Array1, Array2, Array4, ArrayD, Axis, Ix2, Ix4, IxDyn};
use serde::{Deserialize, Serialize};

use super::ModelError;

// ---------------------------------------------------------------------------
// LayerSpec – serialized layer description
// ---------------------------------------------------------------------------

/// One layer as written in a model description file.
///
/// Weights are flat row-major arrays: conv kernels are
/// `(kernel_h, kernel_w, in_channels, filters)`, dense kernels `(in, units)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d {
        #[serde(default)]
        name: Option<String>,
        filters: usize,
        kernel_size: [usize; 2],
        #[serde(default = "unit_stride")]
        strides: [usize; 2],
        kernel: Vec<f32>,
        #[serde(default)]
        bias: Option<Vec<f32>>,
    },
    MaxPool2d {
        #[serde(default)]
        name: Option<String>,
        pool_size: [usize; 2],
    },
    Relu {
        #[serde(default)]
        name: Option<String>,
    },
    Flatten {
        #[serde(default)]
        name: Option<String>,
    },
    Dense {
        #[serde(default)]
        name: Option<String>,
        units: usize,
        kernel: Vec<f32>,
        #[serde(default)]
        bias: Option<Vec<f32>>,
    },
    Dropout {
        #[serde(default)]
        name: Option<String>,
        rate: f32,
    },
    Softmax {
        #[serde(default)]
        name: Option<String>,
    },
}

fn unit_stride() -> [usize; 2] {
    [1, 1]
}

impl LayerSpec {
    pub fn name(&self) -> Option<&str> {
        match self {
            LayerSpec::Conv2d { name, .. }
            | LayerSpec::MaxPool2d { name, .. }
            | LayerSpec::Relu { name }
            | LayerSpec::Flatten { name }
            | LayerSpec::Dense { name, .. }
            | LayerSpec::Dropout { name, .. }
            | LayerSpec::Softmax { name } => name.as_deref(),
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            LayerSpec::Conv2d { .. } => LayerKind::Conv2D,
            LayerSpec::MaxPool2d { .. } => LayerKind::MaxPool2D,
            LayerSpec::Relu { .. } => LayerKind::ReLU,
            LayerSpec::Flatten { .. } => LayerKind::Flatten,
            LayerSpec::Dense { .. } => LayerKind::Dense,
            LayerSpec::Dropout { .. } => LayerKind::Dropout,
            LayerSpec::Softmax { .. } => LayerKind::Softmax,
        }
    }
}

// ---------------------------------------------------------------------------
// LayerKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Conv2D,
    MaxPool2D,
    ReLU,
    Flatten,
    Dense,
    Dropout,
    Softmax,
}

impl LayerKind {
    /// Prefix used when generating names for unnamed layers.
    pub fn name_prefix(self) -> &'static str {
        match self {
            LayerKind::Conv2D => "conv2d",
            LayerKind::MaxPool2D => "max_pooling2d",
            LayerKind::ReLU => "re_lu",
            LayerKind::Flatten => "flatten",
            LayerKind::Dense => "dense",
            LayerKind::Dropout => "dropout",
            LayerKind::Softmax => "softmax",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LayerKind::Conv2D => "Conv2D",
            LayerKind::MaxPool2D => "MaxPooling2D",
            LayerKind::ReLU => "ReLU",
            LayerKind::Flatten => "Flatten",
            LayerKind::Dense => "Dense",
            LayerKind::Dropout => "Dropout",
            LayerKind::Softmax => "Softmax",
        };
        write!(f, "{label}")
    }
}

// ---------------------------------------------------------------------------
// Layer – validated, ready-to-run layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Layer {
    Conv2D {
        kernel: Array4<f32>,
        bias: Array1<f32>,
        stride: (usize, usize),
    },
    MaxPool2D {
        pool: (usize, usize),
    },
    ReLU,
    Flatten,
    Dense {
        weights: Array2<f32>,
        bias: Array1<f32>,
    },
    /// Identity at inference time; the rate is kept for summaries only.
    Dropout {
        rate: f32,
    },
    Softmax,
}

impl Layer {
    /// Validate a spec against the incoming shape (batch excluded) and return
    /// the layer together with its output shape.
    pub fn build(
        spec: &LayerSpec,
        name: &str,
        input: &[usize],
    ) -> Result<(Layer, Vec<usize>), ModelError> {
        let invalid = |reason: String| ModelError::InvalidLayer {
            layer: name.to_string(),
            reason,
        };

        match spec {
            LayerSpec::Conv2d {
                filters,
                kernel_size,
                strides,
                kernel,
                bias,
                ..
            } => {
                let &[h, w, cin] = input else {
                    return Err(invalid(format!("expects (H, W, C) input, got {input:?}")));
                };
                let [kh, kw] = *kernel_size;
                let [sh, sw] = *strides;
                if kh == 0 || kw == 0 || sh == 0 || sw == 0 || *filters == 0 {
                    return Err(invalid("kernel, stride and filters must be non-zero".into()));
                }
                if kh > h || kw > w {
                    return Err(invalid(format!("kernel {kh}x{kw} larger than input {h}x{w}")));
                }
                let kernel = Array4::from_shape_vec((kh, kw, cin, *filters), kernel.clone())
                    .map_err(|_| {
                        invalid(format!(
                            "kernel has {} values, expected {}",
                            kernel.len(),
                            kh * kw * cin * filters
                        ))
                    })?;
                let bias = vector_or_zeros(bias.as_deref(), *filters).map_err(invalid)?;
                let out = vec![(h - kh) / sh + 1, (w - kw) / sw + 1, *filters];
                Ok((
                    Layer::Conv2D {
                        kernel,
                        bias,
                        stride: (sh, sw),
                    },
                    out,
                ))
            }
            LayerSpec::MaxPool2d { pool_size, .. } => {
                let &[h, w, c] = input else {
                    return Err(invalid(format!("expects (H, W, C) input, got {input:?}")));
                };
                let [ph, pw] = *pool_size;
                if ph == 0 || pw == 0 || ph > h || pw > w {
                    return Err(invalid(format!("pool {ph}x{pw} invalid for input {h}x{w}")));
                }
                Ok((Layer::MaxPool2D { pool: (ph, pw) }, vec![h / ph, w / pw, c]))
            }
            LayerSpec::Relu { .. } => Ok((Layer::ReLU, input.to_vec())),
            LayerSpec::Softmax { .. } => Ok((Layer::Softmax, input.to_vec())),
            LayerSpec::Dropout { rate, .. } => {
                if !(0.0..1.0).contains(rate) {
                    return Err(invalid(format!("rate {rate} outside [0, 1)")));
                }
                Ok((Layer::Dropout { rate: *rate }, input.to_vec()))
            }
            LayerSpec::Flatten { .. } => Ok((Layer::Flatten, vec![input.iter().product()])),
            LayerSpec::Dense {
                units,
                kernel,
                bias,
                ..
            } => {
                let &[features] = input else {
                    return Err(invalid(format!("expects flat input, got {input:?}")));
                };
                let weights = Array2::from_shape_vec((features, *units), kernel.clone())
                    .map_err(|_| {
                        invalid(format!(
                            "kernel has {} values, expected {}",
                            kernel.len(),
                            features * units
                        ))
                    })?;
                let bias = vector_or_zeros(bias.as_deref(), *units).map_err(invalid)?;
                Ok((Layer::Dense { weights, bias }, vec![*units]))
            }
        }
    }

    /// Inference-mode forward pass over a batched input.
    pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>, ModelError> {
        match self {
            Layer::Conv2D {
                kernel,
                bias,
                stride,
            } => {
                let x = input.view().into_dimensionality::<Ix4>()?;
                Ok(conv2d(&x, kernel, bias, *stride).into_dyn())
            }
            Layer::MaxPool2D { pool } => {
                let x = input.view().into_dimensionality::<Ix4>()?;
                Ok(max_pool2d(&x, *pool).into_dyn())
            }
            Layer::ReLU => Ok(input.mapv(|x| x.max(0.0))),
            Layer::Dropout { .. } => Ok(input.clone()),
            Layer::Softmax => Ok(softmax_last_axis(input)),
            Layer::Flatten => {
                let batch = input.shape().first().copied().unwrap_or(0);
                let features = input.len().checked_div(batch).unwrap_or(0);
                let flat = input
                    .as_standard_layout()
                    .into_owned()
                    .into_shape(IxDyn(&[batch, features]))?;
                Ok(flat)
            }
            Layer::Dense { weights, bias } => {
                let x = input.view().into_dimensionality::<Ix2>()?;
                Ok((x.dot(weights) + bias).into_dyn())
            }
        }
    }
}

fn vector_or_zeros(values: Option<&[f32]>, len: usize) -> Result<Array1<f32>, String> {
    match values {
        None => Ok(Array1::zeros(len)),
        Some(v) if v.len() == len => Ok(Array1::from(v.to_vec())),
        Some(v) => Err(format!("bias has {} values, expected {len}", v.len())),
    }
}

// ---------------------------------------------------------------------------
// Kernels
// ---------------------------------------------------------------------------

fn conv2d(
    input: &ndarray::ArrayView4<f32>,
    kernel: &Array4<f32>,
    bias: &Array1<f32>,
    (sh, sw): (usize, usize),
) -> Array4<f32> {
    let (n, h, w, _) = input.dim();
    let (kh, kw, _, filters) = kernel.dim();
    let oh = (h - kh) / sh + 1;
    let ow = (w - kw) / sw + 1;
    let mut output = Array4::<f32>::zeros((n, oh, ow, filters));

    for b in 0..n {
        for i in 0..oh {
            for j in 0..ow {
                let window = input.slice(s![b, i * sh..i * sh + kh, j * sw..j * sw + kw, ..]);
                for f in 0..filters {
                    let k = kernel.slice(s![.., .., .., f]);
                    output[[b, i, j, f]] = (&window * &k).sum() + bias[f];
                }
            }
        }
    }

    output
}

fn max_pool2d(input: &ndarray::ArrayView4<f32>, (ph, pw): (usize, usize)) -> Array4<f32> {
    let (n, h, w, c) = input.dim();
    let out_h = h / ph;
    let out_w = w / pw;
    let mut output = Array4::<f32>::zeros((n, out_h, out_w, c));

    for b in 0..n {
        for i in 0..out_h {
            for j in 0..out_w {
                for z in 0..c {
                    let window = input.slice(s![b, i * ph..(i + 1) * ph, j * pw..(j + 1) * pw, z]);
                    output[[b, i, j, z]] = window.iter().fold(f32::MIN, |a, &v| a.max(v));
                }
            }
        }
    }

    output
}

fn softmax_last_axis(input: &ArrayD<f32>) -> ArrayD<f32> {
    let mut out = input.clone();
    let Some(last) = input.ndim().checked_sub(1) else {
        return out;
    };
    for mut lane in out.lanes_mut(Axis(last)) {
        let max = lane.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        lane.mapv_inplace(|x| (x - max).exp());
        let sum = lane.sum();
        lane.mapv_inplace(|x| x / sum);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn conv2d_output_shape_and_values() {
        let spec = LayerSpec::Conv2d {
            name: None,
            filters: 1,
            kernel_size: [2, 2],
            strides: [1, 1],
            kernel: vec![1.0, 0.0, 0.0, 1.0],
            bias: Some(vec![0.5]),
        };
        let (layer, shape) = Layer::build(&spec, "conv2d_1", &[3, 3, 1]).unwrap();
        assert_eq!(shape, vec![2, 2, 1]);

        let input = ArrayD::from_shape_vec(
            IxDyn(&[1, 3, 3, 1]),
            (1..=9).map(|v| v as f32).collect(),
        )
        .unwrap();
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.shape(), &[1, 2, 2, 1]);
        // top-left window: 1 + 5 (diagonal) + bias
        assert_eq!(out[[0, 0, 0, 0]], 6.5);
        assert_eq!(out[[0, 1, 1, 0]], 5.0 + 9.0 + 0.5);
    }

    #[test]
    fn conv2d_rejects_wrong_kernel_size() {
        let spec = LayerSpec::Conv2d {
            name: None,
            filters: 2,
            kernel_size: [3, 3],
            strides: [1, 1],
            kernel: vec![0.0; 5],
            bias: None,
        };
        let err = Layer::build(&spec, "conv", &[8, 8, 1]).unwrap_err();
        assert!(err.to_string().contains("expected 18"));
    }

    #[test]
    fn max_pool_takes_window_maximum() {
        let spec = LayerSpec::MaxPool2d {
            name: None,
            pool_size: [2, 2],
        };
        let (layer, shape) = Layer::build(&spec, "pool", &[2, 4, 1]).unwrap();
        assert_eq!(shape, vec![1, 2, 1]);
        let input = ArrayD::from_shape_vec(
            IxDyn(&[1, 2, 4, 1]),
            vec![1.0, 7.0, -1.0, -3.0, 2.0, 0.0, -2.0, -4.0],
        )
        .unwrap();
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.into_raw_vec(), vec![7.0, -1.0]);
    }

    #[test]
    fn dense_and_softmax() {
        let spec = LayerSpec::Dense {
            name: None,
            units: 2,
            kernel: vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            bias: None,
        };
        let (dense, shape) = Layer::build(&spec, "dense", &[3]).unwrap();
        assert_eq!(shape, vec![2]);
        let x = array![[1.0_f32, 2.0, 3.0]].into_dyn();
        let y = dense.forward(&x).unwrap();
        assert_eq!(y, array![[4.0_f32, 5.0]].into_dyn());

        let p = Layer::Softmax.forward(&y).unwrap();
        assert!((p.sum() - 1.0).abs() < 1e-6);
        assert!(p[[0, 1]] > p[[0, 0]]);
    }

    #[test]
    fn flatten_keeps_batch_axis() {
        let x = ArrayD::<f32>::zeros(IxDyn(&[1, 2, 3, 4]));
        let y = Layer::Flatten.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1, 24]);
    }

    #[test]
    fn dropout_is_identity_at_inference() {
        let x = array![[1.0_f32, -2.0]].into_dyn();
        assert_eq!(Layer::Dropout { rate: 0.5 }.forward(&x).unwrap(), x);
    }
}

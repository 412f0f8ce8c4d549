/// Render layer: turn arrays into pixel buffers.
///
/// Architecture:
/// ```text
///   activation maps (ArrayD)
///        │
///        ▼
///   ┌────────────┐
///   │ activation │  batch check, channel tiling → Array2
///   └────────────┘
///        │
///        ▼
///   ┌────────────┐      ┌────────┐
///   │   figure   │ ───▶ │  crop  │  RgbImage in, RgbImage out
///   └────────────┘      └────────┘
/// ```

pub mod activation;
pub mod crop;
pub mod figure;
pub mod norm;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("One image at a time to visualize (batch size is {0})")]
    BatchSize(usize),

    #[error("len(shape) = {0} has not been implemented")]
    UnsupportedRank(usize),

    #[error("no activation maps to display")]
    Empty,

    #[error("figure size {width}x{height} px at {dpi} dpi is empty")]
    EmptyFigure { width: f32, height: f32, dpi: f32 },
}

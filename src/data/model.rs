use std::fmt;

use anyhow::{bail, Result};
use image::{Rgb, RgbImage};
use ndarray::{Array4, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ChannelOrder – how the three colour channels are laid out in an array
// ---------------------------------------------------------------------------

/// Channel order of a three-channel pixel array.
///
/// Frames are always stored as RGB; BGR only exists at the array boundary,
/// for models trained on BGR-ordered input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Index of the source RGB channel written at position `c`.
    fn source_channel(self, c: usize) -> usize {
        match self {
            ChannelOrder::Rgb => c,
            ChannelOrder::Bgr => 2 - c,
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOrder::Rgb => write!(f, "RGB"),
            ChannelOrder::Bgr => write!(f, "BGR"),
        }
    }
}

/// Swap the first and third channel of every pixel (BGR ↔ RGB).
pub fn swap_channels(img: &RgbImage) -> RgbImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let Rgb([a, b, c]) = *px;
        *px = Rgb([c, b, a]);
    }
    out
}

// ---------------------------------------------------------------------------
// ImageSequence – ordered frames loaded from a directory
// ---------------------------------------------------------------------------

/// An ordered collection of decoded frames.
#[derive(Debug, Clone, Default)]
pub struct ImageSequence {
    /// Decoded frames, in filename-numeric order.
    pub frames: Vec<RgbImage>,
    /// Source file names (lowercased), parallel to `frames`.
    pub names: Vec<String>,
}

impl ImageSequence {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&RgbImage> {
        self.frames.get(index)
    }

    /// The `(width, height)` shared by every frame, or `None` if the
    /// sequence is empty or ragged.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let first = self.frames.first()?.dimensions();
        self.frames
            .iter()
            .all(|f| f.dimensions() == first)
            .then_some(first)
    }

    /// Stack every frame into an `(N, H, W, 3)` array.
    pub fn to_array(&self, order: ChannelOrder) -> Result<Array4<u8>> {
        let Some((w, h)) = self.dimensions() else {
            if self.is_empty() {
                return Ok(Array4::zeros((0, 0, 0, 3)));
            }
            bail!("Frames have differing shapes, cannot stack into one array");
        };

        let (w, h) = (w as usize, h as usize);
        let mut out = Array4::<u8>::zeros((self.len(), h, w, 3));
        for (n, frame) in self.frames.iter().enumerate() {
            for (x, y, px) in frame.enumerate_pixels() {
                for c in 0..3 {
                    out[[n, y as usize, x as usize, c]] = px.0[order.source_channel(c)];
                }
            }
        }
        Ok(out)
    }

    /// One frame as a `(1, H, W, 3)` model input scaled to `[0, 1]`.
    pub fn frame_tensor(&self, index: usize, order: ChannelOrder) -> Result<ArrayD<f32>> {
        let Some(frame) = self.frame(index) else {
            bail!("Frame {index} out of range (sequence has {} frames)", self.len());
        };
        let (w, h) = frame.dimensions();
        let mut out = ArrayD::<f32>::zeros(IxDyn(&[1, h as usize, w as usize, 3]));
        for (x, y, px) in frame.enumerate_pixels() {
            for c in 0..3 {
                out[[0, y as usize, x as usize, c]] =
                    px.0[order.source_channel(c)] as f32 / 255.0;
            }
        }
        Ok(out)
    }
}

use std::ops::Range;

use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

/// Rows and columns to keep when cropping a rendered figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropBox {
    pub rows: Range<u32>,
    pub cols: Range<u32>,
}

impl Default for CropBox {
    fn default() -> Self {
        Self {
            rows: 700..4300,
            cols: 2500..16000,
        }
    }
}

/// Cut `rows` × `cols` out of an image, rows first.
///
/// Ranges behave like array slices: they are clamped to the image, and an
/// empty or inverted range gives an empty image rather than an error.
pub fn crop(img: &RgbImage, rows: Range<u32>, cols: Range<u32>) -> RgbImage {
    let (width, height) = img.dimensions();
    let clamp = |r: Range<u32>, len: u32| {
        let start = r.start.min(len);
        let end = r.end.min(len).max(start);
        start..end
    };
    let rows = clamp(rows, height);
    let cols = clamp(cols, width);

    imageops::crop_imm(img, cols.start, rows.start, cols.len() as u32, rows.len() as u32)
        .to_image()
}

/// [`crop`] with a [`CropBox`].
pub fn crop_box(img: &RgbImage, bbox: &CropBox) -> RgbImage {
    crop(img, bbox.rows.clone(), bbox.cols.clone())
}

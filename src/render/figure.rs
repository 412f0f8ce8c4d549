use image::{Rgb, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::RenderError;
use crate::colormap::{finite_range, Colormap};

// Default subplot rectangle, as fractions of the figure (origin bottom-left).
const AXES_LEFT: f64 = 0.125;
const AXES_RIGHT: f64 = 0.9;
const AXES_BOTTOM: f64 = 0.11;
const AXES_TOP: f64 = 0.88;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Size and style of a rendered figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureSpec {
    /// Requested `(width, height)` in pixels.
    pub size: (u32, u32),
    pub dpi: f32,
    pub cmap: Colormap,
}

impl Default for FigureSpec {
    fn default() -> Self {
        Self {
            size: (250, 70),
            dpi: 70.0,
            cmap: Colormap::Inferno,
        }
    }
}

impl FigureSpec {
    /// Canvas size in whole pixels: the figure is sized in inches
    /// (`size / dpi`) and rasterized at `dpi`, truncating.
    pub fn canvas_size(&self) -> (u32, u32) {
        let dpi = self.dpi as f64;
        let w = self.size.0 as f64 / dpi * dpi;
        let h = self.size.1 as f64 / dpi * dpi;
        (w as u32, h as u32)
    }
}

/// Rasterize a 2-D array as a colormapped, axis-less figure.
///
/// The image keeps its aspect ratio and is centred in the default subplot
/// area on a white canvas. Pixels are sampled nearest-neighbour.
pub fn get_figure(img: &Array2<f32>, spec: &FigureSpec) -> Result<RgbImage, RenderError> {
    let empty = RenderError::EmptyFigure {
        width: spec.size.0 as f32,
        height: spec.size.1 as f32,
        dpi: spec.dpi,
    };
    if !(spec.dpi > 0.0) {
        return Err(empty);
    }
    let (width, height) = spec.canvas_size();
    if width == 0 || height == 0 {
        return Err(empty);
    }

    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
    let (rows, cols) = img.dim();
    if rows == 0 || cols == 0 {
        return Ok(canvas);
    }

    // Axes rectangle in canvas pixels, origin top-left.
    let (fw, fh) = (width as f64, height as f64);
    let ax_x = AXES_LEFT * fw;
    let ax_y = (1.0 - AXES_TOP) * fh;
    let ax_w = (AXES_RIGHT - AXES_LEFT) * fw;
    let ax_h = (AXES_TOP - AXES_BOTTOM) * fh;

    let scale = (ax_w / cols as f64).min(ax_h / rows as f64);
    let draw_w = cols as f64 * scale;
    let draw_h = rows as f64 * scale;
    let x0 = ax_x + (ax_w - draw_w) / 2.0;
    let y0 = ax_y + (ax_h - draw_h) / 2.0;

    let (lo, hi) = finite_range(img.iter().copied());
    let span = hi - lo;

    for (px, py, pixel) in canvas.enumerate_pixels_mut() {
        let x = px as f64 + 0.5 - x0;
        let y = py as f64 + 0.5 - y0;
        if x < 0.0 || y < 0.0 || x >= draw_w || y >= draw_h {
            continue;
        }
        let col = ((x / scale) as usize).min(cols - 1);
        let row = ((y / scale) as usize).min(rows - 1);
        let v = img[[row, col]];
        let t = if span > 0.0 { (v - lo) / span } else { 0.0 };
        *pixel = spec.cmap.map(t);
    }

    log::debug!("Rendered {rows}x{cols} array into {width}x{height} figure");
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn default_canvas_matches_requested_pixels() {
        assert_eq!(FigureSpec::default().canvas_size(), (250, 70));
        let img = Array2::from_shape_fn((4, 40), |(r, c)| (r * 40 + c) as f32);
        let fig = get_figure(&img, &FigureSpec::default()).unwrap();
        assert_eq!(fig.dimensions(), (250, 70));
    }

    #[test]
    fn corners_stay_white_and_centre_is_coloured() {
        let spec = FigureSpec {
            size: (200, 200),
            dpi: 100.0,
            cmap: Colormap::Gray,
        };
        let img = array![[0.0_f32, 1.0], [1.0, 0.0]];
        let fig = get_figure(&img, &spec).unwrap();
        assert_eq!(*fig.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*fig.get_pixel(199, 199), BACKGROUND);

        // Square image in a 155x154 axes box: centred, 154 px per side.
        let centre_left = fig.get_pixel(80, 80).0;
        let centre_right = fig.get_pixel(120, 80).0;
        assert_eq!(centre_left, [0, 0, 0]);
        assert_eq!(centre_right, [255, 255, 255]);
    }

    #[test]
    fn non_positive_dpi_is_rejected() {
        let spec = FigureSpec {
            dpi: 0.0,
            ..FigureSpec::default()
        };
        assert!(get_figure(&array![[1.0_f32]], &spec).is_err());
    }
}

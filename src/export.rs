use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::GrayImage;
use ndarray::Array2;

use crate::config::Settings;
use crate::render::crop::crop_box;
use crate::render::figure::get_figure;
use crate::render::norm::norm_pixels;

/// Write the renderings of one activation grid into `dir`:
///
/// * `<layer>_figure.png`  – the figure at the configured size and colormap
/// * `<layer>_cropped.png` – the figure cut to the crop box, when non-empty
/// * `<layer>_norm.png`    – the raw grid rescaled to 0..=255 greyscale
///
/// Returns the paths written.
pub fn export_layer(
    dir: &Path,
    layer: &str,
    grid: &Array2<f32>,
    settings: &Settings,
) -> Result<Vec<PathBuf>> {
    let stem = sanitize(layer);
    let mut written = Vec::new();

    let figure = get_figure(grid, &settings.figure)
        .with_context(|| format!("rendering figure for {layer}"))?;
    let path = dir.join(format!("{stem}_figure.png"));
    figure
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    written.push(path);

    let cropped = crop_box(&figure, &settings.crop);
    if cropped.width() > 0 && cropped.height() > 0 {
        let path = dir.join(format!("{stem}_cropped.png"));
        cropped
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    } else {
        log::warn!(
            "Crop box {:?}x{:?} lies outside the {}x{} figure of {layer}, skipping",
            settings.crop.rows,
            settings.crop.cols,
            figure.height(),
            figure.width()
        );
    }

    let norm = norm_pixels(grid);
    let (rows, cols) = grid.dim();
    let gray = GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        image::Luma([norm[[y as usize, x as usize]].round() as u8])
    });
    let path = dir.join(format!("{stem}_norm.png"));
    gray.save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    written.push(path);

    log::info!("Exported {} file(s) for layer {layer}", written.len());
    Ok(written)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::crop::CropBox;

    #[test]
    fn writes_figure_and_norm_and_skips_empty_crop() {
        let dir = tempfile::tempdir().unwrap();
        let grid = Array2::from_shape_fn((3, 12), |(r, c)| (r * 12 + c) as f32);
        let written = export_layer(dir.path(), "conv2d_1", &grid, &Settings::default()).unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["conv2d_1_figure.png", "conv2d_1_norm.png"]);

        let figure = image::open(&written[0]).unwrap();
        assert_eq!((figure.width(), figure.height()), (250, 70));
        let norm = image::open(&written[1]).unwrap().to_luma8();
        assert_eq!(norm.get_pixel(0, 0).0, [0]);
        assert_eq!(norm.get_pixel(11, 2).0, [255]);
    }

    #[test]
    fn writes_cropped_figure_when_box_overlaps() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            crop: CropBox {
                rows: 10..60,
                cols: 30..220,
            },
            ..Settings::default()
        };
        let grid = Array2::from_elem((2, 2), 1.0_f32);
        let written = export_layer(dir.path(), "dense/1", &grid, &settings).unwrap();
        assert_eq!(written.len(), 3);

        let cropped = image::open(&written[1]).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (190, 50));
        assert!(written[1].ends_with("dense_1_cropped.png"));
    }
}

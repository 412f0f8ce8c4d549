use image::RgbImage;
use ndarray::{Array2, ArrayD, Axis, Ix2, Ix4};

use super::RenderError;
use crate::colormap::Colormap;

/// Flat activations longer than this are folded into a square.
pub const MAX_ROW_ACTIVATIONS: usize = 1024;

fn batch_size(map: &ArrayD<f32>) -> Result<usize, RenderError> {
    map.shape()
        .first()
        .copied()
        .ok_or(RenderError::UnsupportedRank(0))
}

/// Lay one activation map out as a 2-D grid for display.
///
/// * `(1, H, W, C)`: channels side by side, giving `(H, C * W)`.
/// * `(1, N)`: a single row, or the first `s * s` values folded into an
///   `(s, s)` square when `N` exceeds [`MAX_ROW_ACTIVATIONS`].
pub fn activation_grid(map: &ArrayD<f32>) -> Result<Array2<f32>, RenderError> {
    let batch = batch_size(map)?;
    if batch != 1 {
        return Err(RenderError::BatchSize(batch));
    }

    match map.ndim() {
        4 => {
            let map = map
                .view()
                .into_dimensionality::<Ix4>()
                .map_err(|_| RenderError::UnsupportedRank(4))?;
            let (_, h, w, c) = map.dim();
            Ok(Array2::from_shape_fn((h, c * w), |(y, col)| {
                map[[0, y, col % w, col / w]]
            }))
        }
        2 => {
            let row = map.index_axis(Axis(0), 0);
            let n = row.len();
            if n > MAX_ROW_ACTIVATIONS {
                let side = (n as f64).sqrt().floor() as usize;
                let square: Vec<f32> = row.iter().take(side * side).copied().collect();
                Array2::from_shape_vec((side, side), square)
                    .map_err(|_| RenderError::UnsupportedRank(2))
            } else {
                row.insert_axis(Axis(0))
                    .to_owned()
                    .into_dimensionality::<Ix2>()
                    .map_err(|_| RenderError::UnsupportedRank(2))
            }
        }
        rank => Err(RenderError::UnsupportedRank(rank)),
    }
}

/// Colour every activation map for display, in order.
///
/// All maps must come from a single input image.
pub fn display_activations(
    maps: &[ArrayD<f32>],
    cmap: Colormap,
) -> Result<Vec<RgbImage>, RenderError> {
    let first = maps.first().ok_or(RenderError::Empty)?;
    let batch = batch_size(first)?;
    if batch != 1 {
        return Err(RenderError::BatchSize(batch));
    }

    maps.iter()
        .enumerate()
        .map(|(i, map)| {
            log::debug!("Displaying activation map {i} {:?}", map.shape());
            activation_grid(map).map(|grid| cmap.apply(&grid))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn conv_maps_tile_channels_horizontally() {
        // (1, 2, 3, 2): channel 0 holds 0..6, channel 1 holds 100..106
        let map = ArrayD::from_shape_fn(IxDyn(&[1, 2, 3, 2]), |ix| {
            (ix[3] * 100 + ix[1] * 3 + ix[2]) as f32
        });
        let grid = activation_grid(&map).unwrap();
        assert_eq!(grid.dim(), (2, 6));
        assert_eq!(grid.row(0).to_vec(), vec![0.0, 1.0, 2.0, 100.0, 101.0, 102.0]);
        assert_eq!(grid[[1, 5]], 105.0);
    }

    #[test]
    fn short_dense_maps_become_one_row() {
        let map = ArrayD::from_elem(IxDyn(&[1, 10]), 1.0_f32);
        assert_eq!(activation_grid(&map).unwrap().dim(), (1, 10));

        let edge = ArrayD::from_elem(IxDyn(&[1, 1024]), 1.0_f32);
        assert_eq!(activation_grid(&edge).unwrap().dim(), (1, 1024));
    }

    #[test]
    fn long_dense_maps_fold_into_square() {
        let map = ArrayD::from_shape_fn(IxDyn(&[1, 1100]), |ix| ix[1] as f32);
        let grid = activation_grid(&map).unwrap();
        assert_eq!(grid.dim(), (33, 33));
        assert_eq!(grid[[1, 0]], 33.0);
        assert_eq!(grid[[32, 32]], 1088.0);
    }

    #[test]
    fn rank_three_is_not_supported() {
        let map = ArrayD::<f32>::zeros(IxDyn(&[1, 4, 4]));
        assert_eq!(activation_grid(&map), Err(RenderError::UnsupportedRank(3)));
    }

    #[test]
    fn batches_larger_than_one_are_rejected() {
        let maps = vec![ArrayD::<f32>::zeros(IxDyn(&[2, 8]))];
        assert_eq!(
            display_activations(&maps, Colormap::Inferno),
            Err(RenderError::BatchSize(2))
        );
        assert_eq!(display_activations(&[], Colormap::Inferno), Err(RenderError::Empty));
    }

    #[test]
    fn display_produces_one_image_per_map() {
        let maps = vec![
            ArrayD::<f32>::zeros(IxDyn(&[1, 4, 5, 3])),
            ArrayD::from_elem(IxDyn(&[1, 7]), 0.5_f32),
        ];
        let images = display_activations(&maps, Colormap::Viridis).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].dimensions(), (15, 4));
        assert_eq!(images[1].dimensions(), (7, 1));
    }
}

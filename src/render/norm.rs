use ndarray::{ArrayBase, ArrayD, Data, Dimension};

use crate::colormap::finite_range;

/// Rescale an array to the `0..=255` range: `(x - min) / (max - min) * 255`.
///
/// A constant array has no range and comes back as all zeros.
pub fn norm_pixels<S, D>(img: &ArrayBase<S, D>) -> ArrayD<f32>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let (lo, hi) = finite_range(img.iter().copied());
    let span = hi - lo;
    img.mapv(|v| if span > 0.0 { (v - lo) / span * 255.0 } else { 0.0 })
        .into_dyn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn stretches_to_full_byte_range() {
        let out = norm_pixels(&array![[-1.0_f32, 0.0], [1.0, 3.0]]);
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out[[0, 0]], 0.0);
        assert_eq!(out[[1, 1]], 255.0);
        assert!((out[[0, 1]] - 63.75).abs() < 1e-4);
    }

    #[test]
    fn constant_input_maps_to_zero() {
        let out = norm_pixels(&array![5.0_f32, 5.0, 5.0]);
        assert!(out.iter().all(|&v| v == 0.0));
    }
}

use crate::core::Image;
use crate::warp::Warped;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Accumulate every warped image onto the shared canvas by linear
/// (horizontal) feathering: each destination pixel is
/// `sum(w_i * color_i) / sum(w_i)` over every image that contributed a
/// non-sentinel sample there. Pixels with zero total weight keep the
/// "no data" sentinel.
#[must_use]
pub fn blend(warped: &[Warped], canvas_size: (usize, usize), channels: usize) -> Image {
    let (w, h) = canvas_size;
    let mut out = Image::empty(w, h, channels);

    let rows: Vec<usize> = (0..h).collect();
    let compute_row = |&row: &usize| -> Vec<f32> {
        let mut row_out = vec![-1.0f32; w * channels];
        for col in 0..w {
            let mut sum = vec![0.0f32; channels];
            let mut wsum = 0.0f32;
            for img in warped {
                let weight = img.weight[row * w + col];
                if weight <= 0.0 {
                    continue;
                }
                let pixel = img.image.at(row, col);
                if Image::is_no_data(pixel) {
                    continue;
                }
                for c in 0..channels {
                    sum[c] += pixel[c] * weight;
                }
                wsum += weight;
            }
            if wsum > 0.0 {
                for c in 0..channels {
                    row_out[col * channels + c] = sum[c] / wsum;
                }
            }
        }
        row_out
    };

    #[cfg(feature = "rayon")]
    let rows_data: Vec<Vec<f32>> = rows.par_iter().map(compute_row).collect();
    #[cfg(not(feature = "rayon"))]
    let rows_data: Vec<Vec<f32>> = rows.iter().map(compute_row).collect();

    for (row, data) in rows_data.into_iter().enumerate() {
        out.data_mut()[row * w * channels..(row + 1) * w * channels].copy_from_slice(&data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fully_weighted_image_passes_through() {
        let mut image = Image::new(2, 2, 1);
        image.at_mut(0, 0)[0] = 5.0;
        let weight = vec![1.0, 0.0, 0.0, 0.0];
        let warped = vec![Warped { image, weight }];
        let out = blend(&warped, (2, 2), 1);
        assert_eq!(out.at(0, 0)[0], 5.0);
        assert!(Image::is_no_data(out.at(1, 1)));
    }

    #[test]
    fn zero_weight_everywhere_leaves_sentinel() {
        let image = Image::new(1, 1, 1);
        let weight = vec![0.0];
        let warped = vec![Warped { image, weight }];
        let out = blend(&warped, (1, 1), 1);
        assert!(Image::is_no_data(out.at(0, 0)));
    }
}

use crate::core::Image;

/// Build a normalized 1-D Gaussian kernel with radius `ceil(3*sigma)`.
#[must_use]
pub fn gaussian_kernel_1d(sigma: f64) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil().max(1.0) as i32;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| {
            let x = f64::from(i);
            (-(x * x) / (2.0 * sigma * sigma)).exp() as f32
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    if sum > 0.0 {
        for v in &mut kernel {
            *v /= sum;
        }
    }
    kernel
}

/// Separable Gaussian blur on a single-channel image, clamping at the
/// border (replicate padding) rather than rejecting out-of-range taps.
#[must_use]
pub fn gaussian_blur(src: &Image, sigma: f64) -> Image {
    let kernel = gaussian_kernel_1d(sigma);
    let radius = (kernel.len() / 2) as i32;
    let (w, h, c) = (src.width(), src.height(), src.channels());

    let mut tmp = Image::new(w, h, c);
    for row in 0..h {
        for col in 0..w {
            let mut acc = vec![0.0f32; c];
            for (k, &weight) in kernel.iter().enumerate() {
                let dx = k as i32 - radius;
                let sx = (col as i32 + dx).clamp(0, w as i32 - 1) as usize;
                let px = src.at(row, sx);
                for ch in 0..c {
                    acc[ch] += px[ch] * weight;
                }
            }
            tmp.at_mut(row, col).copy_from_slice(&acc);
        }
    }

    let mut out = Image::new(w, h, c);
    for row in 0..h {
        for col in 0..w {
            let mut acc = vec![0.0f32; c];
            for (k, &weight) in kernel.iter().enumerate() {
                let dy = k as i32 - radius;
                let sy = (row as i32 + dy).clamp(0, h as i32 - 1) as usize;
                let px = tmp.at(sy, col);
                for ch in 0..c {
                    acc[ch] += px[ch] * weight;
                }
            }
            out.at_mut(row, col).copy_from_slice(&acc);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_sums_to_one() {
        let k = gaussian_kernel_1d(1.6);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn blur_preserves_constant_image() {
        let img = Image::new(10, 10, 1);
        let blurred = gaussian_blur(&img, 1.6);
        for row in 0..10 {
            for col in 0..10 {
                assert_eq!(blurred.at(row, col)[0], 0.0);
            }
        }
    }
}

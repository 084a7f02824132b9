use crate::error::{Error, Result};

/// A row-major, float-native image buffer.
///
/// Samples are nominally in `[0, 1]`. A pixel whose channels are all
/// negative is the "no data" sentinel used by the warper and blender to
/// mark locations that fall outside a source image after projection.
#[derive(Debug, Clone)]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

/// Sentinel value written into a channel to mark "no data".
pub const NO_DATA: f32 = -1.0;

impl Image {
    #[must_use]
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    /// Build an image filled with the "no data" sentinel.
    #[must_use]
    pub fn empty(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![NO_DATA; width * height * channels],
        }
    }

    pub fn from_raw(width: usize, height: usize, channels: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height * channels {
            return Err(Error::InvalidDimensions(format!(
                "expected {} samples, got {}",
                width * height * channels,
                data.len()
            )));
        }
        Ok(Self { width, height, channels, data })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[must_use]
    pub fn at(&self, row: usize, col: usize) -> &[f32] {
        let i = (row * self.width + col) * self.channels;
        &self.data[i..i + self.channels]
    }

    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut [f32] {
        let i = (row * self.width + col) * self.channels;
        &mut self.data[i..i + self.channels]
    }

    #[must_use]
    pub fn get_checked(&self, row: isize, col: isize) -> Option<&[f32]> {
        if row < 0 || col < 0 || row as usize >= self.height || col as usize >= self.width {
            return None;
        }
        Some(self.at(row as usize, col as usize))
    }

    /// A pixel is "no data" when every channel is negative.
    #[must_use]
    pub fn is_no_data(pixel: &[f32]) -> bool {
        pixel.iter().all(|&v| v < 0.0)
    }

    pub fn set_no_data(&mut self, row: usize, col: usize) {
        for v in self.at_mut(row, col) {
            *v = NO_DATA;
        }
    }

    /// Bilinearly sample at a continuous `(x, y)` coordinate, `x` across
    /// width and `y` across height. Returns `None` if the sample falls
    /// outside the image or any of the four taps it needs is sentinel
    /// "no data".
    #[must_use]
    pub fn sample_bilinear(&self, x: f32, y: f32) -> Option<Vec<f32>> {
        if x < 0.0 || y < 0.0 || x >= (self.width - 1) as f32 || y >= (self.height - 1) as f32 {
            return None;
        }
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = x0 + 1;
        let y1 = y0 + 1;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let p00 = self.at(y0, x0);
        let p10 = self.at(y0, x1);
        let p01 = self.at(y1, x0);
        let p11 = self.at(y1, x1);
        if Self::is_no_data(p00) || Self::is_no_data(p10) || Self::is_no_data(p01) || Self::is_no_data(p11) {
            return None;
        }

        let mut out = vec![0.0; self.channels];
        for c in 0..self.channels {
            let top = p00[c] * (1.0 - fx) + p10[c] * fx;
            let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
            out[c] = top * (1.0 - fy) + bottom * fy;
        }
        Some(out)
    }

    /// Convert to single-channel luminance (Rec. 601 weights), used as
    /// the grayscale input to the scale-space pyramid.
    #[must_use]
    pub fn to_gray(&self) -> Image {
        if self.channels == 1 {
            return self.clone();
        }
        let mut out = Image::new(self.width, self.height, 1);
        for row in 0..self.height {
            for col in 0..self.width {
                let p = self.at(row, col);
                let gray = if Self::is_no_data(p) {
                    NO_DATA
                } else {
                    0.299 * p[0] + 0.587 * p[1] + 0.114 * p[2]
                };
                out.at_mut(row, col)[0] = gray;
            }
        }
        out
    }

    /// Resize by bilinear resampling to the given dimensions.
    #[must_use]
    pub fn resize(&self, new_width: usize, new_height: usize) -> Image {
        let mut out = Image::new(new_width, new_height, self.channels);
        let sx = (self.width.max(1) - 1).max(1) as f32 / (new_width.max(1)) as f32;
        let sy = (self.height.max(1) - 1).max(1) as f32 / (new_height.max(1)) as f32;
        for row in 0..new_height {
            for col in 0..new_width {
                let x = col as f32 * sx;
                let y = row as f32 * sy;
                match self.sample_bilinear(x, y) {
                    Some(v) => out.at_mut(row, col).copy_from_slice(&v),
                    None => out.set_no_data(row, col),
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_sample_is_exact_at_grid_points() {
        let mut img = Image::new(3, 3, 1);
        for row in 0..3 {
            for col in 0..3 {
                img.at_mut(row, col)[0] = (row * 3 + col) as f32;
            }
        }
        let v = img.sample_bilinear(1.0, 1.0).unwrap();
        assert_eq!(v[0], 4.0);
    }

    #[test]
    fn sentinel_taps_make_sample_none() {
        let mut img = Image::new(2, 2, 1);
        img.set_no_data(0, 0);
        assert!(img.sample_bilinear(0.5, 0.5).is_none());
    }

    #[test]
    fn to_gray_preserves_sentinel() {
        let mut img = Image::new(1, 1, 3);
        img.set_no_data(0, 0);
        let gray = img.to_gray();
        assert!(Image::is_no_data(gray.at(0, 0)));
    }
}

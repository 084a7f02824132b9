use crate::config::StitchConfig;
use crate::core::Image;
use crate::scalespace::gaussian::gaussian_blur;
use std::f32::consts::PI;

/// One octave of the Gaussian pyramid: `num_scales` blurred images plus
/// their gradient magnitude/orientation, grounded on the reference's
/// `Octave::cal_mag_ort` border convention (magnitude zeroed and
/// orientation pinned to `PI` on the leftmost/rightmost column).
pub struct Octave {
    pub images: Vec<Image>,
    pub magnitude: Vec<Image>,
    pub orientation: Vec<Image>,
}

impl Octave {
    #[must_use]
    pub fn build(base: &Image, cfg: &StitchConfig) -> Self {
        let mut images = Vec::with_capacity(cfg.num_scales);
        images.push(base.clone());
        for s in 1..cfg.num_scales {
            let sigma = cfg.base_sigma * 2f64.powf(s as f64 / (cfg.num_scales - 3) as f64);
            images.push(gaussian_blur(base, sigma));
        }

        let mut magnitude = Vec::with_capacity(cfg.num_scales);
        let mut orientation = Vec::with_capacity(cfg.num_scales);
        for img in &images {
            let (mag, ort) = cal_mag_ort(img);
            magnitude.push(mag);
            orientation.push(ort);
        }

        Self { images, magnitude, orientation }
    }
}

/// Gradient magnitude/orientation fields for a single-channel image.
/// Matches the reference's `Octave::cal_mag_ort`: the border column on
/// each side is forced to zero magnitude / `PI` orientation.
fn cal_mag_ort(img: &Image) -> (Image, Image) {
    let (w, h) = (img.width(), img.height());
    let mut mag = Image::new(w, h, 1);
    let mut ort = Image::new(w, h, 1);

    for row in 0..h {
        for col in 0..w {
            if col == 0 || col == w - 1 || row == 0 || row == h - 1 {
                mag.at_mut(row, col)[0] = 0.0;
                ort.at_mut(row, col)[0] = PI;
                continue;
            }
            let dx = img.at(row, col + 1)[0] - img.at(row, col - 1)[0];
            let dy = img.at(row + 1, col)[0] - img.at(row - 1, col)[0];
            mag.at_mut(row, col)[0] = dx.hypot(dy);
            ort.at_mut(row, col)[0] = dy.atan2(dx) + PI;
        }
    }
    (mag, ort)
}

/// Full pyramid: `num_octaves` octaves, each half the resolution of the
/// previous. Octave 0 is built from the input at full size.
pub struct ScaleSpace {
    pub octaves: Vec<Octave>,
}

impl ScaleSpace {
    #[must_use]
    pub fn build(gray: &Image, cfg: &StitchConfig) -> Self {
        let mut octaves = Vec::with_capacity(cfg.num_octaves);
        let mut current = gray.clone();
        for o in 0..cfg.num_octaves {
            let octave = Octave::build(&current, cfg);
            let next_w = (current.width() / 2).max(1);
            let next_h = (current.height() / 2).max(1);
            if o + 1 < cfg.num_octaves {
                current = current.resize(next_w, next_h);
            }
            octaves.push(octave);
        }
        Self { octaves }
    }
}

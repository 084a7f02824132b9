use crate::core::Image;
use crate::scalespace::octave::{Octave, ScaleSpace};

/// Difference-of-Gaussians stack for a single octave: `num_scales - 1`
/// images, each the absolute difference of two adjacent Gaussian scales.
pub struct Dog {
    pub layers: Vec<Image>,
}

impl Dog {
    #[must_use]
    pub fn build(octave: &Octave) -> Self {
        let mut layers = Vec::with_capacity(octave.images.len() - 1);
        for pair in octave.images.windows(2) {
            layers.push(abs_diff(&pair[0], &pair[1]));
        }
        Self { layers }
    }
}

fn abs_diff(a: &Image, b: &Image) -> Image {
    let mut out = Image::new(a.width(), a.height(), a.channels());
    for (dst, (x, y)) in out.data_mut().iter_mut().zip(a.data().iter().zip(b.data())) {
        *dst = (x - y).abs();
    }
    out
}

/// DoG stack for the whole pyramid.
pub struct DogSpace {
    pub octaves: Vec<Dog>,
}

impl DogSpace {
    #[must_use]
    pub fn build(scalespace: &ScaleSpace) -> Self {
        Self {
            octaves: scalespace.octaves.iter().map(Dog::build).collect(),
        }
    }
}

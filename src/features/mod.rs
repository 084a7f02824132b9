pub mod descriptor;
pub mod detect;
pub mod keypoint;
pub mod orientation;

pub use keypoint::{Feature, Keypoint};

use crate::config::StitchConfig;
use crate::core::Image;
use crate::error::{Error, Result};
use crate::scalespace::{DogSpace, ScaleSpace};
use crate::timing::Stopwatch;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Build the scale-space pyramid and extract keypoints+descriptors for
/// a single image.
pub fn extract(image_idx: usize, image: &Image, cfg: &StitchConfig) -> Result<Vec<Feature>> {
    let _t = Stopwatch::new("feature_extract");
    let gray = image.to_gray();
    let scalespace = ScaleSpace::build(&gray, cfg);
    let dogspace = DogSpace::build(&scalespace);

    let keypoints = detect::detect_keypoints(&scalespace, &dogspace, cfg);
    let mut features = Vec::with_capacity(keypoints.len());
    for kp in keypoints {
        if let Some(desc) = descriptor::compute_descriptor(&scalespace.octaves[kp.octave], &kp) {
            features.push(Feature { keypoint: kp, descriptor: desc });
        }
    }

    if features.is_empty() {
        return Err(Error::NoFeatures(image_idx));
    }
    log::info!("image {}: {} keypoints", image_idx, features.len());
    Ok(features)
}

/// Extract features for every image, in parallel across images.
pub fn extract_all(images: &[Image], cfg: &StitchConfig) -> Result<Vec<Vec<Feature>>> {
    #[cfg(feature = "rayon")]
    {
        images
            .par_iter()
            .enumerate()
            .map(|(i, img)| extract(i, img, cfg))
            .collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        images.iter().enumerate().map(|(i, img)| extract(i, img, cfg)).collect()
    }
}

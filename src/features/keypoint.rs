use crate::core::Point2f;

/// A detected SIFT-like keypoint: image-space position, scale, and
/// dominant gradient orientation.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub pt: Point2f,
    pub octave: usize,
    pub scale: usize,
    pub sigma: f32,
    pub angle: f32,
    pub response: f32,
}

/// A keypoint paired with its 128-dimensional descriptor.
#[derive(Debug, Clone)]
pub struct Feature {
    pub keypoint: Keypoint,
    pub descriptor: Vec<f32>,
}

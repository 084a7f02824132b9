pub mod geometry;
pub mod image;

pub use geometry::{apply_projective, normalize_3x3, Point2f, Size};
pub use image::{Image, NO_DATA};

//! Geometric estimation and compositing core for offline panorama
//! stitching: scale-space feature detection, descriptor matching,
//! RANSAC transform estimation, multi-image camera estimation, bundle
//! adjustment, cylindrical/spherical warping, and linear feather
//! blending.
//!
//! The crate never touches a filesystem or a terminal: callers decode
//! images into [`core::Image`] buffers and hand them to [`stitcher::Stitcher`].
//!
//! ```rust,no_run
//! use panostitch::config::StitchConfig;
//! use panostitch::core::Image;
//! use panostitch::stitcher::Stitcher;
//!
//! # fn main() -> panostitch::error::Result<()> {
//! let images: Vec<Image> = vec![Image::new(640, 480, 3), Image::new(640, 480, 3)];
//! let stitcher = Stitcher::new(StitchConfig::default());
//! let panorama = stitcher.build(&images)?;
//! # let _ = panorama;
//! # Ok(())
//! # }
//! ```

pub mod blend;
pub mod bundle;
pub mod camera;
pub mod config;
pub mod core;
pub mod error;
pub mod features;
pub mod matcher;
pub mod scalespace;
pub mod stitcher;
pub mod timing;
pub mod transform;
pub mod warp;

pub mod prelude {
    pub use crate::config::{ProjectionMode, StitchConfig};
    pub use crate::core::Image;
    pub use crate::error::{Error, Result};
    pub use crate::stitcher::Stitcher;
}

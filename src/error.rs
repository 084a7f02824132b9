use thiserror::Error;

/// Errors produced by the stitching pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("image {0} produced no keypoints")]
    NoFeatures(usize),

    #[error("pairwise matching failed between images {0} and {1}")]
    PairwiseMatchFailed(usize, usize),

    #[error("match graph is disconnected: {0} of {1} images reachable from the identity image")]
    DisconnectedGraph(usize, usize),

    #[error("singular matrix while solving {0}")]
    SingularMatrix(String),

    #[error("insufficient matches between images {0} and {1}: found {2}, need at least {3}")]
    InsufficientMatches(usize, usize, usize, usize),

    #[error("RANSAC could not find a model satisfying the sanity test between images {0} and {1}")]
    DegenerateRansac(usize, usize),

    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod hull;
pub mod model;
pub mod ransac;

pub use model::TransformKind;
pub use ransac::MatchInfo;

use crate::config::StitchConfig;
use crate::core::Point2f;
use crate::features::Feature;
use crate::matcher::Match;

/// Transform kind to use: an affine (translation + rotation-in-plane,
/// no projective skew) model in cylindrical pre-warp mode or whenever a
/// caller forces translational geometry with `cfg.trans`; a full
/// projective homography otherwise.
#[must_use]
pub fn transform_kind_for(cfg: &StitchConfig) -> TransformKind {
    if cfg.trans || cfg.cylinder {
        TransformKind::Affine
    } else {
        TransformKind::Projective
    }
}

/// Estimate transforms for every matched pair, dropping (and logging)
/// pairs that fail RANSAC rather than aborting the whole pipeline.
pub fn estimate_all(
    features: &[Vec<Feature>],
    sizes: &[(usize, usize)],
    pair_matches: &[((usize, usize), Vec<Match>)],
    cfg: &StitchConfig,
) -> Vec<ransac::MatchInfo> {
    let kind = transform_kind_for(cfg);
    let coords: Vec<Vec<Point2f>> = features.iter().map(|feats| feats.iter().map(|f| f.keypoint.pt).collect()).collect();
    let mut infos = Vec::new();
    for ((i, j), matches) in pair_matches {
        match ransac::estimate(*i, *j, &coords[*i], &coords[*j], matches, sizes[*i], kind, cfg) {
            Ok(info) => infos.push(info),
            Err(e) => log::warn!("pair ({i}, {j}) transform estimation failed: {e}"),
        }
    }
    infos
}

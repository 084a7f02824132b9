pub mod kdtree;

use crate::config::StitchConfig;
use crate::features::Feature;
use crate::timing::Stopwatch;
use kdtree::KDTree;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A single accepted correspondence between descriptor `query_idx` in
/// image A and `train_idx` in image B.
#[derive(Debug, Clone, Copy)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Squared Euclidean distance between two descriptors, with an
/// early-exit once the running partial sum exceeds `thres`: the
/// accumulation is checked every 32 components, mirroring the SIMD
/// early-exit contract of the reference's vectorized distance routine.
#[must_use]
pub fn euclidean_sqr_early_exit(a: &[f32], b: &[f32], thres: f32) -> f32 {
    let mut sum = 0.0f32;
    for (chunk_idx, (ca, cb)) in a.chunks(32).zip(b.chunks(32)).enumerate() {
        for (x, y) in ca.iter().zip(cb) {
            let d = x - y;
            sum += d * d;
        }
        if chunk_idx > 0 && sum > thres {
            return f32::MAX;
        }
    }
    sum
}

#[must_use]
pub fn hamming_distance(a: &[u32], b: &[u32]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Match descriptors from image A against a k-d tree built over image
/// B's descriptors, applying Lowe's ratio test: the nearest neighbor is
/// accepted only if it beats the second-nearest by at least `ratio`.
#[must_use]
pub fn ratio_test_match(query: &[Feature], tree: &KDTree, ratio: f32) -> Vec<Match> {
    let mut matches = Vec::new();
    for (qi, feature) in query.iter().enumerate() {
        let descriptor: Vec<f64> = feature.descriptor.iter().map(|&v| f64::from(v)).collect();
        let Ok(neighbors) = tree.knn_search(&descriptor, 2) else { continue };
        if neighbors.len() < 2 {
            continue;
        }
        let (best_idx, best_dist) = neighbors[0];
        let (_, second_dist) = neighbors[1];
        if best_dist < f64::from(ratio) * second_dist {
            matches.push(Match {
                query_idx: qi,
                train_idx: best_idx,
                distance: best_dist as f32,
            });
        }
    }
    matches
}

/// Match every pair of images, parallelized across the pair list. Each
/// pair's descriptors are indexed into a k-d tree once and reused for
/// both directions; the reverse-direction match list is derived by
/// swapping indices rather than refit, per the upper-triangular
/// match-table convention.
pub fn match_all_pairs(features: &[Vec<Feature>], cfg: &StitchConfig) -> Vec<((usize, usize), Vec<Match>)> {
    let _t = Stopwatch::new("match_all_pairs");
    let n = features.len();
    let mut pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            pairs.push((i, j));
        }
    }

    let do_pair = |&(i, j): &(usize, usize)| -> ((usize, usize), Vec<Match>) {
        let data: Vec<Vec<f64>> = features[j]
            .iter()
            .map(|f| f.descriptor.iter().map(|&v| f64::from(v)).collect())
            .collect();
        let matches = match KDTree::build(&data) {
            Ok(tree) => ratio_test_match(&features[i], &tree, cfg.match_ratio),
            Err(_) => Vec::new(),
        };
        if matches.len() < 6 {
            log::warn!("pair ({i}, {j}): only {} putative matches", matches.len());
        }
        ((i, j), matches)
    };

    #[cfg(feature = "rayon")]
    {
        pairs.par_iter().map(do_pair).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        pairs.iter().map(do_pair).collect()
    }
}

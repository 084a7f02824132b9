//! Cylindrical/flat pre-warp compositing path: each input image is
//! treated as sitting on a shared projection surface under an
//! *identity* rotation (no bundle-adjusted camera orientation), and
//! panorama composition happens by estimating a 2-D affine placement
//! per image directly from pairwise matches computed in that
//! projection-surface's local coordinates, rather than by the
//! rotation-propagation machinery `camera::estimate_cameras` uses for
//! the full camera-estimation mode.
//!
//! Grounded on the reference's cylindrical stitching mode
//! (`cylinder.cc`): the forward pre-warp of features plus a focal-scale
//! line search (`update_h_factor`/`SLOPE_PLAIN`), a circular-panorama
//! closure check (`calc_matrix_pano`), and a post-hoc horizontal
//! straightening pass (`straighten_simple`).

use crate::camera::{max_confidence_spanning_tree, median_index, Camera};
use crate::config::StitchConfig;
use crate::core::{apply_projective, Image, Point2f};
use crate::error::Result;
use crate::features::Feature;
use crate::matcher::Match;
use crate::transform::{ransac, MatchInfo, TransformKind};
use crate::warp::projection::{Projection, Vec2};
use crate::warp::{build_components_for, canvas_extent_placed, project_point, warp_features, warp_image_placed, ImageComponent};
use nalgebra::{Matrix3, Vector3};
use std::collections::VecDeque;

/// Early-exit threshold for the focal-scale line search: once the
/// vertical slope between the first and last image's placed centers
/// drops below this, the panorama is considered level enough.
const SLOPE_PLAIN: f64 = 0.08;

/// Run the cylindrical/flat pre-warp pipeline end to end, producing the
/// blended panorama.
pub fn build(
    images: &[Image],
    sizes: &[(usize, usize)],
    features: &[Vec<Feature>],
    pair_matches: &[((usize, usize), Vec<Match>)],
    cfg: &StitchConfig,
    channels: usize,
) -> Result<Image> {
    let n = images.len();
    let base_focal = sizes.iter().map(|&(w, h)| 0.5 * (w as f64 + h as f64)).sum::<f64>() / n.max(1) as f64;

    let h_factor = search_h_factor(sizes, features, pair_matches, cfg, base_focal);
    let focal = base_focal * h_factor;
    log::info!("cylinder pre-warp: focal {focal:.1} (h_factor {h_factor:.3})");

    let mut eval = evaluate(sizes, features, pair_matches, cfg, focal)?;

    if close_loop(n, &mut eval.placements, &eval.match_infos, features, cfg) {
        log::info!("cylinder pre-warp: circular panorama detected, loop closure applied");
    }
    straighten(n, &mut eval.placements, &eval.components, &eval.projection, focal, sizes);

    let (origin, width, height) = canvas_extent_placed(&eval.components, &eval.placements, &eval.projection, sizes, focal);
    log::info!("canvas size {width}x{height}");

    let warped: Vec<_> = images
        .iter()
        .zip(&eval.components)
        .zip(&eval.placements)
        .map(|((img, comp), placement)| warp_image_placed(img, comp, &eval.projection, placement, focal, origin, (width, height)))
        .collect();

    Ok(crate::blend::blend(&warped, (width, height), channels))
}

/// Everything one trial focal length produces: per-image components on
/// the cylindrical surface, the pairwise affine matches recovered on
/// warped feature coordinates, the resulting placements, and each
/// image's placed center (for the line search / straightening passes).
struct Evaluation {
    components: Vec<ImageComponent>,
    match_infos: Vec<MatchInfo>,
    placements: Vec<Matrix3<f64>>,
    projection: Projection,
    centers: Vec<Point2f>,
}

fn evaluate(
    sizes: &[(usize, usize)],
    features: &[Vec<Feature>],
    pair_matches: &[((usize, usize), Vec<Match>)],
    cfg: &StitchConfig,
    focal: f64,
) -> Result<Evaluation> {
    let n = sizes.len();
    let cameras: Vec<Camera> = sizes.iter().map(|&(w, h)| Camera::new(focal, w as f64 / 2.0, h as f64 / 2.0)).collect();
    let projection = Projection::Cylindrical { center: Vector3::new(0.0, 0.0, -focal) };
    let components = build_components_for(&cameras, sizes, &projection);

    let warped_coords: Vec<Vec<Point2f>> = features
        .iter()
        .zip(&components)
        .map(|(feats, comp)| warp_features(feats, comp, &projection, Vec2::new(0.0, 0.0), focal))
        .collect();

    let mut match_infos = Vec::new();
    for ((i, j), matches) in pair_matches {
        match ransac::estimate(*i, *j, &warped_coords[*i], &warped_coords[*j], matches, sizes[*i], TransformKind::Affine, cfg) {
            Ok(info) => match_infos.push(info),
            Err(e) => log::warn!("pair ({i}, {j}) cylinder placement estimation failed: {e}"),
        }
    }

    let tree = max_confidence_spanning_tree(n, &match_infos)?;
    let identity = median_index(n);
    let placements = propagate_placements(n, &tree, &match_infos, identity)?;

    let centers = centers_of(sizes, &components, &placements, &projection, focal);

    Ok(Evaluation { components, match_infos, placements, projection, centers })
}

fn centers_of(sizes: &[(usize, usize)], components: &[ImageComponent], placements: &[Matrix3<f64>], projection: &Projection, focal: f64) -> Vec<Point2f> {
    sizes
        .iter()
        .zip(components)
        .zip(placements)
        .map(|((&(w, h), comp), placement)| {
            let local = project_point(comp, projection, Vec2::new(0.0, 0.0), focal, Point2f::new(w as f32 / 2.0, h as f32 / 2.0));
            apply_projective(placement, local)
        })
        .collect()
}

/// BFS placement propagation: if `MatchInfo.homography` maps
/// `from`-local coordinates to `to`-local coordinates, consistency of
/// the shared canvas requires `placement[from] = placement[to] * H`.
/// Mirrors `camera::propagate_rotations`'s tree-walk shape, but composes
/// 2-D placements directly rather than undoing/redoing camera
/// intrinsics -- pre-warp placement lives entirely in the already
/// projected 2-D surface, not in ray space.
fn propagate_placements(n: usize, tree: &[crate::camera::TreeEdge], match_infos: &[MatchInfo], identity: usize) -> Result<Vec<Matrix3<f64>>> {
    let mut placement = vec![Matrix3::identity(); n];
    let mut adjacency: Vec<Vec<&crate::camera::TreeEdge>> = vec![Vec::new(); n];
    for edge in tree {
        adjacency[edge.from].push(edge);
        adjacency[edge.to].push(edge);
    }

    let mut visited = vec![false; n];
    visited[identity] = true;
    let mut queue = VecDeque::new();
    queue.push_back(identity);

    while let Some(cur) = queue.pop_front() {
        for edge in &adjacency[cur] {
            let (other, is_forward) = if edge.from == cur { (edge.to, true) } else { (edge.from, false) };
            if visited[other] {
                continue;
            }
            let m = &match_infos[edge.match_idx];
            placement[other] = if is_forward {
                // H maps `cur`-local -> `other`-local, so placement[cur] = placement[other] * H
                // => placement[other] = placement[cur] * H^-1.
                placement[cur] * m.homography.try_inverse().unwrap_or_else(Matrix3::identity)
            } else {
                // H maps `other`-local -> `cur`-local, so placement[other] = placement[cur] * H.
                placement[cur] * m.homography
            };
            visited[other] = true;
            queue.push_back(other);
        }
    }

    if visited.iter().any(|&v| !v) {
        let reachable = visited.iter().filter(|&&v| v).count();
        return Err(crate::error::Error::DisconnectedGraph(reachable, n));
    }
    Ok(placement)
}

fn vertical_slope(centers: &[Point2f]) -> f64 {
    let (Some(&first), Some(&last)) = (centers.first(), centers.last()) else {
        return 0.0;
    };
    let dx = f64::from(last.x - first.x);
    if dx.abs() < 1e-6 {
        return 0.0;
    }
    f64::from(last.y - first.y) / dx
}

/// Step-halving line search (up to 3 refinements) over a focal-scale
/// factor starting at `1.0`, minimizing the vertical slope between the
/// first and last image's placed centers. Early-exits once
/// `|slope| < SLOPE_PLAIN`.
fn search_h_factor(
    sizes: &[(usize, usize)],
    features: &[Vec<Feature>],
    pair_matches: &[((usize, usize), Vec<Match>)],
    cfg: &StitchConfig,
    base_focal: f64,
) -> f64 {
    let mut factor = 1.0;
    let mut best_slope = match evaluate(sizes, features, pair_matches, cfg, base_focal * factor) {
        Ok(eval) => vertical_slope(&eval.centers),
        Err(_) => return factor,
    };

    let mut step = 0.5;
    for _ in 0..3 {
        if best_slope.abs() < SLOPE_PLAIN {
            break;
        }
        let direction = if best_slope > 0.0 { -1.0 } else { 1.0 };
        let trial_factor = factor + direction * step;
        if trial_factor > 0.0 {
            if let Ok(eval) = evaluate(sizes, features, pair_matches, cfg, base_focal * trial_factor) {
                let trial_slope = vertical_slope(&eval.centers);
                if trial_slope.abs() < best_slope.abs() {
                    factor = trial_factor;
                    best_slope = trial_slope;
                }
            }
        }
        step *= 0.5;
    }
    factor
}

/// Circular-panorama detection: since pairwise matching already covers
/// every image pair (not just consecutive ones), the head/tail
/// `MatchInfo` the reference's `calc_matrix_pano` has to synthesize a
/// closing frame to obtain is already available directly. If its
/// inlier ratio clears `connected_thres`, the sequence wraps around;
/// redistribute the resulting loop-closure drift linearly across every
/// placement in between.
fn close_loop(n: usize, placements: &mut [Matrix3<f64>], match_infos: &[MatchInfo], features: &[Vec<Feature>], cfg: &StitchConfig) -> bool {
    if n <= 2 {
        return false;
    }
    let Some(closing) = match_infos.iter().find(|m| (m.from == 0 && m.to == n - 1) || (m.from == n - 1 && m.to == 0)) else {
        return false;
    };

    let total_feats = (features[0].len() + features[n - 1].len()).max(1);
    let ratio = 2.0 * closing.inlier_src.len() as f64 / total_feats as f64;
    if ratio <= cfg.connected_thres {
        return false;
    }

    let h = if closing.from == n - 1 { closing.homography } else { closing.inverse() };
    let origin = Point2f::new(0.0, 0.0);
    let predicted_origin = apply_projective(&(placements[n - 1] * h), origin);
    let actual_origin = apply_projective(&placements[0], origin);
    if predicted_origin.is_nan() || actual_origin.is_nan() {
        return false;
    }
    let drift = predicted_origin - actual_origin;

    for (i, placement) in placements.iter_mut().enumerate().take(n).skip(1) {
        let t = i as f64 / (n - 1) as f64;
        #[rustfmt::skip]
        let correction = Matrix3::new(
            1.0, 0.0, -f64::from(drift.x) * t,
            0.0, 1.0, -f64::from(drift.y) * t,
            0.0, 0.0, 1.0,
        );
        *placement = correction * *placement;
    }
    true
}

/// Post-hoc horizontal straightening: rotate every placement by the
/// angle between the first and last image's placed centers, so the
/// line between them ends up horizontal.
fn straighten(n: usize, placements: &mut [Matrix3<f64>], components: &[ImageComponent], projection: &Projection, focal: f64, sizes: &[(usize, usize)]) {
    if n < 2 {
        return;
    }
    let centers = centers_of(sizes, components, placements, projection, focal);
    let first = centers[0];
    let last = centers[n - 1];
    let dx = f64::from(last.x - first.x);
    let dy = f64::from(last.y - first.y);
    if dx.abs() < 1e-9 && dy.abs() < 1e-9 {
        return;
    }
    let angle = dy.atan2(dx);
    let (c, s) = (angle.cos(), angle.sin());
    #[rustfmt::skip]
    let rot = Matrix3::new(
        c, s, 0.0,
        -s, c, 0.0,
        0.0, 0.0, 1.0,
    );
    for p in placements.iter_mut() {
        *p = rot * *p;
    }
}

pub mod focal;

use crate::error::{Error, Result};
use crate::transform::MatchInfo;
use focal::{combine_focals, focal_from_homography};
use nalgebra::Matrix3;
use std::collections::VecDeque;

/// Camera intrinsics + rotation for one image in the panorama.
#[derive(Debug, Clone)]
pub struct Camera {
    pub focal: f64,
    pub ppx: f64,
    pub ppy: f64,
    pub aspect: f64,
    pub rotation: Matrix3<f64>,
}

impl Camera {
    #[must_use]
    pub fn new(focal: f64, ppx: f64, ppy: f64) -> Self {
        Self { focal, ppx, ppy, aspect: 1.0, rotation: Matrix3::identity() }
    }

    #[must_use]
    pub fn k(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focal, 0.0, self.ppx,
            0.0, self.focal * self.aspect, self.ppy,
            0.0, 0.0, 1.0,
        )
    }

    #[must_use]
    pub fn k_inverse(&self) -> Matrix3<f64> {
        self.k().try_inverse().unwrap_or_else(Matrix3::identity)
    }
}

/// Estimate a `Camera` for every image: focal by the Szeliski formula
/// (combined by median across all pairwise homographies touching that
/// image), rotation by BFS propagation from a maximum-confidence
/// spanning tree rooted at the identity (median-index) image.
pub fn estimate_cameras(
    num_images: usize,
    sizes: &[(usize, usize)],
    matches: &[MatchInfo],
) -> Result<Vec<Camera>> {
    let mut per_image_focals: Vec<Vec<f64>> = vec![Vec::new(); num_images];
    for m in matches {
        if let Some(f) = focal_from_homography(&m.homography) {
            per_image_focals[m.from].push(f);
            per_image_focals[m.to].push(f);
        }
    }

    let mut cameras: Vec<Camera> = (0..num_images)
        .map(|i| {
            let focal = combine_focals(&per_image_focals[i], sizes[i]);
            let (w, h) = sizes[i];
            Camera::new(focal, w as f64 / 2.0, h as f64 / 2.0)
        })
        .collect();

    let tree = max_confidence_spanning_tree(num_images, matches)?;
    let identity = median_index(num_images);
    propagate_rotations(&mut cameras, &tree, matches, identity)?;

    Ok(cameras)
}

pub(crate) struct TreeEdge {
    pub from: usize,
    pub to: usize,
    pub match_idx: usize,
}

/// Kruskal's algorithm over edges sorted by descending confidence,
/// ties broken by ascending `(from, to)` pair index for determinism.
/// Shared by both the full camera/rotation estimator and the
/// cylindrical pre-warp pipeline's 2-D placement propagation, since
/// both reduce to "build a max-confidence spanning tree over the
/// pairwise match graph, then BFS-propagate from the root".
pub(crate) fn max_confidence_spanning_tree(num_images: usize, matches: &[MatchInfo]) -> Result<Vec<TreeEdge>> {
    let mut edges: Vec<usize> = (0..matches.len()).filter(|&i| matches[i].confidence > 0.0).collect();
    edges.sort_by(|&a, &b| {
        matches[b]
            .confidence
            .partial_cmp(&matches[a].confidence)
            .unwrap()
            .then((matches[a].from, matches[a].to).cmp(&(matches[b].from, matches[b].to)))
    });

    let mut parent: Vec<usize> = (0..num_images).collect();
    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }

    let mut tree = Vec::new();
    for idx in edges {
        let m = &matches[idx];
        let (ra, rb) = (find(&mut parent, m.from), find(&mut parent, m.to));
        if ra != rb {
            parent[ra] = rb;
            tree.push(TreeEdge { from: m.from, to: m.to, match_idx: idx });
        }
    }

    let components: usize = (0..num_images).map(|i| find(&mut parent, i)).collect::<std::collections::HashSet<_>>().len();
    if components != 1 {
        let reachable = tree.len() + 1;
        return Err(Error::DisconnectedGraph(reachable, num_images));
    }
    Ok(tree)
}

pub(crate) fn median_index(num_images: usize) -> usize {
    num_images / 2
}

/// BFS from the identity image, propagating
/// `R_next = R_now * (K_from^-1 * H_{now->next} * K_next)`.
fn propagate_rotations(cameras: &mut [Camera], tree: &[TreeEdge], matches: &[MatchInfo], identity: usize) -> Result<()> {
    let mut adjacency: Vec<Vec<&TreeEdge>> = vec![Vec::new(); cameras.len()];
    for edge in tree {
        adjacency[edge.from].push(edge);
        adjacency[edge.to].push(edge);
    }

    let mut visited = vec![false; cameras.len()];
    visited[identity] = true;
    cameras[identity].rotation = Matrix3::identity();

    let mut queue = VecDeque::new();
    queue.push_back(identity);

    while let Some(cur) = queue.pop_front() {
        for edge in &adjacency[cur] {
            let (other, is_forward) = if edge.from == cur { (edge.to, true) } else { (edge.from, false) };
            if visited[other] {
                continue;
            }
            let m = &matches[edge.match_idx];
            let h = if is_forward { m.homography } else { m.inverse() };
            let k_cur_inv = cameras[cur].k_inverse();
            let k_other = cameras[other].k();
            cameras[other].rotation = cameras[cur].rotation * k_cur_inv * h * k_other;
            visited[other] = true;
            queue.push_back(other);
        }
    }

    if visited.iter().any(|&v| !v) {
        let reachable = visited.iter().filter(|&&v| v).count();
        return Err(Error::DisconnectedGraph(reachable, cameras.len()));
    }
    Ok(())
}

/// Projection method used by the warper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    Flat,
    Cylindrical,
    Spherical,
}

/// All tunable knobs of the pipeline, collapsed into a single
/// plain-old-data record instead of global flags.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchConfig {
    pub num_octaves: usize,
    pub num_scales: usize,
    pub base_sigma: f64,
    pub sift_contrast_thres: f64,
    pub sift_edge_thres: f64,

    pub match_ratio: f32,

    pub ransac_iterations: usize,
    pub ransac_inlier_thres: f64,
    pub inlier_min_ratio: f64,
    pub min_inliers: usize,

    pub connected_thres: f64,

    pub lm_lambda: f64,
    pub lm_max_iter: usize,
    pub lm_max_stale_iter: usize,
    pub jacobian_step: f64,

    pub projection: ProjectionMode,
    pub estimate_camera: bool,
    pub two_dimensional_feather: bool,

    /// Use cylindrical pre-warp mode: each input is forward-warped into
    /// cylindrical coordinates before feature extraction, and the
    /// panorama is composed by 2-D affine placement rather than full
    /// camera/rotation estimation. Mutually exclusive in effect with
    /// `estimate_camera` (this flag takes priority when both are set).
    pub cylinder: bool,
    /// Force a translational/affine pairwise model (no rotation baked
    /// into the homography) regardless of projection mode.
    pub trans: bool,

    pub seed: u64,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            num_octaves: 4,
            num_scales: 7,
            base_sigma: 1.6,
            sift_contrast_thres: 0.04,
            sift_edge_thres: 10.0,

            match_ratio: 0.8,

            ransac_iterations: 1500,
            ransac_inlier_thres: 1.0,
            inlier_min_ratio: 0.1,
            min_inliers: 10,

            connected_thres: 0.3,

            lm_lambda: 0.05,
            lm_max_iter: 100,
            lm_max_stale_iter: 5,
            jacobian_step: 1e-5,

            projection: ProjectionMode::Cylindrical,
            estimate_camera: true,
            two_dimensional_feather: false,

            cylinder: false,
            trans: false,

            seed: 0xC0FFEE,
        }
    }
}

impl StitchConfig {
    #[must_use]
    pub fn with_projection(mut self, mode: ProjectionMode) -> Self {
        self.projection = mode;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_ransac_iterations(mut self, iterations: usize) -> Self {
        self.ransac_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_cylinder(mut self, cylinder: bool) -> Self {
        self.cylinder = cylinder;
        if cylinder {
            self.estimate_camera = false;
        }
        self
    }

    #[must_use]
    pub fn with_trans(mut self, trans: bool) -> Self {
        self.trans = trans;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = StitchConfig::default();
        assert_eq!(cfg.num_octaves, 4);
        assert_eq!(cfg.num_scales, 7);
        assert!((cfg.base_sigma - 1.6).abs() < 1e-9);
        assert_eq!(cfg.ransac_iterations, 1500);
        assert_eq!(cfg.lm_max_iter, 100);
    }

    #[test]
    fn builder_overrides_apply() {
        let cfg = StitchConfig::default()
            .with_projection(ProjectionMode::Flat)
            .with_seed(42);
        assert_eq!(cfg.projection, ProjectionMode::Flat);
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    fn cylinder_mode_disables_camera_estimation() {
        let cfg = StitchConfig::default().with_cylinder(true);
        assert!(cfg.cylinder);
        assert!(!cfg.estimate_camera);
    }

    #[test]
    fn trans_flag_defaults_off() {
        let cfg = StitchConfig::default();
        assert!(!cfg.trans);
        assert!(!cfg.cylinder);
    }
}

use crate::camera::Camera;
use crate::core::{apply_projective, Point2f};
use crate::transform::MatchInfo;
use nalgebra::{DMatrix, DVector, Matrix3, Rotation3};

const PARAMS_PER_CAMERA: usize = 6;

/// Levenberg-Marquardt bundle adjuster refining focal/principal-point/
/// rotation for every camera against the inlier correspondences kept by
/// RANSAC. Aspect is pinned to 1 for every camera (the canonical 6-DoF
/// parameterization), matching the reference's `ba_common.hh`.
pub struct BundleAdjuster<'a> {
    matches: &'a [MatchInfo],
    lambda: f64,
    max_iter: usize,
    max_stale_iter: usize,
    jacobian_step: f64,
}

impl<'a> BundleAdjuster<'a> {
    #[must_use]
    pub fn new(matches: &'a [MatchInfo], lambda: f64, max_iter: usize, max_stale_iter: usize, jacobian_step: f64) -> Self {
        Self { matches, lambda, max_iter, max_stale_iter, jacobian_step }
    }

    /// Run the optimizer, returning the refined cameras. Never errors:
    /// on non-convergence the last accepted parameter vector is
    /// returned.
    #[must_use]
    pub fn optimize(&self, cameras: &[Camera]) -> Vec<Camera> {
        let n = cameras.len();
        let mut params = DVector::<f64>::zeros(n * PARAMS_PER_CAMERA);
        for (i, c) in cameras.iter().enumerate() {
            camera_to_params(c, &mut params, i);
        }

        let mut lambda = self.lambda;
        let mut best_rms = self.rms_error(&params, n);
        let mut stale = 0;

        for _ in 0..self.max_iter {
            if stale >= self.max_stale_iter {
                break;
            }
            let jacobian = self.jacobian(&params, n);
            let residual = self.residuals(&params, n);

            let jt = jacobian.transpose();
            let mut jtj = &jt * &jacobian;
            for i in 0..jtj.nrows() {
                jtj[(i, i)] += lambda;
            }
            let jt_err = &jt * &residual;

            let svd = jtj.clone().svd(true, true);
            let Ok(delta) = svd.solve(&jt_err, 1e-12) else {
                lambda *= 2.0;
                stale += 1;
                continue;
            };

            let trial = &params - &delta;
            let trial_rms = self.rms_error(&trial, n);
            if trial_rms < best_rms {
                params = trial;
                best_rms = trial_rms;
                lambda = (lambda * 0.5).max(1e-12);
                stale = 0;
            } else {
                lambda *= 2.0;
                stale += 1;
            }
        }

        (0..n).map(|i| params_to_camera(&params, i)).collect()
    }

    fn residuals(&self, params: &DVector<f64>, n: usize) -> DVector<f64> {
        let cameras: Vec<Camera> = (0..n).map(|i| params_to_camera(params, i)).collect();
        let mut errs = Vec::with_capacity(self.matches.len() * 2);
        for m in self.matches {
            let cam_from = &cameras[m.from];
            let cam_to = &cameras[m.to];
            let h_to_to_from = reprojection_homography(cam_from, cam_to);
            for (src, dst) in m.inlier_src.iter().zip(&m.inlier_dst) {
                let projected = apply_projective(&h_to_to_from, *dst);
                if projected.is_nan() {
                    errs.push(0.0);
                    errs.push(0.0);
                } else {
                    errs.push(f64::from(projected.x - src.x));
                    errs.push(f64::from(projected.y - src.y));
                }
            }
        }
        DVector::from_vec(errs)
    }

    fn rms_error(&self, params: &DVector<f64>, n: usize) -> f64 {
        let r = self.residuals(params, n);
        if r.is_empty() {
            return 0.0;
        }
        (r.iter().map(|v| v * v).sum::<f64>() / r.len() as f64).sqrt()
    }

    fn jacobian(&self, params: &DVector<f64>, n: usize) -> DMatrix<f64> {
        let base = self.residuals(params, n);
        let rows = base.len();
        let cols = params.len();
        let mut jacobian = DMatrix::<f64>::zeros(rows, cols);
        for c in 0..cols {
            let mut plus = params.clone();
            plus[c] += self.jacobian_step;
            let mut minus = params.clone();
            minus[c] -= self.jacobian_step;
            let r_plus = self.residuals(&plus, n);
            let r_minus = self.residuals(&minus, n);
            for r in 0..rows {
                jacobian[(r, c)] = (r_plus[r] - r_minus[r]) / (2.0 * self.jacobian_step);
            }
        }
        jacobian
    }
}

fn reprojection_homography(cam_from: &Camera, cam_to: &Camera) -> Matrix3<f64> {
    cam_from.k() * cam_from.rotation.transpose() * cam_to.rotation * cam_to.k_inverse()
}

fn camera_to_params(c: &Camera, params: &mut DVector<f64>, i: usize) {
    let (roll, pitch, yaw) = rotation_to_angles(&c.rotation);
    let base = i * PARAMS_PER_CAMERA;
    params[base] = c.focal;
    params[base + 1] = c.ppx;
    params[base + 2] = c.ppy;
    params[base + 3] = roll;
    params[base + 4] = pitch;
    params[base + 5] = yaw;
}

fn params_to_camera(params: &DVector<f64>, i: usize) -> Camera {
    let base = i * PARAMS_PER_CAMERA;
    Camera {
        focal: params[base],
        ppx: params[base + 1],
        ppy: params[base + 2],
        aspect: 1.0,
        rotation: angles_to_rotation(params[base + 3], params[base + 4], params[base + 5]),
    }
}

fn rotation_to_angles(r: &Matrix3<f64>) -> (f64, f64, f64) {
    let rot = Rotation3::from_matrix_unchecked(*r);
    rot.euler_angles()
}

fn angles_to_rotation(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    *Rotation3::from_euler_angles(roll, pitch, yaw).matrix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    #[test]
    fn optimizing_with_no_matches_does_not_panic() {
        let cameras = vec![Camera::new(500.0, 100.0, 50.0), Camera::new(500.0, 100.0, 50.0)];
        let matches: Vec<MatchInfo> = Vec::new();
        let ba = BundleAdjuster::new(&matches, 0.05, 100, 5, 1e-5);
        let out = ba.optimize(&cameras);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn angle_round_trip_preserves_rotation() {
        let r = angles_to_rotation(0.1, 0.2, 0.3);
        let (roll, pitch, yaw) = rotation_to_angles(&r);
        let r2 = angles_to_rotation(roll, pitch, yaw);
        assert!((r - r2).norm() < 1e-9);
    }
}

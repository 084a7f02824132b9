use crate::core::Point2f;
use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector, Matrix3};

/// Which transform family to fit: affine (6 DoF, 3-point minimal
/// sample) in cylindrical/translational stitching modes, or full
/// projective homography (8 DoF, 4-point minimal sample) otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Affine,
    Projective,
}

impl TransformKind {
    #[must_use]
    pub fn min_sample_size(self) -> usize {
        match self {
            TransformKind::Affine => 3,
            TransformKind::Projective => 4,
        }
    }
}

/// Solve for the least-squares transform mapping `src` onto `dst`,
/// using `nalgebra`'s SVD-backed least-squares solve in place of a
/// hand-rolled normal-equations solver.
pub fn solve(kind: TransformKind, src: &[Point2f], dst: &[Point2f]) -> Result<Matrix3<f64>> {
    match kind {
        TransformKind::Affine => solve_affine(src, dst),
        TransformKind::Projective => solve_projective(src, dst),
    }
}

fn solve_affine(src: &[Point2f], dst: &[Point2f]) -> Result<Matrix3<f64>> {
    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 6);
    let mut b = DVector::<f64>::zeros(2 * n);
    for (i, (s, d)) in src.iter().zip(dst).enumerate() {
        let (x, y) = (f64::from(s.x), f64::from(s.y));
        a[(2 * i, 0)] = x;
        a[(2 * i, 1)] = y;
        a[(2 * i, 2)] = 1.0;
        b[2 * i] = f64::from(d.x);

        a[(2 * i + 1, 3)] = x;
        a[(2 * i + 1, 4)] = y;
        a[(2 * i + 1, 5)] = 1.0;
        b[2 * i + 1] = f64::from(d.y);
    }

    let svd = a.svd(true, true);
    let h = svd
        .solve(&b, 1e-12)
        .map_err(|_| Error::SingularMatrix("affine least squares".into()))?;

    Ok(Matrix3::new(
        h[0], h[1], h[2],
        h[3], h[4], h[5],
        0.0, 0.0, 1.0,
    ))
}

fn solve_projective(src: &[Point2f], dst: &[Point2f]) -> Result<Matrix3<f64>> {
    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 8);
    let mut b = DVector::<f64>::zeros(2 * n);
    for (i, (s, d)) in src.iter().zip(dst).enumerate() {
        let (x, y) = (f64::from(s.x), f64::from(s.y));
        let (xp, yp) = (f64::from(d.x), f64::from(d.y));

        a[(2 * i, 0)] = x;
        a[(2 * i, 1)] = y;
        a[(2 * i, 2)] = 1.0;
        a[(2 * i, 6)] = -x * xp;
        a[(2 * i, 7)] = -y * xp;
        b[2 * i] = xp;

        a[(2 * i + 1, 3)] = x;
        a[(2 * i + 1, 4)] = y;
        a[(2 * i + 1, 5)] = 1.0;
        a[(2 * i + 1, 6)] = -x * yp;
        a[(2 * i + 1, 7)] = -y * yp;
        b[2 * i + 1] = yp;
    }

    let svd = a.svd(true, true);
    let h = svd
        .solve(&b, 1e-12)
        .map_err(|_| Error::SingularMatrix("projective least squares".into()))?;

    Ok(Matrix3::new(
        h[0], h[1], h[2],
        h[3], h[4], h[5],
        h[6], h[7], 1.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_recovers_pure_translation() {
        let src = vec![Point2f::new(0.0, 0.0), Point2f::new(1.0, 0.0), Point2f::new(0.0, 1.0)];
        let dst: Vec<_> = src.iter().map(|p| Point2f::new(p.x + 5.0, p.y - 2.0)).collect();
        let h = solve(TransformKind::Affine, &src, &dst).unwrap();
        let p = crate::core::apply_projective(&h, Point2f::new(3.0, 4.0));
        assert!((p.x - 8.0).abs() < 1e-6);
        assert!((p.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn projective_recovers_identity() {
        let src = vec![
            Point2f::new(0.0, 0.0),
            Point2f::new(1.0, 0.0),
            Point2f::new(0.0, 1.0),
            Point2f::new(1.0, 1.0),
        ];
        let h = solve(TransformKind::Projective, &src, &src).unwrap();
        let p = crate::core::apply_projective(&h, Point2f::new(0.3, 0.7));
        assert!((p.x - 0.3).abs() < 1e-6);
        assert!((p.y - 0.7).abs() < 1e-6);
    }
}

use nalgebra::{Matrix3, Vector3};
use std::ops::{Add, Sub};

/// 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }
}

impl Add for Point2f {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point2f {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Integer-valued 2D size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// Apply a projective (homography) transform to a point, returning the
/// homogeneous-normalized `(x, y)` result. Mirrors the reference
/// implementation's `Homography::trans2d`.
#[must_use]
pub fn apply_projective(h: &Matrix3<f64>, p: Point2f) -> Point2f {
    let v = h * Vector3::new(f64::from(p.x), f64::from(p.y), 1.0);
    if v.z.abs() < 1e-12 {
        return Point2f::new(f32::NAN, f32::NAN);
    }
    Point2f::new((v.x / v.z) as f32, (v.y / v.z) as f32)
}

/// Rescale a 3x3 matrix so the sum of squares of its entries is 9,
/// matching the reference's `Homography::normalize`.
#[must_use]
pub fn normalize_3x3(m: &Matrix3<f64>) -> Matrix3<f64> {
    let sum_sq: f64 = m.iter().map(|v| v * v).sum();
    if sum_sq < 1e-18 {
        return *m;
    }
    let factor = (9.0 / sum_sq).sqrt();
    m * factor
}

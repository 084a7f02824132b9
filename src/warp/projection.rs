use nalgebra::Vector3;

/// A point in 2-D projection space (e.g. cylindrical `(theta, h)` or
/// spherical `(theta, phi)` coordinates).
#[derive(Debug, Clone, Copy)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Projection method, collapsed from dynamic dispatch into a tagged
/// enum per camera geometry `proj`/`proj_r` pair.
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    Flat,
    Cylindrical { center: Vector3<f64> },
    Spherical { center: Vector3<f64> },
}

impl Projection {
    /// Forward map: 3-D ray (camera space) to 2-D projection-surface
    /// coordinate.
    #[must_use]
    pub fn proj(&self, p: Vector3<f64>) -> Vec2 {
        match self {
            Projection::Flat => Vec2::new(p.x / p.z, p.y / p.z),
            Projection::Cylindrical { center } => cylinder_proj(p, *center),
            Projection::Spherical { center } => sphere_proj(p, *center),
        }
    }

    /// Inverse map: 2-D projection-surface coordinate back to a 3-D ray,
    /// directly composable with [`Projection::proj`] (its `z` component
    /// is normalized to `1.0`, matching the convention
    /// [`crate::core::apply_projective`]'s callers rely on for
    /// homogeneous pixel rays). `proj(proj_r(p)) == p` to floating-point
    /// precision for any `p` in the method's domain.
    #[must_use]
    pub fn proj_r(&self, p: Vec2) -> Vector3<f64> {
        match self {
            Projection::Flat => Vector3::new(p.x, p.y, 1.0),
            Projection::Cylindrical { center } => cylinder_proj_r(p, *center),
            Projection::Spherical { center } => sphere_proj_r(p, *center),
        }
    }
}

fn cylinder_proj(p: Vector3<f64>, center: Vector3<f64>) -> Vec2 {
    let longx = (p.x - center.x).hypot(p.z - center.z);
    let theta = ((center.x - p.x) / longx).acos();
    Vec2::new(theta, (p.y - center.y) / longx)
}

/// Inverts `cylinder_proj` by walking the ray from `center` through the
/// angle/height pair back out to the `z = 1` plane. `proj` is invariant
/// to where along that ray we sample (it only depends on direction from
/// `center`), so landing exactly on `z = 1` keeps the result usable
/// directly as a homogeneous pixel ray.
fn cylinder_proj_r(p: Vec2, center: Vector3<f64>) -> Vector3<f64> {
    let mut dir = Vector3::new(-p.x.cos(), p.y, -p.x.sin());
    let norm = dir.norm();
    if norm > 1e-12 {
        dir /= norm;
    }
    if dir.z.abs() < 1e-12 {
        return Vector3::new(f64::NAN, f64::NAN, f64::NAN);
    }
    let t = (center.z - 1.0) / dir.z;
    center - dir * t
}

fn sphere_proj(p: Vector3<f64>, center: Vector3<f64>) -> Vec2 {
    let dist = (p - center).norm();
    let phi = ((p.y - center.y) / dist).asin();
    let theta = ((p.x - center.x) / (p.x - center.x).hypot(p.z - center.z)).asin();
    Vec2::new(theta, phi)
}

fn sphere_proj_r(p: Vec2, center: Vector3<f64>) -> Vector3<f64> {
    let cosphi = p.y.cos();
    let mut dir = Vector3::new(p.x.sin() * cosphi, p.y.sin(), p.x.cos() * cosphi);
    let norm = dir.norm();
    if norm > 1e-12 {
        dir /= norm;
    }
    if dir.z.abs() < 1e-12 {
        return Vector3::new(f64::NAN, f64::NAN, f64::NAN);
    }
    let t = (1.0 - center.z) / dir.z;
    center + dir * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cylinder_round_trips() {
        let center = Vector3::new(0.0, 0.0, -500.0);
        let proj = Projection::Cylindrical { center };
        let p = Vector3::new(50.0, 20.0, 1.0);
        let uv = proj.proj(p);
        let ray = proj.proj_r(uv);
        assert!(ray.x.is_finite() && ray.y.is_finite());
        let uv2 = proj.proj(ray);
        assert!((uv2.x - uv.x).abs() < 1e-5, "{} vs {}", uv2.x, uv.x);
        assert!((uv2.y - uv.y).abs() < 1e-5, "{} vs {}", uv2.y, uv.y);
    }

    #[test]
    fn sphere_round_trips() {
        let center = Vector3::new(0.0, 0.0, -500.0);
        let proj = Projection::Spherical { center };
        let p = Vector3::new(30.0, -15.0, 1.0);
        let uv = proj.proj(p);
        let ray = proj.proj_r(uv);
        let uv2 = proj.proj(ray);
        assert!((uv2.x - uv.x).abs() < 1e-5, "{} vs {}", uv2.x, uv.x);
        assert!((uv2.y - uv.y).abs() < 1e-5, "{} vs {}", uv2.y, uv.y);
    }

    #[test]
    fn flat_round_trips() {
        let proj = Projection::Flat;
        let uv = proj.proj(Vector3::new(10.0, 20.0, 2.0));
        let ray = proj.proj_r(uv);
        let uv2 = proj.proj(ray);
        assert!((uv2.x - uv.x).abs() < 1e-9);
        assert!((uv2.y - uv.y).abs() < 1e-9);
    }

    #[test]
    fn flat_projection_is_pinhole_divide() {
        let proj = Projection::Flat;
        let uv = proj.proj(Vector3::new(10.0, 20.0, 2.0));
        assert!((uv.x - 5.0).abs() < 1e-9);
        assert!((uv.y - 10.0).abs() < 1e-9);
    }
}

pub mod projection;

use crate::camera::Camera;
use crate::config::{ProjectionMode, StitchConfig};
use crate::core::{apply_projective, Image, Point2f};
use crate::features::Feature;
use nalgebra::{Matrix3, Vector3};
use projection::{Projection, Vec2};

/// One image's placement in the panorama: the pixel-to-ray and
/// ray-to-pixel homographies (`homo = R * K^-1`, `homo_inv = K * R^T`
/// per the reference), plus its projected bounding box in
/// projection-surface units.
pub struct ImageComponent {
    pub homo: Matrix3<f64>,
    pub homo_inv: Matrix3<f64>,
    pub bounds_min: Vec2,
    pub bounds_max: Vec2,
}

fn projection_for(cfg: &StitchConfig, focal: f64) -> Projection {
    let center = Vector3::new(0.0, 0.0, -focal);
    match cfg.projection {
        ProjectionMode::Flat => Projection::Flat,
        ProjectionMode::Cylindrical => Projection::Cylindrical { center },
        ProjectionMode::Spherical => Projection::Spherical { center },
    }
}

/// Build the `Projection` the stitcher should warp with, using the
/// mean camera focal as the projection-surface's scale reference.
#[must_use]
pub fn projection_for_config(cfg: &StitchConfig, cameras: &[Camera]) -> Projection {
    let mean_focal = cameras.iter().map(|c| c.focal).sum::<f64>() / cameras.len().max(1) as f64;
    projection_for(cfg, mean_focal)
}

pub(crate) fn pixel_to_ray(homo: &Matrix3<f64>, p: Point2f) -> Vector3<f64> {
    homo * Vector3::new(f64::from(p.x), f64::from(p.y), 1.0)
}

/// Map a ray back to a source pixel through `homo_inv`, homogeneously
/// normalizing by the transformed ray's own `z`. Unlike
/// [`crate::core::apply_projective`], this takes the ray's true `z`
/// rather than pinning it to `1.0` -- correct as long as `ray` came
/// from [`projection::Projection::proj_r`], whose `z` is always `1.0`.
pub(crate) fn ray_to_pixel(homo_inv: &Matrix3<f64>, ray: Vector3<f64>) -> Point2f {
    let v = homo_inv * ray;
    if v.z.abs() < 1e-12 {
        return Point2f::new(f32::NAN, f32::NAN);
    }
    Point2f::new((v.x / v.z) as f32, (v.y / v.z) as f32)
}

/// Forward-project a single source pixel into projection-surface units
/// (scaled and offset by `origin`/`scale`): pixel -> ray (`component.homo`)
/// -> projection surface (`projection.proj`) -> scaled canvas-local
/// coordinate. Shared by [`warp_features`] (feature-coordinate
/// transform, `origin = 0`) and the cylindrical pre-warp pipeline's
/// bounding-box and center computations.
#[must_use]
pub fn project_point(component: &ImageComponent, projection: &Projection, origin: Vec2, scale: f64, pt: Point2f) -> Point2f {
    let ray = pixel_to_ray(&component.homo, pt);
    let uv = projection.proj(ray);
    Point2f::new(((uv.x - origin.x) * scale) as f32, ((uv.y - origin.y) * scale) as f32)
}

/// Build one `ImageComponent` per camera under an explicit projection,
/// computing each one's projected corner bounding box.
#[must_use]
pub fn build_components_for(cameras: &[Camera], sizes: &[(usize, usize)], projection: &Projection) -> Vec<ImageComponent> {
    cameras
        .iter()
        .zip(sizes)
        .map(|(cam, &(w, h))| {
            let homo = cam.rotation * cam.k_inverse();
            let homo_inv = cam.k() * cam.rotation.transpose();

            let corners = [
                Point2f::new(0.0, 0.0),
                Point2f::new(w as f32, 0.0),
                Point2f::new(0.0, h as f32),
                Point2f::new(w as f32, h as f32),
            ];
            let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
            let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
            for corner in corners {
                let ray = pixel_to_ray(&homo, corner);
                let uv = projection.proj(ray);
                min.x = min.x.min(uv.x);
                min.y = min.y.min(uv.y);
                max.x = max.x.max(uv.x);
                max.y = max.y.max(uv.y);
            }
            ImageComponent { homo, homo_inv, bounds_min: min, bounds_max: max }
        })
        .collect()
}

/// Build one `ImageComponent` per camera, deriving the projection from
/// `cfg` and the cameras' mean focal length.
#[must_use]
pub fn build_components(cameras: &[Camera], sizes: &[(usize, usize)], cfg: &StitchConfig) -> Vec<ImageComponent> {
    let mean_focal = cameras.iter().map(|c| c.focal).sum::<f64>() / cameras.len().max(1) as f64;
    let projection = projection_for(cfg, mean_focal);
    build_components_for(cameras, sizes, &projection)
}

/// Canvas size and per-projection-unit pixel scale, derived from the
/// union of all components' bounding boxes and the identity image's
/// focal length (acting as the projection-to-pixel scale factor).
#[must_use]
pub fn canvas_extent(components: &[ImageComponent], cameras: &[Camera]) -> (Vec2, usize, usize, f64) {
    let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in components {
        min.x = min.x.min(c.bounds_min.x);
        min.y = min.y.min(c.bounds_min.y);
        max.x = max.x.max(c.bounds_max.x);
        max.y = max.y.max(c.bounds_max.y);
    }
    let scale = cameras.iter().map(|c| c.focal).sum::<f64>() / cameras.len().max(1) as f64;
    let width = ((max.x - min.x) * scale).ceil().max(1.0) as usize;
    let height = ((max.y - min.y) * scale).ceil().max(1.0) as usize;
    (min, width, height, scale)
}

/// Backward-warp one source image into the shared canvas: for every
/// canvas pixel, map to the projection surface, invert the projection
/// to a ray, then project that ray back into the source image with
/// `homo_inv`. Canvas pixels that land outside the source image (or
/// whose source pixel is itself "no data") are left as the "no data"
/// sentinel.
/// A source image warped onto the shared canvas, plus a per-pixel
/// horizontal feather weight (`0.5 - |u - 0.5|` in the source image's
/// normalized x-coordinate) for the linear blender to consume.
pub struct Warped {
    pub image: Image,
    pub weight: Vec<f32>,
}

#[must_use]
pub fn warp_image(image: &Image, component: &ImageComponent, projection: &Projection, origin: Vec2, scale: f64, canvas_size: (usize, usize), cfg: &StitchConfig) -> Warped {
    let (cw, ch) = canvas_size;
    let mut out = Image::empty(cw, ch, image.channels());
    let mut weight = vec![0.0f32; cw * ch];
    let src_width = image.width() as f32;
    let src_height = image.height() as f32;

    for row in 0..ch {
        for col in 0..cw {
            let uv = Vec2::new(origin.x + col as f64 / scale, origin.y + row as f64 / scale);
            let ray = projection.proj_r(uv);
            if !ray.x.is_finite() || !ray.y.is_finite() {
                continue;
            }
            let pixel = ray_to_pixel(&component.homo_inv, ray);
            if pixel.is_nan() {
                continue;
            }
            if let Some(sample) = image.sample_bilinear(pixel.x, pixel.y) {
                out.at_mut(row, col).copy_from_slice(&sample);
                let u = pixel.x / src_width;
                let mut w = 0.5 - (u - 0.5).abs();
                if cfg.two_dimensional_feather {
                    let v = pixel.y / src_height;
                    w *= 0.5 - (v - 0.5).abs();
                }
                weight[row * cw + col] = w;
            }
        }
    }
    Warped { image: out, weight }
}

/// Transform feature coordinates into projection-surface units, used
/// by the cylindrical pre-warp pipeline mode where RANSAC runs on the
/// already-projected (per-image-local) coordinates rather than raw
/// pixels.
#[must_use]
pub fn warp_features(features: &[Feature], component: &ImageComponent, projection: &Projection, origin: Vec2, scale: f64) -> Vec<Point2f> {
    features.iter().map(|f| project_point(component, projection, origin, scale, f.keypoint.pt)).collect()
}

/// Union bounding box (in pixel units) of every image's projected
/// corners after each one's 2-D placement affine is applied, for the
/// cylindrical pre-warp compositing path. `local_scale` is the
/// projection-to-local-unit scale used when the placements themselves
/// were estimated (i.e. the focal passed to [`warp_features`]).
#[must_use]
pub fn canvas_extent_placed(
    components: &[ImageComponent],
    placements: &[Matrix3<f64>],
    projection: &Projection,
    sizes: &[(usize, usize)],
    local_scale: f64,
) -> (Vec2, usize, usize) {
    let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for ((comp, placement), &(w, h)) in components.iter().zip(placements).zip(sizes) {
        let corners = [
            Point2f::new(0.0, 0.0),
            Point2f::new(w as f32, 0.0),
            Point2f::new(0.0, h as f32),
            Point2f::new(w as f32, h as f32),
        ];
        for corner in corners {
            let local = project_point(comp, projection, Vec2::new(0.0, 0.0), local_scale, corner);
            let global = apply_projective(placement, local);
            if global.is_nan() {
                continue;
            }
            min.x = min.x.min(f64::from(global.x));
            min.y = min.y.min(f64::from(global.y));
            max.x = max.x.max(f64::from(global.x));
            max.y = max.y.max(f64::from(global.y));
        }
    }
    if !min.x.is_finite() || !max.x.is_finite() {
        return (Vec2::new(0.0, 0.0), 1, 1);
    }
    let width = (max.x - min.x).ceil().max(1.0) as usize;
    let height = (max.y - min.y).ceil().max(1.0) as usize;
    (min, width, height)
}

/// Backward-warp one source image onto the shared canvas for the
/// cylindrical pre-warp path: canvas pixel -> global placed-unit point
/// -> (inverse placement) per-image-local projection-surface point ->
/// (`proj_r`) ray -> (`homo_inv`) source pixel.
#[must_use]
pub fn warp_image_placed(
    image: &Image,
    component: &ImageComponent,
    projection: &Projection,
    placement: &Matrix3<f64>,
    local_scale: f64,
    canvas_origin: Vec2,
    canvas_size: (usize, usize),
) -> Warped {
    let (cw, ch) = canvas_size;
    let mut out = Image::empty(cw, ch, image.channels());
    let mut weight = vec![0.0f32; cw * ch];
    let src_width = image.width() as f32;
    let placement_inv = placement.try_inverse().unwrap_or_else(Matrix3::identity);

    for row in 0..ch {
        for col in 0..cw {
            let global = Point2f::new((canvas_origin.x + col as f64) as f32, (canvas_origin.y + row as f64) as f32);
            let local = apply_projective(&placement_inv, global);
            if local.is_nan() {
                continue;
            }
            let uv = Vec2::new(f64::from(local.x) / local_scale, f64::from(local.y) / local_scale);
            let ray = projection.proj_r(uv);
            if !ray.x.is_finite() || !ray.y.is_finite() {
                continue;
            }
            let pixel = ray_to_pixel(&component.homo_inv, ray);
            if pixel.is_nan() {
                continue;
            }
            if let Some(sample) = image.sample_bilinear(pixel.x, pixel.y) {
                out.at_mut(row, col).copy_from_slice(&sample);
                let u = pixel.x / src_width;
                weight[row * cw + col] = 0.5 - (u - 0.5).abs();
            }
        }
    }
    Warped { image: out, weight }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    #[test]
    fn components_have_finite_bounds_for_flat_projection() {
        let cfg = StitchConfig::default().with_projection(ProjectionMode::Flat);
        let cameras = vec![Camera::new(500.0, 50.0, 50.0)];
        let sizes = vec![(100, 100)];
        let comps = build_components(&cameras, &sizes, &cfg);
        assert!(comps[0].bounds_min.x.is_finite());
        assert!(comps[0].bounds_max.x.is_finite());
    }
}

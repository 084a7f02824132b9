use crate::features::keypoint::Keypoint;
use crate::scalespace::Octave;
use std::f32::consts::PI;

const GRID: usize = 4;
const BINS: usize = 8;
const DESC_LEN: usize = GRID * GRID * BINS;

/// Compute the 128-dimensional SIFT descriptor for a keypoint: a 4x4
/// grid of 8-bin gradient histograms sampled in a window rotated to the
/// keypoint's dominant orientation, trilinearly interpolated into
/// neighboring grid cells and bins, then L2-normalized, clipped at 0.2,
/// and renormalized.
#[must_use]
pub fn compute_descriptor(octave: &Octave, kp: &Keypoint) -> Option<Vec<f32>> {
    let mag = &octave.magnitude[kp.scale];
    let ort = &octave.orientation[kp.scale];
    let (w, h) = (mag.width() as i32, mag.height() as i32);

    let cos_t = kp.angle.cos();
    let sin_t = kp.angle.sin();
    let hist_width = 3.0 * kp.sigma.max(1.0);
    let radius = (hist_width * (GRID as f32 + 1.0) * std::f32::consts::SQRT_2 / 2.0).round() as i32;

    if radius <= 0 {
        return None;
    }

    let mut hist = vec![0.0f32; DESC_LEN];

    let col0 = kp.pt.x.round() as i32;
    let row0 = kp.pt.y.round() as i32;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            // rotate sample offset into the keypoint's local frame
            let rot_x = (dx as f32 * cos_t + dy as f32 * sin_t) / hist_width;
            let rot_y = (-(dx as f32) * sin_t + dy as f32 * cos_t) / hist_width;

            let bin_x = rot_x + GRID as f32 / 2.0 - 0.5;
            let bin_y = rot_y + GRID as f32 / 2.0 - 0.5;
            if bin_x <= -1.0 || bin_x >= GRID as f32 || bin_y <= -1.0 || bin_y >= GRID as f32 {
                continue;
            }

            let y = row0 + dy;
            let x = col0 + dx;
            if y < 1 || x < 1 || y >= h - 1 || x >= w - 1 {
                continue;
            }

            let m = mag.at(y as usize, x as usize)[0];
            if m == 0.0 {
                continue;
            }
            let mut angle = ort.at(y as usize, x as usize)[0] - kp.angle;
            angle = angle.rem_euclid(2.0 * PI);
            let bin_o = angle * BINS as f32 / (2.0 * PI);

            let weight = (-(rot_x * rot_x + rot_y * rot_y) / (2.0 * (GRID as f32 / 2.0).powi(2))).exp();
            trilinear_add(&mut hist, bin_x, bin_y, bin_o, m * weight);
        }
    }

    let norm: f32 = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= 1e-6 {
        return None;
    }
    for v in &mut hist {
        *v = (*v / norm).min(0.2);
    }
    let norm2: f32 = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm2 > 1e-6 {
        for v in &mut hist {
            *v /= norm2;
        }
    }
    Some(hist)
}

fn trilinear_add(hist: &mut [f32], bin_x: f32, bin_y: f32, bin_o: f32, value: f32) {
    let x0 = bin_x.floor();
    let y0 = bin_y.floor();
    let o0 = bin_o.floor();

    let fx = bin_x - x0;
    let fy = bin_y - y0;
    let fo = bin_o - o0;

    for (dx_i, wx) in [(0, 1.0 - fx), (1, fx)] {
        let gx = x0 as i32 + dx_i;
        if gx < 0 || gx >= GRID as i32 {
            continue;
        }
        for (dy_i, wy) in [(0, 1.0 - fy), (1, fy)] {
            let gy = y0 as i32 + dy_i;
            if gy < 0 || gy >= GRID as i32 {
                continue;
            }
            for (do_i, wo) in [(0, 1.0 - fo), (1, fo)] {
                let go = (o0 as i32 + do_i).rem_euclid(BINS as i32);
                let idx = (gy as usize * GRID + gx as usize) * BINS + go as usize;
                hist[idx] += value * wx * wy * wo;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StitchConfig;
    use crate::core::{Image, Point2f};
    use crate::scalespace::ScaleSpace;

    #[test]
    fn descriptor_on_flat_image_is_none() {
        let gray = Image::new(64, 64, 1);
        let cfg = StitchConfig::default();
        let ss = ScaleSpace::build(&gray, &cfg);
        let kp = Keypoint {
            pt: Point2f::new(32.0, 32.0),
            octave: 0,
            scale: 2,
            sigma: 1.6,
            angle: 0.0,
            response: 0.0,
        };
        assert!(compute_descriptor(&ss.octaves[0], &kp).is_none());
    }
}

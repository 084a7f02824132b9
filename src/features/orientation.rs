use crate::scalespace::Octave;
use std::f32::consts::PI;

const NUM_BINS: usize = 36;

/// Assign one or more dominant orientations (radians) to a keypoint at
/// `(row, col)` in octave scale `s`. A Gaussian-weighted 36-bin
/// histogram of gradient orientation is built in a window of radius
/// `1.5*sigma`; the peak bin and any bin within 80% of the peak each
/// emit a separate orientation, each parabolically interpolated.
#[must_use]
pub fn assign_orientations(octave: &Octave, s: usize, row: usize, col: usize, keypoint_sigma: f32) -> Vec<f32> {
    let mag = &octave.magnitude[s];
    let ort = &octave.orientation[s];
    let sigma = (1.5 * keypoint_sigma).max(1.0);
    let radius = (3.0 * sigma).round() as i32;

    let mut histogram = [0.0f32; NUM_BINS];
    let (h, w) = (mag.height() as i32, mag.width() as i32);

    for dy in -radius..=radius {
        let y = row as i32 + dy;
        if y < 0 || y >= h {
            continue;
        }
        for dx in -radius..=radius {
            let x = col as i32 + dx;
            if x < 0 || x >= w {
                continue;
            }
            let m = mag.at(y as usize, x as usize)[0];
            let angle = ort.at(y as usize, x as usize)[0];
            let weight = (-(dx * dx + dy * dy) as f32 / (2.0 * sigma * sigma)).exp();
            let mut bin = (angle * NUM_BINS as f32 / (2.0 * PI)) as i32;
            bin = bin.rem_euclid(NUM_BINS as i32);
            histogram[bin as usize] += m * weight;
        }
    }

    let peak = histogram.iter().cloned().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Vec::new();
    }

    let mut angles = Vec::new();
    for bin in 0..NUM_BINS {
        let value = histogram[bin];
        if value < 0.8 * peak {
            continue;
        }
        let left = histogram[(bin + NUM_BINS - 1) % NUM_BINS];
        let right = histogram[(bin + 1) % NUM_BINS];
        if value <= left || value <= right {
            continue;
        }
        let denom = left - 2.0 * value + right;
        let offset = if denom.abs() > 1e-12 { 0.5 * (left - right) / denom } else { 0.0 };
        let interpolated_bin = bin as f32 + offset;
        let angle = interpolated_bin * 2.0 * PI / NUM_BINS as f32;
        angles.push(angle);
    }
    if angles.is_empty() {
        let bin = histogram
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0);
        angles.push(bin as f32 * 2.0 * PI / NUM_BINS as f32);
    }
    angles
}

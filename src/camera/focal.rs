use nalgebra::Matrix3;

/// Two-candidate focal length estimate from a single pairwise
/// homography, the closed-form heuristic due to Szeliski (as used by
/// OpenCV's stitching module and the reference implementation's
/// `get_focal_from_matrix`). Returns `None` if neither candidate
/// formula yields a usable positive value.
#[must_use]
pub fn focal_from_homography(h: &Matrix3<f64>) -> Option<f64> {
    let h = [
        h[(0, 0)], h[(0, 1)], h[(0, 2)],
        h[(1, 0)], h[(1, 1)], h[(1, 2)],
        h[(2, 0)], h[(2, 1)], h[(2, 2)],
    ];

    let mut f1_ok = true;
    let d1 = h[6] * h[7];
    let d2 = (h[7] - h[6]) * (h[7] + h[6]);
    let mut v1 = -(h[0] * h[1] + h[3] * h[4]) / d1;
    let mut v2 = (h[0] * h[0] + h[3] * h[3] - h[1] * h[1] - h[4] * h[4]) / d2;
    if v1 < v2 {
        std::mem::swap(&mut v1, &mut v2);
    }
    let f1 = if v1 > 0.0 && v2 > 0.0 {
        (if d1.abs() > d2.abs() { v1 } else { v2 }).sqrt()
    } else if v1 > 0.0 {
        v1.sqrt()
    } else {
        f1_ok = false;
        0.0
    };

    let mut f0_ok = true;
    let d1 = h[0] * h[3] + h[1] * h[4];
    let d2 = h[0] * h[0] + h[1] * h[1] - h[3] * h[3] - h[4] * h[4];
    let mut v1 = -h[2] * h[5] / d1;
    let mut v2 = (h[5] * h[5] - h[2] * h[2]) / d2;
    if v1 < v2 {
        std::mem::swap(&mut v1, &mut v2);
    }
    let f0 = if v1 > 0.0 && v2 > 0.0 {
        (if d1.abs() > d2.abs() { v1 } else { v2 }).sqrt()
    } else if v1 > 0.0 {
        v1.sqrt()
    } else {
        f0_ok = false;
        0.0
    };

    match (f0_ok && f0.is_finite(), f1_ok && f1.is_finite()) {
        (true, true) => Some((f0 * f1).sqrt()),
        (false, true) => Some(f1),
        (true, false) => Some(f0),
        (false, false) => None,
    }
}

/// Median of pairwise focal estimates, falling back to the
/// reference's `0.5 * (w/h) * w` heuristic when no pair yields a usable
/// estimate.
#[must_use]
pub fn combine_focals(estimates: &[f64], fallback_size: (usize, usize)) -> f64 {
    let mut valid: Vec<f64> = estimates.iter().copied().filter(|f| f.is_finite() && *f > 0.0).collect();
    if valid.is_empty() {
        let (w, h) = fallback_size;
        return 0.5 * (w as f64 / h as f64) * w as f64;
    }
    valid.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        0.5 * (valid[mid - 1] + valid[mid])
    } else {
        valid[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_homography_yields_no_focal() {
        let h = Matrix3::identity();
        assert!(focal_from_homography(&h).is_none());
    }

    #[test]
    fn fallback_focal_uses_aspect_heuristic() {
        let f = combine_focals(&[], (1000, 500));
        assert!((f - 1000.0).abs() < 1e-6);
    }
}

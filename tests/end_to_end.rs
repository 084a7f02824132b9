use nalgebra::Matrix3;
use panostitch::camera;
use panostitch::config::{ProjectionMode, StitchConfig};
use panostitch::core::{apply_projective, normalize_3x3, Image, Point2f};
use panostitch::error::Error;
use panostitch::features;
use panostitch::matcher;
use panostitch::stitcher::Stitcher;
use panostitch::transform::{self, ransac, MatchInfo};

/// A deterministic, non-periodic texture: a handful of differently
/// phased/scaled sine waves, chosen so DoG finds plenty of corners
/// without the short-period aliasing a checkerboard produces (which
/// starves RANSAC of unambiguous matches).
fn textured(w: usize, h: usize) -> Image {
    let mut img = Image::new(w, h, 3);
    for row in 0..h {
        for col in 0..w {
            let x = col as f32;
            let y = row as f32;
            let v = 0.5
                + 0.2 * (x * 0.073).sin() * (y * 0.051).cos()
                + 0.15 * (x * 0.017 + y * 0.029).sin()
                + 0.1 * (x * 0.11 - y * 0.07).cos();
            let v = v.clamp(0.0, 1.0);
            img.at_mut(row, col).copy_from_slice(&[v, v, v]);
        }
    }
    img
}

/// A texture built from a different frequency/phase set than
/// [`textured`], so the two families share essentially no matchable
/// structure with each other while each remains internally consistent.
fn textured_b(w: usize, h: usize) -> Image {
    let mut img = Image::new(w, h, 3);
    for row in 0..h {
        for col in 0..w {
            let x = col as f32;
            let y = row as f32;
            let v = 0.5
                + 0.2 * (x * 0.091 + 1.3).cos() * (y * 0.083 + 0.4).sin()
                + 0.15 * (x * 0.037 - y * 0.061).sin()
                + 0.1 * (x * 0.013 + y * 0.103).cos();
            let v = v.clamp(0.0, 1.0);
            img.at_mut(row, col).copy_from_slice(&[v, v, v]);
        }
    }
    img
}

fn crop(src: &Image, x0: usize, w: usize, h: usize) -> Image {
    let mut out = Image::new(w, h, src.channels());
    for row in 0..h {
        for col in 0..w {
            out.at_mut(row, col).copy_from_slice(src.at(row, x0 + col));
        }
    }
    out
}

fn shifted_left(img: &Image, dx: usize) -> Image {
    let mut out = Image::empty(img.width(), img.height(), img.channels());
    for row in 0..img.height() {
        for col in 0..(img.width() - dx) {
            let pixel = img.at(row, col + dx);
            out.at_mut(row, col).copy_from_slice(pixel);
        }
    }
    out
}

// ---- Scenario 6: degenerate input ----

#[test]
fn uniform_input_yields_no_features_error() {
    let flat = Image::new(128, 128, 3);
    let cfg = StitchConfig::default();
    let stitcher = Stitcher::new(cfg);
    let err = stitcher.build(&[flat.clone(), flat]).unwrap_err();
    assert!(matches!(err, Error::NoFeatures(_)));
}

// ---- Scenario 1: identity pair ----

#[test]
fn identity_pair_homography_is_identity_with_clamped_confidence() {
    let img = textured(640, 480);
    let cfg = StitchConfig::default().with_ransac_iterations(400);
    let sizes = vec![(640, 480), (640, 480)];

    let features = features::extract_all(&[img.clone(), img.clone()], &cfg).expect("identical textured images yield features");
    let pair_matches = matcher::match_all_pairs(&features, &cfg);
    let infos = transform::estimate_all(&features, &sizes, &pair_matches, &cfg);

    assert_eq!(infos.len(), 1, "identical images must produce exactly one confident pair");
    let h = infos[0].homography;
    assert!((h[(0, 0)] - 1.0).abs() < 1e-3);
    assert!((h[(1, 1)] - 1.0).abs() < 1e-3);
    assert!(h[(0, 1)].abs() < 1e-3);
    assert!(h[(1, 0)].abs() < 1e-3);
    assert!(h[(0, 2)].abs() < 1e-3);
    assert!(h[(1, 2)].abs() < 1e-3);
    // An identity pair has (almost) every match as an inlier, which
    // pushes the raw confidence ratio past the reference's 3.1 clamp
    // threshold, zeroing it back out.
    assert_eq!(infos[0].confidence, 0.0);
}

// ---- Scenario 2: pure translation ----

#[test]
fn translated_pair_stitches_with_the_expected_canvas_size() {
    let base = textured(640, 480);
    let moved = shifted_left(&base, 100);
    let cfg = StitchConfig::default().with_projection(ProjectionMode::Flat).with_ransac_iterations(400);
    let stitcher = Stitcher::new(cfg);

    let panorama = stitcher.build(&[base, moved]).expect("a well-textured translated pair must stitch successfully");
    assert!(
        (panorama.width() as i64 - 740).abs() <= 2,
        "expected output width ~= 740, got {}",
        panorama.width()
    );
    assert_eq!(panorama.height(), 480);
}

// ---- Scenario 3: three-image cylindrical panorama ----

#[test]
fn three_image_cylinder_panorama_widens_past_one_and_a_half_images() {
    let full = textured(1000, 300);
    let img0 = crop(&full, 0, 400, 300);
    let img1 = crop(&full, 260, 400, 300); // overlaps img0 by 140px
    let img2 = crop(&full, 520, 400, 300); // overlaps img1 by 140px, not img0

    let cfg = StitchConfig::default().with_cylinder(true).with_ransac_iterations(400);
    let stitcher = Stitcher::new(cfg);
    let panorama = stitcher.build(&[img0, img1, img2]).expect("overlapping cylinder triplet must connect and stitch");

    assert!(
        panorama.width() as f64 > 1.5 * 400.0,
        "expected cylinder panorama width > 600, got {}",
        panorama.width()
    );
}

// ---- Scenario 4: disconnected set ----

#[test]
fn disconnected_quartet_yields_disconnected_graph_error() {
    let full_a = textured(700, 300);
    let a0 = crop(&full_a, 0, 400, 300);
    let a1 = crop(&full_a, 200, 400, 300); // overlaps a0 by 200px

    let full_b = textured_b(700, 300);
    let b0 = crop(&full_b, 0, 400, 300);
    let b1 = crop(&full_b, 200, 400, 300); // overlaps b0 by 200px, unrelated to the a-pair

    let cfg = StitchConfig::default().with_ransac_iterations(400);
    let stitcher = Stitcher::new(cfg);
    match stitcher.build(&[a0, a1, b0, b1]) {
        Err(Error::DisconnectedGraph(reachable, total)) => {
            assert_eq!(total, 4);
            assert!(reachable < 4, "expected a strict subset reachable, got {reachable}");
        }
        other => panic!("expected a DisconnectedGraph error, got {other:?}"),
    }
}

// ---- Scenario 5: rotated square (P5 also exercised here) ----

#[test]
fn rotated_pair_recovers_expected_axis_angle() {
    let focal = 800.0;
    let (cx, cy) = (320.0, 240.0);
    let k = Matrix3::new(focal, 0.0, cx, 0.0, focal, cy, 0.0, 0.0, 1.0);
    let k_inv = k.try_inverse().unwrap();

    let angle = 15f64.to_radians();
    let (c, s) = (angle.cos(), angle.sin());
    let r = Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0);

    // homography mapping image 1's pixels onto image 0's, consistent
    // with `ImageComponent`'s `homo = R * K^-1` / `homo_inv = K * R^T`
    // convention: H = K * R * K^-1.
    let h = k * r * k_inv;
    let info = MatchInfo {
        from: 0,
        to: 1,
        homography: h,
        inlier_src: Vec::new(),
        inlier_dst: Vec::new(),
        confidence: 5.0,
    };

    let sizes = vec![(640, 480), (640, 480)];
    let cameras = camera::estimate_cameras(2, &sizes, &[info]).expect("two images with one confident match must connect");

    for cam in &cameras {
        let rt_r = cam.rotation.transpose() * cam.rotation;
        assert!((rt_r - Matrix3::identity()).norm() < 1e-6, "R^T R should be ~I (P5)");
        assert!(cam.rotation.determinant() > 0.0, "det(R) should be positive (P5)");
    }

    let relative = cameras[0].rotation.transpose() * cameras[1].rotation;
    let trace = relative.trace().clamp(-1.0, 3.0);
    let recovered_angle = ((trace - 1.0) / 2.0).acos().to_degrees();
    assert!(
        (14.0..=16.0).contains(&recovered_angle),
        "expected axis-angle magnitude in [14, 16] degrees, got {recovered_angle}"
    );
}

// ---- P1/P2: descriptor norm and keypoint bounds ----

#[test]
fn descriptors_are_unit_norm_and_bounded_within_image() {
    let img = textured(320, 240);
    let cfg = StitchConfig::default();
    let features = features::extract_all(&[img], &cfg).expect("textured image yields features");

    for feature in &features[0] {
        let norm: f32 = feature.descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 + 1e-4, "descriptor L2 norm {norm} outside [1-eps, 1+eps]");
        for &v in &feature.descriptor {
            assert!(v <= 0.2 + 1e-4, "descriptor element {v} exceeds the 0.2 clamp");
        }
        let (x, y) = (feature.keypoint.pt.x, feature.keypoint.pt.y);
        assert!(x >= 0.0 && x < 320.0, "keypoint x {x} out of bounds");
        assert!(y >= 0.0 && y < 240.0, "keypoint y {y} out of bounds");
    }
}

// ---- P3: match symmetry ----

#[test]
fn pairwise_homography_is_symmetric_under_inversion() {
    let base = textured(480, 360);
    let moved = shifted_left(&base, 40);
    let cfg = StitchConfig::default().with_projection(ProjectionMode::Flat).with_ransac_iterations(400);
    let sizes = vec![(480, 360), (480, 360)];

    let features = features::extract_all(&[base, moved], &cfg).expect("translated textured pair yields features");
    let pair_matches = matcher::match_all_pairs(&features, &cfg);
    let (_, matches01) = pair_matches.iter().find(|((i, j), _)| *i == 0 && *j == 1).expect("pair (0, 1) must be attempted");

    let kind = transform::transform_kind_for(&cfg);
    let coords0: Vec<Point2f> = features[0].iter().map(|f| f.keypoint.pt).collect();
    let coords1: Vec<Point2f> = features[1].iter().map(|f| f.keypoint.pt).collect();

    let forward = ransac::estimate(0, 1, &coords0, &coords1, matches01, sizes[0], kind, &cfg).expect("forward pair must estimate a transform");
    let backward = ransac::estimate(1, 0, &coords1, &coords0, &swap_matches(matches01), sizes[1], kind, &cfg).expect("backward pair must estimate a transform");

    let round_trip = normalize_3x3(&(backward.homography * forward.homography));
    let identity = normalize_3x3(&Matrix3::identity());
    assert!((round_trip - identity).norm() < 1e-3, "H_back * H_fwd should be ~I after rescaling (P3)");
}

fn swap_matches(matches: &[panostitch::matcher::Match]) -> Vec<panostitch::matcher::Match> {
    matches.iter().map(|m| panostitch::matcher::Match { query_idx: m.train_idx, train_idx: m.query_idx, distance: m.distance }).collect()
}

// ---- P4: inlier consistency ----

#[test]
fn every_inlier_lands_within_the_ransac_threshold() {
    let base = textured(480, 360);
    let moved = shifted_left(&base, 40);
    let cfg = StitchConfig::default().with_projection(ProjectionMode::Flat).with_ransac_iterations(400);
    let sizes = vec![(480, 360), (480, 360)];

    let features = features::extract_all(&[base, moved], &cfg).expect("translated textured pair yields features");
    let pair_matches = matcher::match_all_pairs(&features, &cfg);
    let (_, matches01) = pair_matches.iter().find(|((i, j), _)| *i == 0 && *j == 1).expect("pair (0, 1) must be attempted");

    let kind = transform::transform_kind_for(&cfg);
    let coords0: Vec<Point2f> = features[0].iter().map(|f| f.keypoint.pt).collect();
    let coords1: Vec<Point2f> = features[1].iter().map(|f| f.keypoint.pt).collect();
    let info = ransac::estimate(0, 1, &coords0, &coords1, matches01, sizes[0], kind, &cfg).expect("forward pair must estimate a transform");

    let (w, h) = sizes[0];
    let thres = cfg.ransac_inlier_thres * (w + h) as f64 / 1600.0;
    for (src, dst) in info.inlier_src.iter().zip(&info.inlier_dst) {
        let projected = apply_projective(&info.homography, *src);
        assert!(!projected.is_nan());
        let dist = f64::from((projected - *dst).x).hypot(f64::from((projected - *dst).y));
        assert!(dist <= thres + 1e-6, "inlier at distance {dist} exceeds threshold {thres} (P4)");
    }
}

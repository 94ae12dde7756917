use approx::assert_abs_diff_eq;
use nalgebra::Point2;
use pcaruco_aruco::builtins::{DICT_4X4_100, DICT_4X4_50};
use pcaruco_aruco::{render_marker, ArucoDetector, ArucoDetectorParams};
use pcaruco_core::GrayImage;

fn detector() -> ArucoDetector {
    ArucoDetector::new(DICT_4X4_50, ArucoDetectorParams::default())
}

fn assert_corners(got: &[Point2<f32>; 4], expected: [(f32, f32); 4]) {
    for (g, (ex, ey)) in got.iter().zip(expected) {
        assert_abs_diff_eq!(g.x, ex, epsilon = 0.75);
        assert_abs_diff_eq!(g.y, ey, epsilon = 0.75);
    }
}

/// Rotate clockwise by a quarter turn: pixel `(x, y)` moves to `(h - 1 - y, x)`.
fn rotate_cw(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width, img.height);
    let mut out = GrayImage::new(h, w, 0);
    for y in 0..h {
        for x in 0..w {
            out.data[x * h + (h - 1 - y)] = img.data[y * w + x];
        }
    }
    out
}

#[test]
fn marker_touching_the_image_edge_is_not_a_candidate() {
    let bare = render_marker(&DICT_4X4_50, 3, 10, 0).expect("render");
    let out = detector().detect(&bare.view()).expect("detect");
    assert!(out.markers.is_empty());
    assert!(out.rejected.is_empty());

    // One light pixel of padding is enough.
    let side = bare.width + 2;
    let mut padded = GrayImage::new(side, side, 255);
    for y in 0..bare.height {
        let row = &bare.data[y * bare.width..(y + 1) * bare.width];
        padded.data[(y + 1) * side + 1..(y + 1) * side + 1 + bare.width].copy_from_slice(row);
    }
    let out = detector().detect(&padded.view()).expect("detect");
    assert_eq!(out.ids(), vec![3]);
}

#[test]
fn full_frame_marker_is_found_once() {
    let img = render_marker(&DICT_4X4_50, 3, 10, 2).expect("render");
    assert_eq!(img.width, 100);

    let out = detector().detect(&img.view()).expect("detect");
    assert_eq!(out.ids(), vec![3]);
    assert!(out.rejected.is_empty(), "rejected: {:?}", out.rejected);

    let m = &out.markers[0];
    assert_eq!(m.rotation, 0);
    assert_eq!(m.hamming, 0);
    assert_corners(
        &m.corners,
        [(19.5, 19.5), (79.5, 19.5), (79.5, 79.5), (19.5, 79.5)],
    );
}

#[test]
fn rotated_marker_keeps_its_own_top_left_first() {
    let img = rotate_cw(&render_marker(&DICT_4X4_50, 17, 10, 2).expect("render"));
    let out = detector().detect(&img.view()).expect("detect");
    assert_eq!(out.ids(), vec![17]);

    let m = &out.markers[0];
    assert_eq!(m.rotation, 1);
    assert_corners(
        &m.corners,
        [(79.5, 19.5), (79.5, 79.5), (19.5, 79.5), (19.5, 19.5)],
    );
}

#[test]
fn plain_black_square_is_rejected() {
    let mut img = GrayImage::new(100, 100, 255);
    for y in 30..70 {
        for x in 30..70 {
            img.data[y * 100 + x] = 0;
        }
    }
    let out = detector().detect(&img.view()).expect("detect");
    assert!(out.markers.is_empty());
    assert_eq!(out.rejected.len(), 1);
    assert_corners(
        &out.rejected[0],
        [(29.5, 29.5), (69.5, 29.5), (69.5, 69.5), (29.5, 69.5)],
    );
}

#[test]
fn several_markers_come_out_in_scan_order() {
    let a = render_marker(&DICT_4X4_100, 60, 8, 1).expect("render");
    let b = render_marker(&DICT_4X4_100, 5, 8, 1).expect("render");
    let side = a.width;
    let mut canvas = GrayImage::new(side * 2 + 20, side + 20, 255);
    for (img, ox) in [(&a, 10), (&b, side + 10)] {
        for y in 0..side {
            let row = (y + 10) * canvas.width;
            canvas.data[row + ox..row + ox + side].copy_from_slice(&img.data[y * side..(y + 1) * side]);
        }
    }

    let det = ArucoDetector::new(DICT_4X4_100, ArucoDetectorParams::default());
    let out = det.detect(&canvas.view()).expect("detect");
    assert_eq!(out.ids(), vec![60, 5]);
    assert!(out.rejected.is_empty());
}

#![allow(dead_code)]

use std::path::Path;

use pcaruco::aruco::builtins::DICT_4X4_50;
use pcaruco::aruco::render_marker;
use pcaruco::core::{GrayImage, Point, PointCloud};

/// Grid spacing of the synthetic clouds; a power of two keeps the
/// projection exact.
pub const SPACING: f32 = 0.25;

/// 65x65 canvas with marker `id` (8 px cells, one quiet cell) at the top-left.
pub fn marker_canvas(id: u32) -> GrayImage {
    let marker = render_marker(&DICT_4X4_50, id, 8, 1).expect("render");
    let mut canvas = GrayImage::new(65, 65, 255);
    for y in 0..marker.height {
        let src = &marker.data[y * marker.width..(y + 1) * marker.width];
        canvas.data[y * 65..y * 65 + marker.width].copy_from_slice(src);
    }
    canvas
}

/// One point per canvas pixel at `(col, row) * SPACING`, all in `tile_byte`.
pub fn marker_cloud(id: u32, tile_byte: u8) -> PointCloud {
    let canvas = marker_canvas(id);
    let mut cloud = PointCloud::empty();
    for row in 0..canvas.height {
        for col in 0..canvas.width {
            let v = canvas.data[row * canvas.width + col];
            let p = Point::new(col as f32 * SPACING, row as f32 * SPACING, 1.0, [v, v, v]);
            cloud.push(p, tile_byte);
        }
    }
    cloud
}

pub fn write_marker_png(path: &Path, id: u32) {
    let canvas = marker_canvas(id);
    image::save_buffer(
        path,
        &canvas.data,
        canvas.width as u32,
        canvas.height as u32,
        image::ExtendedColorType::L8,
    )
    .expect("write png");
}

pub fn write_ascii_ply(path: &Path, cloud: &PointCloud) {
    let mut text = format!(
        "ply\nformat ascii 1.0\nelement vertex {}\n\
         property float x\nproperty float y\nproperty float z\n\
         property uchar red\nproperty uchar green\nproperty uchar blue\n\
         property uchar tile\nend_header\n",
        cloud.len()
    );
    for (p, tile) in cloud.iter() {
        text.push_str(&format!(
            "{} {} {} {} {} {} {}\n",
            p.x, p.y, p.z, p.r, p.g, p.b, tile
        ));
    }
    std::fs::write(path, text).expect("write ply");
}

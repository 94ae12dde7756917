//! Marker overlays on a copy of the detector input.

use nalgebra::Point2;
use pcaruco_core::{RasterImage, Rgb};

use crate::pipeline::FrameReport;

/// Overlay colors.
#[derive(Clone, Copy, Debug)]
pub struct DrawStyle {
    pub outline: Rgb,
    /// Square drawn on each marker's first (top-left) corner.
    pub first_corner: Rgb,
    /// Outline of rejected candidates; `None` skips them.
    pub rejected: Option<Rgb>,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            outline: [255, 0, 255],
            first_corner: [255, 0, 0],
            rejected: None,
        }
    }
}

/// Copy of the frame's raster with marker outlines drawn on top.
pub fn annotate(frame: &FrameReport, style: &DrawStyle) -> RasterImage {
    let mut img = frame.image.clone();
    if let Some(color) = style.rejected {
        for q in &frame.rejected {
            draw_quad(&mut img, q, color);
        }
    }
    for m in &frame.markers {
        draw_quad(&mut img, &m.corners, style.outline);
        let (cx, cy) = round_px(m.corners[0]);
        for y in (cy - 2)..=(cy + 2) {
            for x in (cx - 2)..=(cx + 2) {
                put_signed(&mut img, x, y, style.first_corner);
            }
        }
    }
    img
}

fn round_px(p: Point2<f32>) -> (i64, i64) {
    (p.x.round() as i64, p.y.round() as i64)
}

fn put_signed(img: &mut RasterImage, x: i64, y: i64, rgb: Rgb) {
    if x >= 0 && y >= 0 {
        img.put(x as usize, y as usize, rgb);
    }
}

fn draw_quad(img: &mut RasterImage, quad: &[Point2<f32>; 4], rgb: Rgb) {
    for i in 0..4 {
        draw_line(img, round_px(quad[i]), round_px(quad[(i + 1) % 4]), rgb);
    }
}

/// Bresenham line, both endpoints included. Off-image pixels are skipped.
fn draw_line(img: &mut RasterImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), rgb: Rgb) {
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y) = (x0, y0);
    let mut err = dx - dy;

    loop {
        put_signed(img, x, y, rgb);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FrameSource, MarkerReport};
    use pcaruco_core::TileMask;

    #[test]
    fn outlines_marker_on_a_copy() {
        let frame = FrameReport {
            source: FrameSource::Tile {
                tile: TileMask::TILE_1,
            },
            width: 20,
            height: 20,
            points: 0,
            markers: vec![MarkerReport {
                id: 1,
                corners: [
                    Point2::new(4.0, 4.0),
                    Point2::new(15.0, 4.0),
                    Point2::new(15.0, 15.0),
                    Point2::new(4.0, 15.0),
                ],
                corners_world: None,
            }],
            rejected: Vec::new(),
            image: RasterImage::new(20, 20, [0, 255, 0]),
        };
        let style = DrawStyle::default();
        let out = annotate(&frame, &style);

        assert_eq!(out.get(10, 4), Some(style.outline));
        assert_eq!(out.get(15, 10), Some(style.outline));
        assert_eq!(out.get(4, 4), Some(style.first_corner));
        assert_eq!(out.get(10, 10), Some([0, 255, 0]));
        assert_eq!(frame.image.get(10, 4), Some([0, 255, 0]));
    }

    #[test]
    fn clipped_lines_do_not_panic() {
        let mut img = RasterImage::new(5, 5, [0, 0, 0]);
        draw_line(&mut img, (-3, 2), (9, 2), [1, 2, 3]);
        assert_eq!(img.get(0, 2), Some([1, 2, 3]));
        assert_eq!(img.get(4, 2), Some([1, 2, 3]));
    }
}

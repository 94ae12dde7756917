//! Quad candidates from dark connected components.
//!
//! A printed marker has a solid black border, so after binarization the
//! border and every inner black cell touching it form one 8-connected dark
//! blob whose convex hull is the marker outline.

use nalgebra::Point2;
use pcaruco_core::GrayImageView;

/// Geometric gates applied to fitted quads.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QuadGates {
    pub min_perimeter: f32,
    pub max_perimeter: f32,
    pub accuracy_rate: f32,
    pub min_corner_distance_rate: f32,
    pub min_side_px: f32,
}

/// One dark blob, reduced to what the quad fit needs.
#[derive(Clone, Debug)]
pub(crate) struct DarkComponent {
    /// Pixels with at least one non-dark 4-neighbor.
    pub boundary: Vec<(u32, u32)>,
}

/// Label 8-connected pixels `<= threshold`, dropping blobs that touch the
/// image border or have fewer than `min_pixels` pixels. Blobs come out in
/// raster order of their first pixel.
pub(crate) fn dark_components(
    img: &GrayImageView<'_>,
    threshold: u8,
    min_pixels: usize,
) -> Vec<DarkComponent> {
    let (w, h) = (img.width, img.height);
    let dark = |x: usize, y: usize| img.data[y * w + x] <= threshold;
    let mut visited = vec![false; w * h];
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut out = Vec::new();

    for sy in 0..h {
        for sx in 0..w {
            let seed = sy * w + sx;
            if visited[seed] || !dark(sx, sy) {
                continue;
            }
            visited[seed] = true;
            stack.push((sx, sy));

            let mut pixel_count = 0usize;
            let mut touches_border = false;
            let mut boundary = Vec::new();

            while let Some((x, y)) = stack.pop() {
                pixel_count += 1;
                if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                    touches_border = true;
                }
                let is_boundary = x == 0
                    || y == 0
                    || x + 1 == w
                    || y + 1 == h
                    || !dark(x - 1, y)
                    || !dark(x + 1, y)
                    || !dark(x, y - 1)
                    || !dark(x, y + 1);
                if is_boundary {
                    boundary.push((x as u32, y as u32));
                }

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                            continue;
                        }
                        let (nx, ny) = (nx as usize, ny as usize);
                        let idx = ny * w + nx;
                        if !visited[idx] && dark(nx, ny) {
                            visited[idx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            if touches_border || pixel_count < min_pixels {
                continue;
            }
            out.push(DarkComponent { boundary });
        }
    }
    out
}

/// Convex hull of the outer corners of the boundary pixels.
///
/// Pixel centers sit on integer coordinates, so pixel `(x, y)` covers
/// `[x - 0.5, x + 0.5] × [y - 0.5, y + 0.5]`.
pub(crate) fn component_hull(comp: &DarkComponent) -> Vec<Point2<f32>> {
    let mut pts: Vec<(i64, i64)> = Vec::with_capacity(comp.boundary.len() * 4);
    for &(x, y) in &comp.boundary {
        // Doubled coordinates keep the half-pixel corners integral.
        let (x2, y2) = (2 * x as i64, 2 * y as i64);
        pts.push((x2 - 1, y2 - 1));
        pts.push((x2 + 1, y2 - 1));
        pts.push((x2 + 1, y2 + 1));
        pts.push((x2 - 1, y2 + 1));
    }
    convex_hull(pts)
        .into_iter()
        .map(|(x, y)| Point2::new(x as f32 * 0.5, y as f32 * 0.5))
        .collect()
}

/// Andrew's monotone chain. Collinear points are dropped.
fn convex_hull(mut pts: Vec<(i64, i64)>) -> Vec<(i64, i64)> {
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: (i64, i64), a: (i64, i64), b: (i64, i64)) -> i64 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    }

    let mut hull: Vec<(i64, i64)> = Vec::with_capacity(pts.len() + 1);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Fit a quad to a convex hull and apply the geometric gates.
///
/// The returned corners are ordered clockwise as seen on screen (image y
/// pointing down).
pub(crate) fn fit_quad(hull: &[Point2<f32>], gates: &QuadGates) -> Option<[Point2<f32>; 4]> {
    let n = hull.len();
    if n < 4 {
        return None;
    }

    // Longest diagonal.
    let (mut ia, mut ic, mut best) = (0usize, 0usize, -1f32);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = (hull[i] - hull[j]).norm_squared();
            if d > best {
                (ia, ic, best) = (i, j, d);
            }
        }
    }

    // Farthest hull vertex from the diagonal on each side.
    let (a, c) = (hull[ia], hull[ic]);
    let farthest = |from: usize, to: usize| -> Option<(usize, f32)> {
        let mut k = (from + 1) % n;
        let mut best: Option<(usize, f32)> = None;
        while k != to {
            let d = line_distance(hull[k], a, c);
            if best.is_none_or(|(_, bd)| d > bd) {
                best = Some((k, d));
            }
            k = (k + 1) % n;
        }
        best
    };
    let (ib, db) = farthest(ia, ic)?;
    let (id, dd) = farthest(ic, ia)?;
    if db < 1.0 || dd < 1.0 {
        return None;
    }

    let mut quad = [hull[ia], hull[ib], hull[ic], hull[id]];
    if signed_area(&quad) < 0.0 {
        quad.swap(1, 3);
    }
    // Start at the top-left-most corner.
    let start = (0..4)
        .min_by(|&i, &j| (quad[i].x + quad[i].y).total_cmp(&(quad[j].x + quad[j].y)))
        .unwrap_or(0);
    quad.rotate_left(start);

    let sides: [f32; 4] = std::array::from_fn(|i| (quad[(i + 1) % 4] - quad[i]).norm());
    let perimeter: f32 = sides.iter().sum();
    if perimeter < gates.min_perimeter || perimeter > gates.max_perimeter {
        return None;
    }
    let min_side = (gates.min_corner_distance_rate * perimeter).max(gates.min_side_px);
    if sides.iter().any(|&s| s < min_side) {
        return None;
    }

    let tol = (gates.accuracy_rate * perimeter).max(1.5);
    let fits = hull.iter().all(|&p| {
        (0..4)
            .map(|i| segment_distance(p, quad[i], quad[(i + 1) % 4]))
            .fold(f32::INFINITY, f32::min)
            <= tol
    });
    fits.then_some(quad)
}

/// Shoelace sum; positive for clockwise-on-screen order.
pub(crate) fn signed_area(quad: &[Point2<f32>; 4]) -> f32 {
    0.5 * (0..4)
        .map(|i| {
            let (p, q) = (quad[i], quad[(i + 1) % 4]);
            p.x * q.y - q.x * p.y
        })
        .sum::<f32>()
}

/// True if `p` lies inside (or on) a clockwise-on-screen convex quad.
pub(crate) fn quad_contains(quad: &[Point2<f32>; 4], p: Point2<f32>) -> bool {
    (0..4).all(|i| {
        let (a, b) = (quad[i], quad[(i + 1) % 4]);
        (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= 0.0
    })
}

pub(crate) fn quad_centroid(quad: &[Point2<f32>; 4]) -> Point2<f32> {
    let sx: f32 = quad.iter().map(|p| p.x).sum();
    let sy: f32 = quad.iter().map(|p| p.y).sum();
    Point2::new(sx / 4.0, sy / 4.0)
}

fn line_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len = ab.norm();
    if len <= f32::EPSILON {
        return (p - a).norm();
    }
    ((p - a).perp(&ab)).abs() / len
}

fn segment_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f32::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

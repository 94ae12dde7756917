//! Orthographic top-down projection of a point set onto an RGB raster.
//!
//! The projection drops `z` and maps the XY bounding box of the points onto
//! the full raster with an independent linear scale per axis. It is a coarse
//! sampling, not a camera model: every point is written to exactly one pixel,
//! and when several points land on the same pixel the one visited last wins.

use crate::{Point, RasterImage, Rgb};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Width in pixels of the cosmetic frame drawn around every projection.
pub const FRAME_MARGIN: usize = 2;
/// Color of the frame.
pub const FRAME_COLOR: Rgb = [0, 0, 0];
/// Color of pixels inside the frame that no point was written to.
pub const BACKGROUND_COLOR: Rgb = [0, 255, 0];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    #[error("no data: cannot project an empty point set")]
    EmptyPointSet,
    #[error("invalid raster size {width}x{height}")]
    InvalidSize { width: usize, height: usize },
}

/// Raster size used when projecting a point cloud.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionParams {
    pub width: usize,
    pub height: usize,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

/// Linear mapping of one world axis onto `0..=last` pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisScale {
    pub min: f64,
    pub max: f64,
    /// Pixels per world unit, `(pixels - 1) / (max - min)`; `0.0` when `max == min`.
    pub factor: f64,
    last: usize,
}

impl AxisScale {
    fn fit(min: f64, max: f64, pixels: usize) -> Self {
        let last = pixels.saturating_sub(1);
        let range = max - min;
        let factor = if range > 0.0 { last as f64 / range } else { 0.0 };
        Self {
            min,
            max,
            factor,
            last,
        }
    }

    /// All points share one coordinate on this axis.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.factor == 0.0
    }

    /// Pixel index of world coordinate `v`, always in `0..=last`.
    #[inline]
    pub fn to_pixel(&self, v: f64) -> usize {
        if self.is_degenerate() {
            return 0;
        }
        // Normalize first so that `max` lands on exactly `last`.
        let t = (v - self.min) / (self.max - self.min);
        let px = (t * self.last as f64).floor();
        if px.is_nan() || px <= 0.0 {
            0
        } else {
            (px as usize).min(self.last)
        }
    }

    /// World coordinate of the left/top edge of pixel `px`.
    #[inline]
    pub fn to_world(&self, px: f64) -> f64 {
        if self.is_degenerate() {
            self.min
        } else {
            self.min + px / self.factor
        }
    }
}

/// XY bounding box of a projected point set and its pixel mapping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x: AxisScale,
    pub y: AxisScale,
}

impl Extent {
    /// Fit the extent of all finite points onto a `width × height` raster.
    ///
    /// Returns `None` when there is no finite point.
    pub fn fit(points: &[Point], width: usize, height: usize) -> Option<Self> {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points.iter().filter(|p| is_finite_xy(p)) {
            let (x, y) = (p.x as f64, p.y as f64);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        if min_x > max_x {
            return None;
        }
        Some(Self {
            x: AxisScale::fit(min_x, max_x, width),
            y: AxisScale::fit(min_y, max_y, height),
        })
    }

    #[inline]
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (usize, usize) {
        (self.x.to_pixel(x), self.y.to_pixel(y))
    }

    #[inline]
    pub fn pixel_to_world(&self, px: f64, py: f64) -> (f64, f64) {
        (self.x.to_world(px), self.y.to_world(py))
    }
}

/// For every pixel, the index of the point that was written there last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointLookup {
    width: usize,
    height: usize,
    index: Vec<Option<usize>>,
}

impl PointLookup {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            index: vec![None; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.index[y * self.width + x]
    }

    /// Closest written pixel to the sub-pixel location `(x, y)` within a
    /// square window of `radius` pixels.
    pub fn nearest(&self, x: f32, y: f32, radius: usize) -> Option<usize> {
        let cx = x.round() as i64;
        let cy = y.round() as i64;
        let r = radius as i64;
        let mut best: Option<(f32, usize)> = None;
        for py in (cy - r)..=(cy + r) {
            for px in (cx - r)..=(cx + r) {
                if px < 0 || py < 0 {
                    continue;
                }
                let Some(idx) = self.get(px as usize, py as usize) else {
                    continue;
                };
                let d2 = (px as f32 - x).powi(2) + (py as f32 - y).powi(2);
                if best.map_or(true, |(bd, _)| d2 < bd) {
                    best = Some((d2, idx));
                }
            }
        }
        best.map(|(_, idx)| idx)
    }

    /// Number of pixels that received at least one point.
    pub fn filled(&self) -> usize {
        self.index.iter().filter(|i| i.is_some()).count()
    }
}

/// Output of [`project`].
#[derive(Clone, Debug)]
pub struct Projection {
    pub image: RasterImage,
    pub extent: Extent,
    pub lookup: PointLookup,
}

/// Rasterize `points` onto a `width × height` RGB image, looking down the z axis.
///
/// Column `x` and row `y` of the output are `floor((p - min) * factor)` on the
/// respective axis. Points with non-finite x/y are skipped.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(points), fields(points = points.len()))
)]
pub fn project(points: &[Point], width: usize, height: usize) -> Result<Projection, ProjectError> {
    if width == 0 || height == 0 {
        return Err(ProjectError::InvalidSize { width, height });
    }
    let extent = Extent::fit(points, width, height).ok_or(ProjectError::EmptyPointSet)?;

    log::info!(
        "x range: {}..{}, y range: {}..{}",
        extent.x.min,
        extent.x.max,
        extent.y.min,
        extent.y.max
    );
    if extent.x.is_degenerate() || extent.y.is_degenerate() {
        log::warn!("degenerate extent: all points share one coordinate on an axis");
    }

    let mut image = framed_canvas(width, height);
    let mut lookup = PointLookup::new(width, height);
    let mut skipped = 0usize;

    for (i, p) in points.iter().enumerate() {
        if !is_finite_xy(p) {
            skipped += 1;
            continue;
        }
        let (px, py) = extent.world_to_pixel(p.x as f64, p.y as f64);
        image.put(px, py, p.rgb());
        lookup.index[py * width + px] = Some(i);
    }

    if skipped > 0 {
        log::warn!("skipped {skipped} points with non-finite coordinates");
    }
    log::debug!(
        "projected {} points onto {} of {} pixels",
        points.len() - skipped,
        lookup.filled(),
        width * height
    );

    Ok(Projection {
        image,
        extent,
        lookup,
    })
}

fn framed_canvas(width: usize, height: usize) -> RasterImage {
    let mut image = RasterImage::new(width, height, FRAME_COLOR);
    if width > 2 * FRAME_MARGIN && height > 2 * FRAME_MARGIN {
        image.fill_rect(
            FRAME_MARGIN,
            FRAME_MARGIN,
            width - 1 - FRAME_MARGIN,
            height - 1 - FRAME_MARGIN,
            BACKGROUND_COLOR,
        );
    }
    image
}

#[inline]
fn is_finite_xy(p: &Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

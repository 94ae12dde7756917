//! Reading marker bits from an image quad.

use crate::threshold::otsu_threshold;
use crate::{Match, Matcher};
use nalgebra::Point2;
use pcaruco_core::{sample_bilinear_u8, GrayImageView, Homography};

/// Sampling and acceptance knobs for one quad.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DecodeConfig {
    /// Marker border width in cells.
    pub border_bits: usize,
    /// Required fraction of border cells that read black.
    pub min_border_score: f32,
    /// Minimum spread between the brightest and darkest cell sample.
    pub min_contrast: u8,
}

/// Bits read from a quad, before dictionary lookup.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Observation {
    /// Inner bits, row-major, white = 1.
    pub code: u64,
    pub border_score: f32,
}

/// Observation plus its dictionary match.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Decoded {
    pub matched: Match,
    pub border_score: f32,
}

/// Cell-center and threshold sample positions in canonical marker units.
///
/// The canonical square is `[0, cells]²`, one unit per cell.
pub(crate) struct SampleGrid {
    cells: usize,
    points: Vec<Point2<f32>>,
    threshold_points: Vec<Point2<f32>>,
}

impl SampleGrid {
    pub(crate) fn new(bits: usize, border_bits: usize) -> Option<Self> {
        if bits == 0 || bits * bits > 64 {
            return None;
        }
        let cells = bits + 2 * border_bits;

        let mut points = Vec::with_capacity(cells * cells);
        for cy in 0..cells {
            for cx in 0..cells {
                points.push(Point2::new(cx as f32 + 0.5, cy as f32 + 0.5));
            }
        }

        const THRESH_SUBDIV: usize = 3;
        let grid = cells * THRESH_SUBDIV;
        let step = 1.0 / THRESH_SUBDIV as f32;
        let mut threshold_points = Vec::with_capacity(grid * grid);
        for ty in 0..grid {
            for tx in 0..grid {
                threshold_points.push(Point2::new(
                    (tx as f32 + 0.5) * step,
                    (ty as f32 + 0.5) * step,
                ));
            }
        }

        Some(Self {
            cells,
            points,
            threshold_points,
        })
    }

    pub(crate) fn cells(&self) -> usize {
        self.cells
    }
}

/// Decoder with reusable scratch buffers.
pub(crate) struct QuadDecoder {
    cfg: DecodeConfig,
    bits: usize,
    grid: SampleGrid,
    scratch_bits: Vec<u8>,
    scratch_thr: Vec<u8>,
}

impl QuadDecoder {
    pub(crate) fn new(cfg: DecodeConfig, bits: usize) -> Option<Self> {
        let grid = SampleGrid::new(bits, cfg.border_bits)?;
        Some(Self {
            cfg,
            bits,
            scratch_bits: Vec::with_capacity(grid.points.len()),
            scratch_thr: Vec::with_capacity(grid.threshold_points.len()),
            grid,
        })
    }

    /// Sample the quad (clockwise-on-screen corners) and look the code up.
    pub(crate) fn decode(
        &mut self,
        img: &GrayImageView<'_>,
        quad: &[Point2<f32>; 4],
        matcher: &Matcher,
    ) -> Option<Decoded> {
        let h = Homography::square_to_quad(self.grid.cells() as f32, quad)?;
        let obs = self.observe(img, &h)?;
        let matched = matcher.match_code(obs.code)?;
        Some(Decoded {
            matched,
            border_score: obs.border_score,
        })
    }

    fn observe(&mut self, img: &GrayImageView<'_>, h: &Homography) -> Option<Observation> {
        self.scratch_bits.clear();
        for p in &self.grid.points {
            self.scratch_bits.push(sample(img, h.apply(*p))?);
        }

        self.scratch_thr.clear();
        for p in &self.grid.threshold_points {
            if let Some(v) = sample(img, h.apply(*p)) {
                self.scratch_thr.push(v);
            }
        }

        decode_samples(
            &self.scratch_bits,
            &self.scratch_thr,
            self.grid.cells(),
            self.bits,
            &self.cfg,
        )
    }
}

fn decode_samples(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    cfg: &DecodeConfig,
) -> Option<Observation> {
    if samples.len() != cells * cells {
        return None;
    }

    let lo = samples.iter().copied().min()?;
    let hi = samples.iter().copied().max()?;
    if hi - lo < cfg.min_contrast {
        return None;
    }

    let thr = if thr_samples.is_empty() {
        otsu_threshold(samples)
    } else {
        otsu_threshold(thr_samples)
    };

    let border = cfg.border_bits;
    let mut border_ok = 0u32;
    let mut border_total = 0u32;
    let mut code = 0u64;

    for cy in 0..cells {
        for cx in 0..cells {
            let is_black = samples[cy * cells + cx] <= thr;
            let is_border = cx < border || cy < border || cx >= border + bits || cy >= border + bits;
            if is_border {
                border_total += 1;
                if is_black {
                    border_ok += 1;
                }
            } else if !is_black {
                code |= 1u64 << ((cy - border) * bits + (cx - border));
            }
        }
    }

    let border_score = if border_total == 0 {
        1.0
    } else {
        border_ok as f32 / border_total as f32
    };
    if border_score < cfg.min_border_score {
        return None;
    }

    Some(Observation { code, border_score })
}

fn sample(img: &GrayImageView<'_>, p: Point2<f32>) -> Option<u8> {
    let inside = p.x >= 0.0
        && p.y >= 0.0
        && p.x <= (img.width - 1) as f32
        && p.y <= (img.height - 1) as f32;
    inside.then(|| sample_bilinear_u8(img, p.x, p.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_4X4_50;
    use crate::render_marker;

    fn cfg() -> DecodeConfig {
        DecodeConfig {
            border_bits: 1,
            min_border_score: 0.85,
            min_contrast: 20,
        }
    }

    fn marker_quad(offset: f32, side: f32) -> [Point2<f32>; 4] {
        let (a, b) = (offset - 0.5, offset + side - 0.5);
        [
            Point2::new(a, a),
            Point2::new(b, a),
            Point2::new(b, b),
            Point2::new(a, b),
        ]
    }

    #[test]
    fn decodes_rendered_marker() {
        let img = render_marker(&DICT_4X4_50, 9, 8, 1).expect("render");
        let matcher = Matcher::new(DICT_4X4_50, 0);
        let mut dec = QuadDecoder::new(cfg(), 4).expect("decoder");
        let got = dec
            .decode(&img.view(), &marker_quad(8.0, 48.0), &matcher)
            .expect("decoded");
        assert_eq!(got.matched.id, 9);
        assert_eq!(got.matched.rotation, 0);
        assert_eq!(got.border_score, 1.0);
    }

    #[test]
    fn quarter_turned_quad_reports_rotation() {
        let img = render_marker(&DICT_4X4_50, 9, 8, 1).expect("render");
        let q = marker_quad(8.0, 48.0);
        // Start the quad at the top-right corner: the sampled frame is the
        // marker turned a quarter counter-clockwise.
        let turned = [q[1], q[2], q[3], q[0]];
        let matcher = Matcher::new(DICT_4X4_50, 0);
        let mut dec = QuadDecoder::new(cfg(), 4).expect("decoder");
        let got = dec.decode(&img.view(), &turned, &matcher).expect("decoded");
        assert_eq!(got.matched.id, 9);
        assert_eq!(got.matched.rotation, 3);
    }

    #[test]
    fn flat_patch_has_no_contrast() {
        let samples = vec![10u8; 36];
        assert!(decode_samples(&samples, &[], 6, 4, &cfg()).is_none());
    }

    #[test]
    fn white_border_is_rejected() {
        let mut samples = vec![255u8; 36];
        samples[14] = 0;
        assert!(decode_samples(&samples, &[], 6, 4, &cfg()).is_none());
    }
}

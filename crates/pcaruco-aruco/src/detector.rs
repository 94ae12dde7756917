//! Full-image ArUco detection: candidate quads, decoding, classification.

use crate::decode::{DecodeConfig, QuadDecoder};
use crate::quad::{
    component_hull, dark_components, fit_quad, quad_centroid, quad_contains, QuadGates,
};
use crate::threshold::otsu_threshold;
use crate::{Dictionary, Matcher};
use nalgebra::Point2;
use pcaruco_core::GrayImageView;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors returned by [`ArucoDetector::detect`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: usize, height: usize },
    #[error("image buffer holds {got} bytes, expected {expected}")]
    BufferSize { expected: usize, got: usize },
    #[error("marker size {0} does not fit a 64-bit code")]
    UnsupportedMarkerSize(usize),
}

/// Detector configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArucoDetectorParams {
    /// Fixed binarization threshold; `None` computes a global Otsu threshold.
    pub threshold: Option<u8>,
    /// Dark blobs smaller than this are ignored.
    pub min_component_pixels: usize,
    /// Perimeter bounds relative to `max(width, height)`.
    pub min_perimeter_rate: f32,
    pub max_perimeter_rate: f32,
    /// Allowed hull-to-quad deviation relative to the quad perimeter.
    pub polygonal_accuracy_rate: f32,
    /// Minimum side length relative to the perimeter.
    pub min_corner_distance_rate: f32,
    /// Absolute minimum side length in pixels.
    pub min_side_px: f32,
    /// Marker border width in cells.
    pub border_bits: usize,
    /// Required fraction of border cells reading black.
    pub min_border_score: f32,
    /// Minimum intensity spread inside a candidate.
    pub min_contrast: u8,
    /// Maximum Hamming distance for a match (clamped to the dictionary).
    pub max_hamming: u8,
}

impl Default for ArucoDetectorParams {
    fn default() -> Self {
        Self {
            threshold: None,
            min_component_pixels: 16,
            min_perimeter_rate: 0.03,
            max_perimeter_rate: 4.0,
            polygonal_accuracy_rate: 0.03,
            min_corner_distance_rate: 0.05,
            min_side_px: 8.0,
            border_bits: 1,
            min_border_score: 0.85,
            min_contrast: 20,
            max_hamming: 1,
        }
    }
}

/// One identified marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    /// Image corners, clockwise from the marker's own top-left corner.
    pub corners: [Point2<f32>; 4],
    /// Clockwise quarter turns of the marker as it appears in the image.
    pub rotation: u8,
    pub hamming: u8,
    pub border_score: f32,
}

/// Output of one detection run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArucoDetections {
    /// Identified markers in image scan order.
    pub markers: Vec<MarkerDetection>,
    /// Quads that looked like markers but could not be identified.
    pub rejected: Vec<[Point2<f32>; 4]>,
    /// Binarization threshold used for candidate extraction.
    pub threshold: u8,
}

impl ArucoDetections {
    pub fn ids(&self) -> Vec<u32> {
        self.markers.iter().map(|m| m.id).collect()
    }
}

/// Square-marker detector for one dictionary.
#[derive(Clone, Debug)]
pub struct ArucoDetector {
    params: ArucoDetectorParams,
    matcher: Matcher,
}

impl ArucoDetector {
    pub fn new(dictionary: Dictionary, params: ArucoDetectorParams) -> Self {
        let matcher = Matcher::new(dictionary, params.max_hamming);
        Self { params, matcher }
    }

    pub fn params(&self) -> &ArucoDetectorParams {
        &self.params
    }

    pub fn dictionary(&self) -> Dictionary {
        self.matcher.dictionary()
    }

    /// Find and identify markers in `img`.
    ///
    /// Candidates are dark blobs that stay clear of the image edge. A marker
    /// whose black border reaches the first or last row or column is not a
    /// candidate and shows up in neither `markers` nor `rejected`, so images
    /// need at least one light pixel around each marker.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn detect(&self, img: &GrayImageView<'_>) -> Result<ArucoDetections, DetectError> {
        if img.width == 0 || img.height == 0 {
            return Err(DetectError::EmptyImage {
                width: img.width,
                height: img.height,
            });
        }
        let expected = img.width * img.height;
        if img.data.len() != expected {
            return Err(DetectError::BufferSize {
                expected,
                got: img.data.len(),
            });
        }

        let p = &self.params;
        let bits = self.matcher.dictionary().marker_size;
        let mut decoder = QuadDecoder::new(
            DecodeConfig {
                border_bits: p.border_bits,
                min_border_score: p.min_border_score,
                min_contrast: p.min_contrast,
            },
            bits,
        )
        .ok_or(DetectError::UnsupportedMarkerSize(bits))?;

        let threshold = p.threshold.unwrap_or_else(|| otsu_threshold(img.data));
        let max_dim = img.width.max(img.height) as f32;
        let gates = QuadGates {
            min_perimeter: p.min_perimeter_rate * max_dim,
            max_perimeter: p.max_perimeter_rate * max_dim,
            accuracy_rate: p.polygonal_accuracy_rate,
            min_corner_distance_rate: p.min_corner_distance_rate,
            min_side_px: p.min_side_px,
        };

        let components = dark_components(img, threshold, p.min_component_pixels);
        let quads: Vec<[Point2<f32>; 4]> = components
            .iter()
            .filter_map(|c| fit_quad(&component_hull(c), &gates))
            .collect();
        log::debug!(
            "threshold {threshold}: {} dark components, {} quads",
            components.len(),
            quads.len()
        );

        let mut markers = Vec::new();
        let mut unmatched = Vec::new();
        for quad in quads {
            match decoder.decode(img, &quad, &self.matcher) {
                Some(d) => {
                    let r = d.matched.rotation as usize;
                    markers.push(MarkerDetection {
                        id: d.matched.id,
                        corners: std::array::from_fn(|i| quad[(r + i) % 4]),
                        rotation: d.matched.rotation,
                        hamming: d.matched.hamming,
                        border_score: d.border_score,
                    });
                }
                None => unmatched.push(quad),
            }
        }

        // Inner bit blobs of accepted markers are not candidates of their own.
        let rejected: Vec<_> = unmatched
            .into_iter()
            .filter(|q| {
                let c = quad_centroid(q);
                !markers.iter().any(|m| quad_contains(&m.corners, c))
            })
            .collect();

        log::debug!("{} markers, {} rejected", markers.len(), rejected.len());
        Ok(ArucoDetections {
            markers,
            rejected,
            threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_4X4_50;
    use pcaruco_core::GrayImage;

    #[test]
    fn empty_image_is_an_error() {
        let det = ArucoDetector::new(DICT_4X4_50, ArucoDetectorParams::default());
        let view = GrayImageView {
            width: 0,
            height: 10,
            data: &[],
        };
        assert_eq!(
            det.detect(&view),
            Err(DetectError::EmptyImage {
                width: 0,
                height: 10
            })
        );
    }

    #[test]
    fn short_buffer_is_an_error() {
        let det = ArucoDetector::new(DICT_4X4_50, ArucoDetectorParams::default());
        let data = [0u8; 10];
        let view = GrayImageView {
            width: 4,
            height: 4,
            data: &data,
        };
        assert!(matches!(
            det.detect(&view),
            Err(DetectError::BufferSize {
                expected: 16,
                got: 10
            })
        ));
    }

    #[test]
    fn blank_image_has_no_candidates() {
        let det = ArucoDetector::new(DICT_4X4_50, ArucoDetectorParams::default());
        let img = GrayImage::new(64, 64, 200);
        let out = det.detect(&img.view()).expect("detect");
        assert!(out.markers.is_empty());
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn params_roundtrip_through_json_defaults() {
        let p: ArucoDetectorParams =
            serde_json::from_str(r#"{"max_hamming":0}"#).expect("params");
        assert_eq!(p.max_hamming, 0);
        assert_eq!(p.border_bits, 1);
    }
}

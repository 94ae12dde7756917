//! Marker detection behind a swappable service trait.

use nalgebra::Point2;
use pcaruco_aruco::builtins::{builtin_dictionary, BUILTIN_NAMES};
use pcaruco_aruco::{ArucoDetector, ArucoDetectorParams, DetectError, Dictionary};
use pcaruco_core::RasterImage;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One identified marker in raster pixel coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    /// Clockwise from the marker's own top-left corner.
    pub corners: [Point2<f32>; 4],
}

/// Markers plus the candidates the detector considered but could not identify.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Detections {
    pub markers: Vec<Marker>,
    pub rejected: Vec<[Point2<f32>; 4]>,
}

impl Detections {
    pub fn ids(&self) -> Vec<u32> {
        self.markers.iter().map(|m| m.id).collect()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error(transparent)]
    Aruco(#[from] DetectError),
    #[error("unknown dictionary `{name}` (known: {})", BUILTIN_NAMES.join(", "))]
    UnknownDictionary { name: String },
}

/// Anything that can find markers in an RGB raster.
pub trait MarkerDetectorService {
    fn detect(&self, image: &RasterImage) -> Result<Detections, DetectorError>;
}

impl<T: MarkerDetectorService + ?Sized> MarkerDetectorService for &T {
    fn detect(&self, image: &RasterImage) -> Result<Detections, DetectorError> {
        (**self).detect(image)
    }
}

/// [`MarkerDetectorService`] backed by the built-in ArUco detector.
#[derive(Clone, Debug)]
pub struct ArucoMarkerDetector {
    inner: ArucoDetector,
}

impl ArucoMarkerDetector {
    pub fn new(dictionary: Dictionary, params: ArucoDetectorParams) -> Self {
        Self {
            inner: ArucoDetector::new(dictionary, params),
        }
    }

    /// Build a detector for a built-in dictionary name such as `DICT_4X4_50`.
    pub fn from_name(name: &str, params: ArucoDetectorParams) -> Result<Self, DetectorError> {
        let dictionary = builtin_dictionary(name).ok_or_else(|| DetectorError::UnknownDictionary {
            name: name.to_string(),
        })?;
        Ok(Self::new(dictionary, params))
    }

    pub fn detector(&self) -> &ArucoDetector {
        &self.inner
    }
}

impl MarkerDetectorService for ArucoMarkerDetector {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width(), height = image.height()))
    )]
    fn detect(&self, image: &RasterImage) -> Result<Detections, DetectorError> {
        let gray = image.to_gray();
        let out = self.inner.detect(&gray.view())?;
        Ok(Detections {
            markers: out
                .markers
                .into_iter()
                .map(|m| Marker {
                    id: m.id,
                    corners: m.corners,
                })
                .collect(),
            rejected: out.rejected,
        })
    }
}

//! Projection and detection over tiles and image files.

use std::fmt;
use std::path::{Path, PathBuf};

use nalgebra::Point2;
use pcaruco_core::{
    extract_tile, project, PointCloud, ProjectError, ProjectionParams, RasterImage, TileMask,
};
use serde::{Deserialize, Serialize};

use crate::detect::{Detections, MarkerDetectorService};
use crate::error::PipelineError;
use crate::source::{PlySource, PointCloudSource};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raster size for point-cloud projections.
    pub projection: ProjectionParams,
    /// Tiles to process, in order.
    pub tiles: Vec<TileMask>,
    /// Search window (pixels) when lifting marker corners back to 3D.
    pub lift_radius: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionParams::default(),
            tiles: TileMask::DEFAULT_SET.to_vec(),
            lift_radius: 3,
        }
    }
}

/// Where a frame came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameSource {
    Tile { tile: TileMask },
    Image { path: PathBuf },
}

impl fmt::Display for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tile { tile } => write!(f, "tile {tile}"),
            Self::Image { path } => write!(f, "image {}", path.display()),
        }
    }
}

/// One identified marker, optionally with the 3D points under its corners.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkerReport {
    pub id: u32,
    pub corners: [Point2<f32>; 4],
    /// Point-cloud position nearest to each corner, for projected frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corners_world: Option<[Option<[f32; 3]>; 4]>,
}

/// Everything found in one raster.
#[derive(Clone, Debug, Serialize)]
pub struct FrameReport {
    pub source: FrameSource,
    pub width: usize,
    pub height: usize,
    /// Number of points projected; 0 for image inputs.
    pub points: usize,
    pub markers: Vec<MarkerReport>,
    pub rejected: Vec<[Point2<f32>; 4]>,
    /// The raster the detector saw.
    #[serde(skip)]
    pub image: RasterImage,
}

impl FrameReport {
    pub fn ids(&self) -> Vec<u32> {
        self.markers.iter().map(|m| m.id).collect()
    }
}

/// Result for one tile of a point cloud.
#[derive(Debug)]
pub struct TileOutcome {
    pub tile: TileMask,
    pub result: Result<FrameReport, PipelineError>,
}

/// Result for one readable input file.
#[derive(Debug)]
pub enum InputOutcome {
    PointCloud(Vec<TileOutcome>),
    Image(FrameReport),
}

impl InputOutcome {
    /// Frames that were produced successfully.
    pub fn frames(&self) -> Vec<&FrameReport> {
        match self {
            Self::Image(frame) => vec![frame],
            Self::PointCloud(tiles) => tiles.iter().filter_map(|t| t.result.as_ref().ok()).collect(),
        }
    }
}

/// Projector and detector wired together.
#[derive(Clone, Debug)]
pub struct Pipeline<D, S = PlySource> {
    config: PipelineConfig,
    detector: D,
    source: S,
}

impl<D: MarkerDetectorService> Pipeline<D, PlySource> {
    pub fn new(config: PipelineConfig, detector: D) -> Self {
        Self::with_source(config, detector, PlySource::default())
    }
}

impl<D, S> Pipeline<D, S>
where
    D: MarkerDetectorService,
    S: PointCloudSource,
{
    pub fn with_source(config: PipelineConfig, detector: D, source: S) -> Self {
        Self {
            config,
            detector,
            source,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Project and detect every configured tile. A failing tile does not stop
    /// the remaining ones.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, cloud), fields(points = cloud.len()))
    )]
    pub fn run_on_pointcloud(&self, cloud: &PointCloud) -> Vec<TileOutcome> {
        self.config
            .tiles
            .iter()
            .map(|&tile| {
                let result = self.run_tile(cloud, tile);
                match &result {
                    Ok(frame) => log::info!(
                        "tile {tile}: {} markers {:?}, {} rejected",
                        frame.markers.len(),
                        frame.ids(),
                        frame.rejected.len()
                    ),
                    Err(PipelineError::EmptyTile { .. }) => log::debug!("tile {tile}: no points"),
                    Err(e) => log::warn!("tile {tile}: {e}"),
                }
                TileOutcome { tile, result }
            })
            .collect()
    }

    /// Extract, project and detect a single tile.
    pub fn run_tile(&self, cloud: &PointCloud, tile: TileMask) -> Result<FrameReport, PipelineError> {
        let sub = extract_tile(cloud, tile);
        let params = self.config.projection;
        let projection = project(sub.points(), params.width, params.height).map_err(|e| match e {
            ProjectError::EmptyPointSet => PipelineError::EmptyTile { tile },
            other => PipelineError::Projection(other),
        })?;

        let detections = self.detector.detect(&projection.image)?;
        let radius = self.config.lift_radius;
        let lift = |c: &Point2<f32>| {
            projection
                .lookup
                .nearest(c.x, c.y, radius)
                .map(|idx| sub.points()[idx].position())
        };
        let markers = detections
            .markers
            .into_iter()
            .map(|m| MarkerReport {
                id: m.id,
                corners_world: Some(std::array::from_fn(|i| lift(&m.corners[i]))),
                corners: m.corners,
            })
            .collect();

        Ok(FrameReport {
            source: FrameSource::Tile { tile },
            width: params.width,
            height: params.height,
            points: sub.len(),
            markers,
            rejected: detections.rejected,
            image: projection.image,
        })
    }

    /// Detect markers directly in an image file, without projection.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub fn run_on_image(&self, path: &Path) -> Result<FrameReport, PipelineError> {
        let rgb = image::open(path)
            .map_err(|e| PipelineError::unreadable(path, e))?
            .to_rgb8();
        let (w, h) = (rgb.width() as usize, rgb.height() as usize);
        let raster = RasterImage::from_raw(w, h, rgb.into_raw()).ok_or_else(|| {
            PipelineError::unreadable(
                path,
                image::ImageError::Parameter(image::error::ParameterError::from_kind(
                    image::error::ParameterErrorKind::DimensionMismatch,
                )),
            )
        })?;
        let frame = self.run_on_raster(
            raster,
            FrameSource::Image {
                path: path.to_path_buf(),
            },
        )?;
        log::info!(
            "{}: {} markers {:?}, {} rejected",
            path.display(),
            frame.markers.len(),
            frame.ids(),
            frame.rejected.len()
        );
        Ok(frame)
    }

    /// Detect markers in an in-memory raster.
    pub fn run_on_raster(
        &self,
        image: RasterImage,
        source: FrameSource,
    ) -> Result<FrameReport, PipelineError> {
        let Detections { markers, rejected } = self.detector.detect(&image)?;
        Ok(FrameReport {
            source,
            width: image.width(),
            height: image.height(),
            points: 0,
            markers: markers
                .into_iter()
                .map(|m| MarkerReport {
                    id: m.id,
                    corners: m.corners,
                    corners_world: None,
                })
                .collect(),
            rejected,
            image,
        })
    }

    /// `.ply` files go through the point-cloud path; anything else is read as
    /// an image.
    pub fn run_on_path(&self, path: &Path) -> Result<InputOutcome, PipelineError> {
        let is_ply = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("ply"));
        if is_ply {
            let cloud = self
                .source
                .read(path)
                .map_err(|e| PipelineError::unreadable(path, e))?;
            Ok(InputOutcome::PointCloud(self.run_on_pointcloud(&cloud)))
        } else {
            self.run_on_image(path).map(InputOutcome::Image)
        }
    }
}

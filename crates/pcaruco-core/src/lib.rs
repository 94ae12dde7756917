//! Core types and utilities for finding markers in projected point clouds.
//!
//! This crate owns the data model (points, tiled point clouds, rasters) and
//! the two pure stages of the pipeline:
//! - tile extraction: split a multi-sensor cloud by its per-point tile bitmask,
//! - projection: drop `z` and rasterize the cloud onto a fixed-size RGB image.
//!
//! It does *not* read files or detect markers; see `pcaruco-aruco` and the
//! `pcaruco` facade for that.

mod homography;
mod image;
mod logger;
mod point;
mod projection;
mod tile;

pub use homography::{homography_from_4pt, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, RasterImage, Rgb};
pub use point::{Point, PointCloud, PointCloudError, TileMask, TileMaskError};
pub use projection::{
    project, AxisScale, Extent, PointLookup, ProjectError, Projection, ProjectionParams,
    BACKGROUND_COLOR, FRAME_COLOR, FRAME_MARGIN,
};
pub use tile::{extract_tile, split_tiles};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};

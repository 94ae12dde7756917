//! Find ArUco markers in top-down projections of tiled point clouds.
//!
//! A multi-camera capture is flattened per camera tile onto a fixed-size RGB
//! raster (dropping `z`), and the raster is searched for square fiducial
//! markers. Plain image files can be searched directly.
//!
//! ## Quickstart
//!
//! ```no_run
//! use pcaruco::{ArucoMarkerDetector, Pipeline, PipelineConfig};
//! use pcaruco::aruco::ArucoDetectorParams;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = ArucoMarkerDetector::from_name("DICT_4X4_50", ArucoDetectorParams::default())?;
//! let pipeline = Pipeline::new(PipelineConfig::default(), detector);
//! let outcome = pipeline.run_on_path(std::path::Path::new("capture.ply"))?;
//! for frame in outcome.frames() {
//!     println!("{}: ids {:?}", frame.source, frame.ids());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `pcaruco::core`: points, tile masks, rasters, projection.
//! - `pcaruco::aruco`: dictionaries and the ArUco detector.
//! - [`source`]: PLY point-cloud input.
//! - [`detect`]: the detector service trait and its ArUco adapter.
//! - [`pipeline`]: tile/image processing.
//! - [`report`], [`draw`], [`display`]: output.

pub use pcaruco_aruco as aruco;
pub use pcaruco_core as core;

pub mod detect;
pub mod display;
pub mod draw;
mod error;
pub mod pipeline;
pub mod report;
pub mod source;

pub use detect::{ArucoMarkerDetector, Detections, DetectorError, Marker, MarkerDetectorService};
pub use display::{show_frame, wait_for_dismiss, KeySource, PngViewer, StdinKeys, Viewer, EXIT_KEY};
pub use draw::{annotate, DrawStyle};
pub use error::{DisplayError, InputError, PipelineError, SourceError};
pub use pipeline::{
    FrameReport, FrameSource, InputOutcome, MarkerReport, Pipeline, PipelineConfig, TileOutcome,
};
pub use report::{report_outcome, ConsoleReporter, JsonReporter, Reporter};
pub use source::{read_ply, PlySource, PointCloudSource};

//! ArUco marker dictionaries and a self-contained square-marker detector.
//!
//! This crate covers:
//! - embedded built-in dictionaries (compiled into the binary),
//! - matching observed marker codes against those dictionaries,
//! - finding marker quads in a grayscale image and decoding them,
//! - rendering markers for printing and for tests.
//!
//! Detection is purely geometric: binarize, take dark blobs that do not touch
//! the image border, fit a quad to each convex hull, then sample the cells
//! through a homography.

pub mod builtins;
mod decode;
mod detector;
mod dictionary;
mod matcher;
mod quad;
mod render;
mod threshold;

pub use detector::{
    ArucoDetections, ArucoDetector, ArucoDetectorParams, DetectError, MarkerDetection,
};
pub use dictionary::Dictionary;
pub use matcher::{rotate_code_cw, Match, Matcher};
pub use render::render_marker;

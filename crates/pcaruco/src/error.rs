use std::path::PathBuf;

use pcaruco_core::{ProjectError, TileMask};

use crate::detect::DetectorError;

/// Errors from reading a point-cloud file.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed PLY header: {0}")]
    Header(String),
    #[error("unsupported PLY format `{0}`")]
    UnsupportedFormat(String),
    #[error("malformed PLY data in element `{element}` record {record}: {reason}")]
    Data {
        element: String,
        record: usize,
        reason: String,
    },
}

/// Why an input file could not be loaded.
#[derive(thiserror::Error, Debug)]
pub enum InputError {
    #[error(transparent)]
    PointCloud(#[from] SourceError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Errors from presenting a frame and waiting for the user.
#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    #[error("display I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot encode frame: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors produced while processing one input or one tile.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("cannot read {}: {source}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: InputError,
    },
    #[error("no data for tile {tile}")]
    EmptyTile { tile: TileMask },
    #[error(transparent)]
    Projection(ProjectError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

impl PipelineError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: impl Into<InputError>) -> Self {
        Self::UnreadableInput {
            path: path.into(),
            source: source.into(),
        }
    }
}

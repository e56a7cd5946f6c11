//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for stack tracking.
#[derive(Debug, Error)]
pub enum CellTrackError {
    /// An input artifact does not follow the naming or content convention.
    #[error("invalid input {path}: {reason}")]
    InputFormat { path: PathBuf, reason: String },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A frame of the composed video could not be produced.
    #[error("frame {index} could not be decoded: {reason}")]
    FrameDecode { index: usize, reason: String },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CellTrackError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InputFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by per-frame cell geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("cell {cell} outline has {points} points, at least 4 are required")]
    DegenerateOutline { cell: usize, points: usize },

    #[error("region of interest queried before it was set")]
    RegionUnset,

    #[error("region of interest can only be set once")]
    RegionAlreadySet,

    #[error("region corners ({x1}, {y1}) and ({x2}, {y2}) do not span a rectangle")]
    InvalidRegion { x1: i32, y1: i32, x2: i32, y2: i32 },
}

/// Convenience type alias for results using [`CellTrackError`].
pub type Result<T> = std::result::Result<T, CellTrackError>;

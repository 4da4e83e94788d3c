//! Error types for annotation operations.

use thiserror::Error;

use crate::codec::Label;
use crate::config::ConfigError;

/// Errors that can occur while editing, importing or exporting annotations.
#[derive(Error, Debug)]
pub enum AnnotatorError {
    /// Malformed call arguments (e.g. offsets and labels of different length)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem
        message: String,
    },

    /// Label does not fit in 24 bits
    #[error("Label {label} is outside [0, 16777215]")]
    OutOfRange {
        /// The rejected label
        label: Label,
    },

    /// Segment map references a segment id the index has no slot for
    #[error("Segment id {id} is outside [0, {num_segments})")]
    InvalidSegmentId {
        /// The offending id
        id: u32,
        /// Number of segments announced by the segmentation
        num_segments: usize,
        /// Pixel offset where the id was found, when it came from a map
        offset: Option<usize>,
    },

    /// Pixel offset beyond the raster
    #[error("Pixel offset {offset} is outside raster of {len} cells")]
    OffsetOutOfBounds {
        /// The offending offset
        offset: usize,
        /// Number of cells in the raster
        len: usize,
    },

    /// Raster dimensions disagree with the annotation raster
    #[error("Dimension mismatch: expected {}x{}, found {}x{}", expected.0, expected.1, found.0, found.1)]
    DimensionMismatch {
        /// Expected (width, height)
        expected: (u32, u32),
        /// Found (width, height)
        found: (u32, u32),
    },

    /// Majority filter collaborator failed
    #[error("Filter error: {0}")]
    Filter(String),

    /// Segmentation collaborator failed
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error while reading or writing annotation files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl AnnotatorError {
    /// Create an invalid argument error with a message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: (u32, u32), found: (u32, u32)) -> Self {
        Self::DimensionMismatch { expected, found }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnnotatorError>;

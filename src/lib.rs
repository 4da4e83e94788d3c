//! Segment Annotator - superpixel label painting with exact undo/redo
//!
//! The core keeps an integer label per pixel, packed into the colour bytes of
//! an RGBA raster so exported annotation images carry the labels bit-exactly.
//! Edits are grouped by precomputed superpixels, stored as minimal diffs, and
//! replayed through a bounded undo/redo log.

pub mod annotator;
pub mod codec;
pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod highlight;
pub mod history;
pub mod io;
pub mod overlay;
pub mod segment;
pub mod store;

pub use annotator::{Annotator, AnnotatorEvent, PointerButton};
pub use codec::{Label, MAX_LABEL};
pub use config::{AnnotatorConfig, ConfigError, LogLevel};
pub use diff::DiffRecord;
pub use error::{AnnotatorError, Result};
pub use filter::{MajorityFilter, ModeFilter};
pub use history::HistoryLog;
pub use io::ImportEncoding;
pub use segment::{GridSegmentation, SegmentIndex, SegmentMap, Segmentation, SegmentationResult};
pub use store::{AnnotationStore, Labels};

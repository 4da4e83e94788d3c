//! The label raster and its single writer.
//!
//! [`AnnotationStore`] owns the packed label raster. Every edit goes through
//! [`AnnotationStore::apply_bulk_label`], which diffs against the current
//! labels and only writes cells that actually change. Recording the returned
//! diff in a [`HistoryLog`](crate::history::HistoryLog) is left to the caller.

use std::collections::BTreeSet;

use image::RgbaImage;
use ndarray::Array2;
use web_time::Instant;

use crate::codec::{self, CELL_BYTES, Label};
use crate::diff::{DiffRecord, compute_diff};
use crate::error::{AnnotatorError, Result};
use crate::filter::MajorityFilter;
use crate::history::sealed::WriteLabels;

/// Target labels for a bulk edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Labels<'a> {
    /// The same label for every offset.
    Broadcast(Label),
    /// One label per offset.
    PerPixel(&'a [Label]),
}

/// Storage for the label raster of a single image.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    /// Labels packed into RGB, alpha owned by presentation.
    raster: RgbaImage,
    /// Label used by fill and segment painting.
    current_label: Label,
}

impl AnnotationStore {
    /// Create a raster with every cell set to `default_label`.
    pub fn new(width: u32, height: u32, default_label: Label) -> Result<Self> {
        let [b0, b1, b2] = codec::encode(default_label)?;
        Ok(Self {
            raster: RgbaImage::from_pixel(width, height, image::Rgba([b0, b1, b2, 0])),
            current_label: default_label,
        })
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.raster.as_raw().len() / CELL_BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only view of the packed raster.
    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Label at a pixel offset.
    pub fn label_at(&self, offset: usize) -> Result<Label> {
        self.check_offset(offset)?;
        Ok(self.label_unchecked(offset))
    }

    #[inline]
    fn label_unchecked(&self, offset: usize) -> Label {
        let start = offset * CELL_BYTES;
        codec::read_cell(&self.raster.as_raw()[start..start + CELL_BYTES])
    }

    fn check_offset(&self, offset: usize) -> Result<()> {
        let len = self.len();
        if offset >= len {
            return Err(AnnotatorError::OffsetOutOfBounds { offset, len });
        }
        Ok(())
    }

    /// The label painted by fill and segment clicks.
    pub fn current_label(&self) -> Label {
        self.current_label
    }

    /// Set the paint label.
    pub fn set_current_label(&mut self, label: Label) -> Result<()> {
        codec::check_label(label)?;
        self.current_label = label;
        Ok(())
    }

    /// Set `offsets` to `labels`, returning the cells that changed.
    ///
    /// Validation happens before any write: on error the raster is untouched.
    /// An empty diff leaves the raster untouched as well.
    pub fn apply_bulk_label(
        &mut self,
        offsets: &[usize],
        labels: Labels<'_>,
    ) -> Result<DiffRecord> {
        let broadcast;
        let targets: &[Label] = match labels {
            Labels::Broadcast(label) => {
                broadcast = vec![label; offsets.len()];
                &broadcast
            }
            Labels::PerPixel(labels) => {
                if labels.len() != offsets.len() {
                    log::warn!(
                        "Rejected bulk label: {} offsets, {} labels",
                        offsets.len(),
                        labels.len()
                    );
                    return Err(AnnotatorError::invalid_argument(format!(
                        "{} offsets but {} labels",
                        offsets.len(),
                        labels.len()
                    )));
                }
                labels
            }
        };

        for &offset in offsets {
            self.check_offset(offset)?;
        }
        for &label in targets {
            codec::check_label(label)?;
        }

        let record = compute_diff(|o| self.label_unchecked(o), offsets, targets)?;
        if !record.is_empty() {
            self.write_labels(&record.pixels, &record.next);
        }
        Ok(record)
    }

    /// Replace every cell with `raster`, used by import.
    pub fn replace_raster(&mut self, raster: RgbaImage) -> Result<()> {
        if raster.dimensions() != self.dimensions() {
            return Err(AnnotatorError::dimension_mismatch(
                self.dimensions(),
                raster.dimensions(),
            ));
        }
        self.raster = raster;
        Ok(())
    }

    /// Offsets whose label equals `target`, or every offset when `target` is `None`.
    pub fn offsets_matching(&self, target: Option<Label>) -> Vec<usize> {
        match target {
            None => (0..self.len()).collect(),
            Some(target) => self
                .raster
                .as_raw()
                .chunks_exact(CELL_BYTES)
                .enumerate()
                .filter(|(_, cell)| codec::read_cell(cell) == target)
                .map(|(offset, _)| offset)
                .collect(),
        }
    }

    /// Paint `current_label` over every cell carrying `target` (or every cell).
    pub fn fill(&mut self, target: Option<Label>) -> Result<DiffRecord> {
        let offsets = self.offsets_matching(target);
        if offsets.is_empty() {
            return Ok(DiffRecord::new());
        }
        self.apply_bulk_label(&offsets, Labels::Broadcast(self.current_label))
    }

    /// Smooth the raster with `filter`, as one bulk edit over every cell.
    pub fn denoise(&mut self, filter: &dyn MajorityFilter) -> Result<DiffRecord> {
        let start = Instant::now();
        let decoded = self.to_array()?;
        let filtered = filter.filter(&decoded)?;
        if filtered.dim() != decoded.dim() {
            let (h, w) = filtered.dim();
            return Err(AnnotatorError::dimension_mismatch(
                self.dimensions(),
                (w as u32, h as u32),
            ));
        }

        let offsets: Vec<usize> = (0..self.len()).collect();
        // Row-major iteration matches offset order.
        let targets: Vec<Label> = filtered.iter().copied().collect();
        let record = self.apply_bulk_label(&offsets, Labels::PerPixel(&targets))?;
        log::debug!(
            "Denoise changed {} pixel(s) in {:?}",
            record.len(),
            start.elapsed()
        );
        Ok(record)
    }

    /// Distinct labels in ascending order.
    pub fn unique_labels(&self) -> Vec<Label> {
        self.raster
            .as_raw()
            .chunks_exact(CELL_BYTES)
            .map(codec::read_cell)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// All labels in offset order.
    pub fn labels(&self) -> Vec<Label> {
        self.raster
            .as_raw()
            .chunks_exact(CELL_BYTES)
            .map(codec::read_cell)
            .collect()
    }

    /// Decoded labels as a `height x width` array.
    pub fn to_array(&self) -> Result<Array2<Label>> {
        let shape = (self.height() as usize, self.width() as usize);
        Array2::from_shape_vec(shape, self.labels())
            .map_err(|e| AnnotatorError::invalid_argument(format!("label array: {}", e)))
    }
}

impl WriteLabels for AnnotationStore {
    fn write_labels(&mut self, pixels: &[usize], labels: &[Label]) {
        let data: &mut [u8] = &mut self.raster;
        for (&offset, &label) in pixels.iter().zip(labels) {
            let start = offset * CELL_BYTES;
            codec::write_cell(&mut data[start..start + CELL_BYTES], label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryLog;

    #[test]
    fn test_new_store_default_label() {
        let store = AnnotationStore::new(3, 2, 7).unwrap();
        assert_eq!(store.len(), 6);
        assert_eq!(store.labels(), vec![7; 6]);
        assert_eq!(store.current_label(), 7);
        assert!(AnnotationStore::new(1, 1, codec::MAX_LABEL + 1).is_err());
    }

    #[test]
    fn test_two_by_two_scenario() {
        let mut store = AnnotationStore::new(2, 2, 0).unwrap();
        store.set_current_label(5).unwrap();
        let mut history = HistoryLog::new();

        let record = store.apply_bulk_label(&[0, 3], Labels::PerPixel(&[5, 5])).unwrap();
        assert_eq!(record.pixels, vec![0, 3]);
        assert_eq!(record.prev, vec![0, 0]);
        assert_eq!(record.next, vec![5, 5]);
        history.push(record);
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(store.labels(), vec![5, 0, 0, 5]);

        assert!(history.undo(&mut store));
        assert_eq!(store.labels(), vec![0, 0, 0, 0]);
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn test_apply_undo_redo_exact() {
        let mut store = AnnotationStore::new(4, 4, 1).unwrap();
        store.apply_bulk_label(&[0, 5, 10], Labels::Broadcast(3)).unwrap();
        let before = store.labels();

        let offsets = [0, 1, 2, 5, 15];
        let labels = [3, 9, 1, 4, 0x12_34_56];
        let mut history = HistoryLog::new();
        history.push(store.apply_bulk_label(&offsets, Labels::PerPixel(&labels)).unwrap());
        let after = store.labels();

        history.undo(&mut store);
        assert_eq!(store.labels(), before);
        // Replayed cells count as committed writes and become opaque.
        for offset in [1, 5, 15] {
            assert_eq!(store.raster().as_raw()[offset * CELL_BYTES + 3], codec::OPAQUE);
        }
        // Offset 2 already held label 1, so it was never written.
        assert_eq!(store.raster().as_raw()[2 * CELL_BYTES + 3], 0);

        history.redo(&mut store);
        assert_eq!(store.labels(), after);
    }

    #[test]
    fn test_noop_apply_leaves_raster() {
        let mut store = AnnotationStore::new(2, 1, 4).unwrap();
        let before = store.raster().clone();
        let record = store.apply_bulk_label(&[0, 1], Labels::Broadcast(4)).unwrap();
        assert!(record.is_empty());
        // Alpha stays untouched too.
        assert_eq!(store.raster().as_raw(), before.as_raw());
    }

    #[test]
    fn test_apply_validation() {
        let mut store = AnnotationStore::new(2, 2, 0).unwrap();
        assert!(matches!(
            store.apply_bulk_label(&[0, 1], Labels::PerPixel(&[1])),
            Err(AnnotatorError::InvalidArgument { .. })
        ));
        assert!(matches!(
            store.apply_bulk_label(&[0, 4], Labels::Broadcast(1)),
            Err(AnnotatorError::OffsetOutOfBounds { offset: 4, len: 4 })
        ));
        assert!(matches!(
            store.apply_bulk_label(&[0], Labels::Broadcast(codec::MAX_LABEL + 1)),
            Err(AnnotatorError::OutOfRange { .. })
        ));
        // Nothing was written by the failed calls.
        assert_eq!(store.labels(), vec![0; 4]);
    }

    #[test]
    fn test_fill_and_unique_labels() {
        let mut store = AnnotationStore::new(3, 1, 0).unwrap();
        store.apply_bulk_label(&[1, 2], Labels::PerPixel(&[2, 3])).unwrap();
        assert_eq!(store.unique_labels(), vec![0, 2, 3]);

        store.set_current_label(8).unwrap();
        let record = store.fill(Some(2)).unwrap();
        assert_eq!(record.pixels, vec![1]);
        let unique = store.unique_labels();
        assert!(!unique.contains(&2));
        assert!(unique.contains(&8));

        let record = store.fill(Some(42)).unwrap();
        assert!(record.is_empty());

        store.fill(None).unwrap();
        assert_eq!(store.unique_labels(), vec![8]);
    }

    #[test]
    fn test_label_at_bounds() {
        let store = AnnotationStore::new(2, 2, 3).unwrap();
        assert_eq!(store.label_at(3).unwrap(), 3);
        assert!(store.label_at(4).is_err());
    }

    #[test]
    fn test_replace_raster_dimension_check() {
        let mut store = AnnotationStore::new(2, 2, 0).unwrap();
        assert!(matches!(
            store.replace_raster(RgbaImage::new(3, 2)),
            Err(AnnotatorError::DimensionMismatch { .. })
        ));
        let mut raster = RgbaImage::new(2, 2);
        raster.put_pixel(1, 1, image::Rgba([1, 1, 0, 0]));
        store.replace_raster(raster).unwrap();
        assert_eq!(store.labels(), vec![0, 0, 0, 257]);
    }

    #[test]
    fn test_to_array_layout() {
        let mut store = AnnotationStore::new(3, 2, 0).unwrap();
        store.apply_bulk_label(&[2, 3], Labels::PerPixel(&[1, 2])).unwrap();
        let array = store.to_array().unwrap();
        assert_eq!(array.dim(), (2, 3));
        assert_eq!(array[[0, 2]], 1);
        assert_eq!(array[[1, 0]], 2);
    }
}

//! Differential label updates.
//!
//! A [`DiffRecord`] holds only the cells whose label actually changes, so a
//! history entry stays proportional to the real edit no matter how many
//! already-correct pixels a gesture sweeps over.

use crate::codec::Label;
use crate::error::{AnnotatorError, Result};

/// One accepted edit as parallel offset/previous/next sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffRecord {
    /// Changed pixel offsets, in edit order.
    pub pixels: Vec<usize>,
    /// Labels before the edit.
    pub prev: Vec<Label>,
    /// Labels after the edit.
    pub next: Vec<Label>,
}

impl DiffRecord {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            pixels: Vec::with_capacity(capacity),
            prev: Vec::with_capacity(capacity),
            next: Vec::with_capacity(capacity),
        }
    }

    /// Number of changed cells.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    fn push(&mut self, offset: usize, prev: Label, next: Label) {
        self.pixels.push(offset);
        self.prev.push(prev);
        self.next.push(next);
    }
}

/// Compare each target against the current label and keep only real changes.
///
/// `current` reads the label at an offset. Offsets and targets are paired by
/// position; surviving entries keep their input order. Sequences of different
/// length are rejected with `InvalidArgument`.
pub fn compute_diff<F>(current: F, offsets: &[usize], targets: &[Label]) -> Result<DiffRecord>
where
    F: Fn(usize) -> Label,
{
    if offsets.len() != targets.len() {
        return Err(AnnotatorError::invalid_argument(format!(
            "Invalid labels: {} offsets but {} targets",
            offsets.len(),
            targets.len()
        )));
    }
    let mut record = DiffRecord::with_capacity(offsets.len().min(1024));

    for (&offset, &target) in offsets.iter().zip(targets) {
        let label = current(offset);
        if label != target {
            record.push(offset, label, target);
        }
    }

    log::trace!(
        "Diff: {} of {} cells change",
        record.len(),
        offsets.len()
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_drops_unchanged() {
        let raster = [0, 1, 2, 3];
        let record = compute_diff(|o| raster[o], &[3, 1, 0, 2], &[3, 9, 7, 2]).unwrap();
        assert_eq!(record.pixels, vec![1, 0]);
        assert_eq!(record.prev, vec![1, 0]);
        assert_eq!(record.next, vec![9, 7]);
    }

    #[test]
    fn test_diff_empty_when_nothing_changes() {
        let raster = [5, 5, 6];
        let record = compute_diff(|o| raster[o], &[0, 1, 2], &[5, 5, 6]).unwrap();
        assert!(record.is_empty());
        assert_eq!(record, DiffRecord::new());
    }

    #[test]
    fn test_diff_empty_input() {
        let record = compute_diff(|_| 0, &[], &[]).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_diff_rejects_length_mismatch() {
        let raster = [0, 0, 0];
        let err = compute_diff(|o| raster[o], &[0, 1, 2], &[7]).unwrap_err();
        assert!(matches!(err, AnnotatorError::InvalidArgument { .. }));
        assert!(compute_diff(|o| raster[o], &[0], &[7, 8]).is_err());
    }
}

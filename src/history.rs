//! Bounded undo/redo log of label diffs.
//!
//! The log is a linear history with a cursor pointing at the record that is
//! currently applied at head. Pushing after an undo discards the redo tail.
//! Once the log holds `capacity` records, each push evicts the oldest record
//! and the cursor stays pinned on the last slot instead of advancing.

use crate::diff::DiffRecord;

/// Default number of records kept in the log.
pub const DEFAULT_CAPACITY: usize = 10;

pub(crate) mod sealed {
    use crate::codec::Label;

    /// Raw label writes, reachable only from inside the crate.
    pub trait WriteLabels {
        /// Set `pixels[i]` to `labels[i]` for every `i`.
        ///
        /// Callers pass offsets and labels that were validated when the diff
        /// was recorded.
        fn write_labels(&mut self, pixels: &[usize], labels: &[Label]);
    }
}

/// Destination for replayed label writes.
///
/// Implemented by whatever owns the label raster, so the log never holds a
/// mutable reference to it between calls. The trait is sealed: outside code
/// can pass an [`AnnotationStore`](crate::store::AnnotationStore) to
/// [`HistoryLog::undo`] but cannot write labels through it directly.
///
/// ```compile_fail
/// use segment_annotator::AnnotationStore;
/// use segment_annotator::history::LabelSink;
///
/// let mut store = AnnotationStore::new(1, 1, 0).unwrap();
/// store.write_labels(&[0], &[0x0100_0005]);
/// ```
pub trait LabelSink: sealed::WriteLabels {}

impl<T: sealed::WriteLabels + ?Sized> LabelSink for T {}

/// The undo/redo history.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    /// Records in insertion order (oldest first)
    records: Vec<DiffRecord>,
    /// Index of the record applied at head; `None` when fully undone
    cursor: Option<usize>,
    /// Maximum number of records kept
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl HistoryLog {
    /// Create an empty log with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty log holding at most `capacity` records (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity.max(1)),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    /// Record an applied edit, discarding anything after the cursor.
    pub fn push(&mut self, record: DiffRecord) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        if keep < self.records.len() {
            log::debug!(
                "History: discarding {} redo record(s)",
                self.records.len() - keep
            );
            self.records.truncate(keep);
        }

        log::debug!("History: pushed diff of {} pixel(s)", record.len());
        self.records.push(record);

        if self.records.len() > self.capacity {
            // Saturated: evict the oldest, cursor stays on the last slot.
            self.records.remove(0);
        } else {
            self.cursor = Some(keep);
        }
    }

    /// Revert the record at the cursor.
    ///
    /// Returns `true` when the log is now fully undone. Returns `false` without
    /// touching `sink` when there is nothing to undo.
    pub fn undo<S: LabelSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };

        let record = &self.records[cursor];
        sink.write_labels(&record.pixels, &record.prev);
        self.cursor = cursor.checked_sub(1);
        log::debug!("History: undid record {} ({} pixel(s))", cursor, record.len());

        self.cursor.is_none()
    }

    /// Re-apply the record after the cursor.
    ///
    /// Returns `true` when the cursor now sits on the last record. Returns
    /// `false` without touching `sink` when there is nothing to redo.
    pub fn redo<S: LabelSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.records.len() {
            return false;
        }

        self.cursor = Some(next);
        let record = &self.records[next];
        sink.write_labels(&record.pixels, &record.next);
        log::debug!("History: redid record {} ({} pixel(s))", next, record.len());

        next == self.records.len() - 1
    }

    /// Drop every record and reset the cursor.
    pub fn clear(&mut self) {
        self.records.clear();
        self.cursor = None;
        log::debug!("History cleared");
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.records.len()
    }

    /// Index of the record applied at head.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored records, oldest first.
    pub fn records(&self) -> &[DiffRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Label;

    /// Plain label vector standing in for the annotation raster.
    struct VecSink(Vec<Label>);

    impl sealed::WriteLabels for VecSink {
        fn write_labels(&mut self, pixels: &[usize], labels: &[Label]) {
            for (&p, &l) in pixels.iter().zip(labels) {
                self.0[p] = l;
            }
        }
    }

    fn record(tag: Label) -> DiffRecord {
        DiffRecord {
            pixels: vec![0],
            prev: vec![tag],
            next: vec![tag + 1],
        }
    }

    #[test]
    fn test_push_advances_cursor() {
        let mut log = HistoryLog::new();
        assert_eq!(log.cursor(), None);
        log.push(record(0));
        log.push(record(1));
        assert_eq!(log.len(), 2);
        assert_eq!(log.cursor(), Some(1));
        assert!(log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_eviction_pins_cursor() {
        let mut log = HistoryLog::with_capacity(3);
        for i in 0..7 {
            log.push(record(i * 10));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.cursor(), Some(2));
        let kept: Vec<Label> = log.records().iter().map(|r| r.prev[0]).collect();
        assert_eq!(kept, vec![40, 50, 60]);
    }

    #[test]
    fn test_undo_redo_signals() {
        let mut sink = VecSink(vec![0]);
        let mut log = HistoryLog::new();

        assert!(!log.undo(&mut sink));
        assert!(!log.redo(&mut sink));

        // Two edits: 0 -> 1 -> 2
        log.push(record(0));
        sink.0[0] = 1;
        log.push(record(1));
        sink.0[0] = 2;

        assert!(!log.undo(&mut sink));
        assert_eq!(sink.0[0], 1);
        assert!(log.undo(&mut sink));
        assert_eq!(sink.0[0], 0);
        assert_eq!(log.cursor(), None);
        assert!(!log.undo(&mut sink));

        assert!(!log.redo(&mut sink));
        assert_eq!(sink.0[0], 1);
        assert!(log.redo(&mut sink));
        assert_eq!(sink.0[0], 2);
        assert!(!log.redo(&mut sink));
        assert_eq!(log.cursor(), Some(1));
    }

    #[test]
    fn test_push_after_undo_truncates() {
        let mut sink = VecSink(vec![0]);
        let mut log = HistoryLog::new();
        log.push(record(0));
        log.push(record(1));
        log.push(record(2));

        log.undo(&mut sink);
        log.undo(&mut sink);
        assert!(log.can_redo());

        log.push(record(7));
        assert_eq!(log.len(), 2);
        assert_eq!(log.cursor(), Some(1));
        assert!(!log.can_redo());
        assert!(!log.redo(&mut sink));
    }

    #[test]
    fn test_push_after_full_undo_replaces_everything() {
        let mut sink = VecSink(vec![0]);
        let mut log = HistoryLog::with_capacity(2);
        log.push(record(0));
        log.push(record(1));
        log.push(record(2));
        while log.can_undo() {
            log.undo(&mut sink);
        }
        log.push(record(9));
        assert_eq!(log.len(), 1);
        assert_eq!(log.cursor(), Some(0));
    }

    #[test]
    fn test_saturated_undo_depth() {
        let mut sink = VecSink(vec![0]);
        let mut log = HistoryLog::with_capacity(2);
        for i in 0..4 {
            log.push(record(i));
        }
        assert!(!log.undo(&mut sink));
        assert!(log.undo(&mut sink));
        assert!(!log.undo(&mut sink));
    }

    #[test]
    fn test_clear() {
        let mut log = HistoryLog::new();
        log.push(record(0));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.cursor(), None);
        assert!(!log.can_undo());
    }
}

//! Superpixel annotator.
//!
//! [`Annotator`] ties the label store, undo history, segment index and
//! presentation overlay together. All mutation goes through it so that every
//! accepted edit is recorded once, recoloured once, and announced once.
//!
//! ```rust,ignore
//! use segment_annotator::{Annotator, AnnotatorConfig, GridSegmentation};
//!
//! let mut annotator = Annotator::new(640, 480, AnnotatorConfig::default(),
//!     GridSegmentation::new(640, 480, 16))?;
//! annotator.set_current_label(1)?;
//! annotator.paint_segment(annotator.segment_at(1234).unwrap_or(0))?;
//! annotator.undo();
//! ```

use std::path::Path;

use image::RgbaImage;

use crate::codec::Label;
use crate::config::AnnotatorConfig;
use crate::diff::DiffRecord;
use crate::error::{AnnotatorError, Result};
use crate::filter::MajorityFilter;
use crate::highlight::HighlightTracker;
use crate::history::HistoryLog;
use crate::history::sealed::WriteLabels;
use crate::io::{self, ImportEncoding};
use crate::overlay::Overlay;
use crate::segment::{SegmentIndex, SegmentMap, Segmentation};
use crate::store::{AnnotationStore, Labels};

/// Pointer button held during a pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Paints the segment under the pointer
    Primary,
    /// Picks the label under the pointer
    Secondary,
}

/// Notifications sent to the annotator's listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotatorEvent {
    /// The label raster changed (edit, undo, redo, import)
    Changed,
    /// A segment was painted with this label
    LeftClick(Label),
    /// The label under the pointer was picked
    RightClick(Label),
}

type Listener = Box<dyn FnMut(&AnnotatorEvent)>;

/// Writes replayed labels to the store and keeps the visualization in step.
struct Layers<'a> {
    store: &'a mut AnnotationStore,
    overlay: &'a mut Overlay,
}

impl WriteLabels for Layers<'_> {
    fn write_labels(&mut self, pixels: &[usize], labels: &[Label]) {
        self.store.write_labels(pixels, labels);
        self.overlay.paint(pixels, labels);
    }
}

/// Annotation session for one image.
pub struct Annotator {
    config: AnnotatorConfig,
    store: AnnotationStore,
    history: HistoryLog,
    overlay: Overlay,
    highlight: HighlightTracker,
    segmentation: Box<dyn Segmentation>,
    segment_map: SegmentMap,
    segment_index: SegmentIndex,
    listener: Option<Listener>,
}

impl Annotator {
    /// Create an annotator for a `width x height` image.
    ///
    /// The configuration is validated here, and the segmentation's current
    /// result is indexed immediately.
    pub fn new(
        width: u32,
        height: u32,
        config: AnnotatorConfig,
        segmentation: impl Segmentation + 'static,
    ) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(AnnotatorError::invalid_argument(format!(
                "image must not be empty ({}x{})",
                width, height
            )));
        }

        let store = AnnotationStore::new(width, height, config.default_label)?;
        let overlay = Overlay::new(width, height, &config, &store.labels());
        let (segment_map, segment_index, mask) =
            index_segmentation(&segmentation, (width, height))?;

        let mut annotator = Self {
            history: HistoryLog::with_capacity(config.max_history_record),
            config,
            store,
            overlay,
            highlight: HighlightTracker::new(),
            segmentation: Box::new(segmentation),
            segment_map,
            segment_index,
            listener: None,
        };
        annotator.overlay.set_boundary(&mask);

        log::info!(
            "Annotator ready: {}x{}, {} segments",
            width,
            height,
            annotator.segment_index.len()
        );
        Ok(annotator)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn width(&self) -> u32 {
        self.store.width()
    }

    pub fn height(&self) -> u32 {
        self.store.height()
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Read-only view of the label store.
    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn highlight(&self) -> &HighlightTracker {
        &self.highlight
    }

    pub fn segment_map(&self) -> &SegmentMap {
        &self.segment_map
    }

    pub fn segment_index(&self) -> &SegmentIndex {
        &self.segment_index
    }

    /// Segment id under a pixel offset.
    pub fn segment_at(&self, offset: usize) -> Option<u32> {
        self.segment_map.id_at(offset)
    }

    pub fn label_at(&self, offset: usize) -> Result<Label> {
        self.store.label_at(offset)
    }

    pub fn current_label(&self) -> Label {
        self.store.current_label()
    }

    pub fn set_current_label(&mut self, label: Label) -> Result<()> {
        self.store.set_current_label(label)
    }

    /// Register the event listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: impl FnMut(&AnnotatorEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    fn emit(&mut self, event: AnnotatorEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Set `offsets` to `labels` as one undoable step.
    ///
    /// Returns the number of pixels that changed; zero means nothing was
    /// recorded and no event fired.
    pub fn apply_bulk_label(&mut self, offsets: &[usize], labels: Labels<'_>) -> Result<usize> {
        let record = self.store.apply_bulk_label(offsets, labels)?;
        Ok(self.commit(record))
    }

    /// Paint every pixel of `segment` with the current label.
    pub fn paint_segment(&mut self, segment: u32) -> Result<usize> {
        let pixels = self
            .segment_index
            .pixels(segment)
            .ok_or(AnnotatorError::InvalidSegmentId {
                id: segment,
                num_segments: self.segment_index.len(),
                offset: None,
            })?;
        let label = self.store.current_label();
        let record = self.store.apply_bulk_label(pixels, Labels::Broadcast(label))?;
        Ok(self.commit(record))
    }

    /// Paint the current label over every pixel labelled `target`, or over
    /// everything when `target` is `None`.
    pub fn fill(&mut self, target: Option<Label>) -> Result<usize> {
        let record = self.store.fill(target)?;
        Ok(self.commit(record))
    }

    /// Smooth the labels with a majority filter as one undoable step.
    pub fn denoise(&mut self, filter: &dyn MajorityFilter) -> Result<usize> {
        let record = self.store.denoise(filter)?;
        Ok(self.commit(record))
    }

    /// Distinct labels in ascending order.
    pub fn unique_labels(&self) -> Vec<Label> {
        self.store.unique_labels()
    }

    /// Record an applied diff, recolour it and notify.
    fn commit(&mut self, record: DiffRecord) -> usize {
        if record.is_empty() {
            return 0;
        }
        let changed = record.len();
        self.overlay.paint(&record.pixels, &record.next);
        self.history.push(record);
        self.emit(AnnotatorEvent::Changed);
        changed
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Undo the last edit. Returns `true` when nothing is left to undo.
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let mut layers = Layers {
            store: &mut self.store,
            overlay: &mut self.overlay,
        };
        let exhausted = self.history.undo(&mut layers);
        self.emit(AnnotatorEvent::Changed);
        exhausted
    }

    /// Redo the next edit. Returns `true` when nothing is left to redo.
    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let mut layers = Layers {
            store: &mut self.store,
            overlay: &mut self.overlay,
        };
        let exhausted = self.history.redo(&mut layers);
        self.emit(AnnotatorEvent::Changed);
        exhausted
    }

    // ========================================================================
    // Import / Export
    // ========================================================================

    /// Replace the whole label raster and forget the history.
    pub fn import_raster(&mut self, raster: RgbaImage) -> Result<()> {
        self.store.replace_raster(raster)?;
        self.history.clear();
        self.overlay.paint_all(&self.store.labels());
        log::info!(
            "Imported annotation with {} label(s)",
            self.store.unique_labels().len()
        );
        self.emit(AnnotatorEvent::Changed);
        Ok(())
    }

    /// Import an encoded annotation image.
    pub fn import_bytes(&mut self, bytes: &[u8], encoding: ImportEncoding) -> Result<()> {
        let raster = io::load_annotation(bytes, encoding)?;
        self.import_raster(raster)
    }

    /// Import an annotation image file.
    pub fn import_file(&mut self, path: &Path, encoding: ImportEncoding) -> Result<()> {
        let raster = io::open_annotation(path, encoding)?;
        self.import_raster(raster)
    }

    /// Packed label image with opaque alpha.
    pub fn export_image(&self) -> RgbaImage {
        io::export_image(&self.store)
    }

    /// Packed label image encoded as PNG.
    pub fn export_png(&self) -> Result<Vec<u8>> {
        io::export_png(&self.store)
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        io::save_png(&self.store, path)
    }

    // ========================================================================
    // Superpixels
    // ========================================================================

    /// Swap in a new segmentation and rebuild the index from it.
    pub fn reset_superpixels(&mut self, segmentation: impl Segmentation + 'static) -> Result<()> {
        let (map, index, mask) = index_segmentation(&segmentation, self.store.dimensions())?;
        self.segmentation = Box::new(segmentation);
        self.install_segments(map, index, &mask);
        Ok(())
    }

    /// Ask the segmentation for smaller superpixels.
    pub fn finer(&mut self) -> Result<()> {
        self.segmentation.finer()?;
        self.rebuild_segments()
    }

    /// Ask the segmentation for larger superpixels.
    pub fn coarser(&mut self) -> Result<()> {
        self.segmentation.coarser()?;
        self.rebuild_segments()
    }

    fn rebuild_segments(&mut self) -> Result<()> {
        let (map, index, mask) =
            index_segmentation(self.segmentation.as_ref(), self.store.dimensions())?;
        self.install_segments(map, index, &mask);
        Ok(())
    }

    fn install_segments(&mut self, map: SegmentMap, index: SegmentIndex, mask: &[bool]) {
        self.highlight.clear(&mut self.overlay);
        self.segment_map = map;
        self.segment_index = index;
        self.overlay.set_boundary(mask);
        log::info!("Superpixels updated: {} segments", self.segment_index.len());
    }

    // ========================================================================
    // Pointer interaction
    // ========================================================================

    /// Map a pointer position in image pixels to a clamped offset.
    pub fn offset_at(&self, x: f64, y: f64) -> usize {
        let max_x = f64::from(self.width() - 1);
        let max_y = f64::from(self.height() - 1);
        let x = x.round().clamp(0.0, max_x) as usize;
        let y = y.round().clamp(0.0, max_y) as usize;
        y * self.width() as usize + x
    }

    /// Track the pointer over `offset`.
    ///
    /// Highlights the segment under the pointer. With the primary button held
    /// the segment is painted with the current label; with the secondary
    /// button the label under the pointer is reported instead.
    pub fn pointer_move(&mut self, offset: usize, button: Option<PointerButton>) -> Result<()> {
        let segment = self
            .segment_map
            .id_at(offset)
            .ok_or(AnnotatorError::OffsetOutOfBounds {
                offset,
                len: self.segment_map.len(),
            })?;
        self.highlight
            .set_highlight(&mut self.overlay, self.segment_index.pixels(segment));

        match button {
            Some(PointerButton::Primary) => {
                self.paint_segment(segment)?;
                let label = self.store.current_label();
                self.emit(AnnotatorEvent::LeftClick(label));
            }
            Some(PointerButton::Secondary) => {
                let label = self.store.label_at(offset)?;
                self.emit(AnnotatorEvent::RightClick(label));
            }
            None => {}
        }
        Ok(())
    }

    /// The pointer left the image.
    pub fn pointer_leave(&mut self) {
        self.highlight.clear(&mut self.overlay);
    }

    /// Highlight every pixel carrying `label`.
    pub fn highlight_label(&mut self, label: Label) {
        let pixels = self.store.offsets_matching(Some(label));
        self.highlight.set_highlight(&mut self.overlay, Some(pixels.as_slice()));
    }

    pub fn unhighlight_label(&mut self) {
        self.highlight.clear(&mut self.overlay);
    }

    // ========================================================================
    // Visualization alpha
    // ========================================================================

    pub fn set_alpha(&mut self, alpha: i32) {
        self.overlay.set_alpha(alpha);
        self.highlight.reapply(&mut self.overlay);
    }

    pub fn less_alpha(&mut self, scale: i32) {
        self.overlay.less_alpha(scale);
        self.highlight.reapply(&mut self.overlay);
    }

    pub fn more_alpha(&mut self, scale: i32) {
        self.overlay.more_alpha(scale);
        self.highlight.reapply(&mut self.overlay);
    }
}

/// Validate a segmentation result and derive its index and boundary mask.
fn index_segmentation<S: Segmentation + ?Sized>(
    segmentation: &S,
    dimensions: (u32, u32),
) -> Result<(SegmentMap, SegmentIndex, Vec<bool>)> {
    let result = segmentation.result();
    let found = (result.map.width(), result.map.height());
    if found != dimensions {
        log::warn!("Segmentation size {:?} does not match image {:?}", found, dimensions);
        return Err(AnnotatorError::dimension_mismatch(dimensions, found));
    }
    let index = SegmentIndex::build(&result.map, result.num_segments)?;
    let mask = result.map.boundary_mask();
    Ok((result.map.clone(), index, mask))
}

//! Superpixel segment maps and the segment-to-pixel index.
//!
//! The segmentation itself is an external collaborator behind the
//! [`Segmentation`] trait. This module only consumes its output: it validates
//! the segment map, partitions pixel offsets by segment id, and derives the
//! boundary mask used by the overlay.

use web_time::Instant;

use crate::error::{AnnotatorError, Result};

// ============================================================================
// Segment Map
// ============================================================================

/// Immutable raster of segment ids in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMap {
    width: u32,
    height: u32,
    ids: Vec<u32>,
}

impl SegmentMap {
    /// Create a segment map, checking that `ids` covers the full raster.
    pub fn new(width: u32, height: u32, ids: Vec<u32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if ids.len() != expected {
            return Err(AnnotatorError::invalid_argument(format!(
                "segment map has {} cells, expected {}x{} = {}",
                ids.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { width, height, ids })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Segment id at a pixel offset.
    pub fn id_at(&self, offset: usize) -> Option<u32> {
        self.ids.get(offset).copied()
    }

    /// Raw ids in row-major order.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Mark every cell that has a 4-neighbour in a different segment.
    pub fn boundary_mask(&self) -> Vec<bool> {
        let w = self.width as usize;
        let h = self.height as usize;
        let mut mask = vec![false; self.ids.len()];

        for y in 0..h {
            for x in 0..w {
                let offset = y * w + x;
                let id = self.ids[offset];
                // Each differing pair marks both sides, so checking right and down suffices.
                if x + 1 < w && self.ids[offset + 1] != id {
                    mask[offset] = true;
                    mask[offset + 1] = true;
                }
                if y + 1 < h && self.ids[offset + w] != id {
                    mask[offset] = true;
                    mask[offset + w] = true;
                }
            }
        }

        mask
    }
}

/// Output of a segmentation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationResult {
    /// Segment id per pixel.
    pub map: SegmentMap,
    /// Number of segments; valid ids are `0..num_segments`.
    pub num_segments: usize,
}

// ============================================================================
// Segmentation Collaborator
// ============================================================================

/// Superpixel segmentation collaborator.
///
/// After `finer` or `coarser` the caller must re-read `result` and rebuild
/// any index derived from it.
pub trait Segmentation {
    /// The current segmentation.
    fn result(&self) -> &SegmentationResult;

    /// Increase the number of segments.
    fn finer(&mut self) -> Result<()>;

    /// Decrease the number of segments.
    fn coarser(&mut self) -> Result<()>;
}

/// Deterministic segmentation into square blocks.
///
/// Stands in for a real superpixel algorithm in headless use and tests.
#[derive(Debug, Clone)]
pub struct GridSegmentation {
    width: u32,
    height: u32,
    cell_size: u32,
    result: SegmentationResult,
}

impl GridSegmentation {
    /// Create a block grid with the given cell size (clamped to at least 1).
    pub fn new(width: u32, height: u32, cell_size: u32) -> Self {
        let cell_size = cell_size.max(1);
        Self {
            width,
            height,
            cell_size,
            result: Self::compute(width, height, cell_size),
        }
    }

    /// Current block edge length in pixels.
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    fn compute(width: u32, height: u32, cell_size: u32) -> SegmentationResult {
        let cols = width.div_ceil(cell_size) as usize;
        let rows = height.div_ceil(cell_size) as usize;
        let mut ids = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            let row = (y / cell_size) as usize;
            for x in 0..width {
                ids.push((row * cols + (x / cell_size) as usize) as u32);
            }
        }
        SegmentationResult {
            map: SegmentMap {
                width,
                height,
                ids,
            },
            num_segments: cols * rows,
        }
    }

    fn set_cell_size(&mut self, cell_size: u32) {
        if cell_size != self.cell_size {
            self.cell_size = cell_size;
            self.result = Self::compute(self.width, self.height, cell_size);
        }
    }
}

impl Segmentation for GridSegmentation {
    fn result(&self) -> &SegmentationResult {
        &self.result
    }

    fn finer(&mut self) -> Result<()> {
        self.set_cell_size((self.cell_size / 2).max(1));
        Ok(())
    }

    fn coarser(&mut self) -> Result<()> {
        let longest = self.width.max(self.height).max(1);
        self.set_cell_size(self.cell_size.saturating_mul(2).min(longest));
        Ok(())
    }
}

// ============================================================================
// Segment Index
// ============================================================================

/// Pixel offsets grouped by segment id.
///
/// Slot `k` holds every offset whose segment id is `k`, ascending. The slots
/// partition `0..width*height`.
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    slots: Vec<Vec<usize>>,
}

impl SegmentIndex {
    /// Build the index with one row-major pass over `map`.
    pub fn build(map: &SegmentMap, num_segments: usize) -> Result<Self> {
        // Ids are u32, so no map can address more slots than this.
        if num_segments as u64 > u64::from(u32::MAX) + 1 {
            return Err(AnnotatorError::invalid_argument(format!(
                "{} segments exceed the u32 id space",
                num_segments
            )));
        }

        let start = Instant::now();
        let mut slots = vec![Vec::new(); num_segments];

        for (offset, &id) in map.ids.iter().enumerate() {
            let slot = slots
                .get_mut(id as usize)
                .ok_or(AnnotatorError::InvalidSegmentId {
                    id,
                    num_segments,
                    offset: Some(offset),
                })?;
            slot.push(offset);
        }

        log::debug!(
            "Built segment index: {} segments over {} pixels in {:?}",
            num_segments,
            map.len(),
            start.elapsed()
        );
        Ok(Self { slots })
    }

    /// Offsets belonging to `segment`.
    pub fn pixels(&self, segment: u32) -> Option<&[usize]> {
        self.slots.get(segment as usize).map(Vec::as_slice)
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over all slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.slots.iter().map(Vec::as_slice)
    }
}

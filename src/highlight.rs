//! Transient highlight of the pixels under the pointer.
//!
//! The tracker remembers which pixels it marked so the next call can restore
//! them before marking a new set. It only touches the [`Overlay`]; the label
//! raster is never read or written here.

use crate::overlay::Overlay;

/// Currently highlighted pixel set.
#[derive(Debug, Clone, Default)]
pub struct HighlightTracker {
    current: Option<Vec<usize>>,
}

impl HighlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the highlighted set. `None` just clears.
    pub fn set_highlight(&mut self, overlay: &mut Overlay, pixels: Option<&[usize]>) {
        if let Some(previous) = self.current.take() {
            overlay.mark(&previous, false);
        }
        if let Some(pixels) = pixels {
            overlay.mark(pixels, true);
            self.current = Some(pixels.to_vec());
        }
    }

    /// Remove any highlight.
    pub fn clear(&mut self, overlay: &mut Overlay) {
        self.set_highlight(overlay, None);
    }

    /// Mark the current set again, e.g. after the overlay alpha was reset.
    pub fn reapply(&self, overlay: &mut Overlay) {
        if let Some(pixels) = &self.current {
            overlay.mark(pixels, true);
        }
    }

    /// Forget the current set without restoring the overlay.
    ///
    /// Used when the overlay is rebuilt from scratch.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Pixels currently highlighted.
    pub fn current(&self) -> Option<&[usize]> {
        self.current.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

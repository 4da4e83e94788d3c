//! Presentation rasters derived from labels and segments.
//!
//! The overlay holds two rasters that a renderer composites over the image:
//! the label visualization (colormap colour per label at a shared alpha) and
//! the superpixel boundary alpha mask. Neither raster is ever read back as
//! label data.

use image::{Rgba, RgbaImage};

use crate::codec::Label;
use crate::config::AnnotatorConfig;

/// Step applied by [`Overlay::less_alpha`] and [`Overlay::more_alpha`].
pub const ALPHA_STEP: i32 = 20;

/// Visualization and boundary rasters.
#[derive(Debug, Clone)]
pub struct Overlay {
    visualization: RgbaImage,
    /// Alpha per pixel; non-zero marks a boundary pixel
    boundary: Vec<u8>,
    colormap: Vec<[u8; 3]>,
    visualization_alpha: u8,
    boundary_alpha: u8,
    highlight_alpha: u8,
}

impl Overlay {
    /// Create an overlay showing every pixel as `labels[offset]`.
    pub fn new(width: u32, height: u32, config: &AnnotatorConfig, labels: &[Label]) -> Self {
        let mut overlay = Self {
            visualization: RgbaImage::from_pixel(
                width,
                height,
                Rgba([0, 0, 0, config.visualization_alpha]),
            ),
            boundary: vec![0; width as usize * height as usize],
            colormap: config.colormap.clone(),
            visualization_alpha: config.visualization_alpha,
            boundary_alpha: config.boundary_alpha,
            highlight_alpha: config.effective_highlight_alpha(),
        };
        overlay.paint_all(labels);
        overlay
    }

    /// Display colour of a label.
    pub fn color_of(&self, label: Label) -> [u8; 3] {
        lookup_color(&self.colormap, label)
    }

    /// Recolour `pixels` to show `labels`. Alpha is left alone.
    pub fn paint(&mut self, pixels: &[usize], labels: &[Label]) {
        let data: &mut [u8] = &mut self.visualization;
        for (&offset, &label) in pixels.iter().zip(labels) {
            let start = offset * 4;
            data[start..start + 3].copy_from_slice(&lookup_color(&self.colormap, label));
        }
    }

    /// Recolour every pixel, `labels` in offset order.
    pub fn paint_all(&mut self, labels: &[Label]) {
        let data: &mut [u8] = &mut self.visualization;
        for (cell, &label) in data.chunks_exact_mut(4).zip(labels) {
            cell[..3].copy_from_slice(&lookup_color(&self.colormap, label));
        }
    }

    /// Replace the boundary raster from a segment boundary mask.
    pub fn set_boundary(&mut self, mask: &[bool]) {
        let alpha = self.boundary_alpha;
        self.boundary = mask.iter().map(|&b| if b { alpha } else { 0 }).collect();
    }

    /// Set the visualization alpha (clamped to 0..=255) on every pixel.
    ///
    /// Highlight marking is lost; callers re-apply it afterwards.
    pub fn set_alpha(&mut self, alpha: i32) {
        self.visualization_alpha = alpha.clamp(0, 255) as u8;
        for pixel in self.visualization.pixels_mut() {
            pixel[3] = self.visualization_alpha;
        }
    }

    /// Lower the visualization alpha by `scale` steps.
    pub fn less_alpha(&mut self, scale: i32) {
        self.set_alpha(i32::from(self.visualization_alpha) - scale * ALPHA_STEP);
    }

    /// Raise the visualization alpha by `scale` steps.
    pub fn more_alpha(&mut self, scale: i32) {
        self.set_alpha(i32::from(self.visualization_alpha) + scale * ALPHA_STEP);
    }

    /// Switch highlight marking on or off for `pixels`.
    ///
    /// Off restores the visualization alpha, and the boundary alpha on pixels
    /// that belong to a boundary.
    pub(crate) fn mark(&mut self, pixels: &[usize], highlighted: bool) {
        let (vis, edge) = if highlighted {
            (self.highlight_alpha, self.highlight_alpha)
        } else {
            (self.visualization_alpha, self.boundary_alpha)
        };
        let data: &mut [u8] = &mut self.visualization;
        for &offset in pixels {
            data[offset * 4 + 3] = vis;
            if self.boundary[offset] != 0 {
                self.boundary[offset] = edge;
            }
        }
    }

    pub fn visualization(&self) -> &RgbaImage {
        &self.visualization
    }

    pub fn boundary(&self) -> &[u8] {
        &self.boundary
    }

    pub fn visualization_alpha(&self) -> u8 {
        self.visualization_alpha
    }

    pub fn boundary_alpha(&self) -> u8 {
        self.boundary_alpha
    }

    pub fn highlight_alpha(&self) -> u8 {
        self.highlight_alpha
    }
}

/// Colormap entry for `label`, wrapping past the end.
fn lookup_color(colormap: &[[u8; 3]], label: Label) -> [u8; 3] {
    if colormap.is_empty() {
        return [0, 0, 0];
    }
    colormap[label as usize % colormap.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(labels: &[Label]) -> Overlay {
        Overlay::new(labels.len() as u32, 1, &AnnotatorConfig::default(), labels)
    }

    #[test]
    fn test_initial_colors() {
        let overlay = overlay(&[0, 1, 2]);
        let vis = overlay.visualization();
        assert_eq!(vis.get_pixel(0, 0).0, [255, 255, 255, 144]);
        assert_eq!(vis.get_pixel(1, 0).0, [255, 0, 0, 144]);
        // Label 2 wraps to the first colormap entry.
        assert_eq!(vis.get_pixel(2, 0).0, [255, 255, 255, 144]);
    }

    #[test]
    fn test_paint_keeps_alpha() {
        let mut overlay = overlay(&[0, 0]);
        overlay.mark(&[1], true);
        overlay.paint(&[1], &[1]);
        assert_eq!(overlay.visualization().get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_alpha_steps_clamp() {
        let mut overlay = overlay(&[0]);
        overlay.more_alpha(1);
        assert_eq!(overlay.visualization_alpha(), 164);
        overlay.more_alpha(10);
        assert_eq!(overlay.visualization_alpha(), 255);
        overlay.less_alpha(100);
        assert_eq!(overlay.visualization_alpha(), 0);
        assert_eq!(overlay.visualization().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_mark_respects_boundary() {
        let mut overlay = overlay(&[0, 0, 0]);
        overlay.set_boundary(&[true, false, true]);
        assert_eq!(overlay.boundary(), &[127, 0, 127]);

        overlay.mark(&[0, 1], true);
        assert_eq!(overlay.boundary(), &[255, 0, 127]);
        assert_eq!(overlay.visualization().get_pixel(1, 0)[3], 255);

        overlay.mark(&[0, 1], false);
        assert_eq!(overlay.boundary(), &[127, 0, 127]);
        assert_eq!(overlay.visualization().get_pixel(0, 0)[3], 144);
    }
}

//! Majority filtering of decoded label rasters.
//!
//! Denoising is delegated to a [`MajorityFilter`] collaborator that receives
//! the decoded labels and returns a replacement raster of the same shape.

use std::collections::HashMap;

use ndarray::Array2;

use crate::codec::Label;
use crate::error::Result;

/// Per-pixel majority vote over a neighbourhood.
pub trait MajorityFilter {
    /// Filter a `height x width` label raster.
    ///
    /// The returned raster must have the same shape as `labels`.
    fn filter(&self, labels: &Array2<Label>) -> Result<Array2<Label>>;
}

/// Square-window mode filter.
///
/// Each output cell is the most frequent label inside the `(2r+1)²` window
/// centred on it, clipped at the raster edges. Ties go to the smaller label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFilter {
    /// Window radius in pixels
    pub radius: usize,
}

impl Default for ModeFilter {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

impl ModeFilter {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }
}

impl MajorityFilter for ModeFilter {
    fn filter(&self, labels: &Array2<Label>) -> Result<Array2<Label>> {
        let (h, w) = labels.dim();
        if h == 0 || w == 0 {
            return Ok(labels.clone());
        }

        let r = self.radius;
        let mut out = Array2::zeros((h, w));
        let mut counts: HashMap<Label, usize> = HashMap::new();

        for y in 0..h {
            let rows = y.saturating_sub(r)..=(y + r).min(h - 1);
            for x in 0..w {
                let cols = x.saturating_sub(r)..=(x + r).min(w - 1);
                counts.clear();
                for yy in rows.clone() {
                    for xx in cols.clone() {
                        *counts.entry(labels[[yy, xx]]).or_insert(0) += 1;
                    }
                }
                out[[y, x]] = counts
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                    .map_or(labels[[y, x]], |(&label, _)| label);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_isolated_pixel_removed() {
        let labels = array![[1, 1, 1], [1, 7, 1], [1, 1, 1]];
        let out = ModeFilter::default().filter(&labels).unwrap();
        assert_eq!(out, Array2::from_elem((3, 3), 1));
    }

    #[test]
    fn test_tie_goes_to_smaller_label() {
        let labels = array![[4, 2]];
        let out = ModeFilter::new(1).filter(&labels).unwrap();
        assert_eq!(out, array![[2, 2]]);
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let labels = array![[3, 1], [0, 9]];
        let out = ModeFilter::new(0).filter(&labels).unwrap();
        assert_eq!(out, labels);
    }

    #[test]
    fn test_edges_keep_shape() {
        let labels = Array2::from_shape_fn((4, 5), |(y, x)| if x < 2 { 0 } else { y as Label });
        let out = ModeFilter::default().filter(&labels).unwrap();
        assert_eq!(out.dim(), (4, 5));
        assert_eq!(out[[0, 0]], 0);
    }
}

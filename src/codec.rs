//! Label packing into pixel storage cells.
//!
//! A label occupies the three colour bytes of a 4-byte RGBA cell, least
//! significant byte first. The fourth byte belongs to presentation and is
//! forced opaque whenever a label is committed.

use crate::error::{AnnotatorError, Result};

/// Integer class id painted onto a pixel.
pub type Label = u32;

/// Largest label that fits in three bytes.
pub const MAX_LABEL: Label = 0x00FF_FFFF;

/// Bytes per storage cell (three label bytes plus alpha).
pub const CELL_BYTES: usize = 4;

/// Alpha written alongside every committed label.
pub const OPAQUE: u8 = 255;

/// Encode a label into its three storage bytes.
pub fn encode(label: Label) -> Result<[u8; 3]> {
    check_label(label)?;
    Ok([
        (label & 0xFF) as u8,
        ((label >> 8) & 0xFF) as u8,
        ((label >> 16) & 0xFF) as u8,
    ])
}

/// Decode three storage bytes back into a label.
#[inline]
pub fn decode(bytes: [u8; 3]) -> Label {
    Label::from(bytes[0]) | (Label::from(bytes[1]) << 8) | (Label::from(bytes[2]) << 16)
}

/// Fail with `OutOfRange` when `label` does not fit in 24 bits.
#[inline]
pub fn check_label(label: Label) -> Result<()> {
    if label > MAX_LABEL {
        return Err(AnnotatorError::OutOfRange { label });
    }
    Ok(())
}

/// Read the label stored in a 4-byte cell.
#[inline]
pub(crate) fn read_cell(cell: &[u8]) -> Label {
    decode([cell[0], cell[1], cell[2]])
}

/// Write an already validated label into a 4-byte cell and mark it opaque.
#[inline]
pub(crate) fn write_cell(cell: &mut [u8], label: Label) {
    debug_assert!(label <= MAX_LABEL);
    cell[0] = (label & 0xFF) as u8;
    cell[1] = ((label >> 8) & 0xFF) as u8;
    cell[2] = ((label >> 16) & 0xFF) as u8;
    cell[3] = OPAQUE;
}

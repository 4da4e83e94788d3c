//! Annotation image encodings.
//!
//! Exported annotations are still images whose RGB triplet is the packed
//! label of each pixel (not a display colour) with alpha forced opaque.
//! Import accepts that encoding, or a single-channel image whose value is the
//! label itself.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::codec::{self, CELL_BYTES, Label, OPAQUE};
use crate::error::Result;
use crate::store::AnnotationStore;

/// How an imported annotation image stores its labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportEncoding {
    /// Label packed little-byte-first into RGB.
    #[default]
    Rgb,
    /// Label equals the single channel value.
    Grayscale,
}

/// Copy the label raster with alpha forced to 255.
pub fn export_image(store: &AnnotationStore) -> RgbaImage {
    let mut image = store.raster().clone();
    for pixel in image.pixels_mut() {
        pixel[3] = OPAQUE;
    }
    image
}

/// Encode the label raster as PNG bytes.
pub fn export_png(store: &AnnotationStore) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    export_image(store).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    log::info!(
        "Exported {}x{} annotation ({} bytes)",
        store.width(),
        store.height(),
        bytes.len()
    );
    Ok(bytes)
}

/// Write the label raster to a PNG file.
pub fn save_png(store: &AnnotationStore, path: &Path) -> Result<()> {
    let bytes = export_png(store)?;
    std::fs::write(path, bytes)?;
    log::info!("Saved annotation to {:?}", path);
    Ok(())
}

/// Convert a decoded annotation image into a packed label raster.
///
/// The returned raster has alpha 0 in every cell; presentation owns alpha.
pub fn decode_annotation(image: &DynamicImage, encoding: ImportEncoding) -> RgbaImage {
    let (width, height) = (image.width(), image.height());
    match encoding {
        ImportEncoding::Rgb => {
            let mut raster = image.to_rgba8();
            for pixel in raster.pixels_mut() {
                pixel[3] = 0;
            }
            raster
        }
        ImportEncoding::Grayscale => {
            let labels: Vec<Label> = match image {
                DynamicImage::ImageLuma16(buffer) => {
                    buffer.pixels().map(|p| Label::from(p[0])).collect()
                }
                DynamicImage::ImageLumaA16(buffer) => {
                    buffer.pixels().map(|p| Label::from(p[0])).collect()
                }
                other => other
                    .to_rgba8()
                    .pixels()
                    .map(|p| Label::from(p[0]))
                    .collect(),
            };
            pack_labels(width, height, &labels)
        }
    }
}

/// Decode annotation bytes in any format the `image` crate recognises.
pub fn load_annotation(bytes: &[u8], encoding: ImportEncoding) -> Result<RgbaImage> {
    let image = image::load_from_memory(bytes)?;
    log::debug!(
        "Decoded {}x{} annotation image ({:?})",
        image.width(),
        image.height(),
        image.color()
    );
    Ok(decode_annotation(&image, encoding))
}

/// Read and decode an annotation file.
pub fn open_annotation(path: &Path, encoding: ImportEncoding) -> Result<RgbaImage> {
    let bytes = std::fs::read(path)?;
    load_annotation(&bytes, encoding)
}

/// Pack 16-bit-or-smaller labels into an RGBA raster with alpha 0.
fn pack_labels(width: u32, height: u32, labels: &[Label]) -> RgbaImage {
    let mut raster = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let data: &mut [u8] = &mut raster;
    for (cell, &label) in data.chunks_exact_mut(CELL_BYTES).zip(labels) {
        // Grayscale channels are at most 16 bits wide, always in range.
        if let Ok(bytes) = codec::encode(label) {
            cell[..3].copy_from_slice(&bytes);
        }
    }
    raster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Labels;
    use image::{ImageBuffer, Luma};

    #[test]
    fn test_export_forces_opaque_without_touching_store() {
        let mut store = AnnotationStore::new(2, 1, 0).unwrap();
        store
            .apply_bulk_label(&[1], Labels::Broadcast(0x01_02_03))
            .unwrap();

        let image = export_image(&store);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [3, 2, 1, 255]);
        // Unwritten cell in the live raster keeps alpha 0.
        assert_eq!(store.raster().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_png_roundtrip_preserves_labels() {
        let mut store = AnnotationStore::new(3, 2, 0).unwrap();
        store
            .apply_bulk_label(&[0, 4, 5], Labels::PerPixel(&[codec::MAX_LABEL, 256, 70_000]))
            .unwrap();

        let bytes = export_png(&store).unwrap();
        let raster = load_annotation(&bytes, ImportEncoding::Rgb).unwrap();

        let mut imported = AnnotationStore::new(3, 2, 0).unwrap();
        imported.replace_raster(raster).unwrap();
        assert_eq!(imported.labels(), store.labels());
    }

    #[test]
    fn test_grayscale_8bit() {
        let gray = ImageBuffer::from_fn(2, 2, |x, y| Luma([(x + 2 * y) as u8 * 10]));
        let raster = decode_annotation(&DynamicImage::ImageLuma8(gray), ImportEncoding::Grayscale);
        let mut store = AnnotationStore::new(2, 2, 0).unwrap();
        store.replace_raster(raster).unwrap();
        assert_eq!(store.labels(), vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_grayscale_16bit() {
        let gray: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(2, 1, |x, _| Luma([if x == 0 { 1000 } else { 65535 }]));
        let raster = decode_annotation(&DynamicImage::ImageLuma16(gray), ImportEncoding::Grayscale);
        assert_eq!(codec::read_cell(&raster.get_pixel(0, 0).0), 1000);
        assert_eq!(codec::read_cell(&raster.get_pixel(1, 0).0), 65535);
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(load_annotation(&[0, 1, 2, 3], ImportEncoding::Rgb).is_err());
    }
}

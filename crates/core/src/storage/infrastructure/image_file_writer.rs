use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::shared::image_metadata::ImageMetadata;
use crate::storage::domain::image_writer::ImageWriter;

/// Writes finished images to disk using the `image` crate.
///
/// Creates missing parent directories, bakes any pending EXIF orientation
/// into the pixels, and drops the alpha channel for formats without one.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        image: &DynamicImage,
        metadata: &ImageMetadata,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let format = ImageFormat::from_path(path)?;

        let mut out = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
            _ => image.clone(),
        };
        if let Some(orientation) = metadata.pending_orientation() {
            out.apply_orientation(orientation);
        }

        out.save_with_format(path, format)?;
        Ok(())
    }
}

use std::path::Path;

use image::DynamicImage;

use crate::shared::image_metadata::ImageMetadata;

/// Persists a finished image.
///
/// Shared by every finishing worker, so implementations must be `Sync`.
pub trait ImageWriter: Send + Sync {
    /// Writes `image` to `path`; the format follows the path's extension.
    /// Orientation still pending in `metadata` is applied before encoding.
    fn write(
        &self,
        path: &Path,
        image: &DynamicImage,
        metadata: &ImageMetadata,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

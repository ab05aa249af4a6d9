use std::path::Path;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};

use crate::shared::image_metadata::ImageMetadata;

/// Unsharp-mask parameters for the detector's input copy.
const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 2;

/// A decoded image plus what the crop and save stages need to know about it.
pub struct LoadedImage {
    pub image: DynamicImage,
    pub metadata: ImageMetadata,
}

/// Decodes an image file and reads its EXIF orientation.
///
/// When `apply_rotation` is set the pixels are rotated upright here;
/// otherwise the orientation is recorded as pending in the metadata.
pub fn load_image(
    path: &Path,
    apply_rotation: bool,
) -> Result<LoadedImage, Box<dyn std::error::Error + Send + Sync>> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder)?;

    if apply_rotation {
        image.apply_orientation(orientation);
    }

    let metadata = ImageMetadata {
        width: image.width(),
        height: image.height(),
        orientation,
        orientation_applied: apply_rotation,
        format,
    };
    Ok(LoadedImage { image, metadata })
}

/// Returns a sharpened copy used only as detector input.
pub fn sharpen_for_detection(image: &DynamicImage) -> DynamicImage {
    image.unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

use image::DynamicImage;

use crate::finishing::domain::aspect_ratio::aspect_crop_rect;

/// Centre-crops `image` to `ratio` (width / height).
///
/// Returns an unchanged copy when the ratio or the image is degenerate.
pub fn apply_aspect_ratio(image: &DynamicImage, ratio: f64) -> DynamicImage {
    match aspect_crop_rect(image.width(), image.height(), ratio) {
        Some(r) => image.crop_imm(r.x, r.y, r.width, r.height),
        None => image.clone(),
    }
}

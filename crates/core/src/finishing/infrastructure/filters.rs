use image::{DynamicImage, RgbaImage};

use crate::finishing::domain::image_filter::FilterKind;

/// Brightness added at intensity 100 (per channel, out of 255).
const MAX_BRIGHTEN: f32 = 128.0;
/// Contrast percentage at intensity 100.
const MAX_CONTRAST: f32 = 100.0;
/// Gaussian sigma at intensity 100.
const MAX_BLUR_SIGMA: f32 = 8.0;

const LAPLACIAN: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0];

/// Applies `filter` with `intensity` in [0, 100] (values above 100 are clamped).
///
/// Intensity 0 leaves the image unchanged for every filter.
pub fn apply_filter(image: &DynamicImage, filter: FilterKind, intensity: u8) -> DynamicImage {
    let t = intensity.min(100) as f32 / 100.0;
    if t == 0.0 {
        return image.clone();
    }

    match filter {
        FilterKind::None => image.clone(),
        FilterKind::Brightness => image.brighten((t * MAX_BRIGHTEN).round() as i32),
        FilterKind::Contrast => image.adjust_contrast(t * MAX_CONTRAST),
        FilterKind::Blur => image.blur(t * MAX_BLUR_SIGMA),
        FilterKind::EdgeDetection => {
            let edges = image.grayscale().filter3x3(&LAPLACIAN).to_rgba8();
            DynamicImage::ImageRgba8(blend(&image.to_rgba8(), &edges, t))
        }
        FilterKind::Sepia => {
            let source = image.to_rgba8();
            DynamicImage::ImageRgba8(blend(&source, &sepia(&source), t))
        }
    }
}

fn sepia(source: &RgbaImage) -> RgbaImage {
    let mut out = source.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0.map(f32::from);
        let tone = |cr: f32, cg: f32, cb: f32| (r * cr + g * cg + b * cb).min(255.0) as u8;
        pixel.0 = [
            tone(0.393, 0.769, 0.189),
            tone(0.349, 0.686, 0.168),
            tone(0.272, 0.534, 0.131),
            a as u8,
        ];
    }
    out
}

/// Linear mix from `base` (t = 0) to `overlay` (t = 1); both must share dimensions.
fn blend(base: &RgbaImage, overlay: &RgbaImage, t: f32) -> RgbaImage {
    let mut out = base.clone();
    for (dst, src) in out.iter_mut().zip(overlay.iter()) {
        *dst = (*dst as f32 + (*src as f32 - *dst as f32) * t).round() as u8;
    }
    out
}

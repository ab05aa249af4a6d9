use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::cropping::domain::crop_style::CropStyle;
use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::pipeline::batch_options::BatchOptions;
use crate::pipeline::finisher::Finisher;
use crate::shared::constants::PREVIEW_MAX_SIZE;
use crate::shared::errors::ImageFailure;
use crate::shared::image_metadata::ImageMetadata;
use crate::storage::infrastructure::image_loader::load_image;

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewStatus {
    Generated,
    NoFace,
    CropFailed,
    /// The detector raised; carries its message.
    Failed(String),
}

impl PreviewStatus {
    pub fn message(&self) -> String {
        match self {
            Self::Generated => "Preview generated.".to_string(),
            Self::NoFace => "No face detected.".to_string(),
            Self::CropFailed => "Crop failed.".to_string(),
            Self::Failed(reason) => format!("Preview failed: {reason}"),
        }
    }
}

/// Before/after pair, both already scaled to fit the preview box.
pub struct Preview {
    pub before: DynamicImage,
    pub after: Option<DynamicImage>,
    pub status: PreviewStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPaths {
    pub before: PathBuf,
    pub after: Option<PathBuf>,
}

/// Crops a single image synchronously, always with the general crop.
pub struct PreviewCropUseCase {
    detector: Box<dyn FaceDetector>,
    finisher: Arc<Finisher>,
}

impl PreviewCropUseCase {
    pub fn new(detector: Box<dyn FaceDetector>, finisher: Arc<Finisher>) -> Self {
        Self { detector, finisher }
    }

    /// Fails only when the original cannot be loaded; every other problem
    /// is reported through [`PreviewStatus`].
    pub fn preview(&mut self, path: &Path, options: &BatchOptions) -> Result<Preview, DetectError> {
        let before = fit_preview(load_image(path, true)?.image);

        let face = match self.detector.detect(path, &options.detection) {
            Ok(Some(face)) => face,
            Ok(None) => return Ok(Preview::without_crop(before, PreviewStatus::NoFace)),
            Err(e) => {
                log::warn!("Preview detection failed for {}: {e}", path.display());
                let status = PreviewStatus::Failed(e.to_string());
                return Ok(Preview::without_crop(before, status));
            }
        };

        let mut finish = options.finish;
        finish.crop.style = CropStyle::Auto;

        let after = match self.finisher.render(&face, &finish) {
            Ok(mut image) => {
                if let Some(orientation) = face.metadata.pending_orientation() {
                    image.apply_orientation(orientation);
                }
                fit_preview(image)
            }
            Err(ImageFailure::CropFailed { .. }) => {
                return Ok(Preview::without_crop(before, PreviewStatus::CropFailed))
            }
            Err(e) => return Ok(Preview::without_crop(before, PreviewStatus::Failed(e.to_string()))),
        };

        Ok(Preview {
            before,
            after: Some(after),
            status: PreviewStatus::Generated,
        })
    }

    /// Writes `preview_before_<stem>.png` and, if present, `preview_after_<stem>.png`.
    pub fn save(
        &self,
        preview: &Preview,
        output_dir: &Path,
        stem: &str,
    ) -> Result<PreviewPaths, ImageFailure> {
        let before_path = output_dir.join(format!("preview_before_{stem}.png"));
        self.write(&before_path, &preview.before)?;

        let after = match &preview.after {
            Some(image) => {
                let path = output_dir.join(format!("preview_after_{stem}.png"));
                self.write(&path, image)?;
                Some(path)
            }
            None => None,
        };
        Ok(PreviewPaths {
            before: before_path,
            after,
        })
    }

    fn write(&self, path: &Path, image: &DynamicImage) -> Result<(), ImageFailure> {
        let metadata = ImageMetadata::upright(image.width(), image.height());
        self.finisher.save(path, image, &metadata)
    }
}

impl Preview {
    fn without_crop(before: DynamicImage, status: PreviewStatus) -> Self {
        Self {
            before,
            after: None,
            status,
        }
    }
}

/// Scales down to fit `PREVIEW_MAX_SIZE` square; smaller images are kept as is.
fn fit_preview(image: DynamicImage) -> DynamicImage {
    if image.width() > PREVIEW_MAX_SIZE || image.height() > PREVIEW_MAX_SIZE {
        image.thumbnail(PREVIEW_MAX_SIZE, PREVIEW_MAX_SIZE)
    } else {
        image
    }
}

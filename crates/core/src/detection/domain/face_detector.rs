use std::path::Path;

use image::DynamicImage;

use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::constants::DEFAULT_CONFIDENCE;
use crate::shared::face_box::FaceBox;
use crate::shared::image_metadata::ImageMetadata;

/// Error type for detection calls. `Send + Sync` because failures are
/// carried from the detection thread back to the controller.
pub type DetectError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionOptions {
    pub confidence_threshold: f64,
    /// Sharpen the detector's input copy (the returned image is never sharpened).
    pub sharpen: bool,
    /// Rotate decoded pixels upright according to EXIF orientation.
    pub apply_rotation: bool,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE,
            sharpen: true,
            apply_rotation: true,
        }
    }
}

/// A detected face together with the decoded image it was found in.
///
/// A box always comes with its landmarks; "no face" is expressed by the
/// detector returning `None` rather than by empty fields.
#[derive(Clone, Debug)]
pub struct FaceDetection {
    pub face_box: FaceBox,
    pub landmarks: FaceLandmarks,
    pub image: DynamicImage,
    pub metadata: ImageMetadata,
}

/// Domain interface for the face detection service.
///
/// Implementations typically hold a heavy model, hence `&mut self` and no
/// `Sync` bound: one owner calls it at a time.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        path: &Path,
        options: &DetectionOptions,
    ) -> Result<Option<FaceDetection>, DetectError>;
}

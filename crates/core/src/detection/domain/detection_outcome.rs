use crate::detection::domain::face_detector::FaceDetection;
use crate::shared::errors::ImageFailure;

/// Result of running detection for one submitted image.
///
/// Failures are data here: a detector error or an empty result is carried
/// to the consumer instead of escaping the detection thread.
#[derive(Debug)]
pub struct DetectionOutcome {
    pub filename: String,
    pub detection: Result<FaceDetection, ImageFailure>,
}

impl DetectionOutcome {
    pub fn is_face(&self) -> bool {
        self.detection.is_ok()
    }
}

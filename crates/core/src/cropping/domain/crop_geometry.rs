use image::DynamicImage;

use crate::detection::domain::face_detector::FaceDetection;
use crate::detection::domain::face_landmarks::FaceLandmarks;

/// Geometric crop functions, one per crop strategy.
///
/// Each takes the detection (decoded image, box, landmarks, metadata) plus
/// margins/offsets and returns the cropped image, or `None` when no sensible
/// crop exists. Margins and offsets are percentages of the face box height.
pub trait CropGeometry: Send + Sync {
    fn is_frontal_face(&self, landmarks: &FaceLandmarks) -> bool;

    /// Landmark-centred crop of a face looking at the camera.
    fn crop_frontal(&self, face: &FaceDetection, margin: u32, lip_offset: u32)
        -> Option<DynamicImage>;

    /// Pose-agnostic head-and-shoulders crop.
    fn crop_general(
        &self,
        face: &FaceDetection,
        frontal_margin: u32,
        profile_margin: u32,
        lip_offset: u32,
        neck_offset: u32,
    ) -> Option<DynamicImage>;

    fn crop_profile(&self, face: &FaceDetection, margin: u32, offset: u32) -> Option<DynamicImage>;

    fn crop_chin(&self, face: &FaceDetection, margin: u32, chin_offset: u32)
        -> Option<DynamicImage>;

    fn crop_nose(&self, face: &FaceDetection, margin: u32) -> Option<DynamicImage>;

    fn crop_below_lips(&self, face: &FaceDetection, margin: u32, offset: u32)
        -> Option<DynamicImage>;
}

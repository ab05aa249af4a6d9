//! Box- and landmark-driven crop rectangles.
//!
//! All margins and offsets are percentages of the face box height, so the
//! same settings behave alike on close-ups and group shots. Rectangles are
//! clamped to the image; a rectangle left empty after clamping yields `None`.

use image::DynamicImage;

use crate::cropping::domain::crop_geometry::CropGeometry;
use crate::detection::domain::face_detector::FaceDetection;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::face_box::CropRect;

/// Fraction of the face width kept on each side of the nose for nose crops.
const NOSE_HALF_WIDTH: f64 = 0.25;

/// How far below the face box a below-lips crop reaches, as a fraction of face height.
const BELOW_LIPS_DEPTH: f64 = 0.5;

pub struct LandmarkCropGeometry;

impl LandmarkCropGeometry {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LandmarkCropGeometry {
    fn default() -> Self {
        Self::new()
    }
}

impl CropGeometry for LandmarkCropGeometry {
    fn is_frontal_face(&self, landmarks: &FaceLandmarks) -> bool {
        landmarks.is_frontal()
    }

    fn crop_frontal(&self, face: &FaceDetection, margin: u32, lip_offset: u32) -> Option<DynamicImage> {
        let b = &face.face_box;
        let (cx, _) = face.landmarks.center()?;
        let (_, mouth_y) = face.landmarks.mouth_center()?;
        let half_w = b.width() / 2.0 + pct(face, margin);

        let top = b.y1 - pct(face, margin);
        let bottom = mouth_y + pct(face, lip_offset);
        crop(face, cx - half_w, top, cx + half_w, bottom)
    }

    fn crop_general(
        &self,
        face: &FaceDetection,
        frontal_margin: u32,
        profile_margin: u32,
        lip_offset: u32,
        neck_offset: u32,
    ) -> Option<DynamicImage> {
        let b = &face.face_box;
        let margin = if face.landmarks.is_frontal() {
            frontal_margin
        } else {
            profile_margin
        };
        let side = pct(face, margin);

        let mut bottom = b.y2 + pct(face, neck_offset);
        if let Some((_, mouth_y)) = face.landmarks.mouth_center() {
            bottom = bottom.max(mouth_y + pct(face, lip_offset));
        }
        crop(face, b.x1 - side, b.y1 - side, b.x2 + side, bottom)
    }

    fn crop_profile(&self, face: &FaceDetection, margin: u32, offset: u32) -> Option<DynamicImage> {
        let b = &face.face_box;
        let side = pct(face, margin);
        let (mut left, mut right) = (b.x1 - side, b.x2 + side);

        // Leave extra room on the side the face is pointing towards.
        if let (Some(nose), Some((eye_x, _))) = (face.landmarks.nose(), face.landmarks.eye_center()) {
            if nose.0 < eye_x {
                left -= pct(face, offset);
            } else {
                right += pct(face, offset);
            }
        }
        crop(face, left, b.y1 - side, right, b.y2 + pct(face, offset))
    }

    fn crop_chin(&self, face: &FaceDetection, margin: u32, chin_offset: u32) -> Option<DynamicImage> {
        let b = &face.face_box;
        let side = pct(face, margin);
        let top = face
            .landmarks
            .mouth_center()
            .map(|(_, y)| y)
            .unwrap_or(b.y1 + b.height() / 2.0);
        crop(face, b.x1 - side, top, b.x2 + side, b.y2 + pct(face, chin_offset))
    }

    fn crop_nose(&self, face: &FaceDetection, margin: u32) -> Option<DynamicImage> {
        let (nx, ny) = face.landmarks.nose()?;
        let half = face.face_box.width() * NOSE_HALF_WIDTH + pct(face, margin);
        crop(face, nx - half, ny - half, nx + half, ny + half)
    }

    fn crop_below_lips(&self, face: &FaceDetection, margin: u32, offset: u32) -> Option<DynamicImage> {
        let b = &face.face_box;
        let (_, mouth_y) = face.landmarks.mouth_center()?;
        let side = pct(face, margin);
        let bottom = b.y2 + b.height() * BELOW_LIPS_DEPTH;
        crop(face, b.x1 - side, mouth_y + pct(face, offset), b.x2 + side, bottom)
    }
}

fn pct(face: &FaceDetection, percent: u32) -> f64 {
    face.face_box.height() * percent as f64 / 100.0
}

fn crop(face: &FaceDetection, x1: f64, y1: f64, x2: f64, y2: f64) -> Option<DynamicImage> {
    let rect = CropRect::clamped(x1, y1, x2, y2, face.image.width(), face.image.height())?;
    Some(face.image.crop_imm(rect.x, rect.y, rect.width, rect.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::face_box::FaceBox;
    use crate::shared::image_metadata::ImageMetadata;

    fn frontal_points() -> [(f64, f64); 5] {
        [
            (160.0, 160.0),
            (240.0, 160.0),
            (200.0, 200.0),
            (170.0, 250.0),
            (230.0, 250.0),
        ]
    }

    fn face_with(points: [(f64, f64); 5]) -> FaceDetection {
        FaceDetection {
            face_box: FaceBox {
                x1: 100.0,
                y1: 100.0,
                x2: 300.0,
                y2: 300.0,
                confidence: 0.9,
            },
            landmarks: FaceLandmarks::new(points),
            image: DynamicImage::new_rgb8(400, 600),
            metadata: ImageMetadata::upright(400, 600),
        }
    }

    fn dims(img: Option<DynamicImage>) -> (u32, u32) {
        let img = img.expect("expected a crop");
        (img.width(), img.height())
    }

    #[test]
    fn test_frontal_classification_uses_profile_ratio() {
        let geometry = LandmarkCropGeometry::new();
        assert!(geometry.is_frontal_face(&FaceLandmarks::new(frontal_points())));

        let mut turned = frontal_points();
        turned[2] = (150.0, 200.0);
        assert!(!geometry.is_frontal_face(&FaceLandmarks::new(turned)));
    }

    #[test]
    fn test_general_crop_expands_box() {
        // margin 10% of 200 = 20 per side; neck 50% = 100 below the box (80 → 400)
        let crop = LandmarkCropGeometry::new().crop_general(&face_with(frontal_points()), 10, 10, 50, 50);
        assert_eq!(dims(crop), (240, 320));
    }

    #[test]
    fn test_general_crop_clamps_to_image() {
        let crop = LandmarkCropGeometry::new().crop_general(&face_with(frontal_points()), 100, 100, 50, 50);
        // left/top clamp to 0, right clamps to 400, bottom = 400
        assert_eq!(dims(crop), (400, 400));
    }

    #[test]
    fn test_frontal_crop_ends_below_mouth() {
        // centre x = 200, half width = 100 + 20; top = 80, bottom = 250 + 100
        let crop = LandmarkCropGeometry::new().crop_frontal(&face_with(frontal_points()), 10, 50);
        assert_eq!(dims(crop), (240, 270));
    }

    #[test]
    fn test_frontal_crop_needs_mouth() {
        let mut pts = frontal_points();
        pts[3] = (0.0, 0.0);
        pts[4] = (0.0, 0.0);
        assert!(LandmarkCropGeometry::new().crop_frontal(&face_with(pts), 10, 50).is_none());
    }

    #[test]
    fn test_profile_crop_extends_towards_nose_side() {
        let mut pts = frontal_points();
        pts[2] = (150.0, 200.0); // looking left
        let crop = LandmarkCropGeometry::new().crop_profile(&face_with(pts), 0, 20);
        // left 100 - 40 = 60, right 300, top 100, bottom 300 + 40
        assert_eq!(dims(crop), (240, 240));
    }

    #[test]
    fn test_chin_crop_starts_at_mouth() {
        let crop = LandmarkCropGeometry::new().crop_chin(&face_with(frontal_points()), 0, 20);
        // 250 → 340
        assert_eq!(dims(crop), (200, 90));
    }

    #[test]
    fn test_nose_crop_is_square_around_nose() {
        let crop = LandmarkCropGeometry::new().crop_nose(&face_with(frontal_points()), 0);
        assert_eq!(dims(crop), (100, 100));
    }

    #[test]
    fn test_nose_crop_without_nose_fails() {
        let mut pts = frontal_points();
        pts[2] = (0.0, 0.0);
        assert!(LandmarkCropGeometry::new().crop_nose(&face_with(pts), 0).is_none());
    }

    #[test]
    fn test_below_lips_crop() {
        // top 250 + 20 = 270, bottom 300 + 100 = 400
        let crop = LandmarkCropGeometry::new().crop_below_lips(&face_with(frontal_points()), 0, 10);
        assert_eq!(dims(crop), (200, 130));
    }

    #[test]
    fn test_box_outside_image_yields_none() {
        let mut face = face_with(frontal_points());
        face.face_box = FaceBox {
            x1: 900.0,
            y1: 900.0,
            x2: 1000.0,
            y2: 1000.0,
            confidence: 0.9,
        };
        assert!(LandmarkCropGeometry::new().crop_general(&face, 0, 0, 0, 0).is_none());
    }
}

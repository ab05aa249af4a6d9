use image::DynamicImage;

use crate::cropping::domain::crop_geometry::CropGeometry;
use crate::cropping::domain::crop_style::CropStyle;
use crate::detection::domain::face_detector::FaceDetection;

pub const LIP_OFFSET: u32 = 50;
pub const NECK_OFFSET: u32 = 50;
pub const PROFILE_OFFSET: u32 = 50;
pub const CHIN_OFFSET: u32 = 20;
pub const NOSE_MARGIN: u32 = 0;
pub const BELOW_LIPS_OFFSET: u32 = 10;

/// Crop-stage settings shared by every image in a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropParams {
    pub style: CropStyle,
    pub frontal_margin: u32,
    pub profile_margin: u32,
    pub use_frontal: bool,
    pub use_profile: bool,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            style: CropStyle::Auto,
            frontal_margin: crate::shared::constants::DEFAULT_MARGIN,
            profile_margin: crate::shared::constants::DEFAULT_MARGIN,
            use_frontal: true,
            use_profile: true,
        }
    }
}

/// Applies the crop strategy selected by `params.style`.
///
/// - `Frontal` uses the frontal crop only for faces classified as frontal
///   while `use_frontal` is on; every other face gets the general crop.
/// - `Profile` crops only while `use_profile` is on, otherwise yields `None`.
/// - `Chin`, `Nose` and `BelowLips` ignore both flags.
pub fn crop_face(
    geometry: &dyn CropGeometry,
    face: &FaceDetection,
    params: &CropParams,
) -> Option<DynamicImage> {
    match params.style {
        CropStyle::Frontal => {
            if params.use_frontal && geometry.is_frontal_face(&face.landmarks) {
                geometry.crop_frontal(face, params.frontal_margin, LIP_OFFSET)
            } else {
                general(geometry, face, params)
            }
        }
        CropStyle::Profile => {
            if params.use_profile {
                geometry.crop_profile(face, params.profile_margin, PROFILE_OFFSET)
            } else {
                None
            }
        }
        CropStyle::Chin => geometry.crop_chin(face, params.frontal_margin, CHIN_OFFSET),
        CropStyle::Nose => geometry.crop_nose(face, NOSE_MARGIN),
        CropStyle::BelowLips => {
            geometry.crop_below_lips(face, params.frontal_margin, BELOW_LIPS_OFFSET)
        }
        CropStyle::Auto => general(geometry, face, params),
    }
}

fn general(
    geometry: &dyn CropGeometry,
    face: &FaceDetection,
    params: &CropParams,
) -> Option<DynamicImage> {
    geometry.crop_general(
        face,
        params.frontal_margin,
        params.profile_margin,
        LIP_OFFSET,
        NECK_OFFSET,
    )
}

use std::path::PathBuf;

use crate::cropping::domain::crop_dispatch::CropParams;
use crate::detection::domain::face_detector::DetectionOptions;
use crate::finishing::domain::image_filter::FilterKind;
use crate::shared::constants::DEFAULT_FILTER_INTENSITY;

/// Everything applied after detection: crop, aspect ratio, filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinishOptions {
    pub crop: CropParams,
    pub filter: FilterKind,
    /// 0..=100
    pub intensity: u8,
    /// Target width / height; `None` keeps the crop as is.
    pub aspect_ratio: Option<f64>,
}

impl Default for FinishOptions {
    fn default() -> Self {
        Self {
            crop: CropParams::default(),
            filter: FilterKind::None,
            intensity: DEFAULT_FILTER_INTENSITY,
            aspect_ratio: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchOptions {
    pub detection: DetectionOptions,
    pub finish: FinishOptions,
}

/// One eligible input file together with the options it is processed with.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTask {
    pub filename: String,
    pub input_path: PathBuf,
    pub options: BatchOptions,
}

use std::path::PathBuf;

use thiserror::Error;

use crate::cropping::domain::crop_style::CropStyle;

/// Why a single image contributed nothing to a batch.
///
/// Every variant is absorbed by the batch controller: it is logged and
/// recorded, and the batch carries on with the next image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageFailure {
    #[error("detection error: {0}")]
    Detection(String),
    #[error("no face detected")]
    NoFace,
    #[error("cropping failed for style '{style}'")]
    CropFailed { style: CropStyle },
    #[error("finishing failed: {0}")]
    Finishing(String),
}

/// Conditions that abort a whole batch. Per-image problems are never one of these.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("finishing pool size must be at least 1 (got {0})")]
    InvalidPoolSize(usize),
    #[error("cannot read input directory {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create output directory {path}: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("face detector is unavailable (a previous worker did not shut down)")]
    DetectorUnavailable,
    #[error("detection worker disconnected before the batch finished")]
    WorkerDisconnected,
}

/// Rejected user-supplied option values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("unknown crop style '{0}' (expected one of: auto, frontal, profile, chin, nose, below_lips)")]
    UnknownCropStyle(String),
    #[error("unknown filter '{0}' (expected one of: None, Brightness, Contrast, Blur, Edge Detection, Sepia)")]
    UnknownFilter(String),
}

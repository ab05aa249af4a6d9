use std::time::Duration;

pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Input extensions accepted by batch enumeration (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];

/// Prefix prepended to the input filename when writing a cropped output.
pub const OUTPUT_PREFIX: &str = "cropped_";

/// Upper bound on finishing workers regardless of available parallelism.
pub const MAX_FINISHING_WORKERS: usize = 4;

/// How long shutdown waits for the detection worker before detaching it.
pub const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub const DEFAULT_CONFIDENCE: f64 = 0.3;
pub const DEFAULT_MARGIN: u32 = 30;
pub const DEFAULT_FILTER_INTENSITY: u8 = 50;

/// Preview images are scaled down to fit inside this square.
pub const PREVIEW_MAX_SIZE: u32 = 720;

pub const PREVIEW_RETENTION_HOURS: u64 = 48;
pub const OUTPUT_RETENTION_HOURS: u64 = 168;

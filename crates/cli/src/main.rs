mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use facecrop_core::cropping::domain::crop_dispatch::CropParams;
use facecrop_core::cropping::domain::crop_style::CropStyle;
use facecrop_core::detection::domain::face_detector::{DetectionOptions, FaceDetector};
use facecrop_core::detection::infrastructure::model_resolver;
use facecrop_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use facecrop_core::finishing::domain::aspect_ratio::parse_aspect_ratio;
use facecrop_core::finishing::domain::image_filter::FilterKind;
use facecrop_core::pipeline::batch_crop_use_case::{BatchConfig, BatchCropUseCase};
use facecrop_core::pipeline::batch_options::{BatchOptions, FinishOptions};
use facecrop_core::pipeline::finisher::Finisher;
use facecrop_core::pipeline::preview_crop_use_case::PreviewCropUseCase;
use facecrop_core::shared::constants::{
    OUTPUT_RETENTION_HOURS, PREVIEW_RETENTION_HOURS, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facecrop_core::storage::infrastructure::asset_retention::{
    cleanup_directory, retention_from_env,
};

use settings::Settings;

type CliError = Box<dyn std::error::Error + Send + Sync>;

/// Face detection and portrait cropping for single images and folders.
#[derive(Parser)]
#[command(name = "facecrop", version)]
struct Cli {
    /// Settings file to use instead of the one in the user config directory.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crop every jpg/jpeg/png/heic image in a directory.
    Batch {
        /// Directory with input images.
        input: PathBuf,
        /// Directory for cropped images (created if missing).
        output: PathBuf,
        #[command(flatten)]
        crop: CropArgs,
        /// Number of finishing threads (default: min(4, CPUs)).
        #[arg(long)]
        workers: Option<usize>,
        /// Store the effective options as the new defaults.
        #[arg(long)]
        save_settings: bool,
    },
    /// Write a before/after preview of a single image.
    Preview {
        /// Input image.
        input: PathBuf,
        /// Directory for the preview pair.
        output: PathBuf,
        #[command(flatten)]
        crop: CropArgs,
    },
    /// Delete old previews and outputs.
    Cleanup {
        /// Preview directory (retention: PREVIEW_RETENTION_HOURS, default 48).
        #[arg(long)]
        previews: Option<PathBuf>,
        /// Output directory (retention: OUTPUT_RETENTION_HOURS, default 168).
        #[arg(long)]
        outputs: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
struct CropArgs {
    /// Crop style: auto, frontal, profile, chin, nose, below_lips.
    #[arg(long)]
    style: Option<CropStyle>,

    /// Margin for both frontal and profile faces (% of face height).
    #[arg(long)]
    margin: Option<u32>,

    /// Margin for frontal faces (% of face height).
    #[arg(long)]
    frontal_margin: Option<u32>,

    /// Margin for profile faces (% of face height).
    #[arg(long)]
    profile_margin: Option<u32>,

    /// Use the frontal crop for frontal faces when style is frontal.
    #[arg(long)]
    use_frontal: Option<bool>,

    /// Allow profile crops when style is profile.
    #[arg(long)]
    use_profile: Option<bool>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Sharpen the detector input.
    #[arg(long)]
    sharpen: Option<bool>,

    /// Rotate images upright from EXIF orientation before detection.
    #[arg(long)]
    rotate: Option<bool>,

    /// Filter: none, brightness, contrast, blur, edge-detection, sepia.
    #[arg(long)]
    filter: Option<FilterKind>,

    /// Filter intensity (0-100).
    #[arg(long)]
    intensity: Option<u8>,

    /// Target aspect ratio as W:H or a number; "none" disables.
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Use this ONNX model file instead of the cached download.
    #[arg(long)]
    model: Option<PathBuf>,
}

impl CropArgs {
    /// Flags layered over persisted settings.
    fn merge_into(&self, mut settings: Settings) -> Settings {
        if let Some(style) = self.style {
            settings.crop_style = style;
        }
        if let Some(margin) = self.margin {
            settings.frontal_margin = margin;
            settings.profile_margin = margin;
        }
        if let Some(m) = self.frontal_margin {
            settings.frontal_margin = m;
        }
        if let Some(m) = self.profile_margin {
            settings.profile_margin = m;
        }
        if let Some(v) = self.use_frontal {
            settings.use_frontal = v;
        }
        if let Some(v) = self.use_profile {
            settings.use_profile = v;
        }
        if let Some(c) = self.confidence {
            settings.confidence = c;
        }
        if let Some(v) = self.sharpen {
            settings.sharpen = v;
        }
        if let Some(v) = self.rotate {
            settings.apply_rotation = v;
        }
        if let Some(f) = self.filter {
            settings.filter = f;
        }
        if let Some(i) = self.intensity {
            settings.intensity = i;
        }
        if let Some(r) = &self.aspect_ratio {
            settings.aspect_ratio = r.clone();
        }
        settings
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let stored = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    match cli.command {
        Command::Batch {
            input,
            output,
            crop,
            workers,
            save_settings,
        } => {
            let settings = crop.merge_into(stored);
            let options = batch_options(&settings)?;
            if !input.is_dir() {
                return Err(format!("Input directory not found: {}", input.display()).into());
            }
            if workers == Some(0) {
                return Err("--workers must be at least 1".into());
            }
            if save_settings {
                match &cli.settings {
                    Some(path) => settings.save_to(path)?,
                    None => settings.save(),
                }
            }
            run_batch(&input, &output, options, workers, crop.model.as_deref())
        }
        Command::Preview {
            input,
            output,
            crop,
        } => {
            let settings = crop.merge_into(stored);
            let options = batch_options(&settings)?;
            if !input.is_file() {
                return Err(format!("Input image not found: {}", input.display()).into());
            }
            run_preview(&input, &output, options, crop.model.as_deref())
        }
        Command::Cleanup { previews, outputs } => run_cleanup(previews, outputs),
    }
}

fn run_batch(
    input: &Path,
    output: &Path,
    options: BatchOptions,
    workers: Option<usize>,
    model: Option<&Path>,
) -> Result<(), CliError> {
    let detector = build_detector(model)?;
    let mut use_case = BatchCropUseCase::new(detector, Arc::new(Finisher::default()));
    if let Some(n) = workers {
        use_case = use_case.with_pool_size(n);
    }

    let config = BatchConfig {
        options,
        on_progress: Some(Arc::new(|done, total| {
            eprint!("\rCropped {done}/{total}");
        })),
        ..BatchConfig::default()
    };
    let summary = use_case.process_batch(input, output, &config)?;
    eprintln!();

    for (name, failure) in &summary.failures {
        eprintln!("  skipped {name}: {failure}");
    }
    let (processed, total) = summary.counts();
    println!("{processed}/{total} images processed");
    Ok(())
}

fn run_preview(
    input: &Path,
    output: &Path,
    options: BatchOptions,
    model: Option<&Path>,
) -> Result<(), CliError> {
    let detector = build_detector(model)?;
    let mut use_case = PreviewCropUseCase::new(detector, Arc::new(Finisher::default()));

    let preview = use_case.preview(input, &options)?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let paths = use_case.save(&preview, output, &stem)?;

    println!("{}", preview.status.message());
    println!("before: {}", paths.before.display());
    if let Some(after) = paths.after {
        println!("after:  {}", after.display());
    }
    Ok(())
}

fn run_cleanup(previews: Option<PathBuf>, outputs: Option<PathBuf>) -> Result<(), CliError> {
    if previews.is_none() && outputs.is_none() {
        return Err("Nothing to clean: pass --previews and/or --outputs".into());
    }
    let targets = [
        (previews, "PREVIEW_RETENTION_HOURS", PREVIEW_RETENTION_HOURS),
        (outputs, "OUTPUT_RETENTION_HOURS", OUTPUT_RETENTION_HOURS),
    ];
    for (dir, var, default_hours) in targets {
        let Some(dir) = dir else { continue };
        let removed = cleanup_directory(&dir, retention_from_env(var, default_hours))?;
        println!("Removed {removed} old item(s) from {}", dir.display());
    }
    Ok(())
}

fn batch_options(settings: &Settings) -> Result<BatchOptions, CliError> {
    validate(settings)?;
    Ok(BatchOptions {
        detection: DetectionOptions {
            confidence_threshold: settings.confidence,
            sharpen: settings.sharpen,
            apply_rotation: settings.apply_rotation,
        },
        finish: FinishOptions {
            crop: CropParams {
                style: settings.crop_style,
                frontal_margin: settings.frontal_margin,
                profile_margin: settings.profile_margin,
                use_frontal: settings.use_frontal,
                use_profile: settings.use_profile,
            },
            filter: settings.filter,
            intensity: settings.intensity,
            aspect_ratio: parse_aspect_ratio(&settings.aspect_ratio),
        },
    })
}

fn validate(settings: &Settings) -> Result<(), CliError> {
    if !(0.0..=1.0).contains(&settings.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            settings.confidence
        )
        .into());
    }
    if settings.intensity > 100 {
        return Err(format!(
            "Intensity must be between 0 and 100, got {}",
            settings.intensity
        )
        .into());
    }
    let ratio = settings.aspect_ratio.trim();
    let disabled = ratio.is_empty() || ["none", "null"].contains(&ratio.to_lowercase().as_str());
    if !disabled && parse_aspect_ratio(ratio).is_none() {
        return Err(format!(
            "Aspect ratio must be W:H or a positive number, got '{}'",
            settings.aspect_ratio
        )
        .into());
    }
    Ok(())
}

fn build_detector(model: Option<&Path>) -> Result<Box<dyn FaceDetector>, CliError> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        model,
        Some(Box::new(download_progress)),
    )?;
    if let Some(path) = model.filter(|p| !p.exists()) {
        log::warn!("Model {} not found; using {}", path.display(), model_path.display());
    }
    Ok(Box::new(OnnxYoloDetector::new(&model_path)?))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}

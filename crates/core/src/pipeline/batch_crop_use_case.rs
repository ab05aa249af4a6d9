use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::detection::domain::face_detector::{FaceDetection, FaceDetector};
use crate::pipeline::batch_options::{BatchOptions, FinishOptions, ImageTask};
use crate::pipeline::finisher::Finisher;
use crate::pipeline::infrastructure::detection_worker::{panic_message, DetectionWorker, Shutdown};
use crate::pipeline::infrastructure::finishing_pool::FinishingPool;
use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::{IMAGE_EXTENSIONS, MAX_FINISHING_WORKERS, WORKER_SHUTDOWN_GRACE};
use crate::shared::errors::{BatchError, ImageFailure};

/// Called with `(completed, total)` once per consumed detection result that
/// was scheduled, successful or not. Invocations are serialized and `completed` never
/// decreases between them, but they come from pool threads.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Per-invocation inputs besides the directories.
#[derive(Clone, Default)]
pub struct BatchConfig {
    pub options: BatchOptions,
    pub on_progress: Option<ProgressCallback>,
    pub cancelled: CancellationToken,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Images written to the output directory.
    pub processed: usize,
    /// Eligible inputs found.
    pub total: usize,
    /// Every image that contributed nothing, sorted by file name.
    pub failures: Vec<(String, ImageFailure)>,
    /// Set when cancellation stopped scheduling before all results were used.
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn counts(&self) -> (usize, usize) {
        (self.processed, self.total)
    }
}

/// Counters shared by the controller and every finishing job of one batch.
struct JobState {
    total: usize,
    completed: AtomicUsize,
    report: Mutex<()>,
}

impl JobState {
    fn record(&self, ok: bool, on_progress: Option<&ProgressCallback>) {
        let inc = usize::from(ok);
        let _serialized = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        let done = self.completed.fetch_add(inc, Ordering::SeqCst) + inc;
        if let Some(callback) = on_progress {
            callback(done, self.total);
        }
    }
}

/// Crops every eligible image in a directory.
///
/// Detection is serialized on one worker thread that owns the detector;
/// finishing fans out over a small pool. Per-image problems are recorded in
/// the summary and never abort the batch.
pub struct BatchCropUseCase {
    detector: Option<Box<dyn FaceDetector>>,
    finisher: Arc<Finisher>,
    pool_size: usize,
    shutdown_grace: Duration,
}

impl BatchCropUseCase {
    pub fn new(detector: Box<dyn FaceDetector>, finisher: Arc<Finisher>) -> Self {
        Self {
            detector: Some(detector),
            finisher,
            pool_size: default_pool_size(),
            shutdown_grace: WORKER_SHUTDOWN_GRACE,
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// False once a worker failed to hand the detector back.
    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn process_batch(
        &mut self,
        input_dir: &Path,
        output_dir: &Path,
        config: &BatchConfig,
    ) -> Result<BatchSummary, BatchError> {
        if self.pool_size == 0 {
            return Err(BatchError::InvalidPoolSize(self.pool_size));
        }

        let inputs = list_input_images(input_dir)?;
        if inputs.is_empty() {
            log::info!("No eligible images in {}", input_dir.display());
            return Ok(BatchSummary::default());
        }

        fs::create_dir_all(output_dir).map_err(|source| BatchError::CreateOutput {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let detector = self.detector.take().ok_or(BatchError::DetectorUnavailable)?;

        log::info!(
            "Processing {} image(s) from {} into {}",
            inputs.len(),
            input_dir.display(),
            output_dir.display()
        );
        let worker = DetectionWorker::spawn(detector);
        let result = self.run(&worker, inputs, output_dir, config);

        match worker.shutdown(self.shutdown_grace) {
            Shutdown::Stopped(detector) => self.detector = Some(detector),
            Shutdown::TimedOut | Shutdown::Panicked => {
                log::warn!("Face detector was not recovered; further batches will fail")
            }
        }

        if let Ok(summary) = &result {
            log::info!(
                "Batch finished: {}/{} image(s) cropped, {} skipped{}",
                summary.processed,
                summary.total,
                summary.failures.len(),
                if summary.cancelled { " (cancelled)" } else { "" }
            );
        }
        result
    }

    fn run(
        &self,
        worker: &DetectionWorker,
        inputs: Vec<(String, PathBuf)>,
        output_dir: &Path,
        config: &BatchConfig,
    ) -> Result<BatchSummary, BatchError> {
        let total = inputs.len();
        for (filename, input_path) in inputs {
            let task = ImageTask {
                filename,
                input_path,
                options: config.options,
            };
            worker
                .submit(task)
                .map_err(|_| BatchError::WorkerDisconnected)?;
        }

        let pool = FinishingPool::new(self.pool_size)?;
        log::debug!("Finishing on {} thread(s)", pool.size());

        let state = Arc::new(JobState {
            total,
            completed: AtomicUsize::new(0),
            report: Mutex::new(()),
        });
        let (failure_tx, failure_rx) = crossbeam_channel::unbounded::<(String, ImageFailure)>();
        let mut cancelled = false;

        for consumed in 0..total {
            let outcome = worker
                .get_result()
                .map_err(|_| BatchError::WorkerDisconnected)?;

            if config.cancelled.is_cancelled() {
                log::info!("Cancelled after {consumed} of {total} detection result(s)");
                cancelled = true;
                break;
            }

            // Faceless outcomes still go through the pool so they report progress.
            let job = FinishJob {
                filename: outcome.filename,
                detection: outcome.detection,
                options: config.options.finish,
                output_dir: output_dir.to_path_buf(),
                finisher: Arc::clone(&self.finisher),
                state: Arc::clone(&state),
                on_progress: config.on_progress.clone(),
                failure_tx: failure_tx.clone(),
            };
            pool.execute(move || job.run());
        }

        // Already scheduled work always completes, cancelled or not.
        pool.join();
        drop(failure_tx);

        let mut failures: Vec<_> = failure_rx.try_iter().collect();
        failures.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(BatchSummary {
            processed: state.completed.load(Ordering::SeqCst),
            total,
            failures,
            cancelled,
        })
    }
}

struct FinishJob {
    filename: String,
    detection: Result<FaceDetection, ImageFailure>,
    options: FinishOptions,
    output_dir: PathBuf,
    finisher: Arc<Finisher>,
    state: Arc<JobState>,
    on_progress: Option<ProgressCallback>,
    failure_tx: crossbeam_channel::Sender<(String, ImageFailure)>,
}

impl FinishJob {
    fn run(self) {
        let result = match &self.detection {
            Ok(face) => panic::catch_unwind(AssertUnwindSafe(|| {
                self.finisher
                    .finish(&self.filename, face, &self.options, &self.output_dir)
            }))
            .unwrap_or_else(|payload| {
                Err(ImageFailure::Finishing(format!(
                    "panicked: {}",
                    panic_message(payload.as_ref())
                )))
            }),
            Err(failure) => Err(failure.clone()),
        };

        let ok = match result {
            Ok(path) => {
                log::debug!("{} -> {}", self.filename, path.display());
                true
            }
            Err(failure) => {
                log::warn!("{}: {failure}; skipping", self.filename);
                let _ = self.failure_tx.send((self.filename, failure));
                false
            }
        };
        self.state.record(ok, self.on_progress.as_ref());
    }
}

/// `min(4, available parallelism)`.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_FINISHING_WORKERS)
}

/// Files in `dir` with an accepted image extension, sorted by file name.
pub fn list_input_images(dir: &Path) -> Result<Vec<(String, PathBuf)>, BatchError> {
    let entries = fs::read_dir(dir).map_err(|source| BatchError::ReadInput {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut images: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|path| path.is_file() && has_image_extension(path))
        .filter_map(|path| {
            // Non-UTF-8 names keep their real path; the name is for display and output.
            let name = path.file_name()?.to_string_lossy().into_owned();
            Some((name, path))
        })
        .collect();

    images.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

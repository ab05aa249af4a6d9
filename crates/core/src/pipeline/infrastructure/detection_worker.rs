//! Single-owner actor around the face detector.
//!
//! One dedicated thread owns the detector and runs detection calls one at a
//! time, in submission order. Callers only talk to it through two unbounded
//! FIFO channels, so results come back in exactly the order tasks went in.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::detection::domain::detection_outcome::DetectionOutcome;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::batch_options::ImageTask;
use crate::shared::constants::WORKER_SHUTDOWN_GRACE;
use crate::shared::errors::ImageFailure;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("detection worker is shutting down")]
    ShuttingDown,
    #[error("detection worker thread is gone")]
    Disconnected,
}

/// Lifecycle: `Idle ⇄ Running → Draining → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    /// Working through the submission queue.
    Running = 1,
    /// Shutdown requested; at most the in-flight call is still finishing.
    Draining = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// How a shutdown ended.
pub enum Shutdown {
    /// The thread exited within the grace period and handed the detector back.
    Stopped(Box<dyn FaceDetector>),
    /// The grace period elapsed; the thread was detached with the detector.
    TimedOut,
    /// The thread died without returning the detector.
    Panicked,
}

pub struct DetectionWorker {
    task_tx: Option<Sender<ImageTask>>,
    result_rx: Receiver<DetectionOutcome>,
    done_rx: Receiver<Box<dyn FaceDetector>>,
    handle: Option<JoinHandle<()>>,
    state: Arc<AtomicU8>,
    stop: Arc<AtomicBool>,
}

impl DetectionWorker {
    /// Moves `detector` onto a new worker thread.
    pub fn spawn(detector: Box<dyn FaceDetector>) -> Self {
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<ImageTask>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<DetectionOutcome>();
        let (done_tx, done_rx) = crossbeam_channel::bounded::<Box<dyn FaceDetector>>(1);
        let state = Arc::new(AtomicU8::new(WorkerState::Idle as u8));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let state = Arc::clone(&state);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let detector = run_loop(detector, task_rx, result_tx, &state, &stop);
                state.store(WorkerState::Stopped as u8, Ordering::Release);
                let _ = done_tx.send(detector);
            })
        };

        Self {
            task_tx: Some(task_tx),
            result_rx,
            done_rx,
            handle: Some(handle),
            state,
            stop,
        }
    }

    /// Enqueues a task and returns immediately.
    pub fn submit(&self, task: ImageTask) -> Result<(), WorkerError> {
        if matches!(self.state(), WorkerState::Draining | WorkerState::Stopped) {
            return Err(WorkerError::ShuttingDown);
        }
        let tx = self.task_tx.as_ref().ok_or(WorkerError::ShuttingDown)?;
        tx.send(task).map_err(|_| WorkerError::Disconnected)
    }

    /// Blocks until the next outcome, in submission order.
    pub fn get_result(&self) -> Result<DetectionOutcome, WorkerError> {
        self.result_rx.recv().map_err(|_| WorkerError::Disconnected)
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Signals termination and waits up to `grace` for the thread to exit.
    ///
    /// Queued tasks that have not started are dropped. A timeout is logged
    /// and the thread is left to finish on its own.
    pub fn shutdown(mut self, grace: Duration) -> Shutdown {
        self.stop_within(grace).unwrap_or(Shutdown::Panicked)
    }

    fn stop_within(&mut self, grace: Duration) -> Option<Shutdown> {
        let handle = self.handle.take()?;

        self.stop.store(true, Ordering::Release);
        let _ = self.state.fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
            (s != WorkerState::Stopped as u8).then_some(WorkerState::Draining as u8)
        });
        // Closing the queue wakes the thread if it is waiting for work.
        self.task_tx.take();

        match self.done_rx.recv_timeout(grace) {
            Ok(detector) => {
                let _ = handle.join();
                log::debug!("Detection worker stopped");
                Some(Shutdown::Stopped(detector))
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Detection worker did not stop within {:.1}s; detaching it",
                    grace.as_secs_f64()
                );
                Some(Shutdown::TimedOut)
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                log::warn!("Detection worker thread panicked");
                Some(Shutdown::Panicked)
            }
        }
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.stop_within(WORKER_SHUTDOWN_GRACE);
    }
}

fn run_loop(
    mut detector: Box<dyn FaceDetector>,
    task_rx: Receiver<ImageTask>,
    result_tx: Sender<DetectionOutcome>,
    state: &AtomicU8,
    stop: &AtomicBool,
) -> Box<dyn FaceDetector> {
    for task in task_rx.iter() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let _ = state.compare_exchange(
            WorkerState::Idle as u8,
            WorkerState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        let outcome = detect_one(detector.as_mut(), task);
        if result_tx.send(outcome).is_err() {
            break;
        }

        if task_rx.is_empty() {
            // Fails harmlessly once shutdown has moved us to Draining.
            let _ = state.compare_exchange(
                WorkerState::Running as u8,
                WorkerState::Idle as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
    detector
}

/// Runs one detection; errors and panics become the outcome's failure.
fn detect_one(detector: &mut dyn FaceDetector, task: ImageTask) -> DetectionOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        detector.detect(&task.input_path, &task.options.detection)
    }));

    let detection = match result {
        Ok(Ok(Some(face))) => Ok(face),
        Ok(Ok(None)) => Err(ImageFailure::NoFace),
        Ok(Err(e)) => Err(ImageFailure::Detection(e.to_string())),
        Err(payload) => Err(ImageFailure::Detection(format!(
            "detector panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };

    DetectionOutcome {
        filename: task.filename,
        detection,
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

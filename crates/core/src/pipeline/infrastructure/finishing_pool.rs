use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::shared::errors::BatchError;

use super::detection_worker::panic_message;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size set of threads running finishing jobs in arbitrary order.
///
/// Jobs already handed to the pool always run to completion: there is no
/// way to cancel them, only to stop handing out new ones.
pub struct FinishingPool {
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl FinishingPool {
    pub fn new(size: usize) -> Result<Self, BatchError> {
        if size == 0 {
            return Err(BatchError::InvalidPoolSize(size));
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let workers = (0..size)
            .map(|_| {
                let job_rx = job_rx.clone();
                std::thread::spawn(move || {
                    for job in job_rx {
                        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                            log::error!(
                                "Finishing job panicked: {}",
                                panic_message(payload.as_ref())
                            );
                        }
                    }
                })
            })
            .collect();

        log::debug!("Started {size} finishing worker(s)");
        Ok(Self {
            job_tx: Some(job_tx),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let sent = self
            .job_tx
            .as_ref()
            .map(|tx| tx.send(Box::new(job)).is_ok())
            .unwrap_or(false);
        if !sent {
            log::error!("Finishing pool is closed; job dropped");
        }
    }

    /// Waits for every job handed out so far.
    pub fn join(mut self) {
        self.join_all();
    }

    fn join_all(&mut self) {
        self.job_tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Finishing worker thread panicked");
            }
        }
    }
}

impl Drop for FinishingPool {
    fn drop(&mut self) {
        self.join_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(
            FinishingPool::new(0),
            Err(BatchError::InvalidPoolSize(0))
        ));
    }

    #[test]
    fn test_join_waits_for_all_jobs() {
        let pool = FinishingPool::new(3).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let done = Arc::clone(&done);
            pool.execute(move || {
                std::thread::sleep(Duration::from_millis(5));
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.join();
        assert_eq!(done.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_concurrency_is_bounded_by_size() {
        let pool = FinishingPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let (running, peak) = (Arc::clone(&running), Arc::clone(&peak));
            pool.execute(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(10));
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.join();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = FinishingPool::new(1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        pool.execute(|| panic!("bad pixels"));
        let counter = Arc::clone(&done);
        pool.execute(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        pool.join();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_also_drains() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let pool = FinishingPool::new(2).unwrap();
            for _ in 0..4 {
                let done = Arc::clone(&done);
                pool.execute(move || {
                    done.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }
}

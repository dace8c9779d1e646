//! Fixed-size pool of tokio workers draining a shared bounded queue.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};

use super::{panic_message, Job, JobRunner};
use crate::error::{PoolError, PoolResult};

/// Configuration for the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of workers spawned at construction.
    pub workers: usize,
    /// Jobs that may wait in the queue before `dispatch` starts waiting.
    pub queue_capacity: usize,
    /// Upper bound on how long `dispatch` waits for queue room. `None`
    /// waits indefinitely.
    pub submit_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            queue_capacity: 100,
            submit_timeout: None,
        }
    }
}

impl PoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_submit_timeout(mut self, submit_timeout: Duration) -> Self {
        self.submit_timeout = Some(submit_timeout);
        self
    }
}

type SharedQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>;

/// Bounded worker pool.
///
/// Workers are spawned once, at construction, and live until
/// [`WorkerPool::shutdown`]. A job that panics is logged and the worker
/// moves on to the next job, so a bad job never shrinks the pool.
pub struct WorkerPool {
    /// `None` once the pool is shut down.
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    config: PoolConfig,
}

impl WorkerPool {
    /// Spawns the workers. Must be called from within a Tokio runtime.
    ///
    /// Zero workers or a zero-sized queue are raised to one.
    pub fn new(config: PoolConfig) -> Self {
        let config = PoolConfig {
            workers: config.workers.max(1),
            queue_capacity: config.queue_capacity.max(1),
            ..config
        };

        let (sender, receiver) = mpsc::channel::<Job>(config.queue_capacity);
        let queue: SharedQueue = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..config.workers)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&queue))))
            .collect();

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            handles: Mutex::new(handles),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn workers(&self) -> usize {
        self.config.workers
    }

    /// Jobs currently waiting for a worker.
    pub fn queued_jobs(&self) -> usize {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |s| s.max_capacity() - s.capacity())
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Closes the queue and waits for the workers to finish queued jobs.
    ///
    /// Later dispatches fail with [`PoolError::Closed`].
    pub async fn shutdown(&self) {
        // Dropping the last sender lets workers drain the queue and stop.
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let handles: Vec<JoinHandle<()>> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task failed");
            }
        }
        info!("worker pool stopped");
    }
}

#[async_trait]
impl JobRunner for WorkerPool {
    async fn dispatch(&self, job: Job) -> PoolResult<()> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(PoolError::Closed)?;

        match self.config.submit_timeout {
            Some(limit) => match timeout(limit, sender.send(job)).await {
                Ok(sent) => sent.map_err(|_| PoolError::Closed),
                Err(_) => Err(PoolError::Saturated {
                    waited_ms: limit.as_millis() as u64,
                }),
            },
            None => sender.send(job).await.map_err(|_| PoolError::Closed),
        }
    }
}

async fn run_worker(id: usize, queue: SharedQueue) {
    loop {
        // Only one idle worker waits on the receiver at a time; the others
        // queue on the mutex.
        let next = queue.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        if let Err(payload) = AssertUnwindSafe(job).catch_unwind().await {
            error!(
                worker = id,
                panic = %panic_message(payload.as_ref()),
                "job panicked; worker recovered"
            );
        }
    }
    debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::{oneshot, Notify};

    use crate::pool::{submit, JobResult};

    #[tokio::test]
    async fn test_pool_runs_jobs_and_tags_results() {
        let pool = WorkerPool::new(PoolConfig::default().with_workers(2));
        let (tx, mut rx) = mpsc::channel::<JobResult<usize, usize>>(10);

        for i in 0..10 {
            submit(&pool, i, async move { i * 2 }, tx.clone())
                .await
                .unwrap();
        }
        drop(tx);

        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            assert_eq!(result.outcome, Ok(result.key * 2));
            results.push(result.key);
        }
        results.sort_unstable();
        assert_eq!(results, (0..10).collect::<Vec<_>>());

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_pool_never_exceeds_worker_count() {
        let pool = WorkerPool::new(PoolConfig::default().with_workers(3));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel::<JobResult<usize, ()>>(12);

        for i in 0..12 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let task = async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            };
            submit(&pool, i, task, tx.clone()).await.unwrap();
        }
        drop(tx);

        let mut completed = 0;
        while rx.recv().await.is_some() {
            completed += 1;
        }
        assert_eq!(completed, 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_shrink_pool() {
        let pool = WorkerPool::new(PoolConfig::default().with_workers(1));
        let (tx, mut rx) = mpsc::channel::<JobResult<&str, u32>>(2);

        fn explode() -> u32 {
            panic!("bad job")
        }

        submit(&pool, "bad", async { explode() }, tx.clone())
            .await
            .unwrap();
        submit(&pool, "good", async { 1 }, tx).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.key, "bad");
        assert!(matches!(first.outcome, Err(PoolError::TaskPanicked { .. })));

        // The single worker survived and ran the next job
        let second = rx.recv().await.unwrap();
        assert_eq!(second.key, "good");
        assert_eq!(second.outcome, Ok(1));

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_raw_job_panic_is_recovered_by_worker() {
        let pool = WorkerPool::new(PoolConfig::default().with_workers(1));
        pool.dispatch(Box::pin(async { panic!("unwrapped"); }))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel::<JobResult<(), u8>>(1);
        submit(&pool, (), async { 9 }, tx).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().outcome, Ok(9));

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_dispatch_times_out_when_queue_is_full() {
        let pool = WorkerPool::new(
            PoolConfig::default()
                .with_workers(1)
                .with_queue_capacity(1)
                .with_submit_timeout(Duration::from_millis(50)),
        );
        let release = Arc::new(Notify::new());

        // Occupy the only worker
        let (started_tx, started_rx) = oneshot::channel();
        let gate = Arc::clone(&release);
        pool.dispatch(Box::pin(async move {
            let _ = started_tx.send(());
            gate.notified().await;
        }))
        .await
        .unwrap();
        started_rx.await.unwrap();

        // Fill the queue
        let gate = Arc::clone(&release);
        pool.dispatch(Box::pin(async move { gate.notified().await }))
            .await
            .unwrap();

        let result = pool.dispatch(Box::pin(async {})).await;
        assert_eq!(result, Err(PoolError::Saturated { waited_ms: 50 }));

        release.notify_waiters();
        release.notify_one();
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(PoolConfig::default().with_workers(2));
        pool.shutdown().await;

        assert!(pool.is_closed());
        let result = pool.dispatch(Box::pin(async {})).await;
        assert_eq!(result, Err(PoolError::Closed));
    }

    #[tokio::test]
    async fn test_zero_sized_config_is_raised_to_one() {
        let pool = WorkerPool::new(
            PoolConfig::default()
                .with_workers(0)
                .with_queue_capacity(0),
        );
        assert_eq!(pool.workers(), 1);
        assert_eq!(pool.config().queue_capacity, 1);
        assert_eq!(pool.queued_jobs(), 0);
        pool.shutdown().await;
    }
}

//! Bounded worker pool for partition jobs.
//!
//! The pool is built once per process and shared by every request, so its
//! size bounds the number of concurrent tuple-store calls across the whole
//! service. Callers hold it as an `Arc<dyn JobRunner>`; tests can substitute
//! [`InlineRunner`] to run jobs on the calling task.
//!
//! # Architecture
//!
//! ```text
//!  submit(key, task, results) ──► bounded queue ──► worker 1..N
//!                                                       │
//!      results channel ◄── JobResult { key, outcome } ◄─┘
//! ```
//!
//! Each submitted task is wrapped so that its output (or the panic it
//! raised) lands on the caller's result channel tagged with the caller's
//! key. Dropping the result sender after the send is the completion signal.

mod inline;
mod worker;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;

use crate::error::{PoolError, PoolResult};

pub use inline::InlineRunner;
pub use worker::{PoolConfig, WorkerPool};

/// A type-erased unit of work accepted by a [`JobRunner`].
pub type Job = BoxFuture<'static, ()>;

/// Something that executes jobs, either on a pool or inline.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Hands a job over for execution.
    ///
    /// Waits while the runner has no room; fails with
    /// [`PoolError::Saturated`] or [`PoolError::Closed`] without running the
    /// job.
    async fn dispatch(&self, job: Job) -> PoolResult<()>;
}

/// Envelope written to the result channel for every submitted task.
#[derive(Debug)]
pub struct JobResult<K, T> {
    pub key: K,
    pub outcome: PoolResult<T>,
}

/// Submits `task` to `runner`; its output is sent on `results` tagged with
/// `key`.
///
/// A panic inside `task` is caught and delivered as
/// [`PoolError::TaskPanicked`].
pub async fn submit<R, K, T, F>(
    runner: &R,
    key: K,
    task: F,
    results: mpsc::Sender<JobResult<K, T>>,
) -> PoolResult<()>
where
    R: JobRunner + ?Sized,
    K: Send + 'static,
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let job = async move {
        let outcome = AssertUnwindSafe(task)
            .catch_unwind()
            .await
            .map_err(|payload| PoolError::TaskPanicked {
                message: panic_message(payload.as_ref()),
            });
        // The receiver is gone only if the caller stopped collecting.
        let _ = results.send(JobResult { key, outcome }).await;
    };
    runner.dispatch(job.boxed()).await
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

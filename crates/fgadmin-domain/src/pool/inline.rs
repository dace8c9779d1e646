//! Runner that executes jobs on the dispatching task.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::error;

use super::{panic_message, Job, JobRunner};
use crate::error::PoolResult;

/// Runs each job to completion inside `dispatch`.
///
/// Jobs execute one after another in submission order, which makes it the
/// sequential reference for comparing against [`super::WorkerPool`] and a
/// drop-in replacement in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRunner;

impl InlineRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl JobRunner for InlineRunner {
    async fn dispatch(&self, job: Job) -> PoolResult<()> {
        if let Err(payload) = AssertUnwindSafe(job).catch_unwind().await {
            error!(panic = %panic_message(payload.as_ref()), "inline job panicked");
        }
        Ok(())
    }
}

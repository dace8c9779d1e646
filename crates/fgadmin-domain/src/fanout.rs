//! Fan-out/fan-in over a job runner.
//!
//! [`fan_out`] submits N keyed jobs and collects exactly N envelopes, one
//! per key, regardless of completion order. The result channel is sized to
//! N so a job never blocks on sending its result, even when the caller
//! stops collecting early or the runner executes jobs inline.
//!
//! The aggregation helpers turn per-partition envelopes into a best-effort
//! page: data from every successful partition is kept, and each failing
//! partition is reported by tag and cause.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{PoolError, PoolResult};
use crate::pagination::PageTokens;
use crate::pool::{submit, JobResult, JobRunner};

/// Submits every `(key, task)` pair and waits for all of them.
///
/// Keys must be unique within one call. Results come back in submission
/// order. A job that is dropped without running is reported as
/// [`PoolError::Dropped`] under its key.
///
/// Fails only if a submission is rejected by the runner (saturation or
/// shutdown). Jobs submitted before the rejection still run to completion;
/// their results are discarded.
pub async fn fan_out<R, K, T, F>(runner: &R, jobs: Vec<(K, F)>) -> PoolResult<Vec<JobResult<K, T>>>
where
    R: JobRunner + ?Sized,
    K: Clone + Eq + Hash + Send + 'static,
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let expected = jobs.len();
    let order: HashMap<K, usize> = jobs
        .iter()
        .enumerate()
        .map(|(index, (key, _))| (key.clone(), index))
        .collect();

    let (tx, mut rx) = mpsc::channel(expected.max(1));
    for (key, task) in jobs {
        submit(runner, key, task, tx.clone()).await?;
    }
    drop(tx);

    let mut slots: Vec<Option<JobResult<K, T>>> = (0..expected).map(|_| None).collect();
    let mut received = 0;
    while received < expected {
        let Some(result) = rx.recv().await else {
            break;
        };
        if let Some(&index) = order.get(&result.key) {
            slots[index] = Some(result);
            received += 1;
        }
    }

    let mut keys: Vec<Option<K>> = vec![None; expected];
    for (key, index) in order {
        keys[index] = Some(key);
    }

    Ok(slots
        .into_iter()
        .zip(keys)
        .filter_map(|(slot, key)| {
            slot.or_else(|| {
                key.map(|key| JobResult {
                    key,
                    outcome: Err(PoolError::Dropped),
                })
            })
        })
        .collect())
}

/// What a partition job was doing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Read,
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Read => f.write_str("read"),
            FailureKind::Write => f.write_str("write"),
        }
    }
}

/// One failed partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFailure {
    pub partition: String,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for PartitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partition '{}' {} failed: {}",
            self.partition, self.kind, self.message
        )
    }
}

/// Every failed partition of one fan-out call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionFailures(Vec<PartitionFailure>);

impl PartitionFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: PartitionFailure) {
        self.0.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionFailure> {
        self.0.iter()
    }

    /// Names of the failed partitions.
    pub fn partitions(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.partition.as_str()).collect()
    }

    pub fn contains(&self, partition: &str) -> bool {
        self.0.iter().any(|f| f.partition == partition)
    }

    /// Collects failures from write-style jobs, which produce no data.
    pub fn from_results<E: fmt::Display>(
        results: Vec<JobResult<String, Result<(), E>>>,
        kind: FailureKind,
    ) -> Self {
        let mut failures = Self::new();
        for result in results {
            if let Some(message) = failure_message(result.outcome) {
                failures.push(PartitionFailure {
                    partition: result.key,
                    kind,
                    message,
                });
            }
        }
        failures
    }
}

impl fmt::Display for PartitionFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl IntoIterator for PartitionFailures {
    type Item = PartitionFailure;
    type IntoIter = std::vec::IntoIter<PartitionFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn failure_message<T, E: fmt::Display>(outcome: PoolResult<Result<T, E>>) -> Option<String> {
    match outcome {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => Some(e.to_string()),
    }
}

/// Output of one successful page read in one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionPage {
    pub items: Vec<String>,
    /// Store cursor for the next page; empty once the partition is exhausted.
    pub next_cursor: String,
}

/// Merged result of one paginated fan-out call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutPage {
    /// Items from every successful partition, in partition order.
    pub items: Vec<String>,
    /// Cursor map to hand back to the caller.
    pub next_page_tokens: PageTokens,
    /// Partitions whose read failed.
    pub failures: PartitionFailures,
}

impl FanOutPage {
    /// Merges per-partition results.
    ///
    /// Successful partitions contribute their items and next cursor. A
    /// failed partition keeps the cursor from `prior`, so the next call
    /// retries the same page instead of skipping or restarting it.
    pub fn collect<E: fmt::Display>(
        prior: &PageTokens,
        results: Vec<JobResult<String, Result<PartitionPage, E>>>,
    ) -> Self {
        let mut page = FanOutPage::default();
        for result in results {
            match result.outcome {
                Ok(Ok(partition)) => {
                    page.items.extend(partition.items);
                    page.next_page_tokens
                        .insert(result.key, partition.next_cursor);
                }
                outcome => {
                    let message = failure_message(outcome).unwrap_or_default();
                    warn!(partition = %result.key, error = %message, "partition read failed");
                    page.next_page_tokens
                        .insert(result.key.clone(), prior.cursor(&result.key));
                    page.failures.push(PartitionFailure {
                        partition: result.key,
                        kind: FailureKind::Read,
                        message,
                    });
                }
            }
        }
        page
    }

    /// The failed partitions, if any.
    pub fn error(&self) -> Option<&PartitionFailures> {
        (!self.failures.is_empty()).then_some(&self.failures)
    }

    /// True when every partition answered.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when no partition has more data.
    pub fn is_last_page(&self) -> bool {
        self.is_complete() && self.next_page_tokens.is_exhausted()
    }
}

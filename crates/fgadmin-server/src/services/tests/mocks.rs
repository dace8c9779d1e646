//! Mock stores and runners for service testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fgadmin_domain::pool::{Job, JobRunner};
use fgadmin_domain::{PoolError, PoolResult};
use fgadmin_storage::{
    MemoryTupleStore, StoreError, StoreResult, Tuple, TupleFilter, TuplePage, TupleStore,
};
use tokio::sync::RwLock;

/// What a read against a targeted partition does.
#[derive(Debug, Clone)]
pub enum ReadFault {
    Fail(StoreError),
    Panic,
    Delay(Duration),
}

/// Memory store wrapper with fault injection and call counting.
///
/// Read faults target a filter's object type (`role`) or relation
/// (`member`). Delete faults target tuples of an object type.
pub struct FaultyStore {
    inner: MemoryTupleStore,
    read_faults: RwLock<HashMap<String, ReadFault>>,
    delete_faults: RwLock<HashMap<String, StoreError>>,
    calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::with_page_size(fgadmin_storage::memory::DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: MemoryTupleStore::with_page_size(page_size),
            read_faults: RwLock::new(HashMap::new()),
            delete_faults: RwLock::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Seeds tuples without counting a call.
    pub async fn seed(&self, tuples: &[(&str, &str, &str)]) {
        let tuples = tuples
            .iter()
            .map(|(s, r, o)| Tuple::new(*s, *r, *o))
            .collect();
        self.inner.write_tuples(tuples).await.unwrap();
    }

    pub async fn fault_reads(&self, target: &str, fault: ReadFault) {
        self.read_faults
            .write()
            .await
            .insert(target.to_string(), fault);
    }

    pub async fn fail_reads(&self, target: &str, error: StoreError) {
        self.fault_reads(target, ReadFault::Fail(error)).await;
    }

    pub async fn clear_read_faults(&self) {
        self.read_faults.write().await.clear();
    }

    pub async fn fail_deletes(&self, object_type: &str, error: StoreError) {
        self.delete_faults
            .write()
            .await
            .insert(object_type.to_string(), error);
    }

    /// Store calls made through the trait.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, subject: &str, relation: &str, object: &str) -> bool {
        self.inner.contains(&Tuple::new(subject, relation, object))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn read_fault(&self, filter: &TupleFilter) -> Option<ReadFault> {
        let faults = self.read_faults.read().await;
        filter
            .object_type()
            .and_then(|t| faults.get(t))
            .or_else(|| faults.get(&filter.relation))
            .cloned()
    }
}

#[async_trait]
impl TupleStore for FaultyStore {
    async fn list_objects(
        &self,
        subject: &str,
        relation: &str,
        object_type: &str,
    ) -> StoreResult<Vec<String>> {
        self.record();
        self.inner.list_objects(subject, relation, object_type).await
    }

    async fn read_tuples(&self, filter: &TupleFilter, cursor: &str) -> StoreResult<TuplePage> {
        self.record();
        match self.read_fault(filter).await {
            Some(ReadFault::Fail(error)) => return Err(error),
            Some(ReadFault::Panic) => panic!("store client bug"),
            Some(ReadFault::Delay(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }
        self.inner.read_tuples(filter, cursor).await
    }

    async fn write_tuples(&self, tuples: Vec<Tuple>) -> StoreResult<()> {
        self.record();
        self.inner.write_tuples(tuples).await
    }

    async fn delete_tuples(&self, tuples: Vec<Tuple>) -> StoreResult<()> {
        self.record();
        {
            let faults = self.delete_faults.read().await;
            if let Some(error) = tuples.iter().find_map(|t| faults.get(t.object_type())) {
                return Err(error.clone());
            }
        }
        self.inner.delete_tuples(tuples).await
    }

    async fn check(&self, subject: &str, relation: &str, object: &str) -> StoreResult<bool> {
        self.record();
        self.inner.check(subject, relation, object).await
    }

    async fn batch_check(&self, tuples: Vec<Tuple>) -> StoreResult<bool> {
        self.record();
        self.inner.batch_check(tuples).await
    }

    async fn list_users(
        &self,
        subject_type: &str,
        relation: &str,
        object: &str,
    ) -> StoreResult<Vec<String>> {
        self.record();
        self.inner.list_users(subject_type, relation, object).await
    }
}

/// Runner that rejects every job as if its queue were full.
pub struct SaturatedRunner;

#[async_trait]
impl JobRunner for SaturatedRunner {
    async fn dispatch(&self, _job: Job) -> PoolResult<()> {
        Err(PoolError::Saturated { waited_ms: 10 })
    }
}

pub fn timeout_error() -> StoreError {
    StoreError::Timeout {
        operation: "read_tuples".to_string(),
        duration_ms: 50,
    }
}

//! Partition jobs shared by the group and role services.
//!
//! Both services hold permissions through a userset subject
//! (`group:<id>#member`, `role:<id>#assignee`) on objects spread across the
//! fixed partitions. Listing reads one page per partition; cascading
//! deletion drains every partition plus the relations held directly on the
//! group or role object.
//!
//! Each job receives its partition, cursor and filter as arguments and owns
//! clones of the store handle and cancellation token.

use std::future::Future;
use std::sync::Arc;

use fgadmin_domain::{
    fan_out, is_permission_relation, DirectRelation, FailureKind, FanOutPage, JobRunner,
    PageTokens, PartitionFailures, PartitionPage, PartitionTag, Permission,
};
use fgadmin_storage::{StoreResult, Tuple, TupleFilter, TupleStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{ServiceError, ServiceResult};

/// Key under which a direct relation's drain job reports.
pub(crate) fn relation_key(relation: &str) -> String {
    format!("relation:{relation}")
}

/// Store and runner handles plus the fan-out operations built on them.
#[derive(Clone)]
pub(crate) struct PartitionEngine {
    store: Arc<dyn TupleStore>,
    runner: Arc<dyn JobRunner>,
}

impl PartitionEngine {
    pub(crate) fn new(store: Arc<dyn TupleStore>, runner: Arc<dyn JobRunner>) -> Self {
        Self { store, runner }
    }

    pub(crate) fn store(&self) -> &dyn TupleStore {
        self.store.as_ref()
    }

    /// Reads one page of permissions per partition for `subject`.
    ///
    /// Every partition is read on every call. A partition whose cursor is
    /// missing or empty starts from its first page, so callers stop paging
    /// once [`FanOutPage::is_last_page`] holds. Token keys that name no
    /// partition are ignored.
    pub(crate) async fn list_permissions(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        tokens: &PageTokens,
    ) -> ServiceResult<FanOutPage> {
        ensure_active(cancel)?;

        for (key, _) in tokens.iter() {
            if let Err(err) = key.parse::<PartitionTag>() {
                warn!(error = %err, "ignoring page token entry");
            }
        }

        let jobs: Vec<_> = PartitionTag::ALL
            .into_iter()
            .map(|tag| {
                let job = read_permission_page(
                    Arc::clone(&self.store),
                    cancel.clone(),
                    subject.to_string(),
                    tag,
                    tokens.cursor(tag.as_str()).to_string(),
                );
                (tag.as_str().to_string(), job)
            })
            .collect();

        let results = fan_out(self.runner.as_ref(), jobs).await?;
        ensure_active(cancel)?;

        let page = FanOutPage::collect(tokens, results);
        debug!(
            items = page.items.len(),
            failed = page.failures.len(),
            "listed permissions"
        );
        Ok(page)
    }

    /// Deletes every tuple with `subject` in any partition, and every tuple
    /// held directly on `object` through a direct relation or one of
    /// `extra_relations`.
    ///
    /// Partitions are independent: a failure in one does not stop or undo
    /// the others.
    pub(crate) async fn remove_all_relations(
        &self,
        cancel: &CancellationToken,
        subject: &str,
        object: &str,
        extra_relations: &[&str],
    ) -> ServiceResult<()> {
        ensure_active(cancel)?;

        let mut jobs = Vec::with_capacity(PartitionTag::ALL.len() + DirectRelation::ALL.len());
        for tag in PartitionTag::ALL {
            let filter = TupleFilter::new(subject, "", tag.object_filter());
            jobs.push((
                tag.as_str().to_string(),
                drain_and_delete(Arc::clone(&self.store), cancel.clone(), filter),
            ));
        }
        let mut relations: Vec<&str> = DirectRelation::ALL.iter().map(|r| r.as_str()).collect();
        relations.extend_from_slice(extra_relations);
        for relation in relations {
            let filter = TupleFilter::new("", relation, object);
            jobs.push((
                relation_key(relation),
                drain_and_delete(Arc::clone(&self.store), cancel.clone(), filter),
            ));
        }

        let results = fan_out(self.runner.as_ref(), jobs).await?;
        ensure_active(cancel)?;

        let failures = PartitionFailures::from_results(results, FailureKind::Write);
        if failures.is_empty() {
            return Ok(());
        }
        for failure in failures.iter() {
            warn!(
                partition = %failure.partition,
                error = %failure.message,
                "cascade delete failed for partition"
            );
        }
        Err(ServiceError::PartialFailure(failures))
    }
}

pub(crate) fn ensure_active(cancel: &CancellationToken) -> ServiceResult<()> {
    if cancel.is_cancelled() {
        Err(ServiceError::Cancelled)
    } else {
        Ok(())
    }
}

/// Runs a store call unless the token fires first.
pub(crate) async fn until_cancelled<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = StoreResult<T>>,
) -> ServiceResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ServiceError::Cancelled),
        result = call => result.map_err(ServiceError::from),
    }
}

async fn read_permission_page(
    store: Arc<dyn TupleStore>,
    cancel: CancellationToken,
    subject: String,
    tag: PartitionTag,
    cursor: String,
) -> ServiceResult<PartitionPage> {
    let filter = TupleFilter::new(subject, "", tag.object_filter());
    let page = until_cancelled(&cancel, store.read_tuples(&filter, &cursor)).await?;

    let items = page
        .tuples
        .into_iter()
        .filter(|t| is_permission_relation(&t.relation))
        .map(|t| Permission::new(t.relation, t.object).urn())
        .collect();

    Ok(PartitionPage {
        items,
        next_cursor: page.continuation_token,
    })
}

/// Reads every page matching `filter`, then deletes the collected tuples in
/// one call. Cancellation is checked before each page.
async fn drain_and_delete(
    store: Arc<dyn TupleStore>,
    cancel: CancellationToken,
    filter: TupleFilter,
) -> ServiceResult<()> {
    let mut doomed: Vec<Tuple> = Vec::new();
    let mut cursor = String::new();
    loop {
        ensure_active(&cancel)?;
        let page = until_cancelled(&cancel, store.read_tuples(&filter, &cursor)).await?;
        doomed.extend(page.tuples);
        if page.continuation_token.is_empty() {
            break;
        }
        cursor = page.continuation_token;
    }

    if doomed.is_empty() {
        return Ok(());
    }
    let count = doomed.len();
    until_cancelled(&cancel, store.delete_tuples(doomed)).await?;
    debug!(
        subject = %filter.subject,
        relation = %filter.relation,
        object = %filter.object,
        count,
        "drained tuples"
    );
    Ok(())
}

//! In-memory tuple store for tests and local runs.
//!
//! Tuples are sharded by object type in a `DashMap<String, HashSet<Tuple>>`,
//! so reads restricted to one type (the common case for partitioned
//! fan-out) only scan that shard.
//!
//! Check, list-objects and list-users follow usersets (`group:x#member`
//! subjects) up to a fixed depth, which is enough to model group membership
//! and role assignment without an authorization model.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    object_type_of, parse_tuple_cursor, validate_tuple, Tuple, TupleCursor, TupleFilter,
    TuplePage, TupleStore,
};

/// Default number of tuples per page, matching OpenFGA's default read page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Maximum userset expansion depth (OpenFGA's default resolution depth).
pub const MAX_EXPANSION_DEPTH: u32 = 25;

/// In-memory implementation of [`TupleStore`].
///
/// # Performance Characteristics
///
/// - **Write/delete tuple**: O(1) average (HashSet insert/remove)
/// - **Read tuples**: O(N log N) in the size of the scanned shard(s)
/// - **Check**: proportional to the number of usersets traversed
#[derive(Debug)]
pub struct MemoryTupleStore {
    /// Tuples keyed by object type.
    shards: DashMap<String, HashSet<Tuple>>,
    page_size: usize,
}

impl Default for MemoryTupleStore {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl MemoryTupleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that returns at most `page_size` tuples per read.
    /// A page size of zero is treated as one.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            shards: DashMap::new(),
            page_size: page_size.max(1),
        }
    }

    /// Creates a new in-memory store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total number of stored tuples.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.shards
            .get(tuple.object_type())
            .is_some_and(|shard| shard.contains(tuple))
    }

    /// Tuples whose relation and object match exactly. The shard guard is
    /// released before returning so callers can recurse.
    fn tuples_on(&self, relation: &str, object: &str) -> Vec<Tuple> {
        self.shards
            .get(object_type_of(object))
            .map(|shard| {
                shard
                    .iter()
                    .filter(|t| t.relation == relation && t.object == object)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_inner(
        &self,
        subject: &str,
        relation: &str,
        object: &str,
        depth: u32,
        visited: &mut HashSet<String>,
    ) -> StoreResult<bool> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(StoreError::Internal {
                message: format!("depth limit exceeded (max: {MAX_EXPANSION_DEPTH})"),
            });
        }
        if !visited.insert(format!("{object}#{relation}")) {
            return Ok(false);
        }

        let wildcard = format!("{}:*", object_type_of(subject));
        let candidates = self.tuples_on(relation, object);
        if candidates
            .iter()
            .any(|t| t.subject == subject || t.subject == wildcard)
        {
            return Ok(true);
        }

        for tuple in &candidates {
            if let Some((userset_object, userset_relation)) = tuple.subject.split_once('#') {
                if self.check_inner(subject, userset_relation, userset_object, depth + 1, visited)?
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn collect_users(
        &self,
        subject_type: &str,
        relation: &str,
        object: &str,
        depth: u32,
        visited: &mut HashSet<String>,
        users: &mut BTreeSet<String>,
    ) -> StoreResult<()> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(StoreError::Internal {
                message: format!("depth limit exceeded (max: {MAX_EXPANSION_DEPTH})"),
            });
        }
        if !visited.insert(format!("{object}#{relation}")) {
            return Ok(());
        }

        for tuple in self.tuples_on(relation, object) {
            match tuple.subject.split_once('#') {
                Some((userset_object, userset_relation)) => {
                    self.collect_users(
                        subject_type,
                        userset_relation,
                        userset_object,
                        depth + 1,
                        visited,
                        users,
                    )?;
                }
                None if object_type_of(&tuple.subject) == subject_type => {
                    users.insert(tuple.subject);
                }
                None => {}
            }
        }
        Ok(())
    }
}

fn validate_object_type(object_type: &str) -> StoreResult<()> {
    if object_type.is_empty() || object_type.contains(':') {
        return Err(StoreError::InvalidInput {
            message: format!("invalid object type '{object_type}'"),
        });
    }
    Ok(())
}

#[async_trait]
impl TupleStore for MemoryTupleStore {
    #[instrument(skip(self))]
    async fn list_objects(
        &self,
        subject: &str,
        relation: &str,
        object_type: &str,
    ) -> StoreResult<Vec<String>> {
        validate_object_type(object_type)?;

        let objects: BTreeSet<String> = self
            .shards
            .get(object_type)
            .map(|shard| shard.iter().map(|t| t.object.clone()).collect())
            .unwrap_or_default();

        let mut allowed = Vec::new();
        for object in objects {
            if self.check_inner(subject, relation, &object, 0, &mut HashSet::new())? {
                allowed.push(object);
            }
        }
        Ok(allowed)
    }

    async fn read_tuples(&self, filter: &TupleFilter, cursor: &str) -> StoreResult<TuplePage> {
        let cursor = parse_tuple_cursor(cursor)?;

        let mut filtered: Vec<Tuple> = match filter.object_type() {
            Some(object_type) => self
                .shards
                .get(object_type)
                .map(|shard| shard.iter().filter(|t| filter.matches(t)).cloned().collect())
                .unwrap_or_default(),
            None => self
                .shards
                .iter()
                .flat_map(|shard| {
                    shard
                        .iter()
                        .filter(|t| filter.matches(t))
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .collect(),
        };

        // Page order is (object, relation, subject)
        filtered.sort_by(|a, b| {
            (&a.object, &a.relation, &a.subject).cmp(&(&b.object, &b.relation, &b.subject))
        });

        let start_idx = match cursor {
            Some(ref cursor) => {
                let cursor_key = cursor.sort_key();
                filtered
                    .binary_search_by(|t| {
                        (t.object.as_str(), t.relation.as_str(), t.subject.as_str())
                            .cmp(&cursor_key)
                    })
                    // If found, start after it; if not found, start at insertion point
                    .map(|i| i + 1)
                    .unwrap_or_else(|i| i)
            }
            None => 0,
        };

        let remaining = filtered.len().saturating_sub(start_idx);
        let tuples: Vec<Tuple> = filtered
            .into_iter()
            .skip(start_idx)
            .take(self.page_size)
            .collect();

        let continuation_token = if remaining > self.page_size {
            tuples
                .last()
                .map(|t| TupleCursor::from_tuple(t).encode())
                .unwrap_or_default()
        } else {
            String::new()
        };

        Ok(TuplePage {
            tuples,
            continuation_token,
        })
    }

    async fn write_tuples(&self, tuples: Vec<Tuple>) -> StoreResult<()> {
        for tuple in &tuples {
            validate_tuple(tuple)?;
        }
        let count = tuples.len();
        for tuple in tuples {
            // HashSet::insert handles duplicates (idempotent)
            self.shards
                .entry(tuple.object_type().to_string())
                .or_default()
                .insert(tuple);
        }
        debug!(count, "wrote tuples");
        Ok(())
    }

    async fn delete_tuples(&self, tuples: Vec<Tuple>) -> StoreResult<()> {
        for tuple in &tuples {
            validate_tuple(tuple)?;
        }
        let count = tuples.len();
        for tuple in tuples {
            if let Some(mut shard) = self.shards.get_mut(tuple.object_type()) {
                shard.remove(&tuple);
            }
        }
        debug!(count, "deleted tuples");
        Ok(())
    }

    async fn check(&self, subject: &str, relation: &str, object: &str) -> StoreResult<bool> {
        validate_tuple(&Tuple::new(subject, relation, object))?;
        self.check_inner(subject, relation, object, 0, &mut HashSet::new())
    }

    async fn batch_check(&self, tuples: Vec<Tuple>) -> StoreResult<bool> {
        for tuple in &tuples {
            validate_tuple(tuple)?;
        }
        for tuple in &tuples {
            let allowed = self.check_inner(
                &tuple.subject,
                &tuple.relation,
                &tuple.object,
                0,
                &mut HashSet::new(),
            )?;
            if !allowed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn list_users(
        &self,
        subject_type: &str,
        relation: &str,
        object: &str,
    ) -> StoreResult<Vec<String>> {
        validate_object_type(subject_type)?;
        let mut users = BTreeSet::new();
        self.collect_users(
            subject_type,
            relation,
            object,
            0,
            &mut HashSet::new(),
            &mut users,
        )?;
        Ok(users.into_iter().collect())
    }
}

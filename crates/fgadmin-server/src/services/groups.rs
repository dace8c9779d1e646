//! Group authorization service.

use std::sync::Arc;

use fgadmin_domain::{FanOutPage, JobRunner, PageTokens, Permission};
use fgadmin_storage::{Tuple, TupleFilter, TupleStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::error::ServiceResult;
use super::identifiers::{
    ids_of, object, permission_tuples, userset, validate_id, validate_ids, ASSIGNEE, CAN_VIEW,
    GROUP_TYPE, IDENTITY_TYPE, MEMBER, PRIVILEGED, ROLE_TYPE, USER_TYPE,
};
use super::partitions::PartitionEngine;
use super::ListPage;

/// Manages groups and the roles, permissions and identities attached to
/// them.
///
/// A group holds roles and permissions through its member userset
/// (`group:<id>#member`); identities are members of the group object.
#[derive(Clone)]
pub struct GroupService {
    engine: PartitionEngine,
}

impl GroupService {
    /// Creates a service over a shared store and job runner.
    pub fn new(store: Arc<dyn TupleStore>, runner: Arc<dyn JobRunner>) -> Self {
        Self {
            engine: PartitionEngine::new(store, runner),
        }
    }

    /// Lists one page of the group's permissions across every partition.
    ///
    /// A failing partition does not fail the call: the page carries the
    /// other partitions' permissions and cursors, and
    /// [`FanOutPage::error`] names each failed partition.
    #[instrument(skip(self, cancel, tokens))]
    pub async fn list_permissions(
        &self,
        cancel: &CancellationToken,
        group_id: &str,
        tokens: PageTokens,
    ) -> ServiceResult<FanOutPage> {
        validate_id("group", group_id)?;
        let subject = userset(GROUP_TYPE, group_id, MEMBER);
        self.engine.list_permissions(cancel, &subject, &tokens).await
    }

    /// Removes every relation that references the group.
    ///
    /// Not atomic: partitions that succeeded stay deleted when others fail.
    /// Calling it again on a drained group succeeds.
    #[instrument(skip(self, cancel))]
    pub async fn remove_all_relations(
        &self,
        cancel: &CancellationToken,
        group_id: &str,
    ) -> ServiceResult<()> {
        validate_id("group", group_id)?;
        let subject = userset(GROUP_TYPE, group_id, MEMBER);
        let group = object(GROUP_TYPE, group_id);
        self.engine
            .remove_all_relations(cancel, &subject, &group, &[])
            .await?;
        info!(group_id, "removed all group relations");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_groups(&self, user_id: &str) -> ServiceResult<Vec<String>> {
        validate_id("user", user_id)?;
        let groups = self
            .engine
            .store()
            .list_objects(&object(USER_TYPE, user_id), CAN_VIEW, GROUP_TYPE)
            .await?;
        Ok(ids_of(GROUP_TYPE, groups))
    }

    /// Returns the group id if the user can view it.
    #[instrument(skip(self))]
    pub async fn get_group(&self, user_id: &str, group_id: &str) -> ServiceResult<Option<String>> {
        validate_id("user", user_id)?;
        validate_id("group", group_id)?;
        let visible = self
            .engine
            .store()
            .check(
                &object(USER_TYPE, user_id),
                CAN_VIEW,
                &object(GROUP_TYPE, group_id),
            )
            .await?;
        Ok(visible.then(|| group_id.to_string()))
    }

    /// Creates a group owned by `user_id`, who can view it and is its first
    /// member.
    #[instrument(skip(self))]
    pub async fn create_group(&self, user_id: &str, group_id: &str) -> ServiceResult<()> {
        validate_id("user", user_id)?;
        validate_id("group", group_id)?;
        let user = object(USER_TYPE, user_id);
        let group = object(GROUP_TYPE, group_id);
        self.engine
            .store()
            .write_tuples(vec![
                Tuple::new(user.clone(), PRIVILEGED, group.clone()),
                Tuple::new(user.clone(), CAN_VIEW, group.clone()),
                Tuple::new(user, MEMBER, group),
            ])
            .await?;
        info!(group_id, user_id, "created group");
        Ok(())
    }

    /// Deletes a group by removing every relation that references it.
    pub async fn delete_group(&self, cancel: &CancellationToken, group_id: &str) -> ServiceResult<()> {
        self.remove_all_relations(cancel, group_id).await
    }

    /// Roles assigned to the group.
    #[instrument(skip(self))]
    pub async fn list_roles(&self, group_id: &str) -> ServiceResult<Vec<String>> {
        validate_id("group", group_id)?;
        let roles = self
            .engine
            .store()
            .list_objects(&userset(GROUP_TYPE, group_id, MEMBER), ASSIGNEE, ROLE_TYPE)
            .await?;
        Ok(ids_of(ROLE_TYPE, roles))
    }

    /// One page of identities that are members of the group.
    #[instrument(skip(self))]
    pub async fn list_identities(&self, group_id: &str, cursor: &str) -> ServiceResult<ListPage> {
        validate_id("group", group_id)?;
        let filter = TupleFilter::new("", MEMBER, object(GROUP_TYPE, group_id));
        let page = self.engine.store().read_tuples(&filter, cursor).await?;
        let subjects = page.tuples.into_iter().map(|t| t.subject).collect();
        Ok(ListPage {
            items: ids_of(IDENTITY_TYPE, subjects),
            next_cursor: page.continuation_token,
        })
    }

    #[instrument(skip(self))]
    pub async fn assign_roles(&self, group_id: &str, role_ids: &[String]) -> ServiceResult<()> {
        let tuples = self.role_tuples(group_id, role_ids)?;
        if tuples.is_empty() {
            return Ok(());
        }
        self.engine.store().write_tuples(tuples).await?;
        debug!(group_id, count = role_ids.len(), "assigned roles");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_roles(&self, group_id: &str, role_ids: &[String]) -> ServiceResult<()> {
        let tuples = self.role_tuples(group_id, role_ids)?;
        if tuples.is_empty() {
            return Ok(());
        }
        self.engine.store().delete_tuples(tuples).await?;
        debug!(group_id, count = role_ids.len(), "removed roles");
        Ok(())
    }

    #[instrument(skip(self, permissions), fields(count = permissions.len()))]
    pub async fn assign_permissions(
        &self,
        group_id: &str,
        permissions: &[Permission],
    ) -> ServiceResult<()> {
        let tuples = permission_tuples(&group_permission_subject(group_id)?, permissions)?;
        if tuples.is_empty() {
            return Ok(());
        }
        self.engine.store().write_tuples(tuples).await?;
        Ok(())
    }

    #[instrument(skip(self, permissions), fields(count = permissions.len()))]
    pub async fn remove_permissions(
        &self,
        group_id: &str,
        permissions: &[Permission],
    ) -> ServiceResult<()> {
        let tuples = permission_tuples(&group_permission_subject(group_id)?, permissions)?;
        if tuples.is_empty() {
            return Ok(());
        }
        self.engine.store().delete_tuples(tuples).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn assign_identities(
        &self,
        group_id: &str,
        identity_ids: &[String],
    ) -> ServiceResult<()> {
        let tuples = self.identity_tuples(group_id, identity_ids)?;
        if tuples.is_empty() {
            return Ok(());
        }
        self.engine.store().write_tuples(tuples).await?;
        debug!(group_id, count = identity_ids.len(), "assigned identities");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_identities(
        &self,
        group_id: &str,
        identity_ids: &[String],
    ) -> ServiceResult<()> {
        let tuples = self.identity_tuples(group_id, identity_ids)?;
        if tuples.is_empty() {
            return Ok(());
        }
        self.engine.store().delete_tuples(tuples).await?;
        debug!(group_id, count = identity_ids.len(), "removed identities");
        Ok(())
    }

    /// True if the user can view every candidate role. An empty list is
    /// trivially assignable and makes no store call.
    #[instrument(skip(self))]
    pub async fn can_assign_roles(&self, user_id: &str, role_ids: &[String]) -> ServiceResult<bool> {
        self.can_view_all(user_id, ROLE_TYPE, role_ids).await
    }

    /// True if the user can view every candidate identity. An empty list is
    /// trivially assignable and makes no store call.
    #[instrument(skip(self))]
    pub async fn can_assign_identities(
        &self,
        user_id: &str,
        identity_ids: &[String],
    ) -> ServiceResult<bool> {
        self.can_view_all(user_id, IDENTITY_TYPE, identity_ids).await
    }

    async fn can_view_all(
        &self,
        user_id: &str,
        object_type: &str,
        ids: &[String],
    ) -> ServiceResult<bool> {
        validate_id("user", user_id)?;
        if ids.is_empty() {
            return Ok(true);
        }
        validate_ids(object_type, ids)?;

        let user = object(USER_TYPE, user_id);
        let checks = ids
            .iter()
            .map(|id| Tuple::new(user.clone(), CAN_VIEW, object(object_type, id)))
            .collect();
        Ok(self.engine.store().batch_check(checks).await?)
    }

    fn role_tuples(&self, group_id: &str, role_ids: &[String]) -> ServiceResult<Vec<Tuple>> {
        validate_id("group", group_id)?;
        validate_ids("role", role_ids)?;
        let subject = userset(GROUP_TYPE, group_id, MEMBER);
        Ok(role_ids
            .iter()
            .map(|id| Tuple::new(subject.clone(), ASSIGNEE, object(ROLE_TYPE, id)))
            .collect())
    }

    fn identity_tuples(&self, group_id: &str, identity_ids: &[String]) -> ServiceResult<Vec<Tuple>> {
        validate_id("group", group_id)?;
        validate_ids("identity", identity_ids)?;
        let group = object(GROUP_TYPE, group_id);
        Ok(identity_ids
            .iter()
            .map(|id| Tuple::new(object(IDENTITY_TYPE, id), MEMBER, group.clone()))
            .collect())
    }
}

fn group_permission_subject(group_id: &str) -> ServiceResult<String> {
    validate_id("group", group_id)?;
    Ok(userset(GROUP_TYPE, group_id, MEMBER))
}

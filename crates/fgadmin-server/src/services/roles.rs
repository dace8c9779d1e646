//! Role authorization service.

use std::sync::Arc;

use fgadmin_domain::{FanOutPage, JobRunner, PageTokens, Permission};
use fgadmin_storage::{Tuple, TupleFilter, TupleStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::error::ServiceResult;
use super::identifiers::{
    ids_of, object, permission_tuples, userset, validate_id, ASSIGNEE, CAN_VIEW, GROUP_TYPE,
    MEMBER, PRIVILEGED, ROLE_TYPE, USER_TYPE,
};
use super::partitions::PartitionEngine;
use super::ListPage;

/// Manages roles and their permissions.
///
/// A role holds permissions through its assignee userset
/// (`role:<id>#assignee`). Groups are assigned to a role through their
/// member userset.
#[derive(Clone)]
pub struct RoleService {
    engine: PartitionEngine,
}

impl RoleService {
    pub fn new(store: Arc<dyn TupleStore>, runner: Arc<dyn JobRunner>) -> Self {
        Self {
            engine: PartitionEngine::new(store, runner),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_roles(&self, user_id: &str) -> ServiceResult<Vec<String>> {
        validate_id("user", user_id)?;
        let roles = self
            .engine
            .store()
            .list_objects(&object(USER_TYPE, user_id), CAN_VIEW, ROLE_TYPE)
            .await?;
        Ok(ids_of(ROLE_TYPE, roles))
    }

    /// Returns the role id if the user can view it.
    #[instrument(skip(self))]
    pub async fn get_role(&self, user_id: &str, role_id: &str) -> ServiceResult<Option<String>> {
        validate_id("user", user_id)?;
        validate_id("role", role_id)?;
        let visible = self
            .engine
            .store()
            .check(&object(USER_TYPE, user_id), CAN_VIEW, &object(ROLE_TYPE, role_id))
            .await?;
        Ok(visible.then(|| role_id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn create_role(&self, user_id: &str, role_id: &str) -> ServiceResult<()> {
        validate_id("user", user_id)?;
        validate_id("role", role_id)?;
        let user = object(USER_TYPE, user_id);
        let role = object(ROLE_TYPE, role_id);
        self.engine
            .store()
            .write_tuples(vec![
                Tuple::new(user.clone(), PRIVILEGED, role.clone()),
                Tuple::new(user, CAN_VIEW, role),
            ])
            .await?;
        info!(role_id, user_id, "created role");
        Ok(())
    }

    /// Lists one page of the role's permissions across every partition.
    #[instrument(skip(self, cancel, tokens))]
    pub async fn list_permissions(
        &self,
        cancel: &CancellationToken,
        role_id: &str,
        tokens: PageTokens,
    ) -> ServiceResult<FanOutPage> {
        validate_id("role", role_id)?;
        let subject = userset(ROLE_TYPE, role_id, ASSIGNEE);
        self.engine.list_permissions(cancel, &subject, &tokens).await
    }

    #[instrument(skip(self, permissions), fields(count = permissions.len()))]
    pub async fn assign_permissions(
        &self,
        role_id: &str,
        permissions: &[Permission],
    ) -> ServiceResult<()> {
        let tuples = permission_tuples(&role_permission_subject(role_id)?, permissions)?;
        if tuples.is_empty() {
            return Ok(());
        }
        self.engine.store().write_tuples(tuples).await?;
        Ok(())
    }

    #[instrument(skip(self, permissions), fields(count = permissions.len()))]
    pub async fn remove_permissions(
        &self,
        role_id: &str,
        permissions: &[Permission],
    ) -> ServiceResult<()> {
        let tuples = permission_tuples(&role_permission_subject(role_id)?, permissions)?;
        if tuples.is_empty() {
            return Ok(());
        }
        self.engine.store().delete_tuples(tuples).await?;
        Ok(())
    }

    /// One page of groups the role is assigned to.
    #[instrument(skip(self))]
    pub async fn list_role_groups(&self, role_id: &str, cursor: &str) -> ServiceResult<ListPage> {
        validate_id("role", role_id)?;
        let filter = TupleFilter::new("", ASSIGNEE, object(ROLE_TYPE, role_id));
        let page = self.engine.store().read_tuples(&filter, cursor).await?;

        let member_suffix = format!("#{MEMBER}");
        let groups = page
            .tuples
            .into_iter()
            .filter_map(|t| t.subject.strip_suffix(&member_suffix).map(str::to_string))
            .collect();
        Ok(ListPage {
            items: ids_of(GROUP_TYPE, groups),
            next_cursor: page.continuation_token,
        })
    }

    /// Deletes a role: its permissions, its assignments and every relation
    /// held on the role object. Not atomic.
    #[instrument(skip(self, cancel))]
    pub async fn delete_role(&self, cancel: &CancellationToken, role_id: &str) -> ServiceResult<()> {
        validate_id("role", role_id)?;
        let subject = userset(ROLE_TYPE, role_id, ASSIGNEE);
        let role = object(ROLE_TYPE, role_id);
        self.engine
            .remove_all_relations(cancel, &subject, &role, &[ASSIGNEE])
            .await?;
        info!(role_id, "deleted role");
        Ok(())
    }
}

fn role_permission_subject(role_id: &str) -> ServiceResult<String> {
    validate_id("role", role_id)?;
    Ok(userset(ROLE_TYPE, role_id, ASSIGNEE))
}

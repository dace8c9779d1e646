//! Identifier checks and tuple naming.
//!
//! Service operations take bare ids (`administrator`, `okta`) and build the
//! store-facing names from them: objects are `type:id`, usersets are
//! `type:id#relation`.

use fgadmin_domain::Permission;
use fgadmin_storage::traits::MAX_FIELD_LENGTH;
use fgadmin_storage::Tuple;

use super::error::{ServiceError, ServiceResult};

pub(crate) const MEMBER: &str = "member";
pub(crate) const ASSIGNEE: &str = "assignee";
pub(crate) const PRIVILEGED: &str = "privileged";
pub(crate) const CAN_VIEW: &str = "can_view";

pub(crate) const USER_TYPE: &str = "user";
pub(crate) const GROUP_TYPE: &str = "group";
pub(crate) const ROLE_TYPE: &str = "role";
pub(crate) const IDENTITY_TYPE: &str = "identity";

/// Rejects ids that would change meaning once embedded in a tuple field.
pub(crate) fn validate_id(kind: &str, id: &str) -> ServiceResult<()> {
    if id.is_empty() {
        return Err(ServiceError::validation(format!("{kind} id cannot be empty")));
    }
    if id.len() > MAX_FIELD_LENGTH / 2 {
        return Err(ServiceError::validation(format!(
            "{kind} id exceeds {} bytes",
            MAX_FIELD_LENGTH / 2
        )));
    }
    if id
        .chars()
        .any(|c| c == ':' || c == '#' || c.is_whitespace() || c.is_control())
    {
        return Err(ServiceError::validation(format!(
            "{kind} id '{id}' contains a reserved character"
        )));
    }
    Ok(())
}

pub(crate) fn validate_ids(kind: &str, ids: &[String]) -> ServiceResult<()> {
    ids.iter().try_for_each(|id| validate_id(kind, id))
}

pub(crate) fn object(object_type: &str, id: &str) -> String {
    format!("{object_type}:{id}")
}

pub(crate) fn userset(object_type: &str, id: &str, relation: &str) -> String {
    format!("{object_type}:{id}#{relation}")
}

/// Strips the `type:` prefix from each object, dropping other types.
pub(crate) fn ids_of(object_type: &str, objects: Vec<String>) -> Vec<String> {
    objects
        .into_iter()
        .filter_map(|o| match o.split_once(':') {
            Some((t, id)) if t == object_type => Some(id.to_string()),
            _ => None,
        })
        .collect()
}

/// Tuples granting each permission to `subject`.
///
/// Permissions are re-parsed from their URN so hand-built values get the
/// same checks as parsed ones.
pub(crate) fn permission_tuples(
    subject: &str,
    permissions: &[Permission],
) -> ServiceResult<Vec<Tuple>> {
    permissions
        .iter()
        .map(|p| -> ServiceResult<Tuple> {
            let p = Permission::parse(&p.urn())?;
            Ok(Tuple::new(subject, p.relation, p.object))
        })
        .collect()
}

//! Permission identifiers.
//!
//! A permission is a relation held on an object, rendered as
//! `relation::type:id` (for example `can_edit::client:okta`).

use std::fmt;
use std::str::FromStr;

use crate::error::{DomainError, DomainResult};

/// Separator between relation and object.
pub const URN_SEPARATOR: &str = "::";

/// Prefix shared by every relation that counts as a permission.
pub const PERMISSION_PREFIX: &str = "can_";

/// Returns true if `relation` follows the permission naming convention.
pub fn is_permission_relation(relation: &str) -> bool {
    relation.len() > PERMISSION_PREFIX.len() && relation.starts_with(PERMISSION_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permission {
    pub relation: String,
    pub object: String,
}

impl Permission {
    pub fn new(relation: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            object: object.into(),
        }
    }

    pub fn urn(&self) -> String {
        format!("{}{URN_SEPARATOR}{}", self.relation, self.object)
    }

    /// Parses `relation::type:id`.
    pub fn parse(value: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidPermission {
            value: value.to_string(),
        };
        let (relation, object) = value.split_once(URN_SEPARATOR).ok_or_else(invalid)?;
        let valid_object = matches!(
            object.split_once(':'),
            Some((t, id)) if !t.is_empty() && !id.is_empty()
        );
        if relation.is_empty() || relation.contains(':') || !valid_object {
            return Err(invalid());
        }
        Ok(Self::new(relation, object))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{URN_SEPARATOR}{}", self.relation, self.object)
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::parse(s)
    }
}

//! Fixed partitions the fan-out engine splits work across.

use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Object-type categories a group or role can hold permissions on.
///
/// Partitions are disjoint by object type, so results from different
/// partitions never need deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartitionTag {
    Group,
    Role,
    Identity,
    Scheme,
    Provider,
    Client,
}

impl PartitionTag {
    pub const ALL: [PartitionTag; 6] = [
        PartitionTag::Group,
        PartitionTag::Role,
        PartitionTag::Identity,
        PartitionTag::Scheme,
        PartitionTag::Provider,
        PartitionTag::Client,
    ];

    /// The tag as used in page tokens and as the store object type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionTag::Group => "group",
            PartitionTag::Role => "role",
            PartitionTag::Identity => "identity",
            PartitionTag::Scheme => "scheme",
            PartitionTag::Provider => "provider",
            PartitionTag::Client => "client",
        }
    }

    /// Read filter matching every object of this type (`client:`).
    pub fn object_filter(&self) -> String {
        format!("{}:", self.as_str())
    }
}

impl fmt::Display for PartitionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionTag {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartitionTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| DomainError::UnknownPartition {
                value: s.to_string(),
            })
    }
}

/// Relations held directly on a group or role object.
///
/// Cascading deletion drains one of these per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectRelation {
    Privileged,
    Member,
    CanCreate,
    CanDelete,
    CanEdit,
    CanView,
}

impl DirectRelation {
    pub const ALL: [DirectRelation; 6] = [
        DirectRelation::Privileged,
        DirectRelation::Member,
        DirectRelation::CanCreate,
        DirectRelation::CanDelete,
        DirectRelation::CanEdit,
        DirectRelation::CanView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectRelation::Privileged => "privileged",
            DirectRelation::Member => "member",
            DirectRelation::CanCreate => "can_create",
            DirectRelation::CanDelete => "can_delete",
            DirectRelation::CanEdit => "can_edit",
            DirectRelation::CanView => "can_view",
        }
    }
}

impl fmt::Display for DirectRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_parse_back() {
        for tag in PartitionTag::ALL {
            assert_eq!(tag.as_str().parse::<PartitionTag>().unwrap(), tag);
        }
        assert!("document".parse::<PartitionTag>().is_err());
    }

    #[test]
    fn test_object_filter_selects_whole_type() {
        assert_eq!(PartitionTag::Client.object_filter(), "client:");
    }

    #[test]
    fn test_direct_relation_names() {
        let names: Vec<&str> = DirectRelation::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            names,
            vec!["privileged", "member", "can_create", "can_delete", "can_edit", "can_view"]
        );
    }
}

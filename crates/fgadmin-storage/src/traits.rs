//! TupleStore trait definition.

use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Maximum length of a tuple field, matching OpenFGA's limits.
pub const MAX_FIELD_LENGTH: usize = 512;

/// A relationship tuple: `subject` holds `relation` on `object`.
///
/// Subjects are either plain (`user:alice`) or usersets
/// (`group:admins#member`). Objects are always `type:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tuple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Tuple {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Returns the type half of the object (`client` for `client:okta`).
    pub fn object_type(&self) -> &str {
        object_type_of(&self.object)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.subject)
    }
}

/// Returns the type prefix of a `type:id` string, or the whole string if it
/// has no separator.
pub fn object_type_of(object: &str) -> &str {
    object.split_once(':').map_or(object, |(t, _)| t)
}

/// Filter for reading tuples. Empty fields match anything.
///
/// An `object` of the form `type:` (empty id) matches every object of that
/// type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleFilter {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl TupleFilter {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Returns the object type this filter is restricted to, if any.
    pub fn object_type(&self) -> Option<&str> {
        if self.object.is_empty() {
            None
        } else {
            Some(object_type_of(&self.object))
        }
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        let object_matches = match self.object.split_once(':') {
            Some((object_type, "")) => tuple.object_type() == object_type,
            _ => self.object.is_empty() || tuple.object == self.object,
        };
        object_matches
            && (self.subject.is_empty() || tuple.subject == self.subject)
            && (self.relation.is_empty() || tuple.relation == self.relation)
    }
}

/// One page of a tuple read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuplePage {
    pub tuples: Vec<Tuple>,
    /// Cursor for the next page; empty when the read is exhausted.
    pub continuation_token: String,
}

impl TuplePage {
    pub fn is_last(&self) -> bool {
        self.continuation_token.is_empty()
    }
}

/// Position of the last tuple returned by a paginated read.
///
/// Serialized as URL-safe base64 JSON so clients treat it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleCursor {
    #[serde(rename = "o")]
    pub object: String,
    #[serde(rename = "r")]
    pub relation: String,
    #[serde(rename = "s")]
    pub subject: String,
}

impl TupleCursor {
    pub fn from_tuple(tuple: &Tuple) -> Self {
        Self {
            object: tuple.object.clone(),
            relation: tuple.relation.clone(),
            subject: tuple.subject.clone(),
        }
    }

    /// Sort key matching the store's page order.
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.object, &self.relation, &self.subject)
    }

    pub fn encode(&self) -> String {
        // Serializing three strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> StoreResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| StoreError::InvalidCursor {
                message: format!("not valid base64: {e}"),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidCursor {
            message: format!("not a tuple cursor: {e}"),
        })
    }
}

/// Parses an optional cursor. Empty means "start of read".
pub fn parse_tuple_cursor(token: &str) -> StoreResult<Option<TupleCursor>> {
    if token.is_empty() {
        return Ok(None);
    }
    TupleCursor::decode(token).map(Some)
}

fn validate_field(name: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidInput {
            message: format!("{name} cannot be empty"),
        });
    }
    if value.len() > MAX_FIELD_LENGTH {
        return Err(StoreError::InvalidInput {
            message: format!(
                "{name} exceeds maximum length of {MAX_FIELD_LENGTH} characters"
            ),
        });
    }
    Ok(())
}

/// Validates that every field of a tuple is present and bounded, and that the
/// object is in `type:id` form.
pub fn validate_tuple(tuple: &Tuple) -> StoreResult<()> {
    validate_field("subject", &tuple.subject)?;
    validate_field("relation", &tuple.relation)?;
    validate_field("object", &tuple.object)?;
    match tuple.object.split_once(':') {
        Some((t, id)) if !t.is_empty() && !id.is_empty() => Ok(()),
        _ => Err(StoreError::InvalidInput {
            message: format!("object '{}' must be in type:id form", tuple.object),
        }),
    }
}

/// Client-side view of a relationship tuple store.
///
/// Writes and deletes are idempotent: writing an existing tuple or deleting
/// a missing one succeeds without effect. Implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait TupleStore: Send + Sync + 'static {
    /// Lists every object of `object_type` on which `subject` holds `relation`.
    async fn list_objects(
        &self,
        subject: &str,
        relation: &str,
        object_type: &str,
    ) -> StoreResult<Vec<String>>;

    /// Reads one page of tuples matching the filter, starting after `cursor`.
    async fn read_tuples(&self, filter: &TupleFilter, cursor: &str) -> StoreResult<TuplePage>;

    /// Writes tuples.
    async fn write_tuples(&self, tuples: Vec<Tuple>) -> StoreResult<()>;

    /// Deletes tuples.
    async fn delete_tuples(&self, tuples: Vec<Tuple>) -> StoreResult<()>;

    /// Checks whether `subject` holds `relation` on `object`.
    async fn check(&self, subject: &str, relation: &str, object: &str) -> StoreResult<bool>;

    /// Checks every tuple; true only if all of them hold.
    async fn batch_check(&self, tuples: Vec<Tuple>) -> StoreResult<bool>;

    /// Lists subjects of `subject_type` holding `relation` on `object`.
    async fn list_users(
        &self,
        subject_type: &str,
        relation: &str,
        object: &str,
    ) -> StoreResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_with_type_prefix_matches_all_objects_of_type() {
        let filter = TupleFilter::new("group:admins#member", "", "client:");
        assert!(filter.matches(&Tuple::new("group:admins#member", "can_edit", "client:okta")));
        assert!(!filter.matches(&Tuple::new("group:admins#member", "can_edit", "role:okta")));
        assert!(!filter.matches(&Tuple::new("group:ops#member", "can_edit", "client:okta")));
        assert_eq!(filter.object_type(), Some("client"));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = TupleFilter::default();
        assert!(filter.matches(&Tuple::new("user:alice", "member", "group:admins")));
        assert_eq!(filter.object_type(), None);
    }

    #[test]
    fn test_cursor_survives_encoding() {
        let tuple = Tuple::new("user:alice", "member", "group:admins");
        let cursor = TupleCursor::from_tuple(&tuple);
        let decoded = TupleCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_invalid_cursor_is_rejected() {
        let err = parse_tuple_cursor("not-valid-base64!!!").unwrap_err();
        assert!(matches!(err, StoreError::InvalidCursor { .. }));

        let not_json = URL_SAFE_NO_PAD.encode(b"plain text");
        let err = parse_tuple_cursor(&not_json).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCursor { .. }));

        assert_eq!(parse_tuple_cursor("").unwrap(), None);
    }

    #[test]
    fn test_validate_tuple_rejects_malformed_fields() {
        assert!(validate_tuple(&Tuple::new("user:alice", "member", "group:admins")).is_ok());
        assert!(validate_tuple(&Tuple::new("", "member", "group:admins")).is_err());
        assert!(validate_tuple(&Tuple::new("user:alice", "", "group:admins")).is_err());
        assert!(validate_tuple(&Tuple::new("user:alice", "member", "admins")).is_err());
        assert!(validate_tuple(&Tuple::new("user:alice", "member", "group:")).is_err());

        let long = format!("group:{}", "x".repeat(MAX_FIELD_LENGTH));
        assert!(validate_tuple(&Tuple::new("user:alice", "member", long)).is_err());
    }
}

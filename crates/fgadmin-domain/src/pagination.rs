//! Multiplexed page tokens.
//!
//! A fan-out read keeps one store cursor per partition. Callers only ever see
//! a single opaque string: the cursor map serialized as JSON and encoded as
//! URL-safe base64 without padding. The server keeps no pagination state.
//!
//! The wire format is stable within a release only.

use std::collections::{BTreeMap, HashMap};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::warn;

use crate::error::TokenDecodeError;

/// Cursor map keyed by partition tag.
///
/// A partition with no entry (or an empty cursor) starts from the beginning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTokens {
    cursors: BTreeMap<String, String>,
}

impl PageTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds tokens from the transport-facing map form.
    pub fn from_map(map: HashMap<String, String>) -> Self {
        Self {
            cursors: map.into_iter().collect(),
        }
    }

    /// Returns the transport-facing map form.
    pub fn into_map(self) -> HashMap<String, String> {
        self.cursors.into_iter().collect()
    }

    /// Cursor for `partition`, empty when the partition starts over.
    pub fn cursor(&self, partition: &str) -> &str {
        self.cursors.get(partition).map_or("", String::as_str)
    }

    pub fn insert(&mut self, partition: impl Into<String>, cursor: impl Into<String>) {
        self.cursors.insert(partition.into(), cursor.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cursors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// True when no partition has a pending cursor.
    pub fn is_exhausted(&self) -> bool {
        self.cursors.values().all(String::is_empty)
    }

    /// Serializes the cursor map into one opaque token. An empty map encodes
    /// to the empty string.
    pub fn encode(&self) -> String {
        if self.cursors.is_empty() {
            return String::new();
        }
        // A map of strings always serializes.
        let json = serde_json::to_vec(&self.cursors).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Strict decode. An empty token is a valid, empty map.
    pub fn try_decode(token: &str) -> Result<Self, TokenDecodeError> {
        if token.is_empty() {
            return Ok(Self::default());
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| TokenDecodeError::Base64 {
                message: e.to_string(),
            })?;
        let cursors: BTreeMap<String, String> =
            serde_json::from_slice(&bytes).map_err(|e| TokenDecodeError::Json {
                message: e.to_string(),
            })?;
        Ok(Self { cursors })
    }

    /// Tolerant decode: a malformed token is logged and every partition
    /// restarts.
    pub fn decode(token: &str) -> Self {
        Self::try_decode(token).unwrap_or_else(|e| {
            warn!(error = %e, "discarding malformed page token");
            Self::default()
        })
    }
}

impl FromIterator<(String, String)> for PageTokens {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            cursors: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_tokens_encode_to_empty_string() {
        assert_eq!(PageTokens::new().encode(), "");
        assert_eq!(PageTokens::decode(""), PageTokens::new());
    }

    #[test]
    fn test_missing_partition_starts_over() {
        let mut tokens = PageTokens::new();
        tokens.insert("client", "abc");
        assert_eq!(tokens.cursor("client"), "abc");
        assert_eq!(tokens.cursor("role"), "");

        tokens.insert("role", "");
        assert_eq!(tokens.cursor("role"), "");
    }

    #[test]
    fn test_malformed_token_decodes_to_empty_map() {
        assert_eq!(PageTokens::decode("%%% not base64 %%%"), PageTokens::new());

        let not_a_map = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        assert_eq!(PageTokens::decode(&not_a_map), PageTokens::new());
    }

    #[test]
    fn test_try_decode_reports_cause() {
        assert!(matches!(
            PageTokens::try_decode("%%%"),
            Err(TokenDecodeError::Base64 { .. })
        ));
        let not_json = URL_SAFE_NO_PAD.encode(b"group=abc");
        assert!(matches!(
            PageTokens::try_decode(&not_json),
            Err(TokenDecodeError::Json { .. })
        ));
    }

    #[test]
    fn test_map_form_conversions() {
        let mut map = HashMap::new();
        map.insert("group".to_string(), "g1".to_string());
        map.insert("role".to_string(), String::new());

        let tokens = PageTokens::from_map(map.clone());
        assert_eq!(tokens.len(), 2);
        assert!(!tokens.is_exhausted());
        assert_eq!(tokens.into_map(), map);
    }

    #[test]
    fn test_all_empty_cursors_are_exhausted() {
        let tokens: PageTokens = [("group", ""), ("role", "")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(tokens.is_exhausted());
        // Still encodes, so the caller can see which partitions were read
        assert!(!tokens.encode().is_empty());
    }

    proptest! {
        #[test]
        fn test_decode_inverts_encode(
            cursors in prop::collection::btree_map("[a-z_]{1,12}", "[A-Za-z0-9_=+/-]{0,40}", 0..8)
        ) {
            let tokens = PageTokens { cursors };
            let decoded = PageTokens::try_decode(&tokens.encode());
            prop_assert_eq!(decoded, Ok(tokens));
        }

        #[test]
        fn test_decode_never_panics_on_arbitrary_input(token in ".{0,64}") {
            let _ = PageTokens::decode(&token);
        }
    }
}

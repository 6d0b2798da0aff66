//! Source record types and parent-reference helpers.
//!
//! A [`SourceRecord`] is one generic incoming unit from the legacy system:
//! a content item or a hierarchical term. Parent references and the
//! translation-set key come straight from the source feed, which makes no
//! ordering guarantees (children may precede their parents).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ChangedAt;

/// The source feed encodes "no parent" as the literal string "0".
pub const ROOT_PARENT: &str = "0";

/// An opaque attribute bag: attribute name to raw source value.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One record pulled from the legacy source system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source-system identifier. Not guaranteed numeric-contiguous,
    /// so it is carried as a string end to end.
    pub source_id: String,
    /// Parent references by source ID, in source order. Empty or `["0"]`
    /// denotes a root record.
    #[serde(default)]
    pub parent_source_ids: Vec<String>,
    /// Records sharing this key form one translation set. Equals
    /// `source_id` when the record is not part of a multi-language set.
    #[serde(default)]
    pub translation_set_key: String,
    /// Language code of this record, when the source provides one.
    #[serde(default)]
    pub language: Option<String>,
    /// Source modification time, epoch seconds.
    #[serde(default)]
    pub changed_at: ChangedAt,
    /// Opaque attribute bag consumed by the target store collaborator.
    #[serde(default)]
    pub payload: Payload,
    /// Translations embedded inline on the record (language code to
    /// attribute bag), as the legacy term feed delivers them.
    #[serde(default)]
    pub translations: BTreeMap<String, Payload>,
}

impl SourceRecord {
    /// The effective translation-set key: an absent or zero marker means
    /// the record stands alone (its own ID is the key).
    pub fn effective_set_key(&self) -> &str {
        if self.translation_set_key.is_empty() || self.translation_set_key == "0" {
            &self.source_id
        } else {
            &self.translation_set_key
        }
    }

    /// Whether this record is the canonical original of its set.
    pub fn is_original(&self) -> bool {
        self.effective_set_key() == self.source_id
    }

    /// The first non-root parent reference, if any.
    ///
    /// The source may deliver the parent as an empty list, `["0"]`, or a
    /// multi-valued list; only the first real reference is linked.
    pub fn parent_ref(&self) -> Option<&str> {
        self.parent_source_ids
            .iter()
            .map(String::as_str)
            .find(|p| !p.is_empty() && *p != ROOT_PARENT)
    }

    /// Whether the record sits at the root of the hierarchy.
    pub fn is_root(&self) -> bool {
        self.parent_ref().is_none()
    }

    /// A record without a source ID can neither be mapped nor audited;
    /// the engine drops such records before processing.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.source_id.trim().is_empty() {
            return Err(CoreError::MalformedRecord(
                "record has no source_id".to_string(),
            ));
        }
        Ok(())
    }
}

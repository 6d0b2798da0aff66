//! Identifier mapping (crosswalk) model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crosswalk_core::types::{DbId, TargetId, Timestamp};

/// A row from the `identifier_mappings` table: one durable correspondence
/// between a source-system ID and a target-system ID.
///
/// `scope` disambiguates source collections that reuse numeric IDs (e.g.
/// two vocabularies both containing a term "7"); "no scope" is stored as
/// the empty string so the unique index never sees NULL.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IdentifierMapping {
    pub id: DbId,
    pub entity_kind: String,
    pub source_id: String,
    pub target_id: TargetId,
    pub scope: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for upserting a mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveMapping {
    pub entity_kind: String,
    pub source_id: String,
    pub target_id: TargetId,
    pub scope: Option<String>,
}

//! Reference target content model.
//!
//! Real deployments write into their own content system through the
//! engine's `TargetStore` trait; these tables back the bundled Postgres
//! implementation so the migration is exercisable end to end.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crosswalk_core::types::{ChangedAt, DbId, Timestamp};

/// A row from the `content_records` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContentRecord {
    pub id: DbId,
    /// Migration unit this record belongs to (vocabulary, content type).
    pub unit_key: String,
    pub parent_id: Option<DbId>,
    pub langcode: Option<String>,
    /// Normalized attribute bag, as produced by the engine.
    pub attributes: serde_json::Value,
    /// Source-side modification time (epoch seconds) of the last write.
    pub changed_at: ChangedAt,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a content record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContentRecord {
    pub unit_key: String,
    pub langcode: Option<String>,
    pub attributes: serde_json::Value,
    pub changed_at: ChangedAt,
}

/// A row from the `content_translations` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContentTranslation {
    pub id: DbId,
    pub record_id: DbId,
    pub langcode: String,
    pub attributes: serde_json::Value,
    pub created_at: Timestamp,
}

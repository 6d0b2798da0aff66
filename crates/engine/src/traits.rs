//! Collaborator traits at the engine's seams.
//!
//! Everything the engine talks to is behind one of these traits and is
//! handed to the controller at construction time. The Postgres
//! implementations live in [`crate::pg`], in-memory ones in
//! [`crate::memory`], and the legacy HTTP source client in
//! [`crate::http`].

use std::collections::HashMap;

use async_trait::async_trait;

use crosswalk_core::record::SourceRecord;
use crosswalk_core::types::{ChangedAt, DbId, TargetId, Timestamp};
use crosswalk_db::models::audit_log::CreateAuditLog;

use crate::error::EngineError;

/// One resolved source-to-target correspondence, as the mapping store
/// reports it.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub id: DbId,
    pub entity_kind: String,
    pub source_id: String,
    pub target_id: TargetId,
    pub scope: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Durable key-value store of `(entity_kind, source_id, scope) → target_id`.
///
/// `save` must be an atomic upsert: calling it repeatedly with identical
/// arguments is a no-op, and two racing writers for one key converge on a
/// single row. Storage failure is surfaced, never swallowed — it is fatal
/// to the current batch step.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn save(
        &self,
        entity_kind: &str,
        source_id: &str,
        target_id: TargetId,
        scope: Option<&str>,
    ) -> Result<DbId, EngineError>;

    async fn get(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<Option<Mapping>, EngineError>;

    async fn get_target_id(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<Option<TargetId>, EngineError>;

    /// Reverse lookup, used for diagnostics.
    async fn get_source_id(
        &self,
        entity_kind: &str,
        target_id: TargetId,
        scope: Option<&str>,
    ) -> Result<Option<String>, EngineError>;

    /// Bulk `source_id → target_id` projection; the hierarchy link pass
    /// calls this once instead of one lookup per record.
    async fn get_all(
        &self,
        entity_kind: &str,
        scope: Option<&str>,
    ) -> Result<HashMap<String, TargetId>, EngineError>;

    /// Remove a single mapping (healing an orphaned entry).
    async fn delete(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<(), EngineError>;

    /// Remove every mapping for an entity kind/scope (re-import reset).
    async fn delete_all(&self, entity_kind: &str, scope: Option<&str>)
        -> Result<u64, EngineError>;
}

/// Paginated read access to the legacy source system.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// List records for one migration unit. A collaborator may ignore
    /// pagination and return everything at once; the engine treats an
    /// over-long page as the whole set.
    async fn list_records(
        &self,
        unit_key: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceRecord>, EngineError>;

    async fn get_record_by_id(
        &self,
        source_id: &str,
    ) -> Result<Option<SourceRecord>, EngineError>;
}

/// A target record as far as reconciliation cares: it exists, carries a
/// change time, and knows its current parent.
#[derive(Debug, Clone, Copy)]
pub struct TargetRecord {
    pub id: TargetId,
    pub changed_at: ChangedAt,
    pub parent_id: Option<TargetId>,
}

/// Payload for creating a target record.
#[derive(Debug, Clone)]
pub struct NewTargetRecord {
    pub unit_key: String,
    pub langcode: Option<String>,
    /// Normalized attribute bag (see `crosswalk_core::attributes`).
    pub attributes: serde_json::Value,
    pub changed_at: ChangedAt,
}

/// Write access to the destination content system.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Load by target id; `None` means the record was deleted on the
    /// target side and any mapping to it is stale.
    async fn load_by_target_id(
        &self,
        target_id: TargetId,
    ) -> Result<Option<TargetRecord>, EngineError>;

    async fn create(&self, record: NewTargetRecord) -> Result<TargetId, EngineError>;

    async fn update(
        &self,
        target_id: TargetId,
        attributes: serde_json::Value,
        changed_at: ChangedAt,
    ) -> Result<(), EngineError>;

    async fn set_parent(
        &self,
        target_id: TargetId,
        parent_id: Option<TargetId>,
    ) -> Result<(), EngineError>;

    async fn attach_translation(
        &self,
        target_id: TargetId,
        langcode: &str,
        attributes: serde_json::Value,
    ) -> Result<(), EngineError>;

    async fn has_translation(
        &self,
        target_id: TargetId,
        langcode: &str,
    ) -> Result<bool, EngineError>;
}

/// Append-only audit destination.
///
/// The engine treats appends as fire-and-forget: a sink failure is logged
/// and dropped, never allowed to abort the migration (see
/// [`crate::audit::Auditor`]).
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: CreateAuditLog) -> Result<(), EngineError>;
}

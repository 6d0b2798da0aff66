//! Postgres-backed collaborator implementations.
//!
//! Thin adapters from the engine traits onto the `crosswalk-db`
//! repositories. The mapping store and audit sink are the durable state
//! of any deployment; the target store writes into the bundled reference
//! content tables and is meant to be swapped for the real destination
//! system's own implementation.

use std::collections::HashMap;

use async_trait::async_trait;

use crosswalk_core::types::{ChangedAt, DbId, TargetId};
use crosswalk_db::models::audit_log::CreateAuditLog;
use crosswalk_db::models::content::CreateContentRecord;
use crosswalk_db::repositories::{AuditLogRepo, ContentRepo, MappingRepo};
use crosswalk_db::DbPool;

use crate::error::EngineError;
use crate::traits::{
    AuditSink, Mapping, MappingStore, NewTargetRecord, TargetRecord, TargetStore,
};

#[derive(Clone)]
pub struct PgMappingStore {
    pool: DbPool,
}

impl PgMappingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingStore for PgMappingStore {
    async fn save(
        &self,
        entity_kind: &str,
        source_id: &str,
        target_id: TargetId,
        scope: Option<&str>,
    ) -> Result<DbId, EngineError> {
        Ok(MappingRepo::save(&self.pool, entity_kind, source_id, target_id, scope).await?)
    }

    async fn get(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<Option<Mapping>, EngineError> {
        let row = MappingRepo::find(&self.pool, entity_kind, source_id, scope).await?;
        Ok(row.map(|m| Mapping {
            id: m.id,
            entity_kind: m.entity_kind,
            source_id: m.source_id,
            target_id: m.target_id,
            scope: if m.scope.is_empty() { None } else { Some(m.scope) },
            created_at: m.created_at,
            updated_at: m.updated_at,
        }))
    }

    async fn get_target_id(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<Option<TargetId>, EngineError> {
        Ok(MappingRepo::target_id(&self.pool, entity_kind, source_id, scope).await?)
    }

    async fn get_source_id(
        &self,
        entity_kind: &str,
        target_id: TargetId,
        scope: Option<&str>,
    ) -> Result<Option<String>, EngineError> {
        Ok(MappingRepo::source_id(&self.pool, entity_kind, target_id, scope).await?)
    }

    async fn get_all(
        &self,
        entity_kind: &str,
        scope: Option<&str>,
    ) -> Result<HashMap<String, TargetId>, EngineError> {
        Ok(MappingRepo::all(&self.pool, entity_kind, scope).await?)
    }

    async fn delete(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<(), EngineError> {
        MappingRepo::delete(&self.pool, entity_kind, source_id, scope).await?;
        Ok(())
    }

    async fn delete_all(
        &self,
        entity_kind: &str,
        scope: Option<&str>,
    ) -> Result<u64, EngineError> {
        Ok(MappingRepo::delete_all(&self.pool, entity_kind, scope).await?)
    }
}

#[derive(Clone)]
pub struct PgAuditSink {
    pool: DbPool,
}

impl PgAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, entry: CreateAuditLog) -> Result<(), EngineError> {
        AuditLogRepo::append(&self.pool, &entry).await?;
        Ok(())
    }
}

/// Reference [`TargetStore`] over the bundled content tables.
#[derive(Clone)]
pub struct PgTargetStore {
    pool: DbPool,
}

impl PgTargetStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TargetStore for PgTargetStore {
    async fn load_by_target_id(
        &self,
        target_id: TargetId,
    ) -> Result<Option<TargetRecord>, EngineError> {
        let row = ContentRepo::find_by_id(&self.pool, target_id).await?;
        Ok(row.map(|r| TargetRecord {
            id: r.id,
            changed_at: r.changed_at,
            parent_id: r.parent_id,
        }))
    }

    async fn create(&self, record: NewTargetRecord) -> Result<TargetId, EngineError> {
        let created = ContentRepo::create(
            &self.pool,
            &CreateContentRecord {
                unit_key: record.unit_key,
                langcode: record.langcode,
                attributes: record.attributes,
                changed_at: record.changed_at,
            },
        )
        .await?;
        Ok(created.id)
    }

    async fn update(
        &self,
        target_id: TargetId,
        attributes: serde_json::Value,
        changed_at: ChangedAt,
    ) -> Result<(), EngineError> {
        let updated =
            ContentRepo::update_attributes(&self.pool, target_id, &attributes, changed_at)
                .await?;
        if updated.is_none() {
            return Err(EngineError::Target(format!("no target record {target_id}")));
        }
        Ok(())
    }

    async fn set_parent(
        &self,
        target_id: TargetId,
        parent_id: Option<TargetId>,
    ) -> Result<(), EngineError> {
        let affected = ContentRepo::set_parent(&self.pool, target_id, parent_id).await?;
        if affected == 0 {
            return Err(EngineError::Target(format!("no target record {target_id}")));
        }
        Ok(())
    }

    async fn attach_translation(
        &self,
        target_id: TargetId,
        langcode: &str,
        attributes: serde_json::Value,
    ) -> Result<(), EngineError> {
        ContentRepo::attach_translation(&self.pool, target_id, langcode, &attributes).await?;
        Ok(())
    }

    async fn has_translation(
        &self,
        target_id: TargetId,
        langcode: &str,
    ) -> Result<bool, EngineError> {
        Ok(ContentRepo::has_translation(&self.pool, target_id, langcode).await?)
    }
}

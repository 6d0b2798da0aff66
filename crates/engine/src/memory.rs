//! In-memory collaborator implementations.
//!
//! Used by the engine's test suite and handy for dry runs: the controller
//! behaves identically against these and the Postgres implementations,
//! because every behavioral contract lives in the traits.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crosswalk_core::record::SourceRecord;
use crosswalk_core::types::{ChangedAt, DbId, TargetId};
use crosswalk_db::models::audit_log::CreateAuditLog;

use crate::error::EngineError;
use crate::traits::{
    AuditSink, Mapping, MappingStore, NewTargetRecord, SourceClient, TargetRecord, TargetStore,
};

fn scope_key(scope: Option<&str>) -> String {
    scope.unwrap_or("").to_string()
}

// ---------------------------------------------------------------------------
// Mapping store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MappingInner {
    next_id: DbId,
    rows: HashMap<(String, String, String), Mapping>,
}

/// Mutex-backed [`MappingStore`] with upsert semantics matching the
/// Postgres implementation.
#[derive(Default)]
pub struct MemoryMappingStore {
    inner: Mutex<MappingInner>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn save(
        &self,
        entity_kind: &str,
        source_id: &str,
        target_id: TargetId,
        scope: Option<&str>,
    ) -> Result<DbId, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (
            entity_kind.to_string(),
            source_id.to_string(),
            scope_key(scope),
        );
        if let Some(existing) = inner.rows.get_mut(&key) {
            existing.target_id = target_id;
            existing.updated_at = Utc::now();
            return Ok(existing.id);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        inner.rows.insert(
            key,
            Mapping {
                id,
                entity_kind: entity_kind.to_string(),
                source_id: source_id.to_string(),
                target_id,
                scope: scope.map(str::to_string),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn get(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<Option<Mapping>, EngineError> {
        let inner = self.inner.lock().unwrap();
        let key = (
            entity_kind.to_string(),
            source_id.to_string(),
            scope_key(scope),
        );
        Ok(inner.rows.get(&key).cloned())
    }

    async fn get_target_id(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<Option<TargetId>, EngineError> {
        Ok(self
            .get(entity_kind, source_id, scope)
            .await?
            .map(|m| m.target_id))
    }

    async fn get_source_id(
        &self,
        entity_kind: &str,
        target_id: TargetId,
        scope: Option<&str>,
    ) -> Result<Option<String>, EngineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rows
            .values()
            .find(|m| {
                m.entity_kind == entity_kind
                    && m.target_id == target_id
                    && m.scope.as_deref().unwrap_or("") == scope.unwrap_or("")
            })
            .map(|m| m.source_id.clone()))
    }

    async fn get_all(
        &self,
        entity_kind: &str,
        scope: Option<&str>,
    ) -> Result<HashMap<String, TargetId>, EngineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rows
            .values()
            .filter(|m| {
                m.entity_kind == entity_kind
                    && m.scope.as_deref().unwrap_or("") == scope.unwrap_or("")
            })
            .map(|m| (m.source_id.clone(), m.target_id))
            .collect())
    }

    async fn delete(
        &self,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (
            entity_kind.to_string(),
            source_id.to_string(),
            scope_key(scope),
        );
        inner.rows.remove(&key);
        Ok(())
    }

    async fn delete_all(
        &self,
        entity_kind: &str,
        scope: Option<&str>,
    ) -> Result<u64, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.rows.len();
        inner.rows.retain(|(kind, _, row_scope), _| {
            !(kind.as_str() == entity_kind && row_scope.as_str() == scope.unwrap_or(""))
        });
        Ok((before - inner.rows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Target store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredTarget {
    pub id: TargetId,
    pub unit_key: String,
    pub langcode: Option<String>,
    pub attributes: serde_json::Value,
    pub changed_at: ChangedAt,
    pub parent_id: Option<TargetId>,
}

#[derive(Default)]
struct TargetInner {
    next_id: TargetId,
    records: BTreeMap<TargetId, StoredTarget>,
    translations: HashMap<TargetId, BTreeMap<String, serde_json::Value>>,
}

/// Mutex-backed [`TargetStore`] with inspection helpers for tests.
#[derive(Default)]
pub struct MemoryTargetStore {
    inner: Mutex<TargetInner>,
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StoredTarget> {
        self.inner.lock().unwrap().records.values().cloned().collect()
    }

    pub fn record(&self, target_id: TargetId) -> Option<StoredTarget> {
        self.inner.lock().unwrap().records.get(&target_id).cloned()
    }

    pub fn translation_langs(&self, target_id: TargetId) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .translations
            .get(&target_id)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Simulate an out-of-band deletion on the target side.
    pub fn delete_record(&self, target_id: TargetId) {
        let mut inner = self.inner.lock().unwrap();
        inner.records.remove(&target_id);
        inner.translations.remove(&target_id);
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn load_by_target_id(
        &self,
        target_id: TargetId,
    ) -> Result<Option<TargetRecord>, EngineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.get(&target_id).map(|r| TargetRecord {
            id: r.id,
            changed_at: r.changed_at,
            parent_id: r.parent_id,
        }))
    }

    async fn create(&self, record: NewTargetRecord) -> Result<TargetId, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.insert(
            id,
            StoredTarget {
                id,
                unit_key: record.unit_key,
                langcode: record.langcode,
                attributes: record.attributes,
                changed_at: record.changed_at,
                parent_id: None,
            },
        );
        Ok(id)
    }

    async fn update(
        &self,
        target_id: TargetId,
        attributes: serde_json::Value,
        changed_at: ChangedAt,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .records
            .get_mut(&target_id)
            .ok_or_else(|| EngineError::Target(format!("no target record {target_id}")))?;
        record.attributes = attributes;
        record.changed_at = changed_at;
        Ok(())
    }

    async fn set_parent(
        &self,
        target_id: TargetId,
        parent_id: Option<TargetId>,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .records
            .get_mut(&target_id)
            .ok_or_else(|| EngineError::Target(format!("no target record {target_id}")))?;
        record.parent_id = parent_id;
        Ok(())
    }

    async fn attach_translation(
        &self,
        target_id: TargetId,
        langcode: &str,
        attributes: serde_json::Value,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.records.contains_key(&target_id) {
            return Err(EngineError::Target(format!("no target record {target_id}")));
        }
        inner
            .translations
            .entry(target_id)
            .or_default()
            .entry(langcode.to_string())
            .or_insert(attributes);
        Ok(())
    }

    async fn has_translation(
        &self,
        target_id: TargetId,
        langcode: &str,
    ) -> Result<bool, EngineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .translations
            .get(&target_id)
            .is_some_and(|t| t.contains_key(langcode)))
    }
}

// ---------------------------------------------------------------------------
// Source client and audit sink
// ---------------------------------------------------------------------------

/// Fixed-feed [`SourceClient`] serving a preloaded record list.
#[derive(Default)]
pub struct MemorySourceClient {
    units: HashMap<String, Vec<SourceRecord>>,
}

impl MemorySourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(mut self, unit_key: &str, records: Vec<SourceRecord>) -> Self {
        self.units.insert(unit_key.to_string(), records);
        self
    }
}

#[async_trait]
impl SourceClient for MemorySourceClient {
    async fn list_records(
        &self,
        unit_key: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceRecord>, EngineError> {
        let records = self.units.get(unit_key).cloned().unwrap_or_default();
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_record_by_id(
        &self,
        source_id: &str,
    ) -> Result<Option<SourceRecord>, EngineError> {
        Ok(self
            .units
            .values()
            .flatten()
            .find(|r| r.source_id == source_id)
            .cloned())
    }
}

/// Vec-backed [`AuditSink`] recording every appended entry.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<CreateAuditLog>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<CreateAuditLog> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count_with_status(&self, status: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == status)
            .count()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: CreateAuditLog) -> Result<(), EngineError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

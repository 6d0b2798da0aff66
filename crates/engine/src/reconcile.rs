//! Applies the change-time decision table to one record, with I/O.
//!
//! The decision itself is pure (`crosswalk_core::reconcile`); this module
//! probes the mapping and target stores to build the decision input, then
//! executes the chosen action: create (registering a fresh mapping), heal
//! a stale mapping and re-create, update, or skip.

use crosswalk_core::attributes::normalize_payload;
use crosswalk_core::audit::{operation_types, SkipReason};
use crosswalk_core::reconcile::{decide, Decision, ExistingTarget};
use crosswalk_core::record::SourceRecord;
use crosswalk_core::types::TargetId;

use crate::audit::Auditor;
use crate::controller::UnitConfig;
use crate::error::EngineError;
use crate::traits::{MappingStore, NewTargetRecord, TargetStore};

/// The applied result for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created(TargetId),
    Updated(TargetId),
    Skipped(SkipReason),
}

/// Serialize a record's normalized attribute bag, auditing any
/// per-attribute failures. A failed attribute is logged and omitted; the
/// record still proceeds with whatever normalized cleanly.
async fn normalized_attributes(
    record: &SourceRecord,
    cfg: &UnitConfig,
    auditor: &Auditor,
) -> serde_json::Value {
    let normalized = normalize_payload(&record.payload, &cfg.attributes);

    for name in &normalized.failed {
        auditor
            .warning(
                operation_types::UPDATE,
                &format!("Attribute '{name}' failed normalization; omitted"),
                Some(&record.source_id),
                Some(serde_json::json!({ "attribute": name })),
            )
            .await;
    }

    let map: serde_json::Map<String, serde_json::Value> = normalized
        .values
        .into_iter()
        .map(|(name, value)| (name, serde_json::to_value(value).unwrap_or_default()))
        .collect();
    serde_json::Value::Object(map)
}

/// Probe durable state for the decision table input. Returns the existing
/// target classification plus the mapped target id when one is recorded.
async fn probe(
    record: &SourceRecord,
    cfg: &UnitConfig,
    mappings: &dyn MappingStore,
    target: &dyn TargetStore,
) -> Result<(ExistingTarget, Option<TargetId>), EngineError> {
    let mapped = mappings
        .get_target_id(&cfg.entity_kind, &record.source_id, cfg.scope.as_deref())
        .await?;

    let Some(target_id) = mapped else {
        return Ok((ExistingTarget::Unmapped, None));
    };

    match target.load_by_target_id(target_id).await? {
        Some(loaded) => Ok((
            ExistingTarget::Live {
                changed_at: loaded.changed_at,
            },
            Some(target_id),
        )),
        None => Ok((ExistingTarget::Stale, Some(target_id))),
    }
}

/// Reconcile one source record: decide create/update/skip and execute it.
///
/// Mapping-store failures propagate (fatal to the slice step); target
/// failures propagate as [`EngineError::Target`] for the controller to
/// absorb as a per-record error.
pub async fn reconcile_record(
    record: &SourceRecord,
    cfg: &UnitConfig,
    mappings: &dyn MappingStore,
    target: &dyn TargetStore,
    auditor: &Auditor,
) -> Result<Outcome, EngineError> {
    let (existing, mapped_id) = probe(record, cfg, mappings, target).await?;
    let decision = decide(existing, record.changed_at);

    if decision == Decision::HealThenCreate {
        // The mapped target was deleted behind our back; drop the stale
        // entry so the create below registers a fresh one.
        mappings
            .delete(&cfg.entity_kind, &record.source_id, cfg.scope.as_deref())
            .await?;
        auditor
            .warning(
                operation_types::DELETE,
                "Stale mapping healed: target no longer exists",
                Some(&record.source_id),
                Some(serde_json::json!({ "old_target_id": mapped_id })),
            )
            .await;
    }

    match decision {
        Decision::Create | Decision::HealThenCreate => {
            let attributes = normalized_attributes(record, cfg, auditor).await;
            let target_id = target
                .create(NewTargetRecord {
                    unit_key: cfg.unit_key.clone(),
                    langcode: record.language.clone(),
                    attributes,
                    changed_at: record.changed_at,
                })
                .await?;
            mappings
                .save(
                    &cfg.entity_kind,
                    &record.source_id,
                    target_id,
                    cfg.scope.as_deref(),
                )
                .await?;
            auditor
                .success(
                    operation_types::CREATE,
                    &format!("Created target {target_id}"),
                    Some(&record.source_id),
                    Some(serde_json::json!({ "target_id": target_id })),
                )
                .await;
            Ok(Outcome::Created(target_id))
        }
        Decision::Update => {
            let Some(target_id) = mapped_id else {
                return Err(EngineError::Target(
                    "update decided without a mapped target".to_string(),
                ));
            };
            let attributes = normalized_attributes(record, cfg, auditor).await;
            target
                .update(target_id, attributes, record.changed_at)
                .await?;
            // Idempotent no-op on target_id; refreshes updated_at.
            mappings
                .save(
                    &cfg.entity_kind,
                    &record.source_id,
                    target_id,
                    cfg.scope.as_deref(),
                )
                .await?;
            auditor
                .success(
                    operation_types::UPDATE,
                    &format!("Updated target {target_id}"),
                    Some(&record.source_id),
                    Some(serde_json::json!({ "target_id": target_id })),
                )
                .await;
            Ok(Outcome::Updated(target_id))
        }
        Decision::Skip => {
            auditor
                .skip(
                    SkipReason::Unchanged,
                    "Target already current",
                    Some(&record.source_id),
                )
                .await;
            Ok(Outcome::Skipped(SkipReason::Unchanged))
        }
    }
}

/// Attach a stand-alone translation record (flat flows) to its set's
/// original. Requires the original's mapping to already exist, which the
/// originals-before-translations processing order guarantees for any
/// original that imported successfully.
pub async fn attach_translation_record(
    record: &SourceRecord,
    cfg: &UnitConfig,
    mappings: &dyn MappingStore,
    target: &dyn TargetStore,
    auditor: &Auditor,
) -> Result<Outcome, EngineError> {
    let set_key = record.effective_set_key().to_string();

    let Some(original_id) = mappings
        .get_target_id(&cfg.entity_kind, &set_key, cfg.scope.as_deref())
        .await?
    else {
        auditor
            .skip(
                SkipReason::MissingMapping,
                &format!("Original '{set_key}' has no mapping; translation not attached"),
                Some(&record.source_id),
            )
            .await;
        return Ok(Outcome::Skipped(SkipReason::MissingMapping));
    };

    let Some(langcode) = record.language.clone() else {
        return Err(EngineError::Target(format!(
            "translation record '{}' carries no language code",
            record.source_id
        )));
    };

    if target.has_translation(original_id, &langcode).await? {
        auditor
            .skip(
                SkipReason::Unchanged,
                &format!("Translation '{langcode}' already attached"),
                Some(&record.source_id),
            )
            .await;
        return Ok(Outcome::Skipped(SkipReason::Unchanged));
    }

    let attributes = normalized_attributes(record, cfg, auditor).await;
    target
        .attach_translation(original_id, &langcode, attributes)
        .await?;
    auditor
        .success(
            operation_types::CREATE,
            &format!("Attached translation '{langcode}' to target {original_id}"),
            Some(&record.source_id),
            Some(serde_json::json!({ "target_id": original_id, "langcode": langcode })),
        )
        .await;
    Ok(Outcome::Created(original_id))
}

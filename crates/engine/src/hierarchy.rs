//! Hierarchy linking and embedded-translation passes.
//!
//! Hierarchical units run three passes over the same record list: create
//! every record rootless (pass one, in `reconcile`), then link parents
//! once every possible mapping exists (pass two), then attach the
//! translations embedded on each record (pass three). Splitting create
//! from link is what makes the engine order-independent: a child arriving
//! before its parent still resolves, because linking only starts after
//! the full create sweep.

use std::collections::HashMap;

use crosswalk_core::attributes::normalize_payload;
use crosswalk_core::audit::{operation_types, SkipReason};
use crosswalk_core::record::SourceRecord;
use crosswalk_core::types::TargetId;

use crate::audit::Auditor;
use crate::controller::UnitConfig;
use crate::error::EngineError;
use crate::traits::TargetStore;

/// Result of the link pass for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Parent resolved and written to the target.
    Linked,
    /// Root record; nothing to write.
    Root,
    /// The stored parent already matches; no write.
    AlreadyLinked,
    /// The record itself never obtained a mapping (its create failed).
    SkippedMissingMapping,
    /// The referenced parent has no mapping or is the record itself; the
    /// record stays at root.
    SkippedUnresolvedParent,
}

/// Link one record to its parent via the bulk `source_id → target_id` map
/// snapshot taken at the start of the link pass.
pub async fn link_parent(
    record: &SourceRecord,
    link_map: &HashMap<String, TargetId>,
    target: &dyn TargetStore,
    auditor: &Auditor,
) -> Result<LinkOutcome, EngineError> {
    let Some(&own_id) = link_map.get(&record.source_id) else {
        auditor
            .skip(
                SkipReason::MissingMapping,
                "No mapping for record; parent link skipped",
                Some(&record.source_id),
            )
            .await;
        return Ok(LinkOutcome::SkippedMissingMapping);
    };

    let Some(parent_ref) = record.parent_ref() else {
        return Ok(LinkOutcome::Root);
    };

    // A record naming itself as parent is a feed cycle; flag it, never
    // chase it.
    if parent_ref == record.source_id {
        auditor
            .skip(
                SkipReason::UnresolvedParent,
                "Record references itself as parent; left at root",
                Some(&record.source_id),
            )
            .await;
        return Ok(LinkOutcome::SkippedUnresolvedParent);
    }

    let Some(&parent_id) = link_map.get(parent_ref) else {
        auditor
            .skip(
                SkipReason::UnresolvedParent,
                &format!("Parent '{parent_ref}' has no mapping; record left at root"),
                Some(&record.source_id),
            )
            .await;
        return Ok(LinkOutcome::SkippedUnresolvedParent);
    };

    if parent_id == own_id {
        auditor
            .skip(
                SkipReason::UnresolvedParent,
                "Parent resolves to the record itself; left at root",
                Some(&record.source_id),
            )
            .await;
        return Ok(LinkOutcome::SkippedUnresolvedParent);
    }

    // A re-run over an unchanged tree must not rewrite settled links.
    let current = target.load_by_target_id(own_id).await?;
    if current.is_some_and(|t| t.parent_id == Some(parent_id)) {
        auditor
            .skip(
                SkipReason::Unchanged,
                "Parent already linked",
                Some(&record.source_id),
            )
            .await;
        return Ok(LinkOutcome::AlreadyLinked);
    }

    target.set_parent(own_id, Some(parent_id)).await?;
    auditor
        .success(
            operation_types::UPDATE,
            &format!("Linked parent {parent_id}"),
            Some(&record.source_id),
            Some(serde_json::json!({ "target_id": own_id, "parent_id": parent_id })),
        )
        .await;
    Ok(LinkOutcome::Linked)
}

/// Counters for one record's embedded-translation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub attached: u64,
    pub skipped: u64,
}

/// Attach the translations embedded inline on a record (hierarchical
/// flows deliver them this way). Existing translations are left alone.
pub async fn attach_embedded_translations(
    record: &SourceRecord,
    link_map: &HashMap<String, TargetId>,
    cfg: &UnitConfig,
    target: &dyn TargetStore,
    auditor: &Auditor,
) -> Result<TranslationOutcome, EngineError> {
    let mut outcome = TranslationOutcome::default();

    if record.translations.is_empty() {
        return Ok(outcome);
    }

    let Some(&own_id) = link_map.get(&record.source_id) else {
        auditor
            .skip(
                SkipReason::MissingMapping,
                "No mapping for record; translations not attached",
                Some(&record.source_id),
            )
            .await;
        outcome.skipped += record.translations.len() as u64;
        return Ok(outcome);
    };

    for (langcode, payload) in &record.translations {
        if let Some(own_lang) = &record.language {
            if langcode == own_lang {
                continue;
            }
        }

        if target.has_translation(own_id, langcode).await? {
            auditor
                .skip(
                    SkipReason::Unchanged,
                    &format!("Translation '{langcode}' already attached"),
                    Some(&record.source_id),
                )
                .await;
            outcome.skipped += 1;
            continue;
        }

        let normalized = normalize_payload(payload, &cfg.attributes);
        for name in &normalized.failed {
            auditor
                .warning(
                    operation_types::UPDATE,
                    &format!("Attribute '{name}' failed normalization; omitted"),
                    Some(&record.source_id),
                    Some(serde_json::json!({ "attribute": name, "langcode": langcode })),
                )
                .await;
        }
        let attributes: serde_json::Map<String, serde_json::Value> = normalized
            .values
            .into_iter()
            .map(|(name, value)| (name, serde_json::to_value(value).unwrap_or_default()))
            .collect();

        target
            .attach_translation(own_id, langcode, serde_json::Value::Object(attributes))
            .await?;
        auditor
            .success(
                operation_types::CREATE,
                &format!("Attached translation '{langcode}' to target {own_id}"),
                Some(&record.source_id),
                Some(serde_json::json!({ "target_id": own_id, "langcode": langcode })),
            )
            .await;
        outcome.attached += 1;
    }

    Ok(outcome)
}

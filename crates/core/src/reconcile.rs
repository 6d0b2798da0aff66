//! The change-time reconcile decision table.
//!
//! Given what is durably known about one source record — whether a mapping
//! exists and whether its target still loads — decide create, update, or
//! skip. The decision is pure; applying it (and healing stale mappings)
//! is the engine's job.

use serde::Serialize;

use crate::types::ChangedAt;

/// What the mapping store and target store reported for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingTarget {
    /// No mapping is recorded for this source ID.
    Unmapped,
    /// A mapping exists but its target no longer loads: the target was
    /// deleted behind our back and the mapping is stale.
    Stale,
    /// A mapping exists and its target loaded with this change time.
    Live { changed_at: ChangedAt },
}

/// The reconcile decision for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Create a new target record and save a fresh mapping.
    Create,
    /// Delete the stale mapping first, then create (healing).
    HealThenCreate,
    /// Write new attributes to the existing target and refresh its
    /// stored change time.
    Update,
    /// The target is already current; no write.
    Skip,
}

/// Decide the action for a source record with change time `source_changed`.
///
/// Timestamps are epoch seconds compared as integers. The update rule is
/// strict `>`: an equal timestamp means "already current" and skips, so a
/// full re-run over an unchanged feed performs zero writes.
pub fn decide(existing: ExistingTarget, source_changed: ChangedAt) -> Decision {
    match existing {
        ExistingTarget::Unmapped => Decision::Create,
        ExistingTarget::Stale => Decision::HealThenCreate,
        ExistingTarget::Live { changed_at } if source_changed > changed_at => Decision::Update,
        ExistingTarget::Live { .. } => Decision::Skip,
    }
}

//! Audit vocabulary shared by the engine and the log store.
//!
//! Operation types and statuses are plain string constants (they end up in
//! a text column and in log filters); skip reasons are typed because the
//! engine needs to tell an informational skip from a data-quality one.

use serde::Serialize;

/// Known operation types for audit log entries.
pub mod operation_types {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const SKIP: &str = "skip";
    pub const DELETE: &str = "delete";
    pub const CRON: &str = "cron";
}

/// Known statuses for audit log entries.
pub mod statuses {
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
    pub const WARNING: &str = "warning";
}

/// Actor recorded for unattended runs.
pub const SYSTEM_ACTOR: &str = "system";

/// Why a record was skipped.
///
/// `Unchanged` is informational — the record is simply current. The other
/// variants are data-quality findings and are audited as warnings, never
/// silently merged into the happy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Source change time is not newer than the target's.
    Unchanged,
    /// The record's parent reference could not be resolved; it was left
    /// rootless.
    UnresolvedParent,
    /// The record belongs to a translation set with no original in the
    /// feed.
    OrphanedTranslation,
    /// The record's own mapping is missing (its creation failed earlier),
    /// so hierarchy or translation passes cannot touch it.
    MissingMapping,
}

impl SkipReason {
    /// The audit status this skip is recorded under.
    pub fn status(self) -> &'static str {
        match self {
            SkipReason::Unchanged => statuses::SUCCESS,
            SkipReason::UnresolvedParent
            | SkipReason::OrphanedTranslation
            | SkipReason::MissingMapping => statuses::WARNING,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Unchanged => "unchanged",
            SkipReason::UnresolvedParent => "unresolved_parent",
            SkipReason::OrphanedTranslation => "orphaned_translation",
            SkipReason::MissingMapping => "missing_mapping",
        }
    }
}

/// Errors surfaced past the engine's per-record absorption boundary.
///
/// Per-record failures never appear here — they are caught, counted, and
/// audited inside the controller. What remains is the unit-level fetch
/// failure and genuine storage faults, both fatal to the current slice.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The initial fetch of a unit's record list failed or returned
    /// unusable data. The unit aborts; no records are processed.
    #[error("Source fetch failed for unit '{unit}': {reason}")]
    SourceFetch { unit: String, reason: String },

    /// The mapping store or audit storage failed underneath us.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Transport-level failure talking to the legacy HTTP source.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The target store collaborator failed in a way attributable to a
    /// single record; the controller converts this into a counted,
    /// logged per-record error.
    #[error("Target store error: {0}")]
    Target(String),
}

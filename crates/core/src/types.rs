/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Target-system identifiers share the BIGSERIAL space.
pub type TargetId = i64;

/// All wall-clock timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Source-system modification times are plain epoch seconds, compared as
/// integers throughout (see `reconcile`).
pub type ChangedAt = i64;

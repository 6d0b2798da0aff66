//! Audit log model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crosswalk_core::types::{DbId, Timestamp};

/// A row from the `audit_logs` table: one immutable reconciliation fact.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLogEntry {
    pub id: DbId,
    pub operation_type: String,
    pub entity_kind: String,
    pub status: String,
    pub message: String,
    pub source_id: Option<String>,
    pub details: serde_json::Value,
    pub actor: String,
    pub created_at: Timestamp,
}

/// DTO for appending a new audit log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuditLog {
    pub operation_type: String,
    pub entity_kind: String,
    pub status: String,
    pub message: String,
    pub source_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub actor: Option<String>,
}

/// Filter parameters for audit log queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQuery {
    pub operation_type: Option<String>,
    pub entity_kind: Option<String>,
    pub status: Option<String>,
    pub source_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Per-status log counts for the statistics surface.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AuditStatistics {
    pub total: i64,
    pub success: i64,
    pub error: i64,
    pub warning: i64,
}

//! Fire-and-forget audit helper.
//!
//! Wraps an [`AuditSink`] so call sites can record decisions without
//! handling sink failures: a failed append is reported through `tracing`
//! and dropped. Losing an audit row must never cost a migrated record.

use std::sync::Arc;

use crosswalk_core::audit::{statuses, SkipReason, SYSTEM_ACTOR};
use crosswalk_db::models::audit_log::CreateAuditLog;

use crate::traits::AuditSink;

#[derive(Clone)]
pub struct Auditor {
    sink: Arc<dyn AuditSink>,
    entity_kind: String,
    actor: String,
}

impl Auditor {
    pub fn new(sink: Arc<dyn AuditSink>, entity_kind: &str) -> Self {
        Self {
            sink,
            entity_kind: entity_kind.to_string(),
            actor: SYSTEM_ACTOR.to_string(),
        }
    }

    /// Append one entry, swallowing sink failures.
    pub async fn record(
        &self,
        operation_type: &str,
        status: &str,
        message: &str,
        source_id: Option<&str>,
        details: Option<serde_json::Value>,
    ) {
        let entry = CreateAuditLog {
            operation_type: operation_type.to_string(),
            entity_kind: self.entity_kind.clone(),
            status: status.to_string(),
            message: message.to_string(),
            source_id: source_id.map(str::to_string),
            details,
            actor: Some(self.actor.clone()),
        };

        if let Err(err) = self.sink.append(entry).await {
            tracing::warn!(error = %err, "audit append failed; entry dropped");
        }
    }

    pub async fn success(
        &self,
        operation_type: &str,
        message: &str,
        source_id: Option<&str>,
        details: Option<serde_json::Value>,
    ) {
        self.record(operation_type, statuses::SUCCESS, message, source_id, details)
            .await;
    }

    pub async fn warning(
        &self,
        operation_type: &str,
        message: &str,
        source_id: Option<&str>,
        details: Option<serde_json::Value>,
    ) {
        self.record(operation_type, statuses::WARNING, message, source_id, details)
            .await;
    }

    pub async fn error(
        &self,
        operation_type: &str,
        message: &str,
        source_id: Option<&str>,
        details: Option<serde_json::Value>,
    ) {
        self.record(operation_type, statuses::ERROR, message, source_id, details)
            .await;
    }

    /// Record a skip under its reason-specific status; informational and
    /// data-quality skips stay distinguishable in the log.
    pub async fn skip(&self, reason: SkipReason, message: &str, source_id: Option<&str>) {
        self.record(
            crosswalk_core::audit::operation_types::SKIP,
            reason.status(),
            message,
            source_id,
            Some(serde_json::json!({ "reason": reason.as_str() })),
        )
        .await;
    }
}

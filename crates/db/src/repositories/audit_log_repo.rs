//! Repository for the `audit_logs` table.

use sqlx::PgPool;

use crosswalk_core::audit::{statuses, SYSTEM_ACTOR};

use crate::models::audit_log::{AuditLogEntry, AuditLogQuery, AuditStatistics, CreateAuditLog};

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str = "\
    id, operation_type, entity_kind, status, message, \
    source_id, details, actor, created_at";

/// Provides append and query operations for the audit log.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append one entry, returning the stored row.
    pub async fn append(
        pool: &PgPool,
        entry: &CreateAuditLog,
    ) -> Result<AuditLogEntry, sqlx::Error> {
        let details = entry
            .details
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));
        let actor = entry.actor.as_deref().unwrap_or(SYSTEM_ACTOR);

        let query = format!(
            "INSERT INTO audit_logs
                (operation_type, entity_kind, status, message, source_id, details, actor)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLogEntry>(&query)
            .bind(&entry.operation_type)
            .bind(&entry.entity_kind)
            .bind(&entry.status)
            .bind(&entry.message)
            .bind(&entry.source_id)
            .bind(&details)
            .bind(actor)
            .fetch_one(pool)
            .await
    }

    /// Query entries with filtering and pagination, newest first.
    pub async fn query(
        pool: &PgPool,
        params: &AuditLogQuery,
    ) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
        let limit = params.limit.unwrap_or(50).min(500);
        let offset = params.offset.unwrap_or(0).max(0);

        let (where_clause, bind_values, bind_idx) = build_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let mut q = sqlx::query_as::<_, AuditLogEntry>(&query);
        for value in &bind_values {
            q = q.bind(value.as_str());
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count entries matching the filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &AuditLogQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_filter(params);

        let query = format!("SELECT COUNT(*)::BIGINT FROM audit_logs {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for value in &bind_values {
            q = q.bind(value.as_str());
        }
        q.fetch_one(pool).await
    }

    /// Per-status counts across the whole log.
    pub async fn statistics(pool: &PgPool) -> Result<AuditStatistics, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*)::BIGINT FROM audit_logs GROUP BY status",
        )
        .fetch_all(pool)
        .await?;

        let mut stats = AuditStatistics::default();
        for (status, count) in rows {
            stats.total += count;
            match status.as_str() {
                statuses::SUCCESS => stats.success = count,
                statuses::ERROR => stats.error = count,
                statuses::WARNING => stats.warning = count,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Retention pruning: delete entries older than `days` days.
    pub async fn delete_older_than(pool: &PgPool, days: i32) -> Result<u64, sqlx::Error> {
        sqlx::query("DELETE FROM audit_logs WHERE created_at < NOW() - ($1 * INTERVAL '1 day')")
            .bind(days)
            .execute(pool)
            .await
            .map(|r| r.rows_affected())
    }
}

/// Build a WHERE clause and bind values from the filter parameters.
///
/// Returns `(where_clause, bind_values, next_bind_index)`. All filter
/// columns are text, so bind values stay plain strings.
fn build_filter(params: &AuditLogQuery) -> (String, Vec<String>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<String> = Vec::new();

    let filters = [
        ("operation_type", &params.operation_type),
        ("entity_kind", &params.entity_kind),
        ("status", &params.status),
        ("source_id", &params.source_id),
    ];

    for (column, value) in filters {
        if let Some(value) = value {
            conditions.push(format!("{column} = ${bind_idx}"));
            bind_idx += 1;
            bind_values.push(value.clone());
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (clause, values, idx) = build_filter(&AuditLogQuery::default());
        assert!(clause.is_empty());
        assert!(values.is_empty());
        assert_eq!(idx, 1);
    }

    #[test]
    fn filters_combine_with_and() {
        let params = AuditLogQuery {
            status: Some("error".to_string()),
            entity_kind: Some("term".to_string()),
            ..Default::default()
        };
        let (clause, values, idx) = build_filter(&params);
        assert_eq!(clause, "WHERE entity_kind = $1 AND status = $2");
        assert_eq!(values, vec!["term".to_string(), "error".to_string()]);
        assert_eq!(idx, 3);
    }
}

//! Repository for the `identifier_mappings` (crosswalk) table.

use std::collections::HashMap;

use sqlx::PgPool;

use crosswalk_core::types::{DbId, TargetId};

use crate::models::mapping::IdentifierMapping;

/// Column list for identifier_mappings queries.
const COLUMNS: &str = "id, entity_kind, source_id, target_id, scope, created_at, updated_at";

/// "No scope" is stored as the empty string so the unique key
/// `(entity_kind, source_id, scope)` never contains NULL.
fn scope_value(scope: Option<&str>) -> &str {
    scope.unwrap_or("")
}

/// Provides crosswalk operations for identifier mappings.
pub struct MappingRepo;

impl MappingRepo {
    /// Upsert a mapping by its unique key, returning the row id.
    ///
    /// The upsert is a single atomic `ON CONFLICT` statement: repeated
    /// calls with identical arguments are no-ops beyond refreshing
    /// `updated_at`, and two racing writers for the same key converge on
    /// one row.
    pub async fn save(
        pool: &PgPool,
        entity_kind: &str,
        source_id: &str,
        target_id: TargetId,
        scope: Option<&str>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO identifier_mappings (entity_kind, source_id, target_id, scope)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (entity_kind, source_id, scope)
             DO UPDATE SET target_id = EXCLUDED.target_id, updated_at = NOW()
             RETURNING id",
        )
        .bind(entity_kind)
        .bind(source_id)
        .bind(target_id)
        .bind(scope_value(scope))
        .fetch_one(pool)
        .await
    }

    /// Find a mapping by its unique key.
    pub async fn find(
        pool: &PgPool,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<Option<IdentifierMapping>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM identifier_mappings
             WHERE entity_kind = $1 AND source_id = $2 AND scope = $3"
        );
        sqlx::query_as::<_, IdentifierMapping>(&query)
            .bind(entity_kind)
            .bind(source_id)
            .bind(scope_value(scope))
            .fetch_optional(pool)
            .await
    }

    /// Convenience projection: just the target id.
    pub async fn target_id(
        pool: &PgPool,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<Option<TargetId>, sqlx::Error> {
        sqlx::query_scalar::<_, TargetId>(
            "SELECT target_id FROM identifier_mappings
             WHERE entity_kind = $1 AND source_id = $2 AND scope = $3",
        )
        .bind(entity_kind)
        .bind(source_id)
        .bind(scope_value(scope))
        .fetch_optional(pool)
        .await
    }

    /// Reverse lookup by target id, used for diagnostics.
    pub async fn source_id(
        pool: &PgPool,
        entity_kind: &str,
        target_id: TargetId,
        scope: Option<&str>,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT source_id FROM identifier_mappings
             WHERE entity_kind = $1 AND target_id = $2 AND scope = $3",
        )
        .bind(entity_kind)
        .bind(target_id)
        .bind(scope_value(scope))
        .fetch_optional(pool)
        .await
    }

    /// Bulk projection `source_id -> target_id` for one entity kind/scope.
    ///
    /// The hierarchy link pass uses this single query instead of one
    /// lookup per record.
    pub async fn all(
        pool: &PgPool,
        entity_kind: &str,
        scope: Option<&str>,
    ) -> Result<HashMap<String, TargetId>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, TargetId)>(
            "SELECT source_id, target_id FROM identifier_mappings
             WHERE entity_kind = $1 AND scope = $2",
        )
        .bind(entity_kind)
        .bind(scope_value(scope))
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Delete a single mapping (healing an orphaned entry).
    pub async fn delete(
        pool: &PgPool,
        entity_kind: &str,
        source_id: &str,
        scope: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        sqlx::query(
            "DELETE FROM identifier_mappings
             WHERE entity_kind = $1 AND source_id = $2 AND scope = $3",
        )
        .bind(entity_kind)
        .bind(source_id)
        .bind(scope_value(scope))
        .execute(pool)
        .await
        .map(|r| r.rows_affected())
    }

    /// Delete every mapping for an entity kind/scope (re-import reset).
    pub async fn delete_all(
        pool: &PgPool,
        entity_kind: &str,
        scope: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        sqlx::query("DELETE FROM identifier_mappings WHERE entity_kind = $1 AND scope = $2")
            .bind(entity_kind)
            .bind(scope_value(scope))
            .execute(pool)
            .await
            .map(|r| r.rows_affected())
    }
}

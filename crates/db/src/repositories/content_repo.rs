//! Repository for the reference target content tables
//! (`content_records`, `content_translations`).

use sqlx::PgPool;

use crosswalk_core::types::{ChangedAt, DbId};

use crate::models::content::{ContentRecord, ContentTranslation, CreateContentRecord};

/// Column list for content_records queries.
const COLUMNS: &str =
    "id, unit_key, parent_id, langcode, attributes, changed_at, created_at, updated_at";

/// Column list for content_translations queries.
const TRANSLATION_COLUMNS: &str = "id, record_id, langcode, attributes, created_at";

/// Provides CRUD operations for the reference target content store.
pub struct ContentRepo;

impl ContentRepo {
    /// Create a content record (parent left unset; the link pass fills it).
    pub async fn create(
        pool: &PgPool,
        input: &CreateContentRecord,
    ) -> Result<ContentRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_records (unit_key, langcode, attributes, changed_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentRecord>(&query)
            .bind(&input.unit_key)
            .bind(&input.langcode)
            .bind(&input.attributes)
            .bind(input.changed_at)
            .fetch_one(pool)
            .await
    }

    /// Find a content record by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ContentRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM content_records WHERE id = $1");
        sqlx::query_as::<_, ContentRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Replace a record's attributes and refresh its source change time.
    pub async fn update_attributes(
        pool: &PgPool,
        id: DbId,
        attributes: &serde_json::Value,
        changed_at: ChangedAt,
    ) -> Result<Option<ContentRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE content_records
             SET attributes = $2, changed_at = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentRecord>(&query)
            .bind(id)
            .bind(attributes)
            .bind(changed_at)
            .fetch_optional(pool)
            .await
    }

    /// Set or clear a record's parent link.
    pub async fn set_parent(
        pool: &PgPool,
        id: DbId,
        parent_id: Option<DbId>,
    ) -> Result<u64, sqlx::Error> {
        sqlx::query(
            "UPDATE content_records SET parent_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(parent_id)
        .execute(pool)
        .await
        .map(|r| r.rows_affected())
    }

    /// Whether a translation exists for `(record, langcode)`.
    pub async fn has_translation(
        pool: &PgPool,
        record_id: DbId,
        langcode: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM content_translations WHERE record_id = $1 AND langcode = $2
             )",
        )
        .bind(record_id)
        .bind(langcode)
        .fetch_one(pool)
        .await
    }

    /// Attach a translation to a record. The unique `(record_id, langcode)`
    /// index makes a repeat attach a no-op rather than a duplicate.
    pub async fn attach_translation(
        pool: &PgPool,
        record_id: DbId,
        langcode: &str,
        attributes: &serde_json::Value,
    ) -> Result<Option<ContentTranslation>, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_translations (record_id, langcode, attributes)
             VALUES ($1, $2, $3)
             ON CONFLICT (record_id, langcode) DO NOTHING
             RETURNING {TRANSLATION_COLUMNS}"
        );
        sqlx::query_as::<_, ContentTranslation>(&query)
            .bind(record_id)
            .bind(langcode)
            .bind(attributes)
            .fetch_optional(pool)
            .await
    }

    /// List a record's translations, used for diagnostics.
    pub async fn list_translations(
        pool: &PgPool,
        record_id: DbId,
    ) -> Result<Vec<ContentTranslation>, sqlx::Error> {
        let query = format!(
            "SELECT {TRANSLATION_COLUMNS} FROM content_translations
             WHERE record_id = $1 ORDER BY langcode"
        );
        sqlx::query_as::<_, ContentTranslation>(&query)
            .bind(record_id)
            .fetch_all(pool)
            .await
    }
}

//! Worker configuration loaded from environment variables.

use anyhow::Context;

use crosswalk_core::attributes::AttributeConfig;
use crosswalk_engine::controller::DEFAULT_SLICE_SIZE;

/// One worker invocation drives one migration unit to completion.
///
/// | Env Var                          | Default        |
/// |----------------------------------|----------------|
/// | `DATABASE_URL`                   | required       |
/// | `CROSSWALK_SOURCE_URL`           | required       |
/// | `CROSSWALK_SOURCE_TOKEN`         | none           |
/// | `CROSSWALK_UNIT`                 | required       |
/// | `CROSSWALK_ENTITY_KIND`          | same as unit   |
/// | `CROSSWALK_SCOPE`                | none           |
/// | `CROSSWALK_HIERARCHICAL`         | `false`        |
/// | `CROSSWALK_SLICE_SIZE`           | `10`           |
/// | `CROSSWALK_ATTRIBUTES`           | `{}` (JSON)    |
/// | `CROSSWALK_AUDIT_RETENTION_DAYS` | none (no prune)|
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub source_url: String,
    pub source_token: Option<String>,
    pub unit_key: String,
    pub entity_kind: String,
    pub scope: Option<String>,
    pub hierarchical: bool,
    pub slice_size: usize,
    pub attributes: AttributeConfig,
    pub audit_retention_days: Option<i32>,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let source_url =
            std::env::var("CROSSWALK_SOURCE_URL").context("CROSSWALK_SOURCE_URL must be set")?;
        let source_token = std::env::var("CROSSWALK_SOURCE_TOKEN").ok();

        let unit_key = std::env::var("CROSSWALK_UNIT").context("CROSSWALK_UNIT must be set")?;
        let entity_kind =
            std::env::var("CROSSWALK_ENTITY_KIND").unwrap_or_else(|_| unit_key.clone());
        let scope = std::env::var("CROSSWALK_SCOPE").ok().filter(|s| !s.is_empty());

        let hierarchical = std::env::var("CROSSWALK_HIERARCHICAL")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let slice_size: usize = std::env::var("CROSSWALK_SLICE_SIZE")
            .unwrap_or_else(|_| DEFAULT_SLICE_SIZE.to_string())
            .parse()
            .context("CROSSWALK_SLICE_SIZE must be a positive integer")?;

        let attributes = match std::env::var("CROSSWALK_ATTRIBUTES") {
            Ok(raw) => serde_json::from_str(&raw)
                .context("CROSSWALK_ATTRIBUTES must be a JSON attribute-kind map")?,
            Err(_) => AttributeConfig::default(),
        };

        let audit_retention_days = match std::env::var("CROSSWALK_AUDIT_RETENTION_DAYS") {
            Ok(raw) => Some(
                raw.parse()
                    .context("CROSSWALK_AUDIT_RETENTION_DAYS must be an integer")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            source_url,
            source_token,
            unit_key,
            entity_kind,
            scope,
            hierarchical,
            slice_size,
            attributes,
            audit_retention_days,
        })
    }
}

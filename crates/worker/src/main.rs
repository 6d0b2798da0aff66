//! Worker binary: drives one migration unit to completion.
//!
//! Repeatedly calls the controller for one bounded slice at a time,
//! logging progress between slices, then optionally prunes old audit
//! entries before exiting.

mod config;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crosswalk_core::audit::{operation_types, statuses, SYSTEM_ACTOR};
use crosswalk_db::models::audit_log::CreateAuditLog;
use crosswalk_db::repositories::AuditLogRepo;
use crosswalk_engine::http::HttpSourceClient;
use crosswalk_engine::pg::{PgAuditSink, PgMappingStore, PgTargetStore};
use crosswalk_engine::{ImportController, UnitConfig};

use config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crosswalk_worker=info,crosswalk_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    tracing::info!(
        unit = %config.unit_key,
        entity_kind = %config.entity_kind,
        hierarchical = config.hierarchical,
        "Loaded worker configuration"
    );

    let pool = crosswalk_db::create_pool(&config.database_url).await?;
    crosswalk_db::health_check(&pool).await?;
    crosswalk_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let mut source = HttpSourceClient::new(&config.source_url)?;
    if let Some(token) = &config.source_token {
        source = source.with_bearer_token(token);
    }

    let mut unit = UnitConfig::new(&config.unit_key, &config.entity_kind);
    unit.scope = config.scope.clone();
    unit.hierarchical = config.hierarchical;
    unit.slice_size = config.slice_size;
    unit.attributes = config.attributes.clone();

    let mut controller = ImportController::new(
        unit,
        Arc::new(source),
        Arc::new(PgMappingStore::new(pool.clone())),
        Arc::new(PgTargetStore::new(pool.clone())),
        Arc::new(PgAuditSink::new(pool.clone())),
    );

    loop {
        let report = controller.process_next_slice().await?;
        tracing::info!(
            phase = ?report.phase,
            progress = %format!("{:.0}%", report.finished_fraction * 100.0),
            "{}",
            report.message
        );
        if report.is_finished() {
            let c = report.counters;
            tracing::info!(
                created = c.created,
                updated = c.updated,
                skipped = c.skipped,
                errors = c.errors,
                "Unit finished"
            );
            break;
        }
    }

    if let Some(days) = config.audit_retention_days {
        let pruned = AuditLogRepo::delete_older_than(&pool, days).await?;
        AuditLogRepo::append(
            &pool,
            &CreateAuditLog {
                operation_type: operation_types::CRON.to_string(),
                entity_kind: config.entity_kind.clone(),
                status: statuses::SUCCESS.to_string(),
                message: format!("Pruned {pruned} audit entries older than {days} days"),
                source_id: None,
                details: None,
                actor: Some(SYSTEM_ACTOR.to_string()),
            },
        )
        .await?;
        tracing::info!(pruned, days, "Audit retention applied");
    }

    Ok(())
}

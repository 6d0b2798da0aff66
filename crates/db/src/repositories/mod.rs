//! Repository layer: one unit struct of associated query functions per
//! table group, taking `&PgPool` and returning `sqlx::Error` untouched.

mod audit_log_repo;
mod content_repo;
mod mapping_repo;

pub use audit_log_repo::AuditLogRepo;
pub use content_repo::ContentRepo;
pub use mapping_repo::MappingRepo;

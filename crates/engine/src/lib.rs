//! The crosswalk migration reconciliation engine.
//!
//! Orchestrates repeated small batches over a legacy source feed:
//! change-time reconciliation against the identifier mapping store,
//! three-pass hierarchy resolution, translation attachment, and an
//! append-only audit trail. All collaborators (source client, target
//! store, mapping store, audit sink) are injected as trait objects — no
//! ambient globals — so the engine runs identically against Postgres, an
//! in-memory store, or anything a deployment substitutes.

pub mod audit;
pub mod controller;
pub mod error;
pub mod hierarchy;
pub mod http;
pub mod memory;
pub mod pg;
pub mod reconcile;
pub mod traits;

pub use controller::{ImportController, SliceReport, UnitConfig};
pub use error::EngineError;

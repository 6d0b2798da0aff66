//! Pure domain logic for the crosswalk migration engine.
//!
//! This crate has zero I/O dependencies (no DB, no async, no network).
//! It provides the record and attribute types, the change-time reconcile
//! decision table, translation-set grouping, batch progress math, and the
//! audit vocabulary shared by the persistence and engine crates.

pub mod attributes;
pub mod audit;
pub mod error;
pub mod progress;
pub mod reconcile;
pub mod record;
pub mod translation;
pub mod types;

//! Core business logic module
//!
//! This module contains the reconciliation components:
//! - `traits` - The `LedgerStore` query interface
//! - `sqlite_store` - Relational store backed by SQLite
//! - `memory_store` - In-memory store with identical semantics
//! - `engine` - Tiered matching of one alert at a time
//! - `summary` - Per-run outcome counters
//! - `async` - Concurrent batch reconciliation

pub mod r#async;
pub mod engine;
pub mod memory_store;
pub mod sqlite_store;
pub mod summary;
pub mod traits;

pub use engine::{MatchOutcome, ReconciliationEngine, Resolution, SkipReason, Tier};
pub use memory_store::InMemoryLedgerStore;
pub use r#async::BatchProcessor;
pub use sqlite_store::SqliteLedgerStore;
pub use summary::RunSummary;
pub use traits::{LedgerStore, WindowQuery};

//! Card Alert Reconciler Library
//! # Overview
//!
//! This library matches alerted transactions (externally reported card
//! transactions, such as chargeback or fraud notifications) against an
//! internal ledger of cards, transactions and transaction amounts. It offers a
//! synchronous and a parallel batch strategy with identical output.
//!
//! # Architecture
//!
//! - [`types`] - Domain types (alerts, ledger entities, candidates, amounts, errors)
//! - [`config`] - Matching parameters and the optional TOML config file
//! - [`cli`] - CLI argument parsing and run orchestration
//! - [`core`] - Business logic components:
//!   - [`core::traits`] - The `LedgerStore` query interface
//!   - [`core::sqlite_store`] - SQLite-backed store with parameterized queries
//!   - [`core::memory_store`] - In-memory store with the same semantics
//!   - [`core::engine`] - Tiered matching protocol
//! - [`io`] - CSV ingestion, alert readers and match output
//! - [`strategy`] - Sync and async reconciliation pipelines
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Matching Protocol
//!
//! 1. **Authorization tier**: ledger transactions whose authorization code
//!    contains the alert's code. One hit is accepted; several are narrowed to
//!    the closest amount.
//! 2. **Window tier** (only with no authorization hits): transactions within
//!    ±2 days, on a card with the same first six and last four characters,
//!    with a local or reference amount within ±5% of the claimed value. One
//!    hit is accepted; several are narrowed to the closest amount.
//!
//! Closeness is `min(|local - value|, |reference - value|)` over the amounts
//! present; exact ties go to the lowest transaction id.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::MatchConfig;
pub use core::{
    InMemoryLedgerStore, LedgerStore, MatchOutcome, ReconciliationEngine, RunSummary,
    SqliteLedgerStore,
};
pub use io::write_matches_csv;
pub use types::{AlertedTransaction, Candidate, MaskedCard, MatchResult, ReconError};

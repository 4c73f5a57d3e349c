//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `ledger`: cards, transactions and amounts held by the store
//! - `alert`: alerted transactions and masked card numbers
//! - `candidate`: query rows and match results
//! - `amount`: value precision, tolerance bands and distances
//! - `error`: Error types for the reconciler

pub mod alert;
pub mod amount;
pub mod candidate;
pub mod error;
pub mod ledger;

pub use alert::{AlertedTransaction, Fingerprint, MaskedCard};
pub use amount::ValueBand;
pub use candidate::{Candidate, MatchResult};
pub use error::ReconError;
pub use ledger::{Card, CardId, LedgerTransaction, TransactionAmount, TransactionId};

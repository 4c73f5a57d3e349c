//! Ledger entities
//!
//! Cards, transactions and transaction amounts as ingested into the store.
//! They are created once during ingestion and never mutated afterwards.

use rust_decimal::Decimal;
use serde::Serialize;

/// Card identifier
pub type CardId = String;

/// Transaction identifier
pub type TransactionId = String;

/// A card with its partially redacted number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Unique card key
    pub card_id: CardId,

    /// Masked number, e.g. `411111******1111`
    ///
    /// Only the first six and last four characters are meaningful.
    pub visible_number: String,
}

/// A ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerTransaction {
    /// Unique transaction key
    pub transaction_id: TransactionId,

    /// Creation time in epoch seconds
    pub created_at: i64,

    /// Order the transaction belongs to
    pub order_id: String,

    /// Authorization code, not unique across transactions
    pub authorization_code: String,

    /// Owning card, absent when the card was never recorded
    pub card_id: Option<CardId>,

    /// User that placed the transaction
    pub user_id: String,
}

/// Amounts recorded for a transaction, keyed 1:1 by transaction id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionAmount {
    pub transaction_id: TransactionId,

    /// Creation time in epoch seconds
    pub created_at: Option<i64>,

    /// Value in the local currency
    pub local_value: Option<Decimal>,

    /// Value in the reference currency (USD)
    pub reference_value: Option<Decimal>,
}

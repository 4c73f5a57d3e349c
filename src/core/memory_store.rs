//! In-memory ledger store
//!
//! A `LedgerStore` backed by plain maps. It answers the same four queries as the
//! relational store with the same semantics (case-insensitive authorization
//! containment, outer-joined cards and amounts, lowest-id tie-break), and is
//! used as a test double and for small ledgers that do not need SQLite.
//!
//! # Duplicate Handling
//!
//! As with the relational store, the first record inserted for a key wins;
//! later records with the same key are ignored.

use crate::core::traits::{LedgerStore, WindowQuery};
use crate::types::amount;
use crate::types::{
    Candidate, Card, CardId, LedgerTransaction, ReconError, TransactionAmount, TransactionId,
};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Ledger held entirely in memory
///
/// Transactions are kept ordered by id so query results are deterministic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    cards: HashMap<CardId, Card>,
    transactions: BTreeMap<TransactionId, LedgerTransaction>,
    amounts: HashMap<TransactionId, TransactionAmount>,
}

impl InMemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a card, returning false if the id was already present
    pub fn insert_card(&mut self, card: Card) -> bool {
        if self.cards.contains_key(&card.card_id) {
            return false;
        }
        self.cards.insert(card.card_id.clone(), card);
        true
    }

    /// Insert a transaction, returning false if the id was already present
    pub fn insert_transaction(&mut self, tx: LedgerTransaction) -> bool {
        if self.transactions.contains_key(&tx.transaction_id) {
            return false;
        }
        self.transactions.insert(tx.transaction_id.clone(), tx);
        true
    }

    /// Insert an amount row, rounded to ledger precision
    ///
    /// Returns false if the transaction already had an amount row.
    pub fn insert_amount(&mut self, mut row: TransactionAmount) -> bool {
        if self.amounts.contains_key(&row.transaction_id) {
            return false;
        }
        row.local_value = row.local_value.map(amount::normalize);
        row.reference_value = row.reference_value.map(amount::normalize);
        self.amounts.insert(row.transaction_id.clone(), row);
        true
    }

    /// Number of transactions held
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Transactions outer-joined with their card and amount row
    fn joined(
        &self,
    ) -> impl Iterator<Item = (&LedgerTransaction, Option<&Card>, Option<&TransactionAmount>)> {
        self.transactions.values().map(move |tx| {
            let card = tx.card_id.as_ref().and_then(|id| self.cards.get(id));
            let amount = self.amounts.get(&tx.transaction_id);
            (tx, card, amount)
        })
    }

    fn auth_code_matches(&self, fragment: &str) -> Vec<Candidate> {
        let needle = fragment.to_ascii_uppercase();
        self.joined()
            .filter(|(tx, _, _)| tx.authorization_code.to_ascii_uppercase().contains(&needle))
            .map(|(tx, _, amount)| to_candidate(tx, amount))
            .collect()
    }

    fn window_matches(&self, query: &WindowQuery) -> Vec<Candidate> {
        self.joined()
            .filter(|(tx, _, _)| tx.created_at >= query.date_lower && tx.created_at <= query.date_upper)
            .filter(|(_, card, _)| {
                card.is_some_and(|c| {
                    c.visible_number.starts_with(&query.card_prefix)
                        && c.visible_number.ends_with(&query.card_suffix)
                })
            })
            .filter(|(_, _, amount)| {
                amount.is_some_and(|a| query.band.admits(a.local_value, a.reference_value))
            })
            .map(|(tx, _, amount)| to_candidate(tx, amount))
            .collect()
    }
}

fn to_candidate(tx: &LedgerTransaction, amount: Option<&TransactionAmount>) -> Candidate {
    Candidate {
        authorization_code: tx.authorization_code.clone(),
        transaction_id: tx.transaction_id.clone(),
        order_id: tx.order_id.clone(),
        user_id: tx.user_id.clone(),
        card_id: tx.card_id.clone(),
        local_value: amount.and_then(|a| a.local_value),
        reference_value: amount.and_then(|a| a.reference_value),
    }
}

/// Order by distance to `target`, incomparable rows last, then by transaction id
fn closest(candidates: Vec<Candidate>, target: Decimal) -> Option<Candidate> {
    candidates
        .into_iter()
        .map(|c| (c.distance_to(target), c))
        .min_by(|(da, a), (db, b)| {
            let by_distance = match (da, db) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_distance.then_with(|| a.transaction_id.cmp(&b.transaction_id))
        })
        .map(|(_, c)| c)
}

impl LedgerStore for InMemoryLedgerStore {
    fn find_by_auth_code(&self, fragment: &str) -> Result<Vec<Candidate>, ReconError> {
        Ok(self.auth_code_matches(fragment))
    }

    fn find_by_auth_code_closest_value(
        &self,
        fragment: &str,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError> {
        Ok(closest(self.auth_code_matches(fragment), target))
    }

    fn find_by_window(&self, query: &WindowQuery) -> Result<Vec<Candidate>, ReconError> {
        Ok(self.window_matches(query))
    }

    fn find_by_window_closest_value(
        &self,
        query: &WindowQuery,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError> {
        Ok(closest(self.window_matches(query), target))
    }
}

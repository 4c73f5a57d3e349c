//! Store query rows and engine output

use crate::types::amount;
use crate::types::ledger::{CardId, TransactionId};
use rust_decimal::Decimal;
use serde::Serialize;

/// A row returned from a ledger query, prior to final selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The ledger's own authorization code
    pub authorization_code: String,
    pub transaction_id: TransactionId,
    pub order_id: String,
    pub user_id: String,
    pub card_id: Option<CardId>,
    pub local_value: Option<Decimal>,
    pub reference_value: Option<Decimal>,
}

impl Candidate {
    /// Distance of this candidate's amounts to `target`, `None` if no amount is recorded
    pub fn distance_to(&self, target: Decimal) -> Option<Decimal> {
        amount::closest_distance(self.local_value, self.reference_value, target)
    }
}

/// A matched alert, in output field order
///
/// The authorization code echoes the alert, not the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub authorization_code: String,
    pub transaction_id: TransactionId,
    pub order_id: String,
    pub user_id: String,
    pub card_id: Option<CardId>,
}

impl MatchResult {
    /// Pair an alert's authorization code with the winning candidate
    pub fn from_candidate(alert_auth_code: &str, candidate: Candidate) -> Self {
        MatchResult {
            authorization_code: alert_auth_code.to_string(),
            transaction_id: candidate.transaction_id,
            order_id: candidate.order_id,
            user_id: candidate.user_id,
            card_id: candidate.card_id,
        }
    }
}

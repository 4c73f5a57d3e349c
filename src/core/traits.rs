//! Core traits for the ledger store
//!
//! The engine only sees the store through [`LedgerStore`], so a relational
//! backend and the in-memory test double can be used interchangeably.

use crate::types::{Candidate, ReconError, ValueBand};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Filter of the windowed tier
///
/// Matches transactions created within `[date_lower, date_upper]` whose card
/// number starts with `card_prefix` and ends with `card_suffix`, and whose
/// local or reference value lies in `band`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowQuery {
    pub date_lower: i64,
    pub date_upper: i64,
    pub card_prefix: String,
    pub card_suffix: String,
    pub band: ValueBand,
}

/// Read-only queries over transactions joined with cards and amounts
///
/// Cards and amounts are outer-joined: a transaction without them is still a
/// candidate for the authorization-code queries. None of the operations treat
/// "no rows" as an error.
pub trait LedgerStore: Send + Sync {
    /// Every transaction whose authorization code contains `fragment`
    fn find_by_auth_code(&self, fragment: &str) -> Result<Vec<Candidate>, ReconError>;

    /// The transaction containing `fragment` whose amounts are closest to `target`
    ///
    /// Missing amounts are not comparable; rows without any amount sort last.
    /// Exact ties go to the lowest transaction id.
    fn find_by_auth_code_closest_value(
        &self,
        fragment: &str,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError>;

    /// Every transaction inside the date, card and value window
    fn find_by_window(&self, query: &WindowQuery) -> Result<Vec<Candidate>, ReconError>;

    /// The windowed transaction whose amounts are closest to `target`
    fn find_by_window_closest_value(
        &self,
        query: &WindowQuery,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for &S {
    fn find_by_auth_code(&self, fragment: &str) -> Result<Vec<Candidate>, ReconError> {
        (**self).find_by_auth_code(fragment)
    }

    fn find_by_auth_code_closest_value(
        &self,
        fragment: &str,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError> {
        (**self).find_by_auth_code_closest_value(fragment, target)
    }

    fn find_by_window(&self, query: &WindowQuery) -> Result<Vec<Candidate>, ReconError> {
        (**self).find_by_window(query)
    }

    fn find_by_window_closest_value(
        &self,
        query: &WindowQuery,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError> {
        (**self).find_by_window_closest_value(query, target)
    }
}

impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    fn find_by_auth_code(&self, fragment: &str) -> Result<Vec<Candidate>, ReconError> {
        (**self).find_by_auth_code(fragment)
    }

    fn find_by_auth_code_closest_value(
        &self,
        fragment: &str,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError> {
        (**self).find_by_auth_code_closest_value(fragment, target)
    }

    fn find_by_window(&self, query: &WindowQuery) -> Result<Vec<Candidate>, ReconError> {
        (**self).find_by_window(query)
    }

    fn find_by_window_closest_value(
        &self,
        query: &WindowQuery,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError> {
        (**self).find_by_window_closest_value(query, target)
    }
}

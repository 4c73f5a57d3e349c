//! Reconciliation engine
//!
//! This module provides the ReconciliationEngine that resolves one alerted
//! transaction at a time against a [`LedgerStore`] by running the tiered
//! matching protocol:
//!
//! 1. **Authorization tier**: transactions whose authorization code contains the
//!    alert's code. One hit is accepted as is; several hits are narrowed to the
//!    one whose amount is closest to the claimed value.
//! 2. **Window tier**: only when the first tier has no hits. Transactions within
//!    ±N days of the alert, on a card with the same first six and last four
//!    characters, with a local or reference amount inside the value band. One
//!    hit is accepted; several are narrowed by closest value.
//!
//! "No candidates" and "several candidates" are ordinary outcomes, never errors.
//! A timed out filter query is treated as "no candidates" for that tier. When a
//! tier has candidates but its closest-value query times out or comes back
//! empty, the alert is left unmatched and later tiers are not tried. Any other
//! store failure is returned to the caller and ends the run.

use crate::config::MatchConfig;
use crate::core::traits::{LedgerStore, WindowQuery};
use crate::types::{
    AlertedTransaction, Candidate, Fingerprint, MatchResult, ReconError, ValueBand,
};
use std::fmt;
use tracing::{debug, warn};

/// Stage of the protocol that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Authorization-code containment
    Authorization,
    /// Date window, card pattern and value band
    Window,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Authorization => f.write_str("authorization"),
            Tier::Window => f.write_str("window"),
        }
    }
}

/// How the winning candidate was singled out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// The tier's filter returned exactly one row
    Unique,
    /// Several rows; the closest value won
    ClosestValue,
}

/// Why an alert could not be reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Several authorization hits but no usable claimed value to break the tie
    AmbiguousWithoutValue,
    /// No authorization hits and the alert lacks a timestamp, card or value
    IncompleteFingerprint,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AmbiguousWithoutValue => {
                f.write_str("several authorization matches and no usable value")
            }
            SkipReason::IncompleteFingerprint => {
                f.write_str("no authorization match and no usable timestamp, card or value")
            }
        }
    }
}

/// Result of reconciling one alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched {
        result: MatchResult,
        tier: Tier,
        resolution: Resolution,
    },
    Unmatched,
    Skipped {
        reason: SkipReason,
    },
}

impl MatchOutcome {
    /// The match result, if any
    pub fn result(&self) -> Option<&MatchResult> {
        match self {
            MatchOutcome::Matched { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<MatchResult> {
        match self {
            MatchOutcome::Matched { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// What a tier concluded
enum TierOutcome {
    Accepted(Candidate, Resolution),
    /// Advance to the next tier
    Empty,
    /// Candidates were found but none could be singled out; later tiers do not run
    Unresolved,
    Unresolvable(SkipReason),
}

/// Tiered matching engine over an explicit store handle
///
/// Holds no mutable state: `reconcile` takes `&self`, so one engine can serve
/// many workers provided the store supports concurrent reads.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine<S> {
    store: S,
    config: MatchConfig,
}

impl<S: LedgerStore> ReconciliationEngine<S> {
    /// Create an engine over `store`
    pub fn new(store: S, config: MatchConfig) -> Self {
        ReconciliationEngine { store, config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconcile a single alerted transaction
    ///
    /// # Errors
    ///
    /// Only fatal store failures are returned. Timeouts, empty tiers and
    /// ambiguity are folded into the outcome.
    pub fn reconcile(&self, alert: &AlertedTransaction) -> Result<MatchOutcome, ReconError> {
        match self.authorization_tier(alert)? {
            TierOutcome::Accepted(candidate, resolution) => {
                return Ok(self.accept(alert, candidate, Tier::Authorization, resolution));
            }
            TierOutcome::Unresolvable(reason) => {
                warn!(auth_code = alert.auth_code(), %reason, "alert skipped");
                return Ok(MatchOutcome::Skipped { reason });
            }
            TierOutcome::Unresolved => return Ok(MatchOutcome::Unmatched),
            TierOutcome::Empty => {}
        }

        let Some(fingerprint) = alert.fingerprint() else {
            let reason = SkipReason::IncompleteFingerprint;
            warn!(auth_code = alert.auth_code(), %reason, "alert skipped");
            return Ok(MatchOutcome::Skipped { reason });
        };

        match self.window_tier(fingerprint)? {
            TierOutcome::Accepted(candidate, resolution) => {
                Ok(self.accept(alert, candidate, Tier::Window, resolution))
            }
            TierOutcome::Empty => {
                debug!(auth_code = alert.auth_code(), "no match in any tier");
                Ok(MatchOutcome::Unmatched)
            }
            TierOutcome::Unresolved => Ok(MatchOutcome::Unmatched),
            TierOutcome::Unresolvable(reason) => Ok(MatchOutcome::Skipped { reason }),
        }
    }

    fn authorization_tier(&self, alert: &AlertedTransaction) -> Result<TierOutcome, ReconError> {
        let code = alert.auth_code();
        let Some(mut candidates) = self.within_deadline(self.store.find_by_auth_code(code))? else {
            return Ok(TierOutcome::Empty);
        };

        let (winner, resolution) = match candidates.len() {
            0 => return Ok(TierOutcome::Empty),
            1 => (candidates.swap_remove(0), Resolution::Unique),
            count => {
                let Some(target) = alert.value() else {
                    return Ok(TierOutcome::Unresolvable(SkipReason::AmbiguousWithoutValue));
                };
                debug!(auth_code = code, count, "ambiguous authorization match");
                let closest = self.store.find_by_auth_code_closest_value(code, target);
                match self.within_deadline(closest)? {
                    Some(Some(candidate)) => (candidate, Resolution::ClosestValue),
                    Some(None) => {
                        warn!(
                            auth_code = code,
                            count, "closest-value query returned nothing for a non-empty match set"
                        );
                        return Ok(TierOutcome::Unresolved);
                    }
                    None => return Ok(TierOutcome::Unresolved),
                }
            }
        };

        if self.config.strict_authorization && !self.in_band(alert, &winner) {
            debug!(
                auth_code = code,
                transaction_id = %winner.transaction_id,
                "authorization match outside value band, trying window tier"
            );
            return Ok(TierOutcome::Empty);
        }

        Ok(TierOutcome::Accepted(winner, resolution))
    }

    fn window_tier(&self, fingerprint: Fingerprint<'_>) -> Result<TierOutcome, ReconError> {
        let query = self.window_query(&fingerprint);
        let Some(mut candidates) = self.within_deadline(self.store.find_by_window(&query))? else {
            return Ok(TierOutcome::Empty);
        };

        match candidates.len() {
            0 => Ok(TierOutcome::Empty),
            1 => Ok(TierOutcome::Accepted(
                candidates.swap_remove(0),
                Resolution::Unique,
            )),
            count => {
                debug!(card = %fingerprint.card, count, "ambiguous window match");
                let closest = self
                    .store
                    .find_by_window_closest_value(&query, fingerprint.value);
                match self.within_deadline(closest)? {
                    Some(Some(candidate)) => {
                        Ok(TierOutcome::Accepted(candidate, Resolution::ClosestValue))
                    }
                    Some(None) => {
                        warn!(
                            card = %fingerprint.card,
                            count, "closest-value query returned nothing for a non-empty match set"
                        );
                        Ok(TierOutcome::Unresolved)
                    }
                    None => Ok(TierOutcome::Unresolved),
                }
            }
        }
    }

    /// Filter of the window tier for this alert
    pub fn window_query(&self, fingerprint: &Fingerprint<'_>) -> WindowQuery {
        let half_width = self.config.window_seconds();
        WindowQuery {
            date_lower: fingerprint.timestamp.saturating_sub(half_width),
            date_upper: fingerprint.timestamp.saturating_add(half_width),
            card_prefix: fingerprint.card.prefix(),
            card_suffix: fingerprint.card.suffix(),
            band: ValueBand::around(fingerprint.value, self.config.value_tolerance),
        }
    }

    fn in_band(&self, alert: &AlertedTransaction, candidate: &Candidate) -> bool {
        alert.value().is_some_and(|value| {
            ValueBand::around(value, self.config.value_tolerance)
                .admits(candidate.local_value, candidate.reference_value)
        })
    }

    /// `Ok(None)` when the query timed out
    fn within_deadline<T>(&self, result: Result<T, ReconError>) -> Result<Option<T>, ReconError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err @ ReconError::QueryTimeout { .. }) => {
                warn!(error = %err, "treating timed out query as no candidates");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn accept(
        &self,
        alert: &AlertedTransaction,
        candidate: Candidate,
        tier: Tier,
        resolution: Resolution,
    ) -> MatchOutcome {
        debug!(
            auth_code = alert.auth_code(),
            transaction_id = %candidate.transaction_id,
            %tier,
            ?resolution,
            "matched"
        );
        MatchOutcome::Matched {
            result: MatchResult::from_candidate(alert.auth_code(), candidate),
            tier,
            resolution,
        }
    }
}

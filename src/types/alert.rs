//! Alerted transactions reported by an external party
//!
//! An alert names an authorization code, a timestamp, a masked card number and
//! a claimed value. Only the authorization code is mandatory: records with an
//! unusable timestamp, card or value are still reconciled by authorization
//! code, they just cannot reach the windowed tier.

use crate::types::{amount, ReconError};
use rust_decimal::Decimal;
use std::fmt;

/// Minimum masked number length needed to slice the first six and last four
pub const MIN_MASKED_LEN: usize = 10;

const PREFIX_LEN: usize = 6;
const SUFFIX_LEN: usize = 4;

/// Validated masked card number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedCard(String);

impl MaskedCard {
    /// Validate a masked number, requiring at least ten characters
    pub fn parse(raw: &str) -> Result<Self, ReconError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len < MIN_MASKED_LEN {
            return Err(ReconError::invalid_alert(
                "masked_card",
                &format!("'{}' has {} characters, need at least {}", trimmed, len, MIN_MASKED_LEN),
            ));
        }
        Ok(MaskedCard(trimmed.to_string()))
    }

    /// First six characters (issuer digits)
    pub fn prefix(&self) -> String {
        self.0.chars().take(PREFIX_LEN).collect()
    }

    /// Last four characters
    pub fn suffix(&self) -> String {
        let skip = self.0.chars().count() - SUFFIX_LEN;
        self.0.chars().skip(skip).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaskedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the windowed tier needs from an alert
#[derive(Debug, Clone, Copy)]
pub struct Fingerprint<'a> {
    pub timestamp: i64,
    pub card: &'a MaskedCard,
    pub value: Decimal,
}

/// A claimed value must be positive and representable in ledger units
pub fn check_value(value: Decimal) -> Result<(), String> {
    if value <= Decimal::ZERO {
        return Err(format!("{} must be positive", value));
    }
    if !amount::in_range(value) {
        return Err(format!("{} is out of range", value));
    }
    Ok(())
}

/// An externally reported transaction to reconcile against the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertedTransaction {
    auth_code: String,
    timestamp: Option<i64>,
    masked_card: Option<MaskedCard>,
    value: Option<Decimal>,
}

impl AlertedTransaction {
    /// Build a fully specified alert
    ///
    /// # Errors
    ///
    /// Rejects an empty authorization code, a non-positive or out-of-range value
    /// and a masked number shorter than ten characters.
    pub fn new(
        auth_code: &str,
        timestamp: i64,
        masked_card: &str,
        value: Decimal,
    ) -> Result<Self, ReconError> {
        let masked_card = MaskedCard::parse(masked_card)?;
        Self::degraded(auth_code, Some(timestamp), Some(masked_card), Some(value))
    }

    /// Build an alert that may be missing its windowed-tier fields
    ///
    /// # Errors
    ///
    /// Rejects an empty authorization code, or a value that is present but not
    /// positive or too large for ledger precision.
    pub fn degraded(
        auth_code: &str,
        timestamp: Option<i64>,
        masked_card: Option<MaskedCard>,
        value: Option<Decimal>,
    ) -> Result<Self, ReconError> {
        let auth_code = auth_code.trim();
        if auth_code.is_empty() {
            return Err(ReconError::invalid_alert(
                "authorization_code",
                "must not be empty",
            ));
        }
        if let Some(v) = value {
            check_value(v).map_err(|reason| ReconError::invalid_alert("value", &reason))?;
        }

        Ok(AlertedTransaction {
            auth_code: auth_code.to_string(),
            timestamp,
            masked_card,
            value,
        })
    }

    pub fn auth_code(&self) -> &str {
        &self.auth_code
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn masked_card(&self) -> Option<&MaskedCard> {
        self.masked_card.as_ref()
    }

    pub fn value(&self) -> Option<Decimal> {
        self.value
    }

    /// Timestamp, card and value together, if all three are usable
    pub fn fingerprint(&self) -> Option<Fingerprint<'_>> {
        Some(Fingerprint {
            timestamp: self.timestamp?,
            card: self.masked_card.as_ref()?,
            value: self.value?,
        })
    }
}

//! Monetary value helpers
//!
//! Ledger amounts carry four decimal places. The relational store keeps them as
//! integer units of 1/10_000 so that band comparisons stay exact; both store
//! implementations normalize through this module to agree on every boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Number of decimal places kept for ledger amounts
pub const AMOUNT_SCALE: u32 = 4;

/// Units per whole currency unit (10^AMOUNT_SCALE)
const UNITS_PER_WHOLE: i64 = 10_000;

/// Round a value to the ledger precision
pub fn normalize(value: Decimal) -> Decimal {
    value.round_dp(AMOUNT_SCALE)
}

/// Convert a value to integer units, `None` if it does not fit in an i64
pub fn to_units(value: Decimal) -> Option<i64> {
    normalize(value)
        .checked_mul(Decimal::from(UNITS_PER_WHOLE))?
        .to_i64()
}

/// Whether a value can be stored and compared at ledger precision
pub fn in_range(value: Decimal) -> bool {
    to_units(value).is_some()
}

/// Convert integer units back into a value
pub fn from_units(units: i64) -> Decimal {
    Decimal::new(units, AMOUNT_SCALE)
}

/// Distance between a candidate's amounts and a target value
///
/// The smaller of the local and reference currency distances. A missing amount
/// is not comparable and is left out; `None` when neither amount is present.
pub fn closest_distance(
    local: Option<Decimal>,
    reference: Option<Decimal>,
    target: Decimal,
) -> Option<Decimal> {
    let target = normalize(target);
    let gap = |v: Decimal| v.checked_sub(target).map_or(Decimal::MAX, |d| d.abs());
    let local = local.map(gap);
    let reference = reference.map(gap);

    match (local, reference) {
        (Some(l), Some(r)) => Some(l.min(r)),
        (Some(l), None) => Some(l),
        (None, Some(r)) => Some(r),
        (None, None) => None,
    }
}

/// Inclusive tolerance band around a claimed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueBand {
    /// `value * (1 - tolerance)`
    pub lower: Decimal,
    /// `value * (1 + tolerance)`
    pub upper: Decimal,
}

impl ValueBand {
    /// Build the band `[value * (1 - tolerance), value * (1 + tolerance)]`
    ///
    /// Bounds saturate at the largest representable decimal.
    pub fn around(value: Decimal, tolerance: Decimal) -> Self {
        let scale = |factor: Decimal| {
            value.checked_mul(factor).unwrap_or_else(|| {
                if value.is_sign_negative() != factor.is_sign_negative() {
                    Decimal::MIN
                } else {
                    Decimal::MAX
                }
            })
        };
        ValueBand {
            lower: scale(Decimal::ONE - tolerance),
            upper: scale(Decimal::ONE + tolerance),
        }
    }

    /// Whether a single amount lies inside the band (bounds included)
    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Whether either currency amount lies inside the band
    pub fn admits(&self, local: Option<Decimal>, reference: Option<Decimal>) -> bool {
        local.is_some_and(|v| self.contains(v)) || reference.is_some_and(|v| self.contains(v))
    }

    /// Smallest unit value inside the band
    pub fn lower_units(&self) -> Option<i64> {
        self.lower
            .checked_mul(Decimal::from(UNITS_PER_WHOLE))?
            .ceil()
            .to_i64()
    }

    /// Largest unit value inside the band
    pub fn upper_units(&self) -> Option<i64> {
        self.upper
            .checked_mul(Decimal::from(UNITS_PER_WHOLE))?
            .floor()
            .to_i64()
    }
}

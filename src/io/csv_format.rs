//! CSV format handling for ledger files, alerts and match output
//!
//! This module centralizes all CSV format concerns, providing:
//! - Raw record structures for deserialization
//! - Required column lists and header validation
//! - Conversion from raw records to domain types, including timestamp parsing
//! - Match output serialization
//!
//! Conversions are pure (no I/O) for easy testing.

use crate::types::alert::check_value;
use crate::types::{
    AlertedTransaction, Card, LedgerTransaction, MaskedCard, MatchResult, ReconError,
    TransactionAmount,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

pub const CARD_COLUMNS: &[&str] = &["card_id", "visible_number"];

pub const TRANSACTION_COLUMNS: &[&str] = &[
    "created_at",
    "order_id",
    "transaction_id",
    "authorization_code",
    "card_id",
    "user_id",
];

pub const AMOUNT_COLUMNS: &[&str] = &[
    "created_at",
    "transaction_id",
    "local_value",
    "reference_value",
];

pub const ALERT_COLUMNS: &[&str] = &[
    "authorization_code",
    "transaction_date",
    "masked_card",
    "value",
];

/// Output header, in the fixed field order of [`MatchResult`]
pub const OUTPUT_COLUMNS: [&str; 5] = [
    "authorization_code",
    "transaction_id",
    "order_id",
    "user_id",
    "card_id",
];

/// Naive layouts accepted for timestamps, all read as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Raw row of `cards.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvCard {
    pub card_id: Option<String>,
    pub visible_number: Option<String>,
}

/// Raw row of `transactions.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvTransaction {
    pub created_at: Option<String>,
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub authorization_code: Option<String>,
    pub card_id: Option<String>,
    pub user_id: Option<String>,
}

/// Raw row of `amounts.csv`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvAmount {
    pub created_at: Option<String>,
    pub transaction_id: Option<String>,
    pub local_value: Option<String>,
    pub reference_value: Option<String>,
}

/// Raw row of the alert file
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvAlert {
    pub authorization_code: Option<String>,
    pub transaction_date: Option<String>,
    pub masked_card: Option<String>,
    pub value: Option<String>,
}

/// An alert plus the field problems that degraded it
///
/// A non-empty `issues` list means the alert can only be matched by
/// authorization code.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    pub alert: AlertedTransaction,
    pub issues: Vec<ReconError>,
}

/// Fail with `MissingColumns` if any of `required` is absent from `headers`
pub fn check_columns<'a>(
    file: &str,
    headers: impl IntoIterator<Item = &'a str>,
    required: &[&str],
) -> Result<(), ReconError> {
    let present: Vec<&str> = headers.into_iter().map(str::trim).collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !present.contains(column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconError::missing_columns(file, &missing))
    }
}

/// Parse a timestamp into epoch seconds
///
/// Accepts integer epoch seconds, RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` (both with optional fractional seconds) and
/// `YYYY-MM-DD`. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();

    if let Ok(epoch) = raw.parse::<i64>() {
        return Ok(epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().timestamp());
    }

    Err(format!("unrecognized timestamp '{}'", raw))
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("invalid {} '{}'", field, raw))
}

/// Non-empty trimmed value of a field
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(field: &str, value: Option<String>) -> Result<String, ReconError> {
    present(value).ok_or_else(|| ReconError::parse_error(None, &format!("missing {}", field)))
}

pub fn convert_card(record: CsvCard) -> Result<Card, ReconError> {
    Ok(Card {
        card_id: required("card_id", record.card_id)?,
        visible_number: required("visible_number", record.visible_number)?,
    })
}

pub fn convert_transaction(record: CsvTransaction) -> Result<LedgerTransaction, ReconError> {
    let transaction_id = required("transaction_id", record.transaction_id)?;
    let created_at = required("created_at", record.created_at)?;
    let created_at = parse_timestamp(&created_at).map_err(|e| {
        ReconError::parse_error(None, &format!("transaction {}: {}", transaction_id, e))
    })?;

    Ok(LedgerTransaction {
        created_at,
        order_id: required("order_id", record.order_id)?,
        authorization_code: present(record.authorization_code).unwrap_or_default(),
        card_id: present(record.card_id),
        user_id: required("user_id", record.user_id)?,
        transaction_id,
    })
}

pub fn convert_amount(record: CsvAmount) -> Result<TransactionAmount, ReconError> {
    let transaction_id = required("transaction_id", record.transaction_id)?;
    let context = |e: String| {
        ReconError::parse_error(None, &format!("amount for {}: {}", transaction_id, e))
    };

    let created_at = present(record.created_at)
        .map(|raw| parse_timestamp(&raw))
        .transpose()
        .map_err(context)?;
    let local_value = present(record.local_value)
        .map(|raw| parse_decimal("local_value", &raw))
        .transpose()
        .map_err(context)?;
    let reference_value = present(record.reference_value)
        .map(|raw| parse_decimal("reference_value", &raw))
        .transpose()
        .map_err(context)?;

    Ok(TransactionAmount {
        transaction_id,
        created_at,
        local_value,
        reference_value,
    })
}

/// Convert a raw alert row, degrading it instead of failing where possible
///
/// Only a missing authorization code rejects the row. An unusable timestamp,
/// masked card or value is dropped from the alert and reported in
/// [`AlertRecord::issues`].
pub fn convert_alert(record: CsvAlert) -> Result<AlertRecord, ReconError> {
    let mut issues = Vec::new();

    let timestamp = match present(record.transaction_date) {
        Some(raw) => parse_timestamp(&raw)
            .map_err(|e| issues.push(ReconError::invalid_alert("transaction_date", &e)))
            .ok(),
        None => {
            issues.push(ReconError::invalid_alert("transaction_date", "missing"));
            None
        }
    };

    let masked_card = match present(record.masked_card) {
        Some(raw) => MaskedCard::parse(&raw).map_err(|e| issues.push(e)).ok(),
        None => {
            issues.push(ReconError::invalid_alert("masked_card", "missing"));
            None
        }
    };

    let value = match present(record.value) {
        Some(raw) => match parse_decimal("value", &raw) {
            Ok(v) => check_value(v)
                .map(|()| v)
                .map_err(|e| issues.push(ReconError::invalid_alert("value", &e)))
                .ok(),
            Err(e) => {
                issues.push(ReconError::invalid_alert("value", &e));
                None
            }
        },
        None => {
            issues.push(ReconError::invalid_alert("value", "missing"));
            None
        }
    };

    let auth_code = record.authorization_code.unwrap_or_default();
    let alert = AlertedTransaction::degraded(&auth_code, timestamp, masked_card, value)?;
    Ok(AlertRecord { alert, issues })
}

/// Streaming writer for match results
///
/// Writes the header on creation, so an empty run still produces it.
pub struct MatchWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> MatchWriter<W> {
    pub fn new(output: W) -> Result<Self, ReconError> {
        let mut writer = csv::Writer::from_writer(output);
        writer.write_record(OUTPUT_COLUMNS)?;
        Ok(Self { writer })
    }

    pub fn write(&mut self, result: &MatchResult) -> Result<(), ReconError> {
        self.writer.write_record([
            result.authorization_code.as_str(),
            result.transaction_id.as_str(),
            result.order_id.as_str(),
            result.user_id.as_str(),
            result.card_id.as_deref().unwrap_or(""),
        ])?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), ReconError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write match results, in the given order, as CSV
pub fn write_matches_csv(results: &[MatchResult], output: &mut dyn Write) -> Result<(), ReconError> {
    let mut writer = MatchWriter::new(output)?;
    for result in results {
        writer.write(result)?;
    }
    writer.finish()
}

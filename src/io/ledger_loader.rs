//! Ledger ingestion from CSV exports
//!
//! Loads `cards.csv`, `transactions.csv` and `amounts.csv` into a
//! [`SqliteLedgerStore`]. A file with a missing required column aborts the
//! load; individual malformed rows are logged and skipped. Rows whose key was
//! already loaded are counted as duplicates and ignored.

use crate::core::SqliteLedgerStore;
use crate::io::csv_format::{
    check_columns, convert_amount, convert_card, convert_transaction, AMOUNT_COLUMNS,
    CARD_COLUMNS, TRANSACTION_COLUMNS,
};
use crate::io::sync_reader::{open_input, reader_builder};
use crate::types::{amount, ReconError, TransactionAmount};
use csv::StringRecord;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Locations of the three ledger exports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerFiles {
    pub cards: PathBuf,
    pub transactions: PathBuf,
    pub amounts: PathBuf,
}

/// Row counts from one load
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub cards: usize,
    pub transactions: usize,
    pub amounts: usize,
    /// Malformed rows that were skipped
    pub rejected: usize,
    /// Rows whose key had already been loaded
    pub duplicates: usize,
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cards, {} transactions, {} amounts loaded ({} rejected, {} duplicates)",
            self.cards, self.transactions, self.amounts, self.rejected, self.duplicates
        )
    }
}

/// Parsed rows of one file plus the number of rows skipped
struct FileRows<T> {
    rows: Vec<T>,
    rejected: usize,
}

/// Load all three ledger files into `store`, creating the schema if needed
///
/// # Errors
///
/// Returns a fatal error if a file is missing, lacks a required column or
/// cannot be read, or if the store rejects the inserts.
pub fn load_ledger(store: &SqliteLedgerStore, files: &LedgerFiles) -> Result<LoadReport, ReconError> {
    store.migrate()?;
    let mut report = LoadReport::default();

    let cards = read_ledger_file(&files.cards, CARD_COLUMNS, convert_card)?;
    report.cards = store.insert_cards(&cards.rows)?;
    report.rejected += cards.rejected;
    report.duplicates += cards.rows.len() - report.cards;

    let transactions =
        read_ledger_file(&files.transactions, TRANSACTION_COLUMNS, convert_transaction)?;
    report.transactions = store.insert_transactions(&transactions.rows)?;
    report.rejected += transactions.rejected;
    report.duplicates += transactions.rows.len() - report.transactions;

    let mut amounts = read_ledger_file(&files.amounts, AMOUNT_COLUMNS, convert_amount)?;
    let before = amounts.rows.len();
    amounts.rows.retain(fits_units);
    report.rejected += amounts.rejected + (before - amounts.rows.len());
    report.amounts = store.insert_amounts(&amounts.rows)?;
    report.duplicates += amounts.rows.len() - report.amounts;

    info!(%report, "ledger loaded");
    Ok(report)
}

fn fits_units(row: &TransactionAmount) -> bool {
    let fits = [row.local_value, row.reference_value]
        .into_iter()
        .flatten()
        .all(|v| amount::to_units(v).is_some());
    if !fits {
        warn!(transaction_id = %row.transaction_id, "skipping amount row: value out of range");
    }
    fits
}

fn read_ledger_file<C, T>(
    path: &Path,
    required: &[&str],
    convert: fn(C) -> Result<T, ReconError>,
) -> Result<FileRows<T>, ReconError>
where
    C: DeserializeOwned,
{
    let label = path.display().to_string();
    let mut reader = reader_builder().from_reader(open_input(path)?);
    let headers = reader.headers()?.clone();
    check_columns(&label, headers.iter(), required)?;

    let mut rows = Vec::new();
    let mut rejected = 0;
    let mut record = StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let line = record.position().map(|p| p.line());
                match record
                    .deserialize::<C>(Some(&headers))
                    .map_err(ReconError::from)
                    .and_then(convert)
                {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        warn!(file = %label, error = %e.at_line(line), "skipping ledger row");
                        rejected += 1;
                    }
                }
            }
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => {
                warn!(file = %label, error = %e, "skipping ledger row");
                rejected += 1;
            }
        }
    }

    Ok(FileRows { rows, rejected })
}

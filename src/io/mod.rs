//! I/O module
//!
//! Handles CSV ingestion and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (records, column checks, conversion, output)
//! - `sync_reader` - Synchronous alert reader with iterator interface
//! - `async_reader` - Asynchronous alert reader with batch reading interface
//! - `ledger_loader` - Loads the ledger CSV exports into the SQLite store

pub mod async_reader;
pub mod csv_format;
pub mod ledger_loader;
pub mod sync_reader;

pub use async_reader::{AlertRow, AsyncReader};
pub use csv_format::{convert_alert, write_matches_csv, AlertRecord, CsvAlert, MatchWriter};
pub use ledger_loader::{load_ledger, LedgerFiles, LoadReport};
pub use sync_reader::SyncReader;

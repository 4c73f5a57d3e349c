//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over alerted transactions from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader validates the header row up front, then reads one raw record
//! at a time, deserializes it against the header and converts it into an
//! [`AlertRecord`]. The whole file is never held in memory.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<AlertRecord, ReconError>` for each CSV row:
//!
//! ```no_run
//! use card_alert_recon::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("alerts.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Reconciling alert: {:?}", record.alert),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, missing columns) are returned from `new()`
//! - Individual record errors are yielded as `ParseError`s carrying the line number

use crate::io::csv_format::{check_columns, convert_alert, AlertRecord, CsvAlert, ALERT_COLUMNS};
use crate::types::ReconError;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// CSV reader settings shared by every input file
pub fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024);
    builder
}

/// Open an input file, mapping a missing file to `FileNotFound`
pub fn open_input(path: &Path) -> Result<File, ReconError> {
    File::open(path).map_err(|e| open_error(path, e))
}

/// Error for a failed open of `path`
pub fn open_error(path: &Path, err: std::io::Error) -> ReconError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ReconError::file_not_found(&path.display().to_string())
    } else {
        ReconError::from(err)
    }
}

#[derive(Debug)]
pub struct SyncReader<R = File> {
    reader: csv::Reader<R>,
    headers: StringRecord,
    record: StringRecord,
}

impl SyncReader<File> {
    /// Open an alert file and validate its header
    ///
    /// # Errors
    ///
    /// `FileNotFound` if the file does not exist, `MissingColumns` if the
    /// header lacks any alert column.
    pub fn new(path: &Path) -> Result<Self, ReconError> {
        let file = open_input(path)?;
        Self::from_reader(file, &path.display().to_string())
    }
}

impl<R: Read> SyncReader<R> {
    /// Read alerts from any byte source; `label` names it in errors
    pub fn from_reader(input: R, label: &str) -> Result<Self, ReconError> {
        let mut reader = reader_builder().from_reader(input);
        let headers = reader.headers()?.clone();
        check_columns(label, headers.iter(), ALERT_COLUMNS)?;

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }
}

impl<R: Read> Iterator for SyncReader<R> {
    type Item = Result<AlertRecord, ReconError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let line = self.record.position().map(|p| p.line());
                let converted = self
                    .record
                    .deserialize::<CsvAlert>(Some(&self.headers))
                    .map_err(ReconError::from)
                    .and_then(convert_alert)
                    .map_err(|e| e.at_line(line));
                Some(converted)
            }
            Err(e) => Some(Err(ReconError::from(e))),
        }
    }
}

//! Asynchronous CSV reader with batch interface
//!
//! Provides batched reading of alerted transactions for the parallel strategy.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - a running row index, so results can be put back in input order after
//!   they have been reconciled out of order
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of AlertRows (index + record)
//!                  ↓
//!           csv_format module
//!           (CsvAlert, convert_alert)
//! ```

use crate::io::csv_format::{check_columns, convert_alert, AlertRecord, CsvAlert, ALERT_COLUMNS};
use crate::types::ReconError;
use csv_async::{AsyncReaderBuilder, StringRecord};
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// One data row of the alert file
#[derive(Debug, Clone)]
pub struct AlertRow {
    /// Zero-based position among the data rows
    pub index: usize,
    pub record: Result<AlertRecord, ReconError>,
}

pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncReader<R>,
    headers: StringRecord,
    next_index: usize,
}

impl<R: AsyncRead + Unpin + Send> AsyncReader<R> {
    /// Read and validate the header row
    ///
    /// # Errors
    ///
    /// `MissingColumns` if the header lacks any alert column.
    pub async fn new(reader: R, label: &str) -> Result<Self, ReconError> {
        let mut csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_reader(reader);

        let headers = csv_reader
            .headers()
            .await
            .map_err(|e| ReconError::parse_error(Some(1), &e.to_string()))?
            .clone();
        check_columns(label, headers.iter(), ALERT_COLUMNS)?;

        Ok(Self {
            csv_reader,
            headers,
            next_index: 0,
        })
    }

    /// Read up to `batch_size` rows; an empty batch means end of input
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<AlertRow> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.records();

        while batch.len() < batch_size {
            let record = match records.next().await {
                Some(Ok(raw)) => {
                    let line = raw.position().map(|p| p.line());
                    raw.deserialize::<CsvAlert>(Some(&self.headers))
                        .map_err(|e| ReconError::parse_error(line, &e.to_string()))
                        .and_then(convert_alert)
                        .map_err(|e| e.at_line(line))
                }
                Some(Err(e)) => Err(ReconError::parse_error(None, &e.to_string())),
                None => break,
            };
            batch.push(AlertRow {
                index: self.next_index,
                record,
            });
            self.next_index += 1;
        }

        batch
    }
}

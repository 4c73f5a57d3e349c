//! Asynchronous batch reconciliation strategy
//!
//! This module provides a parallel implementation of the ReconciliationStrategy
//! trait. Alerts are read in batches and the alerts of a batch are reconciled
//! concurrently.
//!
//! # Architecture
//!
//! ```text
//! AsyncReconciliationStrategy
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── AsyncReader (batched CSV reading with row indexes)
//!     ├── BatchProcessor (blocking-pool workers + DashMap of outcomes)
//!     └── ReconciliationEngine (shared, read-only)
//! ```
//!
//! # Ordering
//!
//! Batches are processed one after another. Within a batch, outcomes are
//! taken back out of the processor by row index, so the output is identical
//! to the synchronous strategy's.

use super::{log_alert_issues, log_rejected_row, ReconciliationStrategy, SharedEngine};
use crate::core::{BatchProcessor, RunSummary};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::MatchWriter;
use crate::io::sync_reader::open_error;
use crate::types::ReconError;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of alerts read per batch
    pub batch_size: usize,

    /// Maximum number of alerts reconciled at the same time
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a configuration, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            warn!(
                max_concurrent,
                default = default.max_concurrent,
                "invalid max_concurrent, using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsyncReconciliationStrategy {
    config: BatchConfig,
}

impl AsyncReconciliationStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ReconciliationStrategy for AsyncReconciliationStrategy {
    fn process(
        &self,
        engine: SharedEngine,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<RunSummary, ReconError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent)
            .build()?;

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| open_error(input_path, e))?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader =
                AsyncReader::new(compat_file, &input_path.display().to_string()).await?;

            let processor = BatchProcessor::new(engine, self.config.max_concurrent);
            let mut writer = MatchWriter::new(output)?;
            let mut summary = RunSummary::new();

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                debug!(rows = batch.len(), "processing batch");

                let mut indices = Vec::with_capacity(batch.len());
                let mut alerts = Vec::with_capacity(batch.len());
                for row in batch {
                    indices.push(row.index);
                    match row.record {
                        Ok(record) => {
                            log_alert_issues(&record);
                            alerts.push((row.index, record.alert));
                        }
                        Err(e) => log_rejected_row(&e),
                    }
                }

                processor.process_batch(alerts).await?;

                for index in indices {
                    match processor.take(index) {
                        Some(outcome) => {
                            summary.record(&outcome);
                            if let Some(matched) = outcome.result() {
                                writer.write(matched)?;
                            }
                        }
                        None => summary.record_rejected(),
                    }
                }
            }

            writer.finish()?;
            Ok(summary)
        })
    }
}

//! Concurrent reconciliation of alert batches
//!
//! This module provides the `BatchProcessor` struct, which reconciles the
//! alerts of one batch in parallel while keeping the final output in input
//! order.
//!
//! # Design
//!
//! Alerts are independent of each other and the store is read-only during a
//! run, so every alert of a batch can be reconciled at the same time. Each
//! alert runs on tokio's blocking pool (store queries are blocking calls), with
//! at most `max_concurrent` in flight. Outcomes are written into a shared
//! `DashMap` keyed by the alert's row index; the caller takes them back out in
//! index order once the batch has completed.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     ├── Arc<ReconciliationEngine<S>>      (shared, immutable)
//!     └── Arc<DashMap<usize, MatchOutcome>>  (row index → outcome)
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tracing::error;

use crate::core::engine::{MatchOutcome, ReconciliationEngine};
use crate::core::traits::LedgerStore;
use crate::types::{AlertedTransaction, ReconError};

#[derive(Debug)]
pub struct BatchProcessor<S> {
    engine: Arc<ReconciliationEngine<S>>,
    outcomes: Arc<DashMap<usize, MatchOutcome>>,
    max_concurrent: usize,
}

impl<S> Clone for BatchProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            outcomes: Arc::clone(&self.outcomes),
            max_concurrent: self.max_concurrent,
        }
    }
}

impl<S: LedgerStore + 'static> BatchProcessor<S> {
    /// Create a processor running at most `max_concurrent` alerts at once
    pub fn new(engine: Arc<ReconciliationEngine<S>>, max_concurrent: usize) -> Self {
        Self {
            engine,
            outcomes: Arc::new(DashMap::new()),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Reconcile a batch of `(row index, alert)` pairs
    ///
    /// Every task runs to completion even if one fails.
    ///
    /// # Errors
    ///
    /// Returns the first fatal store error raised by any alert of the batch.
    pub async fn process_batch(
        &self,
        alerts: Vec<(usize, AlertedTransaction)>,
    ) -> Result<(), ReconError> {
        let mut tasks = stream::iter(alerts)
            .map(|(index, alert)| {
                let engine = Arc::clone(&self.engine);
                let outcomes = Arc::clone(&self.outcomes);
                tokio::task::spawn_blocking(move || {
                    let outcome = engine.reconcile(&alert)?;
                    outcomes.insert(index, outcome);
                    Ok::<_, ReconError>(())
                })
            })
            .buffer_unordered(self.max_concurrent);

        let mut first_error = None;
        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => error!(error = %e, "reconciliation task panicked"),
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Remove and return the outcome recorded for `index`
    pub fn take(&self, index: usize) -> Option<MatchOutcome> {
        self.outcomes.remove(&index).map(|(_, outcome)| outcome)
    }

    /// Number of outcomes not yet taken
    pub fn pending(&self) -> usize {
        self.outcomes.len()
    }
}

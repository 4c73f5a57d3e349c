//! Synchronous reconciliation strategy
//!
//! Single-threaded reference pipeline: each alert is read, reconciled through
//! every tier it needs and written out before the next one is read.
//!
//! # Design
//!
//! The SyncReconciliationStrategy only orchestrates, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Matching to `ReconciliationEngine`
//! - CSV output to `csv_format::MatchWriter`
//!
//! Memory use is constant in the number of alerts.

use super::{log_alert_issues, log_rejected_row, ReconciliationStrategy, SharedEngine};
use crate::core::RunSummary;
use crate::io::csv_format::MatchWriter;
use crate::io::sync_reader::SyncReader;
use crate::types::ReconError;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct SyncReconciliationStrategy;

impl ReconciliationStrategy for SyncReconciliationStrategy {
    fn process(
        &self,
        engine: SharedEngine,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<RunSummary, ReconError> {
        let reader = SyncReader::new(input_path)?;
        let mut writer = MatchWriter::new(output)?;
        let mut summary = RunSummary::new();

        for result in reader {
            match result {
                Ok(record) => {
                    log_alert_issues(&record);
                    let outcome = engine.reconcile(&record.alert)?;
                    summary.record(&outcome);
                    if let Some(matched) = outcome.result() {
                        writer.write(matched)?;
                    }
                }
                Err(e) => {
                    log_rejected_row(&e);
                    summary.record_rejected();
                }
            }
        }

        writer.finish()?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::core::{InMemoryLedgerStore, LedgerStore, ReconciliationEngine};
    use crate::types::{Card, LedgerTransaction, TransactionAmount};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn engine() -> SharedEngine {
        let mut store = InMemoryLedgerStore::new();
        store.insert_card(Card {
            card_id: "c1".to_string(),
            visible_number: "411111******1111".to_string(),
        });
        store.insert_transaction(LedgerTransaction {
            transaction_id: "t1".to_string(),
            created_at: 1_700_000_000,
            order_id: "o1".to_string(),
            authorization_code: "AB1234".to_string(),
            card_id: Some("c1".to_string()),
            user_id: "u1".to_string(),
        });
        store.insert_amount(TransactionAmount {
            transaction_id: "t1".to_string(),
            created_at: None,
            local_value: Some(Decimal::from(100)),
            reference_value: None,
        });
        let store: Arc<dyn LedgerStore> = Arc::new(store);
        Arc::new(ReconciliationEngine::new(store, MatchConfig::default()))
    }

    #[test]
    fn test_sync_strategy_writes_matches_and_counts() {
        let file = create_temp_csv(
            "authorization_code,transaction_date,masked_card,value\n\
             1234,2023-11-14,411111******1111,100\n\
             9999,2020-01-01,411111******1111,100\n\
             ,2023-11-14,411111******1111,100\n\
             ZZZZ,1700086400,411111******1111,104\n",
        );
        let mut output = Vec::new();

        let summary = SyncReconciliationStrategy
            .process(engine(), file.path(), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "authorization_code,transaction_id,order_id,user_id,card_id\n\
             1234,t1,o1,u1,c1\n\
             ZZZZ,t1,o1,u1,c1\n"
        );
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let mut output = Vec::new();
        let result =
            SyncReconciliationStrategy.process(engine(), Path::new("nonexistent.csv"), &mut output);
        assert!(matches!(result, Err(ReconError::FileNotFound { .. })));
    }
}

//! Processing strategy module for alert reconciliation
//!
//! This module defines the Strategy pattern for complete reconciliation
//! pipelines, encompassing alert parsing, tiered matching and output. This
//! allows different implementations (synchronous, parallel batch) to be
//! selected at runtime. Both strategies produce byte-identical output for the
//! same input.

use crate::cli::StrategyType;
use crate::core::{LedgerStore, ReconciliationEngine, RunSummary};
use crate::io::csv_format::AlertRecord;
use crate::types::ReconError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncReconciliationStrategy, BatchConfig};
pub use sync::SyncReconciliationStrategy;

/// Engine handle shared by all strategies
pub type SharedEngine = Arc<ReconciliationEngine<Arc<dyn LedgerStore>>>;

/// Strategy trait for reconciliation pipelines
///
/// A strategy reads the alert file at `input_path`, reconciles every alert
/// with `engine` and writes one CSV row per match to `output`, in input order.
///
/// # Errors
///
/// Fatal errors only: unreadable or malformed alert file, a failing store or
/// an unwritable output. Per-row problems are logged and counted as skipped.
pub trait ReconciliationStrategy: Send + Sync {
    fn process(
        &self,
        engine: SharedEngine,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<RunSummary, ReconError>;
}

/// Factory function to create a reconciliation strategy
///
/// `config` is only used by the async strategy; `None` selects the defaults.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ReconciliationStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncReconciliationStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncReconciliationStrategy::new(config))
        }
    }
}

fn log_alert_issues(record: &AlertRecord) {
    for issue in &record.issues {
        warn!(
            auth_code = record.alert.auth_code(),
            error = %issue,
            "alert limited to authorization-code matching"
        );
    }
}

fn log_rejected_row(error: &ReconError) {
    warn!(error = %error, "skipping alert row");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_strategy_returns_both_kinds() {
        let _sync = create_strategy(StrategyType::Sync, None);
        let _async = create_strategy(StrategyType::Async, Some(BatchConfig::new(10, 2)));
    }
}

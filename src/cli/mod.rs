// CLI module
// Command-line interface, argument parsing and run orchestration

mod args;

pub use args::{CliArgs, StrategyType};

use crate::core::{LedgerStore, ReconciliationEngine, RunSummary, SqliteLedgerStore};
use crate::io::ledger_loader::load_ledger;
use crate::strategy::create_strategy;
use crate::types::ReconError;
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use tracing::info;

/// Parse command-line arguments using clap
///
/// If parsing fails (e.g., invalid arguments, missing required arguments, or
/// --help flag), clap will display an error message or help text and exit the
/// process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Run a full reconciliation as described by `args`
///
/// Resolves configuration, prepares the ledger store (loading CSV exports if
/// given), then reconciles the alert file with the selected strategy.
///
/// # Errors
///
/// Any fatal error: bad configuration, missing files or columns, an
/// unreachable store, or an unwritable output.
pub fn run(args: &CliArgs) -> Result<RunSummary, ReconError> {
    let file_config = args.load_file_config()?;
    let match_config = args.to_match_config(file_config.as_ref())?;
    let ledger_files = args.ledger_files()?;

    let store = match &args.db {
        Some(path) => SqliteLedgerStore::open(path)?,
        None => SqliteLedgerStore::in_memory()?,
    }
    .with_query_timeout(match_config.query_timeout);

    if let Some(files) = &ledger_files {
        load_ledger(&store, files)?;
    }
    let transactions = store.health_check()?;
    info!(transactions, "ledger ready");

    let store: Arc<dyn LedgerStore> = Arc::new(store);
    let engine = Arc::new(ReconciliationEngine::new(store, match_config));

    let batch_config = match args.strategy {
        StrategyType::Async => Some(args.to_batch_config(file_config.as_ref())),
        StrategyType::Sync => None,
    };
    let strategy = create_strategy(args.strategy, batch_config);

    let summary = match &args.output {
        Some(path) => {
            let mut output = BufWriter::new(File::create(path)?);
            let summary = strategy.process(engine, &args.alerts_file, &mut output)?;
            output.flush()?;
            summary
        }
        None => {
            let stdout = std::io::stdout();
            let mut output = stdout.lock();
            strategy.process(engine, &args.alerts_file, &mut output)?
        }
    };

    info!(%summary, "reconciliation complete");
    Ok(summary)
}

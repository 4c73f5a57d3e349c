//! Card Alert Reconciler CLI
//!
//! Command-line interface for matching externally reported card transactions
//! against the ledger.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --cards cards.csv --transactions transactions.csv --amounts amounts.csv alerts.csv > matches.csv
//! cargo run -- --db ledger.db alerts.csv > matches.csv
//! cargo run -- --db ledger.db --strategy async --batch-size 2000 --max-concurrent 8 alerts.csv
//! cargo run -- --db ledger.db --strict-auth --tolerance 0.02 --window-days 1 alerts.csv
//! ```
//!
//! Matches are written as CSV to stdout (or `--output`), logs to stderr.
//!
//! # Processing Strategies
//!
//! - **sync**: one alert at a time (default)
//! - **async**: parallel batches on a multi-threaded runtime, same output
//!
//! # Exit Codes
//!
//! - 0: Run completed, whether or not every alert matched
//! - 1: Fatal error (bad arguments or config, missing file or column, store failure)

use card_alert_recon::cli;
use card_alert_recon::logging::init_logging;
use std::process;

fn main() {
    let args = cli::parse_args();
    init_logging(args.log_level, args.log_json);

    if let Err(e) = cli::run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

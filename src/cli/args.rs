use crate::config::{FileConfig, MatchConfig};
use crate::io::ledger_loader::LedgerFiles;
use crate::logging::LogLevel;
use crate::strategy::BatchConfig;
use crate::types::ReconError;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the alert reconciler
///
/// The ledger comes either from an existing SQLite database (`--db`), from the
/// three CSV exports (`--cards`, `--transactions`, `--amounts`), or both, in
/// which case the exports are loaded into the database first.
#[derive(Parser, Debug)]
#[command(name = "alert-recon")]
#[command(
    about = "Reconcile externally reported card transactions against the ledger",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the alerted transactions CSV file
    #[arg(value_name = "ALERTS", help = "Path to the alerted transactions CSV file")]
    pub alerts_file: PathBuf,

    #[arg(
        long = "db",
        value_name = "PATH",
        help = "SQLite ledger database (in-memory if omitted)"
    )]
    pub db: Option<PathBuf>,

    #[arg(long = "cards", value_name = "PATH", help = "Cards CSV to load")]
    pub cards: Option<PathBuf>,

    #[arg(
        long = "transactions",
        value_name = "PATH",
        help = "Transactions CSV to load"
    )]
    pub transactions: Option<PathBuf>,

    #[arg(long = "amounts", value_name = "PATH", help = "Transaction amounts CSV to load")]
    pub amounts: Option<PathBuf>,

    #[arg(
        long = "output",
        short = 'o',
        value_name = "PATH",
        help = "Write matches here instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for one alert at a time or 'async' for parallel batches"
    )]
    pub strategy: StrategyType,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of alerts per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of alerts reconciled concurrently (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    #[arg(
        long = "tolerance",
        value_name = "FRACTION",
        help = "Relative value tolerance, e.g. 0.05 for ±5% (default: 0.05)"
    )]
    pub tolerance: Option<Decimal>,

    #[arg(
        long = "window-days",
        value_name = "DAYS",
        help = "Days either side of the alert date to search (default: 2)"
    )]
    pub window_days: Option<i64>,

    #[arg(
        long = "strict-auth",
        help = "Require authorization-code matches to fall inside the value band"
    )]
    pub strict_auth: bool,

    #[arg(
        long = "query-timeout-ms",
        value_name = "MS",
        help = "Per-query timeout; a timed out query counts as no candidates"
    )]
    pub query_timeout_ms: Option<u64>,

    #[arg(long = "config", value_name = "PATH", help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "info",
        help = "Log verbosity when RUST_LOG is not set"
    )]
    pub log_level: LogLevel,

    #[arg(long = "log-json", help = "Emit logs as JSON lines on stderr")]
    pub log_json: bool,
}

/// Processing strategy type selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    /// Single-threaded, one alert at a time
    Sync,
    /// Parallel batches on a tokio runtime
    Async,
}

impl CliArgs {
    /// Read the `--config` file, if one was given
    pub fn load_file_config(&self) -> Result<Option<FileConfig>, ReconError> {
        self.config.as_deref().map(FileConfig::load).transpose()
    }

    /// Matching parameters: defaults, then the config file, then flags
    ///
    /// # Errors
    ///
    /// `Config` if a value is malformed or out of range.
    pub fn to_match_config(&self, file: Option<&FileConfig>) -> Result<MatchConfig, ReconError> {
        let mut config = match file {
            Some(file) => file.apply_matching(MatchConfig::default())?,
            None => MatchConfig::default(),
        };

        if let Some(tolerance) = self.tolerance {
            config.value_tolerance = tolerance;
        }
        if let Some(days) = self.window_days {
            config.date_window_days = days;
        }
        if self.strict_auth {
            config.strict_authorization = true;
        }
        if let Some(ms) = self.query_timeout_ms {
            config.query_timeout = Some(Duration::from_millis(ms));
        }

        config.validate()?;
        Ok(config)
    }

    /// Batch parameters: flags, then the config file, then defaults
    pub fn to_batch_config(&self, file: Option<&FileConfig>) -> BatchConfig {
        let section = file.map(|f| &f.batch);
        let batch_size = self
            .batch_size
            .or_else(|| section.and_then(|s| s.batch_size));
        let max_concurrent = self
            .max_concurrent
            .or_else(|| section.and_then(|s| s.max_concurrent));

        if batch_size.is_none() && max_concurrent.is_none() {
            return BatchConfig::default();
        }

        let default = BatchConfig::default();
        BatchConfig::new(
            batch_size.unwrap_or(default.batch_size),
            max_concurrent.unwrap_or(default.max_concurrent),
        )
    }

    /// The ledger exports to load, if any
    ///
    /// # Errors
    ///
    /// `Config` if only some of the three files were given, or if neither
    /// exports nor a database were given.
    pub fn ledger_files(&self) -> Result<Option<LedgerFiles>, ReconError> {
        match (&self.cards, &self.transactions, &self.amounts) {
            (Some(cards), Some(transactions), Some(amounts)) => Ok(Some(LedgerFiles {
                cards: cards.clone(),
                transactions: transactions.clone(),
                amounts: amounts.clone(),
            })),
            (None, None, None) if self.db.is_some() => Ok(None),
            (None, None, None) => Err(ReconError::config(
                "no ledger given: pass --db or all of --cards, --transactions and --amounts",
            )),
            _ => Err(ReconError::config(
                "--cards, --transactions and --amounts must be given together",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Strategy parsing tests
    #[rstest]
    #[case::default_strategy(&["program", "alerts.csv"], StrategyType::Sync)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "alerts.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "alerts.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    // Individual config option tests
    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "alerts.csv"], Some(2000), None)]
    #[case::max_concurrent(&["program", "--max-concurrent", "8", "alerts.csv"], None, Some(8))]
    #[case::no_options(&["program", "alerts.csv"], None, None)]
    #[case::all_options(
        &["program", "--strategy", "async", "--batch-size", "2000", "--max-concurrent", "8", "alerts.csv"],
        Some(2000),
        Some(8)
    )]
    fn test_batch_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.max_concurrent, max_concurrent);
    }

    // BatchConfig conversion tests with valid values
    #[rstest]
    #[case::all_defaults(&["program", "alerts.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "alerts.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "alerts.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "alerts.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "alerts.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_batch_config(None);

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent, expected_max_concurrent);
    }

    #[test]
    fn test_batch_flags_override_file() {
        let file = FileConfig::parse("[batch]\nbatch_size = 50\nmax_concurrent = 3\n").unwrap();
        let parsed = CliArgs::try_parse_from(["program", "--batch-size", "10", "alerts.csv"]).unwrap();

        let config = parsed.to_batch_config(Some(&file));
        assert_eq!(config, BatchConfig::new(10, 3));
    }

    #[test]
    fn test_match_config_defaults() {
        let parsed = CliArgs::try_parse_from(["program", "alerts.csv"]).unwrap();
        assert_eq!(parsed.to_match_config(None).unwrap(), MatchConfig::default());
    }

    #[test]
    fn test_match_flags_override_file() {
        let file = FileConfig::parse(
            "[matching]\nvalue_tolerance = \"0.10\"\ndate_window_days = 5\nquery_timeout_ms = 100\n",
        )
        .unwrap();
        let parsed = CliArgs::try_parse_from([
            "program",
            "--window-days",
            "1",
            "--strict-auth",
            "alerts.csv",
        ])
        .unwrap();

        let config = parsed.to_match_config(Some(&file)).unwrap();
        assert_eq!(config.value_tolerance, Decimal::new(10, 2));
        assert_eq!(config.date_window_days, 1);
        assert!(config.strict_authorization);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(100)));
    }

    #[rstest]
    #[case::tolerance_too_large(&["program", "--tolerance", "1.5", "alerts.csv"])]
    #[case::negative_window(&["program", "--window-days=-1", "alerts.csv"])]
    #[case::huge_window(&["program", "--window-days", "9223372036854775", "alerts.csv"])]
    fn test_match_config_rejects_out_of_range(#[case] args: &[&str]) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert!(matches!(
            parsed.to_match_config(None),
            Err(ReconError::Config { .. })
        ));
    }

    #[rstest]
    #[case::all_three(
        &["program", "--cards", "c.csv", "--transactions", "t.csv", "--amounts", "a.csv", "alerts.csv"],
        true
    )]
    #[case::db_only(&["program", "--db", "ledger.db", "alerts.csv"], false)]
    fn test_ledger_files(#[case] args: &[&str], #[case] expect_files: bool) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.ledger_files().unwrap().is_some(), expect_files);
    }

    #[rstest]
    #[case::partial(&["program", "--cards", "c.csv", "--db", "ledger.db", "alerts.csv"])]
    #[case::nothing(&["program", "alerts.csv"])]
    fn test_ledger_files_errors(#[case] args: &[&str]) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert!(matches!(
            parsed.ledger_files(),
            Err(ReconError::Config { .. })
        ));
    }

    // Error handling tests
    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "alerts.csv"])]
    #[case::invalid_tolerance(&["program", "--tolerance", "five", "alerts.csv"])]
    #[case::invalid_log_level(&["program", "--log-level", "loud", "alerts.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}

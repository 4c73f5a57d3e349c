//! End-to-end integration tests
//!
//! These tests validate the complete reconciliation pipeline using predefined
//! CSV fixtures. Each fixture directory under tests/fixtures/ holds:
//! - `cards.csv`, `transactions.csv`, `amounts.csv` - the ledger exports
//! - `alerts.csv` - the alerted transactions
//! - `expected.csv` - the exact expected output
//!
//! Each fixture is loaded into an in-memory SQLite ledger, reconciled, and the
//! output compared byte for byte with expected.csv. Fixtures cover:
//! - Authorization-code substring matches
//! - Ambiguous matches resolved by closest value, including exact ties
//! - Window-tier matches and their inclusive date and value boundaries
//! - Alerts with no match at all
//! - Malformed ledger rows and degraded alerts
//! - A mixed run exercising all of the above
//!
//! Each fixture is run with both the synchronous and the async strategy.

#[cfg(test)]
mod tests {
    use card_alert_recon::cli::{self, CliArgs, StrategyType};
    use card_alert_recon::config::MatchConfig;
    use card_alert_recon::core::{LedgerStore, ReconciliationEngine, SqliteLedgerStore};
    use card_alert_recon::io::{load_ledger, LedgerFiles};
    use card_alert_recon::strategy::{create_strategy, BatchConfig};
    use card_alert_recon::ReconError;
    use clap::Parser;
    use rstest::rstest;
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::{NamedTempFile, TempDir};

    fn fixture_dir(name: &str) -> PathBuf {
        Path::new("tests/fixtures").join(name)
    }

    fn ledger_files(dir: &Path) -> LedgerFiles {
        LedgerFiles {
            cards: dir.join("cards.csv"),
            transactions: dir.join("transactions.csv"),
            amounts: dir.join("amounts.csv"),
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
    }

    /// Run a fixture through the selected strategy and return the output CSV
    fn reconcile_fixture(dir: &Path, strategy_type: StrategyType, config: MatchConfig) -> String {
        let store = SqliteLedgerStore::in_memory().expect("Failed to open store");
        load_ledger(&store, &ledger_files(dir))
            .unwrap_or_else(|e| panic!("Failed to load ledger: {}", e));

        let store: Arc<dyn LedgerStore> = Arc::new(store);
        let engine = Arc::new(ReconciliationEngine::new(store, config));

        // Small batches so the async strategy crosses batch boundaries
        let strategy = create_strategy(strategy_type, Some(BatchConfig::new(2, 4)));
        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        strategy
            .process(engine, &dir.join("alerts.csv"), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to reconcile alerts: {}", e));
        temp_output.flush().expect("Failed to flush temp file");

        read(temp_output.path())
    }

    /// End-to-end test for all fixtures with both strategies
    #[rstest]
    #[case("authorization_substring")]
    #[case("ambiguous_authorization")]
    #[case("window_match")]
    #[case("no_match")]
    #[case("window_boundaries")]
    #[case("data_quality")]
    #[case("mixed")]
    #[case("strict_authorization")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let dir = fixture_dir(fixture);
        let actual = reconcile_fixture(&dir, strategy, MatchConfig::default());
        let expected = read(&dir.join("expected.csv"));

        assert_eq!(
            actual, expected,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture, strategy, actual, expected
        );
    }

    #[rstest]
    fn test_strict_authorization_falls_back_to_window(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let dir = fixture_dir("strict_authorization");
        let config = MatchConfig {
            strict_authorization: true,
            ..MatchConfig::default()
        };

        let actual = reconcile_fixture(&dir, strategy, config);
        assert_eq!(actual, read(&dir.join("expected_strict.csv")));
    }

    fn cli_args(dir: &Path, output: &Path, extra: &[&str]) -> CliArgs {
        let path = |name: &str| dir.join(name).display().to_string();
        let mut args = vec![
            "alert-recon".to_string(),
            "--cards".to_string(),
            path("cards.csv"),
            "--transactions".to_string(),
            path("transactions.csv"),
            "--amounts".to_string(),
            path("amounts.csv"),
            "--output".to_string(),
            output.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        args.push(path("alerts.csv"));
        CliArgs::try_parse_from(args).expect("Failed to parse arguments")
    }

    #[test]
    fn test_cli_run_reports_summary() {
        let dir = fixture_dir("mixed");
        let output = NamedTempFile::new().expect("Failed to create temp file");

        let summary = cli::run(&cli_args(&dir, output.path(), &["--strategy", "async"])).unwrap();

        assert_eq!(read(output.path()), read(&dir.join("expected.csv")));
        assert_eq!(summary.matched, 4);
        assert_eq!(summary.ambiguous_resolved, 4);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn test_cli_run_counts_data_quality_skips() {
        let dir = fixture_dir("data_quality");
        let output = NamedTempFile::new().expect("Failed to create temp file");

        let summary = cli::run(&cli_args(&dir, output.path(), &[])).unwrap();
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.skipped, 3);
    }

    #[test]
    fn test_cli_run_with_config_file() {
        let dir = fixture_dir("strict_authorization");
        let output = NamedTempFile::new().expect("Failed to create temp file");
        let mut config = NamedTempFile::new().expect("Failed to create temp file");
        config
            .write_all(b"[matching]\nstrict_authorization = true\n")
            .expect("Failed to write config");
        config.flush().expect("Failed to flush config");

        let config_path = config.path().display().to_string();
        cli::run(&cli_args(&dir, output.path(), &["--config", &config_path])).unwrap();

        assert_eq!(read(output.path()), read(&dir.join("expected_strict.csv")));
    }

    #[test]
    fn test_cli_run_reuses_database() {
        let dir = fixture_dir("ambiguous_authorization");
        let db_dir = TempDir::new().expect("Failed to create temp dir");
        let db = db_dir.path().join("ledger.db").display().to_string();
        let output = NamedTempFile::new().expect("Failed to create temp file");

        // First run loads the exports into the database
        cli::run(&cli_args(&dir, output.path(), &["--db", &db])).unwrap();

        // Second run reads the ledger from the database alone
        let second = NamedTempFile::new().expect("Failed to create temp file");
        let args = CliArgs::try_parse_from([
            "alert-recon".to_string(),
            "--db".to_string(),
            db,
            "--output".to_string(),
            second.path().display().to_string(),
            dir.join("alerts.csv").display().to_string(),
        ])
        .unwrap();
        cli::run(&args).unwrap();

        assert_eq!(read(second.path()), read(&dir.join("expected.csv")));
    }

    #[rstest]
    fn test_alerts_missing_columns_is_fatal(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let dir = fixture_dir("mixed");
        let mut alerts = NamedTempFile::new().expect("Failed to create temp file");
        alerts
            .write_all(b"authorization_code,masked_card\n1234,411111******1111\n")
            .expect("Failed to write alerts");
        alerts.flush().expect("Failed to flush alerts");

        let store = SqliteLedgerStore::in_memory().unwrap();
        load_ledger(&store, &ledger_files(&dir)).unwrap();
        let store: Arc<dyn LedgerStore> = Arc::new(store);
        let engine = Arc::new(ReconciliationEngine::new(store, MatchConfig::default()));

        let mut output = Vec::new();
        let result =
            create_strategy(strategy, None).process(engine, alerts.path(), &mut output);

        match result {
            Err(ReconError::MissingColumns { columns, .. }) => {
                assert_eq!(columns, vec!["transaction_date", "value"]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[rstest]
    fn test_out_of_range_value_does_not_stop_the_run(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let dir = fixture_dir("authorization_substring");
        let mut alerts = NamedTempFile::new().expect("Failed to create temp file");
        alerts
            .write_all(
                b"authorization_code,transaction_date,masked_card,value\n\
                  NOPE,2024-03-01,411111******1111,10000000000000000000000000\n\
                  1234,2024-03-10 12:00:00,550000******0004,12.00\n",
            )
            .expect("Failed to write alerts");
        alerts.flush().expect("Failed to flush alerts");

        let store = SqliteLedgerStore::in_memory().unwrap();
        load_ledger(&store, &ledger_files(&dir)).unwrap();
        let store: Arc<dyn LedgerStore> = Arc::new(store);
        let engine = Arc::new(ReconciliationEngine::new(store, MatchConfig::default()));

        let mut output = Vec::new();
        let summary = create_strategy(strategy, Some(BatchConfig::new(1, 2)))
            .process(engine, alerts.path(), &mut output)
            .unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), read(&dir.join("expected.csv")));
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_cli_run_without_ledger_is_fatal() {
        let output = NamedTempFile::new().expect("Failed to create temp file");
        let args = CliArgs::try_parse_from([
            "alert-recon".to_string(),
            "--output".to_string(),
            output.path().display().to_string(),
            "alerts.csv".to_string(),
        ])
        .unwrap();

        assert!(matches!(cli::run(&args), Err(ReconError::Config { .. })));
    }
}

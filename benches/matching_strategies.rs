//! Benchmark suite for comparing reconciliation strategies
//!
//! Compares the synchronous and asynchronous strategies on a generated ledger
//! using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! # Generated Data
//!
//! The ledger holds `size` transactions spread over 50 cards and 30 days. The
//! alert file has one alert per ledger transaction, cycling through:
//! - an exact authorization code (unique authorization match)
//! - a shared code fragment (ambiguous authorization match)
//! - an unknown code with the transaction's card, date and value (window match)

use card_alert_recon::cli::StrategyType;
use card_alert_recon::config::MatchConfig;
use card_alert_recon::core::{LedgerStore, ReconciliationEngine, SqliteLedgerStore};
use card_alert_recon::strategy::{create_strategy, BatchConfig, SharedEngine};
use card_alert_recon::types::{Card, LedgerTransaction, TransactionAmount};
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const CARDS: usize = 50;
const BASE_TIME: i64 = 1_709_251_200;

fn main() {
    divan::main();
}

struct Fixture {
    engine: SharedEngine,
    alerts: NamedTempFile,
}

fn card_number(card: usize) -> String {
    format!("4{:05}******{:04}", card, card)
}

fn fixture(size: usize) -> Fixture {
    let cards: Vec<Card> = (0..CARDS)
        .map(|c| Card {
            card_id: format!("c{}", c),
            visible_number: card_number(c),
        })
        .collect();
    let transactions: Vec<LedgerTransaction> = (0..size)
        .map(|i| LedgerTransaction {
            transaction_id: format!("t{:07}", i),
            created_at: BASE_TIME + (i as i64 % 30) * 86_400 + i as i64,
            order_id: format!("o{}", i),
            authorization_code: format!("A{:07}", i),
            card_id: Some(format!("c{}", i % CARDS)),
            user_id: format!("u{}", i % 500),
        })
        .collect();
    let amounts: Vec<TransactionAmount> = (0..size)
        .map(|i| TransactionAmount {
            transaction_id: format!("t{:07}", i),
            created_at: None,
            local_value: Some(Decimal::new(1_000 + (i as i64 * 37) % 90_000, 2)),
            reference_value: Some(Decimal::new(250 + (i as i64 * 11) % 20_000, 2)),
        })
        .collect();

    let store = SqliteLedgerStore::in_memory().expect("Failed to open store");
    store.migrate().expect("Failed to migrate");
    store.insert_cards(&cards).expect("Failed to insert cards");
    store
        .insert_transactions(&transactions)
        .expect("Failed to insert transactions");
    store.insert_amounts(&amounts).expect("Failed to insert amounts");

    let mut alerts = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(alerts, "authorization_code,transaction_date,masked_card,value")
        .expect("Failed to write alerts");
    for (tx, amount) in transactions.iter().zip(&amounts) {
        let value = amount.local_value.unwrap_or(Decimal::ONE);
        let code = match tx.created_at % 3 {
            0 => tx.authorization_code.clone(),
            1 => tx.authorization_code[..6].to_string(),
            _ => format!("W{}", tx.transaction_id),
        };
        let card = tx
            .card_id
            .as_deref()
            .and_then(|id| id[1..].parse::<usize>().ok())
            .unwrap_or(0);
        writeln!(
            alerts,
            "{},{},{},{}",
            code,
            tx.created_at,
            card_number(card),
            value
        )
        .expect("Failed to write alerts");
    }
    alerts.flush().expect("Failed to flush alerts");

    let store: Arc<dyn LedgerStore> = Arc::new(store);
    Fixture {
        engine: Arc::new(ReconciliationEngine::new(store, MatchConfig::default())),
        alerts,
    }
}

/// Benchmark the synchronous strategy
#[divan::bench(args = [100, 1_000, 10_000])]
fn sync_strategy(bencher: divan::Bencher, size: usize) {
    let fixture = fixture(size);
    let strategy = create_strategy(StrategyType::Sync, None);

    bencher.bench_local(|| {
        let mut output = Vec::new();
        strategy
            .process(Arc::clone(&fixture.engine), fixture.alerts.path(), &mut output)
            .expect("Processing failed")
    });
}

/// Benchmark the asynchronous strategy with default batching
#[divan::bench(args = [100, 1_000, 10_000])]
fn async_strategy(bencher: divan::Bencher, size: usize) {
    let fixture = fixture(size);
    let strategy = create_strategy(StrategyType::Async, Some(BatchConfig::default()));

    bencher.bench_local(|| {
        let mut output = Vec::new();
        strategy
            .process(Arc::clone(&fixture.engine), fixture.alerts.path(), &mut output)
            .expect("Processing failed")
    });
}

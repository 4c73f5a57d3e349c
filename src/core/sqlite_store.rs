//! SQLite-backed ledger store
//!
//! Only this module talks to the database. Every query is a prepared statement
//! with bound parameters; no ledger or alert value is ever spliced into SQL text.
//!
//! # Amounts
//!
//! Values are stored as integer units of 1/10000 (see [`crate::types::amount`]),
//! so the inclusive band bounds and the closest-value ordering are exact.
//!
//! # Timeouts
//!
//! With a query timeout configured, a progress handler interrupts any statement
//! that runs past its deadline. The interruption surfaces as
//! [`ReconError::QueryTimeout`], which the engine treats as an empty tier.

use crate::core::traits::{LedgerStore, WindowQuery};
use crate::types::amount;
use crate::types::{Candidate, Card, LedgerTransaction, ReconError, TransactionAmount};
use rusqlite::{params, Connection, ErrorCode, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// VM instructions between deadline checks
const PROGRESS_INTERVAL: i32 = 1_000;

const SELECT_JOINED: &str = "
    SELECT t.authorization_code, t.transaction_id, t.order_id, t.user_id, t.card_id,
           a.local_value_units, a.reference_value_units
    FROM transactions t
    LEFT OUTER JOIN cards c ON c.card_id = t.card_id
    LEFT OUTER JOIN transaction_amounts a ON a.transaction_id = t.transaction_id";

const AUTH_FILTER: &str = "WHERE instr(upper(t.authorization_code), upper(?1)) > 0";

const WINDOW_FILTER: &str = "
    WHERE t.created_at BETWEEN ?1 AND ?2
      AND substr(c.visible_number, 1, length(?3)) = ?3
      AND substr(c.visible_number, -length(?4)) = ?4
      AND (a.local_value_units BETWEEN ?5 AND ?6
           OR a.reference_value_units BETWEEN ?5 AND ?6)";

/// Smaller of the two currency distances; NULL only when both amounts are NULL
fn distance_order(param: usize) -> String {
    format!(
        "ORDER BY MIN(COALESCE(ABS(a.local_value_units - ?{p}), ABS(a.reference_value_units - ?{p})),
                      COALESCE(ABS(a.reference_value_units - ?{p}), ABS(a.local_value_units - ?{p}))) IS NULL,
                  MIN(COALESCE(ABS(a.local_value_units - ?{p}), ABS(a.reference_value_units - ?{p})),
                      COALESCE(ABS(a.reference_value_units - ?{p}), ABS(a.local_value_units - ?{p}))),
                  t.transaction_id
         LIMIT 1",
        p = param
    )
}

fn candidate_from_row(row: &Row<'_>) -> rusqlite::Result<Candidate> {
    Ok(Candidate {
        authorization_code: row.get(0)?,
        transaction_id: row.get(1)?,
        order_id: row.get(2)?,
        user_id: row.get(3)?,
        card_id: row.get(4)?,
        local_value: row.get::<_, Option<i64>>(5)?.map(amount::from_units),
        reference_value: row.get::<_, Option<i64>>(6)?.map(amount::from_units),
    })
}

/// Target value as units, saturating for absurdly large values
fn target_units(target: Decimal) -> i64 {
    amount::to_units(target).unwrap_or(i64::MAX)
}

/// Ledger store over a single SQLite connection
///
/// The connection sits behind a mutex so the store is `Sync` and can be shared
/// by parallel workers; queries are serialized on the connection.
pub struct SqliteLedgerStore {
    conn: Mutex<Connection>,
    query_timeout: Option<Duration>,
}

impl std::fmt::Debug for SqliteLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedgerStore")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

impl SqliteLedgerStore {
    /// Open (or create) the ledger database at `path`
    pub fn open(path: &Path) -> Result<Self, ReconError> {
        let conn = Connection::open(path).map_err(|e| {
            ReconError::store_unavailable(format!("cannot open '{}': {}", path.display(), e))
        })?;
        info!(path = %path.display(), "opened ledger database");
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, ReconError> {
        let conn = Connection::open_in_memory().map_err(ReconError::store_unavailable)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            query_timeout: None,
        }
    }

    /// Interrupt any single query that runs longer than `timeout`
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ReconError> {
        self.conn
            .lock()
            .map_err(|_| ReconError::store_unavailable("connection lock poisoned"))
    }

    /// Create tables and indexes if they do not exist yet
    pub fn migrate(&self) -> Result<(), ReconError> {
        self.lock()?
            .execute_batch(include_str!("../../migrations/001_ledger.sql"))
            .map_err(ReconError::store_unavailable)
    }

    /// Confirm the schema is present, returning the number of transactions
    pub fn health_check(&self) -> Result<u64, ReconError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .map_err(ReconError::store_unavailable)?;
        Ok(count as u64)
    }

    /// Insert cards, skipping ids already present; returns rows inserted
    pub fn insert_cards(&self, cards: &[Card]) -> Result<usize, ReconError> {
        let mut conn = self.lock()?;
        let inserted = (|| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO cards (card_id, visible_number) VALUES (?1, ?2)",
                )?;
                for card in cards {
                    inserted += stmt.execute(params![card.card_id, card.visible_number])?;
                }
            }
            tx.commit()?;
            Ok::<_, rusqlite::Error>(inserted)
        })()
        .map_err(|e| ReconError::store_query("insert_cards", e))?;
        Ok(inserted)
    }

    /// Insert transactions, skipping ids already present; returns rows inserted
    pub fn insert_transactions(&self, rows: &[LedgerTransaction]) -> Result<usize, ReconError> {
        let mut conn = self.lock()?;
        let inserted = (|| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO transactions
                        (transaction_id, created_at, order_id, authorization_code, card_id, user_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for row in rows {
                    inserted += stmt.execute(params![
                        row.transaction_id,
                        row.created_at,
                        row.order_id,
                        row.authorization_code,
                        row.card_id,
                        row.user_id,
                    ])?;
                }
            }
            tx.commit()?;
            Ok::<_, rusqlite::Error>(inserted)
        })()
        .map_err(|e| ReconError::store_query("insert_transactions", e))?;
        Ok(inserted)
    }

    /// Insert amount rows, skipping transactions that already have one
    ///
    /// # Errors
    ///
    /// Fails if a value does not fit in 64-bit units.
    pub fn insert_amounts(&self, rows: &[TransactionAmount]) -> Result<usize, ReconError> {
        let mut units = Vec::with_capacity(rows.len());
        for row in rows {
            let local = row.local_value.map(|v| to_units_checked(v, row)).transpose()?;
            let reference = row.reference_value.map(|v| to_units_checked(v, row)).transpose()?;
            units.push((row, local, reference));
        }

        let mut conn = self.lock()?;
        let inserted = (|| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO transaction_amounts
                        (transaction_id, created_at, local_value_units, reference_value_units)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (row, local, reference) in &units {
                    inserted += stmt.execute(params![
                        row.transaction_id,
                        row.created_at,
                        local,
                        reference,
                    ])?;
                }
            }
            tx.commit()?;
            Ok::<_, rusqlite::Error>(inserted)
        })()
        .map_err(|e| ReconError::store_query("insert_amounts", e))?;
        Ok(inserted)
    }

    /// Run `query` on the connection under the configured deadline
    fn run<T>(
        &self,
        name: &str,
        query: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, ReconError> {
        let conn = self.lock()?;
        // Timeouts too large for an Instant never fire
        if let Some(deadline) = self.query_timeout.and_then(|t| Instant::now().checked_add(t)) {
            conn.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() >= deadline));
        }

        let result = query(&*conn);

        if self.query_timeout.is_some() {
            conn.progress_handler(0, None::<fn() -> bool>);
        }

        result.map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::OperationInterrupted => {
                let timeout_ms = self
                    .query_timeout
                    .map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
                ReconError::query_timeout(name, timeout_ms)
            }
            other => ReconError::store_query(name, other),
        })
    }

    fn query_many(
        &self,
        name: &str,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Candidate>, ReconError> {
        let rows = self.run(name, |conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params, candidate_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        debug!(query = name, rows = rows.len(), "ledger query");
        Ok(rows)
    }

    fn query_one(
        &self,
        name: &str,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Option<Candidate>, ReconError> {
        let mut rows = self.query_many(name, sql, params)?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }
}

fn to_units_checked(value: Decimal, row: &TransactionAmount) -> Result<i64, ReconError> {
    amount::to_units(value).ok_or_else(|| {
        ReconError::store_query(
            "insert_amounts",
            format!("value {} of transaction {} is out of range", value, row.transaction_id),
        )
    })
}

impl LedgerStore for SqliteLedgerStore {
    fn find_by_auth_code(&self, fragment: &str) -> Result<Vec<Candidate>, ReconError> {
        let sql = format!("{} {} ORDER BY t.transaction_id", SELECT_JOINED, AUTH_FILTER);
        self.query_many("find_by_auth_code", &sql, &[&fragment])
    }

    fn find_by_auth_code_closest_value(
        &self,
        fragment: &str,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError> {
        let sql = format!("{} {} {}", SELECT_JOINED, AUTH_FILTER, distance_order(2));
        let target = target_units(target);
        self.query_one("find_by_auth_code_closest_value", &sql, &[&fragment, &target])
    }

    fn find_by_window(&self, query: &WindowQuery) -> Result<Vec<Candidate>, ReconError> {
        let sql = format!("{} {} ORDER BY t.transaction_id", SELECT_JOINED, WINDOW_FILTER);
        let (lower, upper) = band_units(query);
        self.query_many(
            "find_by_window",
            &sql,
            &[
                &query.date_lower,
                &query.date_upper,
                &query.card_prefix,
                &query.card_suffix,
                &lower,
                &upper,
            ],
        )
    }

    fn find_by_window_closest_value(
        &self,
        query: &WindowQuery,
        target: Decimal,
    ) -> Result<Option<Candidate>, ReconError> {
        let sql = format!("{} {} {}", SELECT_JOINED, WINDOW_FILTER, distance_order(7));
        let (lower, upper) = band_units(query);
        let target = target_units(target);
        self.query_one(
            "find_by_window_closest_value",
            &sql,
            &[
                &query.date_lower,
                &query.date_upper,
                &query.card_prefix,
                &query.card_suffix,
                &lower,
                &upper,
                &target,
            ],
        )
    }
}

/// Inclusive unit bounds of the value band; values are positive so only the
/// upper direction can overflow
fn band_units(query: &WindowQuery) -> (i64, i64) {
    (
        query.band.lower_units().unwrap_or(i64::MAX),
        query.band.upper_units().unwrap_or(i64::MAX),
    )
}

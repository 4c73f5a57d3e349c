//! Error types for the alert reconciler
//!
//! This module defines all error types that can occur during a reconciliation run.
//! Errors are designed to be descriptive and user-friendly for CLI output.
//!
//! # Error Categories
//!
//! - **Fatal**: missing input files, missing CSV columns, an unreachable store,
//!   invalid configuration. These abort the run before matching begins.
//! - **Per-record**: malformed rows and invalid alert fields. The record is
//!   logged and skipped, the run continues.
//! - **Query timeouts**: non-fatal, the engine treats the tier as empty.

use thiserror::Error;

/// Main error type for the reconciler
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconError {
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// Recoverable for individual rows; the row is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Input file lacks one or more required columns
    ///
    /// This is a fatal error raised before any record is processed.
    #[error("{file} is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Which input the columns are missing from
        file: String,
        /// Names of the missing columns
        columns: Vec<String>,
    },

    /// The ledger store could not be opened or is not initialized
    #[error("Ledger store unavailable: {message}")]
    StoreUnavailable {
        /// Underlying cause
        message: String,
    },

    /// A store query failed for a reason other than a timeout
    #[error("Ledger query '{query}' failed: {message}")]
    StoreQuery {
        /// Name of the store operation
        query: String,
        /// Underlying cause
        message: String,
    },

    /// A store query exceeded the configured timeout
    ///
    /// Not fatal: the engine treats the tier as having no candidates.
    #[error("Ledger query '{query}' timed out after {timeout_ms}ms")]
    QueryTimeout {
        /// Name of the store operation
        query: String,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// An alerted transaction field failed validation
    #[error("Invalid alert {field}: {reason}")]
    InvalidAlert {
        /// Field that failed validation
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Configuration value out of range or unreadable config file
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },
}

impl From<std::io::Error> for ReconError {
    fn from(err: std::io::Error) -> Self {
        ReconError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for ReconError {
    fn from(err: csv::Error) -> Self {
        ReconError::ParseError {
            line: err.position().map(|p| p.line()),
            message: err.to_string(),
        }
    }
}

impl ReconError {
    /// Whether this error must abort the run
    ///
    /// Timeouts, per-row parse errors and invalid alerts are isolated to one record.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ReconError::QueryTimeout { .. }
                | ReconError::ParseError { .. }
                | ReconError::InvalidAlert { .. }
        )
    }

    /// Create a FileNotFound error
    pub fn file_not_found(path: &str) -> Self {
        ReconError::FileNotFound {
            path: path.to_string(),
        }
    }

    /// Create a ParseError error
    pub fn parse_error(line: Option<u64>, message: &str) -> Self {
        ReconError::ParseError {
            line,
            message: message.to_string(),
        }
    }

    /// Create a MissingColumns error
    pub fn missing_columns(file: &str, columns: &[&str]) -> Self {
        ReconError::MissingColumns {
            file: file.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Create a StoreUnavailable error
    pub fn store_unavailable(message: impl std::fmt::Display) -> Self {
        ReconError::StoreUnavailable {
            message: message.to_string(),
        }
    }

    /// Create a StoreQuery error
    pub fn store_query(query: &str, message: impl std::fmt::Display) -> Self {
        ReconError::StoreQuery {
            query: query.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a QueryTimeout error
    pub fn query_timeout(query: &str, timeout_ms: u64) -> Self {
        ReconError::QueryTimeout {
            query: query.to_string(),
            timeout_ms,
        }
    }

    /// Create an InvalidAlert error
    pub fn invalid_alert(field: &str, reason: &str) -> Self {
        ReconError::InvalidAlert {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl std::fmt::Display) -> Self {
        ReconError::Config {
            message: message.to_string(),
        }
    }

    /// Locate a per-record error at an input line
    ///
    /// Row-level failures (`ParseError` without a line, `InvalidAlert`) become
    /// a `ParseError` carrying `line`. Other errors are returned unchanged.
    pub fn at_line(self, line: Option<u64>) -> Self {
        match self {
            ReconError::ParseError {
                line: None,
                message,
            } => ReconError::ParseError { line, message },
            ReconError::InvalidAlert { field, reason } => ReconError::ParseError {
                line,
                message: format!("invalid {}: {}", field, reason),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::file_not_found(
        ReconError::FileNotFound { path: "alerts.csv".to_string() },
        "File not found: alerts.csv"
    )]
    #[case::io_error(
        ReconError::IoError { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    #[case::parse_error_with_line(
        ReconError::ParseError { line: Some(42), message: "Invalid field".to_string() },
        "CSV parse error at line 42: Invalid field"
    )]
    #[case::parse_error_without_line(
        ReconError::ParseError { line: None, message: "Invalid field".to_string() },
        "CSV parse error: Invalid field"
    )]
    #[case::missing_columns(
        ReconError::missing_columns("alerts.csv", &["value", "masked_card"]),
        "alerts.csv is missing required columns: value, masked_card"
    )]
    #[case::store_unavailable(
        ReconError::StoreUnavailable { message: "no such table: transactions".to_string() },
        "Ledger store unavailable: no such table: transactions"
    )]
    #[case::query_timeout(
        ReconError::QueryTimeout { query: "find_by_window".to_string(), timeout_ms: 250 },
        "Ledger query 'find_by_window' timed out after 250ms"
    )]
    #[case::invalid_alert(
        ReconError::InvalidAlert { field: "value".to_string(), reason: "must be positive".to_string() },
        "Invalid alert value: must be positive"
    )]
    fn test_error_display(#[case] error: ReconError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::unlocated_parse_error(
        ReconError::parse_error(None, "missing card_id"),
        "CSV parse error at line 7: missing card_id"
    )]
    #[case::located_parse_error(
        ReconError::parse_error(Some(3), "bad quote"),
        "CSV parse error at line 3: bad quote"
    )]
    #[case::invalid_alert(
        ReconError::invalid_alert("authorization_code", "must not be empty"),
        "CSV parse error at line 7: invalid authorization_code: must not be empty"
    )]
    #[case::fatal_unchanged(
        ReconError::store_unavailable("locked"),
        "Ledger store unavailable: locked"
    )]
    fn test_at_line(#[case] error: ReconError, #[case] expected: &str) {
        assert_eq!(error.at_line(Some(7)).to_string(), expected);
    }

    #[rstest]
    #[case::timeout(ReconError::query_timeout("q", 10), false)]
    #[case::parse(ReconError::parse_error(Some(3), "bad"), false)]
    #[case::invalid_alert(ReconError::invalid_alert("value", "bad"), false)]
    #[case::store_unavailable(ReconError::store_unavailable("gone"), true)]
    #[case::store_query(ReconError::store_query("q", "disk I/O error"), true)]
    #[case::missing_columns(ReconError::missing_columns("cards.csv", &["card_id"]), true)]
    fn test_is_fatal(#[case] error: ReconError, #[case] fatal: bool) {
        assert_eq!(error.is_fatal(), fatal);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: ReconError = io_error.into();
        assert!(matches!(error, ReconError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}

//! Run configuration
//!
//! Matching parameters live in [`MatchConfig`]. They can be read from an
//! optional TOML file and are then overridden by command-line flags:
//!
//! ```toml
//! [matching]
//! value_tolerance = "0.05"
//! date_window_days = 2
//! strict_authorization = false
//! query_timeout_ms = 500
//!
//! [batch]
//! batch_size = 1000
//! max_concurrent = 8
//! ```

use crate::types::ReconError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Seconds in one day, used to widen the date window
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Parameters of the tiered matching protocol
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Relative tolerance of the value band (0.05 = ±5%)
    pub value_tolerance: Decimal,

    /// Days either side of the alert timestamp, inclusive
    pub date_window_days: i64,

    /// Require the authorization-tier winner to lie in the value band as well
    pub strict_authorization: bool,

    /// Per-query timeout; a timed out query counts as no candidates
    pub query_timeout: Option<Duration>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            value_tolerance: Decimal::new(5, 2),
            date_window_days: 2,
            strict_authorization: false,
            query_timeout: None,
        }
    }
}

impl MatchConfig {
    /// Check ranges: tolerance in `[0, 1)`, window non-negative and expressible in seconds
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.value_tolerance < Decimal::ZERO || self.value_tolerance >= Decimal::ONE {
            return Err(ReconError::config(format!(
                "value_tolerance {} must be in [0, 1)",
                self.value_tolerance
            )));
        }
        if self.date_window_days < 0 {
            return Err(ReconError::config(format!(
                "date_window_days {} must not be negative",
                self.date_window_days
            )));
        }
        if self.date_window_days.checked_mul(SECONDS_PER_DAY).is_none() {
            return Err(ReconError::config(format!(
                "date_window_days {} is too large",
                self.date_window_days
            )));
        }
        Ok(())
    }

    /// Half-width of the date window in seconds, saturating
    pub fn window_seconds(&self) -> i64 {
        self.date_window_days.saturating_mul(SECONDS_PER_DAY)
    }
}

/// `[matching]` section of the config file
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingSection {
    /// Given as a string so the decimal is read exactly
    pub value_tolerance: Option<String>,
    pub date_window_days: Option<i64>,
    pub strict_authorization: Option<bool>,
    pub query_timeout_ms: Option<u64>,
}

/// `[batch]` section of the config file
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSection {
    pub batch_size: Option<usize>,
    pub max_concurrent: Option<usize>,
}

/// Contents of a config file
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub matching: MatchingSection,
    #[serde(default)]
    pub batch: BatchSection,
}

impl FileConfig {
    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReconError::file_not_found(&path.display().to_string())
            } else {
                ReconError::from(e)
            }
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ReconError> {
        toml::from_str(text).map_err(|e| ReconError::config(e.to_string()))
    }

    /// Apply the `[matching]` section on top of `base`
    pub fn apply_matching(&self, mut base: MatchConfig) -> Result<MatchConfig, ReconError> {
        let section = &self.matching;
        if let Some(raw) = &section.value_tolerance {
            base.value_tolerance = raw
                .trim()
                .parse::<Decimal>()
                .map_err(|e| ReconError::config(format!("value_tolerance '{}': {}", raw, e)))?;
        }
        if let Some(days) = section.date_window_days {
            base.date_window_days = days;
        }
        if let Some(strict) = section.strict_authorization {
            base.strict_authorization = strict;
        }
        if let Some(ms) = section.query_timeout_ms {
            base.query_timeout = Some(Duration::from_millis(ms));
        }
        base.validate()?;
        Ok(base)
    }
}

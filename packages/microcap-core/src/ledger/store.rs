//! CSV persistence for the portfolio ledger and the trade log.

use crate::types::{SnapshotRow, TradeLogEntry};
use crate::Result;
use chrono::NaiveDate;
use std::env;
use std::fs;
use std::fs::OpenOptions;
use std::path::PathBuf;

/// The portfolio ledger file: one row per ticker per date plus one `TOTAL`
/// row per date.
///
/// Commits use delete-then-append semantics: all rows already carrying the
/// committed date are dropped before the new rows are written, so re-running
/// an update for the same date replaces rather than duplicates.
#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Open the ledger at the default path.
    ///
    /// Default path: `~/.microcap/portfolio_update.csv`
    /// Can be overridden with the `MICROCAP_LEDGER_FILE` environment variable.
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Open a ledger at a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the default ledger file path.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("MICROCAP_LEDGER_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".microcap/portfolio_update.csv"))
            .unwrap_or_else(|| PathBuf::from("portfolio_update.csv"))
    }

    /// Get the current path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Whether the ledger file exists yet.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all rows, empty when the file does not exist yet.
    pub fn read_rows(&self) -> Result<Vec<SnapshotRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        Ok(rows)
    }

    /// Replace all rows for `date` with `rows` and rewrite the file.
    pub fn commit(&self, date: NaiveDate, rows: &[SnapshotRow]) -> Result<()> {
        let mut all = self.read_rows()?;
        all.retain(|r| r.date != date);
        all.extend_from_slice(rows);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        for row in &all {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Cash balance from the most recent `TOTAL` row, if any.
    pub fn latest_cash(&self) -> Result<Option<f64>> {
        Ok(self
            .read_rows()?
            .into_iter()
            .filter(|r| r.is_total())
            .max_by_key(|r| r.date)
            .and_then(|r| r.cash_balance))
    }

    /// Dated total-equity series from the `TOTAL` rows, oldest first.
    pub fn equity_series(&self) -> Result<Vec<(NaiveDate, f64)>> {
        let mut series: Vec<(NaiveDate, f64)> = self
            .read_rows()?
            .into_iter()
            .filter(|r| r.is_total())
            .filter_map(|r| r.total_equity.map(|equity| (r.date, equity)))
            .collect();
        series.sort_by_key(|(date, _)| *date);
        Ok(series)
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The append-only trade log file. Existing lines are never rewritten.
#[derive(Debug)]
pub struct TradeLog {
    path: PathBuf,
}

impl TradeLog {
    /// Open the trade log at the default path.
    ///
    /// Default path: `~/.microcap/trade_log.csv`
    /// Can be overridden with the `MICROCAP_TRADE_LOG_FILE` environment variable.
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Open a trade log at a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the default trade log file path.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("MICROCAP_TRADE_LOG_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".microcap/trade_log.csv"))
            .unwrap_or_else(|| PathBuf::from("trade_log.csv"))
    }

    /// Get the current path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one entry.
    pub fn append(&self, entry: &TradeLogEntry) -> Result<()> {
        self.append_all(std::slice::from_ref(entry))
    }

    /// Append entries in order. The header is written only when the file is
    /// created.
    pub fn append_all(&self, entries: &[TradeLogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let needs_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for entry in entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read all entries, empty when the file does not exist yet.
    pub fn read_entries(&self) -> Result<Vec<TradeLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut entries = Vec::new();
        for record in reader.deserialize() {
            entries.push(record?);
        }
        Ok(entries)
    }
}

impl Default for TradeLog {
    fn default() -> Self {
        Self::new()
    }
}

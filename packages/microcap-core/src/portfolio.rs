//! Portfolio state persistence.

use crate::types::{Portfolio, Position};
use crate::Result;
use chrono::Utc;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Persisted portfolio state: open positions plus the cash balance.
///
/// State is stored as pretty-printed JSON and rewritten in full on save.
#[derive(Debug)]
pub struct PortfolioBook {
    /// Path to the portfolio JSON file
    path: PathBuf,
    /// In-memory portfolio state
    portfolio: Portfolio,
}

impl PortfolioBook {
    /// Open the portfolio at the default path.
    ///
    /// Default path: `~/.microcap/portfolio.json`
    /// Can be overridden with the `MICROCAP_PORTFOLIO_FILE` environment variable.
    pub fn new() -> Self {
        let path = Self::default_path();
        let portfolio = Self::load_from_path(&path).unwrap_or_default();
        Self { path, portfolio }
    }

    /// Open a portfolio at a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        let portfolio = Self::load_from_path(&path).unwrap_or_default();
        Self { path, portfolio }
    }

    /// Create an in-memory portfolio (no persistence).
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            portfolio: Portfolio::default(),
        }
    }

    /// Get the default portfolio file path.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("MICROCAP_PORTFOLIO_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".microcap/portfolio.json"))
            .unwrap_or_else(|| PathBuf::from("portfolio.json"))
    }

    /// Get the current path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Whether a portfolio file exists at this book's path.
    pub fn file_exists(&self) -> bool {
        !self.path.as_os_str().is_empty() && self.path.exists()
    }

    /// Load portfolio state from a specific path.
    fn load_from_path(path: &PathBuf) -> Result<Portfolio> {
        if !path.exists() {
            return Ok(Portfolio::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the current portfolio to disk.
    pub fn save(&mut self) -> Result<()> {
        // Skip if in-memory only
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Update timestamps
        if self.portfolio.created_at.is_none() {
            self.portfolio.created_at = Some(Utc::now());
        }
        self.portfolio.updated_at = Some(Utc::now());

        let content = serde_json::to_string_pretty(&self.portfolio)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Reload the portfolio from disk.
    pub fn reload(&mut self) -> Result<()> {
        self.portfolio = Self::load_from_path(&self.path)?;
        Ok(())
    }

    /// Get a reference to the current portfolio.
    pub fn get(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Get a mutable reference to the current portfolio.
    pub fn get_mut(&mut self) -> &mut Portfolio {
        &mut self.portfolio
    }

    /// Get all positions.
    pub fn positions(&self) -> &[Position] {
        &self.portfolio.positions
    }

    /// Get the cash balance.
    pub fn cash(&self) -> f64 {
        self.portfolio.cash
    }

    /// Set the cash balance.
    pub fn set_cash(&mut self, cash: f64) {
        self.portfolio.cash = cash;
    }
}

impl Default for PortfolioBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_in_memory_starts_empty() {
        let book = PortfolioBook::in_memory();
        assert_eq!(book.positions().len(), 0);
        assert_eq!(book.cash(), 0.0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portfolio.json");

        // Create and save
        {
            let mut book = PortfolioBook::with_path(path.clone());
            book.get_mut()
                .positions
                .push(Position::new("ACME", 10.0, 5.0, 4.5));
            book.set_cash(50.0);
            book.save().unwrap();
        }

        // Reload and verify
        {
            let book = PortfolioBook::with_path(path);
            assert_eq!(book.positions().len(), 1);
            assert_eq!(book.positions()[0].ticker, "ACME");
            assert_eq!(book.positions()[0].stop_loss, 4.5);
            assert_eq!(book.cash(), 50.0);
        }
    }

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempdir().unwrap();
        let book = PortfolioBook::with_path(dir.path().join("nope.json"));
        assert!(!book.file_exists());
        assert_eq!(book.positions().len(), 0);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeply/portfolio.json");

        let mut book = PortfolioBook::with_path(path.clone());
        book.set_cash(100.0);
        book.save().unwrap();

        assert!(path.exists());
    }
}

//! Microcap Core - Portfolio ledger and reporting library.
//!
//! This crate provides the core functionality for the micro-cap portfolio
//! tracker:
//!
//! - **Ledger updates**: daily valuation snapshots with stop-loss handling
//! - **Manual trades**: validated buy/sell recording against cash and holdings
//! - **Performance reporting**: total return, Sharpe ratio, Sortino ratio,
//!   benchmark comparison
//! - **Market data**: a pluggable price-lookup seam with a Yahoo Finance client
//!
//! # Example
//!
//! ```rust,no_run
//! use microcap_core::portfolio::PortfolioBook;
//!
//! // Open the portfolio (uses default path ~/.microcap/portfolio.json)
//! let book = PortfolioBook::new();
//! println!("Cash on hand: ${:.2}", book.cash());
//! println!("Open positions: {}", book.positions().len());
//! ```

pub mod ledger;
pub mod market;
pub mod portfolio;
pub mod report;
pub mod trades;
pub mod types;

// Re-export commonly used types
pub use types::{Action, ApiResponse, Portfolio, Position, SnapshotRow, TradeLogEntry};

// Re-export main functionality
pub use ledger::{process_portfolio, DailyUpdate, LedgerStore, TradeLog};
pub use market::{MarketData, Quote, YahooFinance};
pub use portfolio::PortfolioBook;
pub use report::{benchmark_comparison, performance_report, BenchmarkComparison, PerformanceReport};
pub use trades::{execute_buy, execute_sell, BuyOrder, SellOrder};

/// Error types for microcap-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("Insufficient funds: need ${needed:.2}, have ${available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Cannot sell {requested} shares, only {held} held")]
    OverSell { requested: f64, held: f64 },

    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    #[error("No market data for {0}")]
    NoMarketData(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

/// Result type for microcap-core operations.
pub type Result<T> = std::result::Result<T, Error>;

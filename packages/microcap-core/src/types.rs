//! Core data types for the micro-cap portfolio tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A position in the portfolio representing shares owned of a particular ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// Stock ticker symbol (uppercase)
    pub ticker: String,
    /// Number of shares owned (may be fractional)
    pub shares: f64,
    /// Price per share at acquisition
    pub buy_price: f64,
    /// Price at or below which the position is force-sold
    pub stop_loss: f64,
    /// Total amount paid for the currently-held shares
    pub cost_basis: f64,
}

impl Position {
    /// Create a new position. The cost basis is derived from shares and buy price.
    pub fn new(ticker: &str, shares: f64, buy_price: f64, stop_loss: f64) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            shares,
            buy_price,
            stop_loss,
            cost_basis: shares * buy_price,
        }
    }

    /// Market value of the position at the given price.
    pub fn value_at(&self, price: f64) -> f64 {
        price * self.shares
    }

    /// Unrealized profit or loss at the given price.
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.buy_price) * self.shares
    }
}

/// A portfolio containing open positions and free cash.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Portfolio {
    /// List of open positions
    pub positions: Vec<Position>,
    /// Cash balance
    pub cash: f64,
    /// When the portfolio was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the portfolio was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Portfolio {
    /// Create a new empty portfolio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a portfolio with initial cash.
    pub fn with_cash(cash: f64) -> Self {
        Self {
            cash,
            ..Default::default()
        }
    }

    /// Find a position by ticker (case-insensitive).
    pub fn find_position(&self, ticker: &str) -> Option<&Position> {
        let ticker_upper = ticker.to_uppercase();
        self.positions.iter().find(|p| p.ticker == ticker_upper)
    }

    /// Find a mutable position by ticker (case-insensitive).
    pub fn find_position_mut(&mut self, ticker: &str) -> Option<&mut Position> {
        let ticker_upper = ticker.to_uppercase();
        self.positions.iter_mut().find(|p| p.ticker == ticker_upper)
    }

    /// Remove a position by ticker, returning it if it was held.
    pub fn remove_position(&mut self, ticker: &str) -> Option<Position> {
        let ticker_upper = ticker.to_uppercase();
        self.positions
            .iter()
            .position(|p| p.ticker == ticker_upper)
            .map(|idx| self.positions.remove(idx))
    }

    /// Total cost basis of all open positions.
    pub fn total_cost(&self) -> f64 {
        self.positions.iter().map(|p| p.cost_basis).sum()
    }

    /// Number of open positions.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

/// Action recorded on a ledger snapshot row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Action {
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL - Stop Loss Triggered")]
    StopLossSell,
    #[serde(rename = "NO DATA")]
    NoData,
}

/// One ledger entry for one ticker on one date.
///
/// Numeric columns are blank on `NO DATA` rows; the cash balance and total
/// equity columns are only populated on the synthetic `TOTAL` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Shares")]
    pub shares: Option<f64>,
    #[serde(rename = "Cost Basis")]
    pub cost_basis: Option<f64>,
    #[serde(rename = "Stop Loss")]
    pub stop_loss: Option<f64>,
    #[serde(rename = "Current Price")]
    pub current_price: Option<f64>,
    #[serde(rename = "Total Value")]
    pub total_value: Option<f64>,
    #[serde(rename = "PnL")]
    pub pnl: Option<f64>,
    #[serde(rename = "Action")]
    pub action: Option<Action>,
    #[serde(rename = "Cash Balance")]
    pub cash_balance: Option<f64>,
    #[serde(rename = "Total Equity")]
    pub total_equity: Option<f64>,
}

impl SnapshotRow {
    /// Ticker used for the per-date summary row.
    pub const TOTAL_TICKER: &'static str = "TOTAL";

    /// Whether this is the synthetic per-date summary row.
    pub fn is_total(&self) -> bool {
        self.ticker == Self::TOTAL_TICKER
    }
}

/// An immutable record of one executed trade, appended to the trade log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeLogEntry {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Shares Sold/Bought")]
    pub shares: f64,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Cost Basis")]
    pub cost_basis: f64,
    #[serde(rename = "PnL")]
    pub pnl: f64,
    #[serde(rename = "Reason")]
    pub reason: String,
}

/// API response wrapper for success cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

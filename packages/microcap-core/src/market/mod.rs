//! Market data lookup.
//!
//! The [`MarketData`] trait is the seam to the external price source. An
//! empty result (unknown symbol, no trading data in the requested range) is
//! `Ok(None)` / an empty vector, not an error; errors are reserved for
//! transport failures.

mod yahoo;

pub use yahoo::YahooFinance;

use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily price record for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
}

impl Quote {
    /// Create a close-only quote.
    pub fn close_only(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
        }
    }
}

/// Price lookup collaborator.
pub trait MarketData {
    /// Most recent session's quote for a symbol, or `None` when the symbol
    /// has no trading data.
    fn latest(&self, symbol: &str) -> impl std::future::Future<Output = Result<Option<Quote>>>;

    /// Daily quotes over a date range (inclusive), oldest first. Empty when
    /// no trading data exists for the range.
    fn history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Vec<Quote>>>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory market data for tests.

    use super::{MarketData, Quote};
    use crate::{Error, Result};
    use chrono::NaiveDate;
    use std::collections::{HashMap, HashSet};

    /// Fixed quote series per symbol; symbols listed in `failing` error out
    /// on every call (simulating transport failures).
    #[derive(Debug, Default)]
    pub struct StaticMarket {
        quotes: HashMap<String, Vec<Quote>>,
        failing: HashSet<String>,
    }

    impl StaticMarket {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_quote(mut self, symbol: &str, quote: Quote) -> Self {
            self.quotes
                .entry(symbol.to_uppercase())
                .or_default()
                .push(quote);
            self
        }

        pub fn with_failure(mut self, symbol: &str) -> Self {
            self.failing.insert(symbol.to_uppercase());
            self
        }
    }

    impl MarketData for StaticMarket {
        async fn latest(&self, symbol: &str) -> Result<Option<Quote>> {
            let symbol = symbol.to_uppercase();
            if self.failing.contains(&symbol) {
                return Err(Error::NoMarketData(symbol));
            }
            Ok(self
                .quotes
                .get(&symbol)
                .and_then(|series| series.last().cloned()))
        }

        async fn history(
            &self,
            symbol: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<Quote>> {
            let symbol = symbol.to_uppercase();
            if self.failing.contains(&symbol) {
                return Err(Error::NoMarketData(symbol));
            }
            Ok(self
                .quotes
                .get(&symbol)
                .map(|series| {
                    series
                        .iter()
                        .filter(|q| q.date >= from && q.date <= to)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }
}

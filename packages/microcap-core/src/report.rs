//! Performance reporting over the ledger's equity history.

use crate::market::MarketData;
use crate::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Trading sessions per year, used to scale the risk-free rate.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Default annual risk-free rate.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.045;

/// Risk-adjusted return summary over the observed equity history.
///
/// `sharpe` and `sortino` are `None` when the ratio is undefined (too few
/// return observations, zero dispersion, or - for Sortino - no negative
/// days), never NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Number of daily return observations
    pub observations: usize,
    /// Most recent total equity
    pub latest_equity: f64,
    /// Return over the whole observed period
    pub total_return: f64,
    /// Risk-free return compounded over the same period
    pub risk_free_period_return: f64,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
}

/// Compute the performance report from the ordered `TOTAL` equity series.
///
/// Needs at least two data points; fails with `InsufficientHistory`
/// otherwise.
pub fn performance_report(equity: &[f64], annual_rf: f64) -> Result<PerformanceReport> {
    if equity.len() < 2 {
        return Err(Error::InsufficientHistory(format!(
            "need at least 2 dated snapshots, have {}",
            equity.len()
        )));
    }

    let returns = daily_returns(equity);
    let n = returns.len() as f64;

    let total_return = equity[equity.len() - 1] / equity[0] - 1.0;
    let rf_period = (1.0 + annual_rf).powf(n / TRADING_DAYS_PER_YEAR) - 1.0;
    let excess = total_return - rf_period;

    let sharpe = ratio(excess, sample_std(&returns), n);

    let downside: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();
    let sortino = ratio(excess, sample_std(&downside), n);

    Ok(PerformanceReport {
        observations: returns.len(),
        latest_equity: equity[equity.len() - 1],
        total_return,
        risk_free_period_return: rf_period,
        sharpe,
        sortino,
    })
}

/// Daily returns of an equity series: `equity[i]/equity[i-1] - 1`.
pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

fn ratio(excess: f64, std: Option<f64>, n: f64) -> Option<f64> {
    match std {
        Some(std) if std > 0.0 => Some(excess / (std * n.sqrt())),
        _ => None,
    }
}

/// Sample standard deviation (n-1 divisor). `None` for fewer than two
/// observations.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// A benchmark's return over a date range, normalized to a $100 baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub symbol: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Starting stake
    pub baseline: f64,
    /// What the stake is worth at the end of the range
    pub value: f64,
}

/// Fetch the benchmark's closing series and normalize $100 invested at the
/// start of the range. A failed or empty fetch is fatal to the report - no
/// substitute benchmark is used.
pub async fn benchmark_comparison<M: MarketData>(
    market: &M,
    symbol: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<BenchmarkComparison> {
    let quotes = market.history(symbol, from, to).await?;

    let (Some(first), Some(last)) = (quotes.first(), quotes.last()) else {
        return Err(Error::NoMarketData(symbol.to_string()));
    };

    let baseline = 100.0;
    Ok(BenchmarkComparison {
        symbol: symbol.to_string(),
        from,
        to,
        baseline,
        value: baseline * last.close / first.close,
    })
}

/// Latest close, day-over-day change, and volume for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceDigestEntry {
    pub ticker: String,
    pub close: f64,
    /// Percent change from the previous session, when one exists
    pub percent_change: Option<f64>,
    pub volume: Option<i64>,
}

/// Build the daily price digest for a set of symbols (held tickers plus
/// benchmark indices). Symbols with no data are skipped with a warning.
pub async fn price_digest<M: MarketData>(
    market: &M,
    symbols: &[String],
    date: NaiveDate,
) -> Vec<PriceDigestEntry> {
    let mut digest = Vec::new();
    let from = date - Duration::days(7);

    for symbol in symbols {
        let quotes = match market.history(symbol, from, date).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("digest lookup failed for {}: {}", symbol, e);
                continue;
            }
        };

        let Some(last) = quotes.last() else {
            warn!("no digest data for {}", symbol);
            continue;
        };

        let percent_change = quotes
            .len()
            .checked_sub(2)
            .and_then(|idx| quotes.get(idx))
            .map(|prev| (last.close - prev.close) / prev.close * 100.0);

        digest.push(PriceDigestEntry {
            ticker: symbol.clone(),
            close: last.close,
            percent_change,
            volume: last.volume,
        });
    }

    digest
}

//! Daily portfolio valuation.

use crate::market::MarketData;
use crate::types::{Action, Portfolio, Position, SnapshotRow, TradeLogEntry};
use chrono::NaiveDate;
use tracing::warn;

/// Round to two decimal places (ledger currency precision).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Result of one daily valuation pass.
#[derive(Debug, Clone)]
pub struct DailyUpdate {
    /// Ledger date the pass was run for
    pub date: NaiveDate,
    /// Snapshot rows in position order, ending with the `TOTAL` row
    pub rows: Vec<SnapshotRow>,
    /// Trade log entries for stop-loss liquidations
    pub trades: Vec<TradeLogEntry>,
    /// Market value of positions still held
    pub total_value: f64,
    /// Unrealized PnL of positions still held
    pub total_pnl: f64,
    /// Cash after stop-loss proceeds
    pub cash: f64,
    /// Total value plus cash
    pub total_equity: f64,
}

/// Value every held position at its latest close, apply the stop-loss rule,
/// and build the day's snapshot rows.
///
/// One price lookup is made per position. A failed or empty lookup degrades
/// that ticker to a `NO DATA` row (the position is kept, but excluded from
/// the totals). A close at or below the stop-loss liquidates the position:
/// proceeds go to cash, the position is removed from the portfolio, and a
/// trade log entry is produced. Liquidated positions do not contribute to
/// the day's totals.
///
/// The caller decides what to do with the result (persist it via
/// [`super::LedgerStore::commit`] and [`super::TradeLog::append_all`]).
pub async fn process_portfolio<M: MarketData>(
    market: &M,
    portfolio: &mut Portfolio,
    date: NaiveDate,
) -> DailyUpdate {
    let mut rows = Vec::new();
    let mut trades = Vec::new();
    let mut total_value = 0.0;
    let mut total_pnl = 0.0;

    let held: Vec<Position> = portfolio.positions.clone();
    for position in &held {
        let quote = match market.latest(&position.ticker).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("price lookup failed for {}: {}", position.ticker, e);
                None
            }
        };

        let Some(quote) = quote else {
            warn!("no data for {}", position.ticker);
            rows.push(no_data_row(position, date));
            continue;
        };

        let price = round2(quote.close);
        let value = round2(position.value_at(price));
        let pnl = round2(position.pnl_at(price));

        let action = if price <= position.stop_loss {
            // Liquidated before totals are struck: proceeds go to cash and
            // the value/pnl stay out of the day's totals
            portfolio.cash += value;
            portfolio.remove_position(&position.ticker);
            trades.push(TradeLogEntry {
                date,
                ticker: position.ticker.clone(),
                shares: position.shares,
                price,
                cost_basis: position.cost_basis,
                pnl,
                reason: "AUTOMATED SELL - STOPLOSS TRIGGERED".to_string(),
            });
            Action::StopLossSell
        } else {
            total_value += value;
            total_pnl += pnl;
            Action::Hold
        };

        rows.push(SnapshotRow {
            date,
            ticker: position.ticker.clone(),
            shares: Some(position.shares),
            cost_basis: Some(position.cost_basis),
            stop_loss: Some(position.stop_loss),
            current_price: Some(price),
            total_value: Some(value),
            pnl: Some(pnl),
            action: Some(action),
            cash_balance: None,
            total_equity: None,
        });
    }

    let total_value = round2(total_value);
    let total_pnl = round2(total_pnl);
    let cash = round2(portfolio.cash);
    let total_equity = round2(total_value + cash);

    rows.push(SnapshotRow {
        date,
        ticker: SnapshotRow::TOTAL_TICKER.to_string(),
        shares: None,
        cost_basis: None,
        stop_loss: None,
        current_price: None,
        total_value: Some(total_value),
        pnl: Some(total_pnl),
        action: None,
        cash_balance: Some(cash),
        total_equity: Some(total_equity),
    });

    DailyUpdate {
        date,
        rows,
        trades,
        total_value,
        total_pnl,
        cash,
        total_equity,
    }
}

fn no_data_row(position: &Position, date: NaiveDate) -> SnapshotRow {
    SnapshotRow {
        date,
        ticker: position.ticker.clone(),
        shares: Some(position.shares),
        cost_basis: Some(position.cost_basis),
        stop_loss: Some(position.stop_loss),
        current_price: None,
        total_value: None,
        pnl: None,
        action: Some(Action::NoData),
        cash_balance: None,
        total_equity: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::fake::StaticMarket;
    use crate::market::Quote;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn market_with(prices: &[(&str, f64)]) -> StaticMarket {
        let d = date("2025-08-04");
        prices.iter().fold(StaticMarket::new(), |m, (ticker, px)| {
            m.with_quote(ticker, Quote::close_only(d, *px))
        })
    }

    #[tokio::test]
    async fn test_hold_accumulates_totals() {
        let market = market_with(&[("ACME", 5.5), ("WIDG", 2.0)]);
        let mut portfolio = Portfolio::with_cash(10.0);
        portfolio.positions.push(Position::new("ACME", 10.0, 5.0, 4.5));
        portfolio.positions.push(Position::new("WIDG", 4.0, 2.5, 1.5));

        let update = process_portfolio(&market, &mut portfolio, date("2025-08-04")).await;

        // 55 + 8 held value; pnl 5 - 2
        assert!((update.total_value - 63.0).abs() < 1e-9);
        assert!((update.total_pnl - 3.0).abs() < 1e-9);
        assert!((update.total_equity - 73.0).abs() < 1e-9);
        assert_eq!(portfolio.position_count(), 2);
        assert!(update.trades.is_empty());

        assert_eq!(update.rows.len(), 3);
        assert_eq!(update.rows[0].action, Some(Action::Hold));
        assert!(update.rows[2].is_total());
    }

    #[tokio::test]
    async fn test_stop_loss_liquidates_position() {
        // Worked example: 10 shares at 5.00, stop 4.50, cash 50, close 4.40
        let market = market_with(&[("ACME", 4.4)]);
        let mut portfolio = Portfolio::with_cash(50.0);
        portfolio.positions.push(Position::new("ACME", 10.0, 5.0, 4.5));

        let update = process_portfolio(&market, &mut portfolio, date("2025-08-04")).await;

        assert!((update.cash - 94.0).abs() < 1e-9);
        assert_eq!(portfolio.position_count(), 0);
        assert_eq!(update.rows[0].action, Some(Action::StopLossSell));

        // Liquidated value stays out of the totals
        assert_eq!(update.total_value, 0.0);
        assert!((update.total_equity - 94.0).abs() < 1e-9);

        assert_eq!(update.trades.len(), 1);
        let trade = &update.trades[0];
        assert_eq!(trade.ticker, "ACME");
        assert!((trade.pnl - -6.0).abs() < 1e-9);
        assert_eq!(trade.reason, "AUTOMATED SELL - STOPLOSS TRIGGERED");
    }

    #[tokio::test]
    async fn test_stop_loss_triggers_on_exact_price() {
        let market = market_with(&[("ACME", 4.5)]);
        let mut portfolio = Portfolio::with_cash(0.0);
        portfolio.positions.push(Position::new("ACME", 10.0, 5.0, 4.5));

        let update = process_portfolio(&market, &mut portfolio, date("2025-08-04")).await;

        assert_eq!(update.rows[0].action, Some(Action::StopLossSell));
        assert_eq!(portfolio.position_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_data_degrades_to_no_data_row() {
        let market = market_with(&[("ACME", 5.5)]);
        let mut portfolio = Portfolio::with_cash(10.0);
        portfolio.positions.push(Position::new("ACME", 10.0, 5.0, 4.5));
        portfolio.positions.push(Position::new("GHST", 4.0, 2.5, 1.5));

        let update = process_portfolio(&market, &mut portfolio, date("2025-08-04")).await;

        let ghost = &update.rows[1];
        assert_eq!(ghost.action, Some(Action::NoData));
        assert!(ghost.current_price.is_none());
        assert!(ghost.total_value.is_none());

        // Position is kept, but excluded from totals
        assert_eq!(portfolio.position_count(), 2);
        assert!((update.total_value - 55.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_lookup_error_degrades_like_missing_data() {
        let market = market_with(&[("ACME", 5.5)]).with_failure("FLKY");
        let mut portfolio = Portfolio::with_cash(10.0);
        portfolio.positions.push(Position::new("FLKY", 4.0, 2.5, 1.5));
        portfolio.positions.push(Position::new("ACME", 10.0, 5.0, 4.5));

        let update = process_portfolio(&market, &mut portfolio, date("2025-08-04")).await;

        assert_eq!(update.rows[0].action, Some(Action::NoData));
        assert_eq!(update.rows[1].action, Some(Action::Hold));
        assert!((update.total_value - 55.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rerun_after_stop_finds_nothing_to_sell() {
        let market = market_with(&[("ACME", 4.4)]);
        let mut portfolio = Portfolio::with_cash(50.0);
        portfolio.positions.push(Position::new("ACME", 10.0, 5.0, 4.5));

        let first = process_portfolio(&market, &mut portfolio, date("2025-08-04")).await;
        assert_eq!(first.trades.len(), 1);

        // The position is gone; a second pass sees only the TOTAL row
        let second = process_portfolio(&market, &mut portfolio, date("2025-08-04")).await;
        assert!(second.trades.is_empty());
        assert_eq!(second.rows.len(), 1);
        assert!((second.cash - 94.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_total_row_equity_invariant() {
        let market = market_with(&[("ACME", 5.5), ("WIDG", 1.0)]);
        let mut portfolio = Portfolio::with_cash(25.0);
        portfolio.positions.push(Position::new("ACME", 10.0, 5.0, 4.5));
        portfolio.positions.push(Position::new("WIDG", 4.0, 2.5, 1.5)); // stops out at 1.0

        let update = process_portfolio(&market, &mut portfolio, date("2025-08-04")).await;

        let total = update.rows.last().unwrap();
        assert!(total.is_total());
        let equity = total.total_equity.unwrap();
        let value = total.total_value.unwrap();
        let cash = total.cash_balance.unwrap();
        assert!((equity - (value + cash)).abs() < 1e-9);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(4.404999), 4.4);
        assert_eq!(round2(4.406), 4.41);
        assert_eq!(round2(-6.000000000000001), -6.0);
    }
}

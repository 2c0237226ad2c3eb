//! Manual trade recording.
//!
//! Both operations validate completely before touching any state: a rejected
//! order leaves the portfolio exactly as it was.

use crate::market::MarketData;
use crate::types::{Portfolio, Position, TradeLogEntry};
use crate::{Error, Result};
use chrono::NaiveDate;

/// A manual purchase instruction.
#[derive(Debug, Clone)]
pub struct BuyOrder {
    pub ticker: String,
    pub shares: f64,
    pub price: f64,
    pub stop_loss: f64,
}

/// A manual sale instruction. `reason` is the caller's free-text
/// justification, recorded in the trade log.
#[derive(Debug, Clone)]
pub struct SellOrder {
    pub ticker: String,
    pub shares: f64,
    pub price: f64,
    pub reason: String,
}

/// Record a manual buy.
///
/// The ticker must resolve through the market collaborator and the purchase
/// must fit in cash. A ticker already held is accumulated: shares are added,
/// cost bases are summed, and the stop-loss is overwritten with the newly
/// supplied value (last write wins).
pub async fn execute_buy<M: MarketData>(
    market: &M,
    portfolio: &mut Portfolio,
    order: &BuyOrder,
    date: NaiveDate,
) -> Result<TradeLogEntry> {
    if order.shares <= 0.0 || order.price <= 0.0 || order.stop_loss <= 0.0 {
        return Err(Error::InvalidOrder(
            "shares, price, and stop-loss must all be positive".to_string(),
        ));
    }

    let ticker = order.ticker.to_uppercase();
    if market.latest(&ticker).await?.is_none() {
        return Err(Error::UnknownTicker(ticker));
    }

    let cost = order.shares * order.price;
    if cost > portfolio.cash {
        return Err(Error::InsufficientFunds {
            needed: cost,
            available: portfolio.cash,
        });
    }

    let existing = portfolio.positions.iter().position(|p| p.ticker == ticker);
    let reason = match existing {
        Some(idx) => {
            let position = &mut portfolio.positions[idx];
            position.shares += order.shares;
            position.cost_basis += cost;
            position.stop_loss = order.stop_loss;
            "MANUAL BUY - Accumulation"
        }
        None => {
            portfolio.positions.push(Position::new(
                &ticker,
                order.shares,
                order.price,
                order.stop_loss,
            ));
            "MANUAL BUY - New position"
        }
    };
    portfolio.cash -= cost;

    Ok(TradeLogEntry {
        date,
        ticker,
        shares: order.shares,
        price: order.price,
        cost_basis: cost,
        pnl: 0.0,
        reason: reason.to_string(),
    })
}

/// Record a manual sell.
///
/// The ticker must be held and the quantity must not exceed the held shares.
/// Selling the full quantity removes the position; a partial sell recomputes
/// the cost basis from the remaining shares.
pub fn execute_sell(
    portfolio: &mut Portfolio,
    order: &SellOrder,
    date: NaiveDate,
) -> Result<TradeLogEntry> {
    if order.shares <= 0.0 || order.price <= 0.0 {
        return Err(Error::InvalidOrder(
            "shares and price must both be positive".to_string(),
        ));
    }

    let ticker = order.ticker.to_uppercase();
    let pos_idx = portfolio
        .positions
        .iter()
        .position(|p| p.ticker == ticker)
        .ok_or_else(|| Error::UnknownTicker(ticker.clone()))?;

    let held = &portfolio.positions[pos_idx];
    if order.shares > held.shares {
        return Err(Error::OverSell {
            requested: order.shares,
            held: held.shares,
        });
    }

    let buy_price = held.buy_price;
    let cost_basis_sold = buy_price * order.shares;
    let pnl = order.price * order.shares - cost_basis_sold;

    if order.shares >= held.shares {
        portfolio.positions.remove(pos_idx);
    } else {
        let position = &mut portfolio.positions[pos_idx];
        position.shares -= order.shares;
        position.cost_basis = position.shares * buy_price;
    }
    portfolio.cash += order.shares * order.price;

    Ok(TradeLogEntry {
        date,
        ticker,
        shares: order.shares,
        price: order.price,
        cost_basis: cost_basis_sold,
        pnl,
        reason: format!("MANUAL SELL - {}", order.reason),
    })
}

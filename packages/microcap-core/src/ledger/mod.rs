//! Portfolio ledger: daily valuation snapshots and the trade log.

mod store;
mod update;

pub use store::{LedgerStore, TradeLog};
pub use update::{process_portfolio, round2, DailyUpdate};

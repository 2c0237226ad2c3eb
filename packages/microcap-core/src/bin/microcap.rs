//! Microcap CLI - Command line interface for the micro-cap portfolio tracker.
//!
//! Every command prints a JSON envelope so the output can be consumed by
//! scripts as well as read directly.

use chrono::{Datelike, Local, NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use microcap_core::{
    ledger::{process_portfolio, LedgerStore, TradeLog},
    market::YahooFinance,
    portfolio::PortfolioBook,
    report::{benchmark_comparison, performance_report, price_digest, DEFAULT_RISK_FREE_RATE},
    trades::{execute_buy, execute_sell, BuyOrder, SellOrder},
    ApiResponse,
};
use serde_json::json;

#[derive(Parser)]
#[command(name = "microcap")]
#[command(about = "Micro-cap portfolio tracker - ledger, trades, and reporting")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daily ledger update: fetch prices, apply stop-losses, append
    /// today's snapshot rows
    Update {
        /// Ledger date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Run even on a weekend, logging the prior session's prices under
        /// the chosen date
        #[arg(long)]
        force: bool,
    },
    /// Record a manual buy
    Buy {
        /// Stock ticker
        #[arg(short, long)]
        ticker: String,
        /// Number of shares
        #[arg(short = 'n', long)]
        shares: f64,
        /// Buy price per share
        #[arg(short, long)]
        price: f64,
        /// Stop-loss price
        #[arg(short = 'l', long)]
        stop_loss: f64,
        /// Confirm the trade (required; trades are irreversible)
        #[arg(long)]
        yes: bool,
    },
    /// Record a manual sell
    Sell {
        /// Stock ticker
        #[arg(short, long)]
        ticker: String,
        /// Number of shares to sell
        #[arg(short = 'n', long)]
        shares: f64,
        /// Sell price per share
        #[arg(short, long)]
        price: f64,
        /// Why the position is being sold
        #[arg(short, long)]
        reason: String,
        /// Confirm the trade (required; trades are irreversible)
        #[arg(long)]
        yes: bool,
    },
    /// Print performance metrics and a benchmark comparison
    Report {
        /// Benchmark index symbol
        #[arg(short, long, default_value = "^SPX")]
        benchmark: String,
        /// Annual risk-free rate
        #[arg(long, default_value_t = DEFAULT_RISK_FREE_RATE)]
        risk_free: f64,
    },
    /// List open positions
    Positions,
    /// Get or set the cash balance
    Cash {
        /// Cash amount to set (optional)
        #[arg(short, long)]
        set: Option<f64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Update { date, force } => handle_update(date, force).await,
        Commands::Buy {
            ticker,
            shares,
            price,
            stop_loss,
            yes,
        } => handle_buy(ticker, shares, price, stop_loss, yes).await,
        Commands::Sell {
            ticker,
            shares,
            price,
            reason,
            yes,
        } => handle_sell(ticker, shares, price, reason, yes),
        Commands::Report {
            benchmark,
            risk_free,
        } => handle_report(benchmark, risk_free).await,
        Commands::Positions => handle_positions(),
        Commands::Cash { set } => handle_cash(set),
    };

    println!("{}", output);
}

fn ok_json<T: serde::Serialize>(data: T) -> String {
    serde_json::to_string_pretty(&ApiResponse::ok(data)).unwrap()
}

fn err_json(error: impl std::fmt::Display) -> String {
    serde_json::to_string_pretty(&ApiResponse::<()>::err(error.to_string())).unwrap()
}

async fn handle_update(date: Option<NaiveDate>, force: bool) -> String {
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !force {
        return err_json(format!(
            "{} is a weekend; markets were closed, so this would log the prior \
             session's prices under that date. Re-run with --force to do it anyway.",
            date
        ));
    }

    let market = match YahooFinance::new() {
        Ok(market) => market,
        Err(e) => return err_json(e),
    };

    let mut book = PortfolioBook::new();
    let store = LedgerStore::new();
    let log = TradeLog::new();

    // First run against an existing ledger: recover the running cash balance
    // from the most recent TOTAL row
    if !book.file_exists() {
        if let Ok(Some(cash)) = store.latest_cash() {
            book.set_cash(cash);
        }
    }

    let update = process_portfolio(&market, book.get_mut(), date).await;

    if let Err(e) = store.commit(date, &update.rows) {
        return err_json(e);
    }
    if let Err(e) = log.append_all(&update.trades) {
        return err_json(e);
    }
    if let Err(e) = book.save() {
        return err_json(e);
    }

    ok_json(json!({
        "date": update.date,
        "total_value": update.total_value,
        "total_pnl": update.total_pnl,
        "cash": update.cash,
        "total_equity": update.total_equity,
        "stop_loss_sells": update.trades,
        "positions_remaining": book.positions().len(),
    }))
}

async fn handle_buy(ticker: String, shares: f64, price: f64, stop_loss: f64, yes: bool) -> String {
    if !yes {
        return err_json(format!(
            "refusing to buy {} shares of {} at {} without --yes",
            shares, ticker, price
        ));
    }

    let market = match YahooFinance::new() {
        Ok(market) => market,
        Err(e) => return err_json(e),
    };

    let mut book = PortfolioBook::new();
    let log = TradeLog::new();
    let order = BuyOrder {
        ticker,
        shares,
        price,
        stop_loss,
    };

    match execute_buy(&market, book.get_mut(), &order, Local::now().date_naive()).await {
        Ok(entry) => {
            if let Err(e) = log.append(&entry) {
                return err_json(e);
            }
            if let Err(e) = book.save() {
                return err_json(e);
            }
            ok_json(json!({
                "trade": entry,
                "cash": book.cash(),
            }))
        }
        Err(e) => err_json(e),
    }
}

fn handle_sell(ticker: String, shares: f64, price: f64, reason: String, yes: bool) -> String {
    if !yes {
        return err_json(format!(
            "refusing to sell {} shares of {} at {} without --yes",
            shares, ticker, price
        ));
    }

    let mut book = PortfolioBook::new();
    let log = TradeLog::new();
    let order = SellOrder {
        ticker,
        shares,
        price,
        reason,
    };

    match execute_sell(book.get_mut(), &order, Local::now().date_naive()) {
        Ok(entry) => {
            if let Err(e) = log.append(&entry) {
                return err_json(e);
            }
            if let Err(e) = book.save() {
                return err_json(e);
            }
            ok_json(json!({
                "trade": entry,
                "cash": book.cash(),
            }))
        }
        Err(e) => err_json(e),
    }
}

async fn handle_report(benchmark: String, risk_free: f64) -> String {
    let store = LedgerStore::new();
    let series = match store.equity_series() {
        Ok(series) => series,
        Err(e) => return err_json(e),
    };

    let equity: Vec<f64> = series.iter().map(|(_, equity)| *equity).collect();
    let report = match performance_report(&equity, risk_free) {
        Ok(report) => report,
        Err(e) => return err_json(e),
    };

    let market = match YahooFinance::new() {
        Ok(market) => market,
        Err(e) => return err_json(e),
    };

    // series has at least 2 entries here, or performance_report failed above
    let from = series[0].0;
    let to = series[series.len() - 1].0;

    // A benchmark failure is fatal to the report
    let comparison = match benchmark_comparison(&market, &benchmark, from, to).await {
        Ok(comparison) => comparison,
        Err(e) => return err_json(e),
    };

    let book = PortfolioBook::new();
    let mut symbols: Vec<String> = book.positions().iter().map(|p| p.ticker.clone()).collect();
    symbols.push(benchmark);
    let digest = price_digest(&market, &symbols, to).await;

    ok_json(json!({
        "performance": report,
        "benchmark": comparison,
        "digest": digest,
    }))
}

fn handle_positions() -> String {
    let book = PortfolioBook::new();
    ok_json(json!({
        "positions": book.positions(),
        "position_count": book.positions().len(),
        "cash": book.cash(),
    }))
}

fn handle_cash(set: Option<f64>) -> String {
    let mut book = PortfolioBook::new();
    if let Some(amount) = set {
        book.set_cash(amount);
        if let Err(e) = book.save() {
            return err_json(e);
        }
    }
    ok_json(json!({
        "cash": book.cash(),
    }))
}

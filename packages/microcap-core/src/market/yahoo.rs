//! Yahoo Finance quote provider.
//!
//! Talks to the v8 chart API. Unknown symbols surface as chart errors (or
//! plain 404s) and are reported as "no data" rather than failures.

use super::{MarketData, Quote};
use crate::Result;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance market data client.
#[derive(Debug, Clone)]
pub struct YahooFinance {
    client: reqwest::Client,
}

impl YahooFinance {
    /// Create a client with the headers Yahoo expects.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_chart(&self, url: &str) -> Result<Option<serde_json::Value>> {
        debug!("fetching {}", url);
        let response = self.client.get(url).send().await?;

        // Unknown symbols come back as 404 with a chart error body
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;

        let data: serde_json::Value = response.json().await?;
        if let Some((code, desc)) = chart_error(&data) {
            debug!("chart error: {} - {}", code, desc);
            return Ok(None);
        }
        Ok(Some(data))
    }
}

impl MarketData for YahooFinance {
    async fn latest(&self, symbol: &str) -> Result<Option<Quote>> {
        let url = format!("{}?interval=1d&range=1d", symbol_url(symbol));
        match self.fetch_chart(&url).await? {
            Some(data) => Ok(parse_latest(&data)),
            None => Ok(None),
        }
    }

    async fn history(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Quote>> {
        // Yahoo takes unix timestamps; stretch `to` to the end of the day
        let from_ts = from
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let to_ts = to
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        let url = format!(
            "{}?period1={}&period2={}&interval=1d",
            symbol_url(symbol),
            from_ts,
            to_ts
        );
        match self.fetch_chart(&url).await? {
            Some(data) => Ok(parse_history(&data)),
            None => Ok(Vec::new()),
        }
    }
}

fn symbol_url(symbol: &str) -> String {
    format!("{}/{}", BASE_URL, urlencoding::encode(symbol))
}

/// Extract the error object Yahoo embeds in failed chart responses.
fn chart_error(data: &serde_json::Value) -> Option<(String, String)> {
    let error = data
        .get("chart")
        .and_then(|c| c.get("error"))
        .and_then(|e| e.as_object())?;
    let code = error
        .get("code")
        .and_then(|c| c.as_str())
        .unwrap_or("unknown")
        .to_string();
    let desc = error
        .get("description")
        .and_then(|d| d.as_str())
        .unwrap_or("")
        .to_string();
    Some((code, desc))
}

/// Parse the most recent quote from a chart response.
fn parse_latest(data: &serde_json::Value) -> Option<Quote> {
    let chart = data
        .get("chart")
        .and_then(|c| c.get("result"))
        .and_then(|r| r.get(0))?;

    let meta = chart.get("meta")?;
    let quote_data = chart
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.get(0))?;

    let close = meta
        .get("regularMarketPrice")
        .and_then(|p| p.as_f64())
        .or_else(|| last_f64(quote_data, "close"))?;

    let timestamp = meta.get("regularMarketTime").and_then(|t| t.as_i64())?;
    let date = chrono::DateTime::from_timestamp(timestamp, 0)?.date_naive();

    Some(Quote {
        date,
        close,
        open: last_f64(quote_data, "open"),
        high: last_f64(quote_data, "high"),
        low: last_f64(quote_data, "low"),
        volume: quote_data
            .get("volume")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.last())
            .and_then(|v| v.as_i64()),
    })
}

fn last_f64(quote_data: &serde_json::Value, field: &str) -> Option<f64> {
    quote_data
        .get(field)
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.last())
        .and_then(|v| v.as_f64())
}

/// Parse a ranged chart response into daily quotes, oldest first.
fn parse_history(data: &serde_json::Value) -> Vec<Quote> {
    let Some(chart) = data
        .get("chart")
        .and_then(|c| c.get("result"))
        .and_then(|r| r.get(0))
    else {
        return Vec::new();
    };

    let Some(timestamps) = chart.get("timestamp").and_then(|t| t.as_array()) else {
        return Vec::new();
    };
    let Some(quote_data) = chart
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.get(0))
    else {
        return Vec::new();
    };

    let closes = quote_data.get("close").and_then(|c| c.as_array());
    let opens = quote_data.get("open").and_then(|o| o.as_array());
    let highs = quote_data.get("high").and_then(|h| h.as_array());
    let lows = quote_data.get("low").and_then(|l| l.as_array());
    let volumes = quote_data.get("volume").and_then(|v| v.as_array());

    let mut quotes = Vec::new();
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(date) = ts
            .as_i64()
            .and_then(|t| chrono::DateTime::from_timestamp(t, 0))
            .map(|dt| dt.date_naive())
        else {
            continue;
        };

        // Sessions without a close (halted days) are skipped
        let Some(close) = closes
            .and_then(|arr| arr.get(i))
            .and_then(|v| v.as_f64())
        else {
            continue;
        };

        quotes.push(Quote {
            date,
            close,
            open: opens.and_then(|arr| arr.get(i)).and_then(|v| v.as_f64()),
            high: highs.and_then(|arr| arr.get(i)).and_then(|v| v.as_f64()),
            low: lows.and_then(|arr| arr.get(i)).and_then(|v| v.as_f64()),
            volume: volumes.and_then(|arr| arr.get(i)).and_then(|v| v.as_i64()),
        });
    }

    quotes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn latest_fixture() -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {
                        "currency": "USD",
                        "symbol": "ACME",
                        "regularMarketPrice": 4.42,
                        "regularMarketTime": 1721999400i64
                    },
                    "timestamp": [1721999400i64],
                    "indicators": {
                        "quote": [{
                            "open": [4.55],
                            "high": [4.60],
                            "low": [4.35],
                            "close": [4.42],
                            "volume": [125000i64]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    fn history_fixture() -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "^SPX" },
                    "timestamp": [1721826600i64, 1721913000i64, 1721999400i64],
                    "indicators": {
                        "quote": [{
                            "open": [5500.0, 5520.0, null],
                            "high": [5540.0, 5560.0, null],
                            "low": [5480.0, 5500.0, null],
                            "close": [5510.0, 5555.0, null],
                            "volume": [1000i64, 1200i64, null]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_parse_latest() {
        let quote = parse_latest(&latest_fixture()).unwrap();
        assert_eq!(quote.close, 4.42);
        assert_eq!(quote.volume, Some(125000));
        assert_eq!(quote.date.year(), 2024);
    }

    #[test]
    fn test_parse_latest_missing_meta() {
        let data = serde_json::json!({"chart": {"result": [{}], "error": null}});
        assert!(parse_latest(&data).is_none());
    }

    #[test]
    fn test_parse_history_skips_null_closes() {
        let quotes = parse_history(&history_fixture());
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].close, 5510.0);
        assert_eq!(quotes[1].close, 5555.0);
    }

    #[test]
    fn test_parse_history_malformed() {
        let data = serde_json::json!({"chart": {"result": []}});
        assert!(parse_history(&data).is_empty());
    }

    #[test]
    fn test_chart_error_detected() {
        let data = serde_json::json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        });
        let (code, desc) = chart_error(&data).unwrap();
        assert_eq!(code, "Not Found");
        assert!(desc.contains("delisted"));
    }

    #[test]
    fn test_chart_error_absent_on_success() {
        assert!(chart_error(&latest_fixture()).is_none());
    }
}

//! Yahoo Finance data adapter.
//!
//! Daily bars with adjusted close from the v8 chart API. One request per fetch, no retry:
//! a failed request fails the run with `DataUnavailable`.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, SigtraderError> {
        Self::with_base_url("https://query2.finance.yahoo.com")
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, SigtraderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) sigtrader")
            .build()
            .map_err(|e| SigtraderError::DataUnavailable {
                code: "yahoo".into(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp() + 86_399;
        format!(
            "{}/v8/finance/chart/{ticker}?period1={start_ts}&period2={end_ts}\
             &interval=1d&includeAdjustedClose=true",
            self.base_url
        )
    }
}

fn unavailable(ticker: &str, reason: impl Into<String>) -> SigtraderError {
    SigtraderError::DataUnavailable {
        code: ticker.to_string(),
        reason: reason.into(),
    }
}

/// Rows with a missing price field are skipped. A missing adjusted close falls back
/// to the close.
fn parse_response(ticker: &str, resp: ChartResponse) -> Result<Vec<PriceBar>, SigtraderError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) => {
            return Err(unavailable(ticker, format!("{}: {}", err.code, err.description)));
        }
        (None, None) => return Err(unavailable(ticker, "empty result with no error")),
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| unavailable(ticker, "result array is empty"))?;
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| unavailable(ticker, "no quote data"))?;
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| unavailable(ticker, format!("invalid timestamp {ts}")))?;
        let at = |v: &[Option<f64>]| v.get(i).copied().flatten();

        match (at(&quote.open), at(&quote.high), at(&quote.low), at(&quote.close)) {
            (Some(open), Some(high), Some(low), Some(close)) => bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                adj_close: at(&adj_closes).unwrap_or(close),
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0) as f64,
            }),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(ticker, skipped, "yahoo rows with missing prices skipped");
    }
    Ok(bars)
}

impl DataPort for YahooAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError> {
        let url = self.chart_url(ticker, start, end);
        debug!(ticker, %url, "requesting yahoo chart");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| unavailable(ticker, format!("request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(unavailable(ticker, format!("HTTP {status}")));
        }
        let chart: ChartResponse = resp
            .json()
            .map_err(|e| unavailable(ticker, format!("failed to parse response: {e}")))?;

        let mut bars = parse_response(ticker, chart)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        let start = NaiveDate::from_ymd_opt(1970, 1, 2)
            .ok_or_else(|| unavailable(ticker, "invalid epoch date"))?;
        let end = chrono::Utc::now().date_naive();
        let bars = self.fetch_bars(ticker, start, end)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

#![allow(dead_code)]

use chrono::NaiveDate;
use sigtrader::domain::error::SigtraderError;
pub use sigtrader::domain::ohlcv::{PriceBar, PriceSeries};
use sigtrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::io::Write;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    fn check(&self, ticker: &str) -> Result<(), SigtraderError> {
        match self.errors.get(ticker) {
            Some(reason) => Err(SigtraderError::DataUnavailable {
                code: ticker.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError> {
        self.check(ticker)?;
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        self.check(ticker)?;
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> PriceBar {
    PriceBar {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        adj_close: close,
        volume: 1000.0,
    }
}

/// Daily bars oscillating around a slow drift, so every signal category shows up.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = start_price + (t * 0.35).sin() * start_price * 0.08 + t * 0.02;
            PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 0.9 + (t * 0.7).cos().abs(),
                low: close - 0.9 - (t * 0.5).sin().abs(),
                close,
                adj_close: close * 0.98,
                volume: 1000.0 + ((i * 37) % 500) as f64,
            }
        })
        .collect()
}

pub fn make_series(code: &str, count: usize, start_price: f64) -> PriceSeries {
    PriceSeries::new(code, generate_bars("2020-01-01", count, start_price)).unwrap()
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Writes `bars` as `<dir>/<ticker>.csv` in the layout the CSV adapter reads.
pub fn write_price_csv(dir: &std::path::Path, ticker: &str, bars: &[PriceBar]) {
    let mut content = String::from("date,open,high,low,close,adj_close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.adj_close, b.volume
        ));
    }
    std::fs::write(dir.join(format!("{ticker}.csv")), content).unwrap();
}

pub fn assert_exit_success(code: std::process::ExitCode) {
    let got = format!("{code:?}");
    let want = format!("{:?}", std::process::ExitCode::SUCCESS);
    assert_eq!(got, want, "expected success exit code");
}

pub fn assert_exit_code(code: std::process::ExitCode, expected: u8) {
    let got = format!("{code:?}");
    let want = format!("{:?}", std::process::ExitCode::from(expected));
    assert_eq!(got, want, "expected exit code {expected}");
}

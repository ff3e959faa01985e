//! CSV file data adapter.
//!
//! One file per ticker, `<base_path>/<TICKER>.csv`, with the header
//! `date,open,high,low,close,adj_close,volume`.

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    fn read_all(&self, ticker: &str) -> Result<Vec<PriceBar>, SigtraderError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| {
            unavailable(ticker, format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record =
                result.map_err(|e| unavailable(ticker, format!("CSV parse error: {}", e)))?;

            let date_str = field(&record, 0, "date", row)?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                SigtraderError::malformed(row, "date", format!("invalid date '{date_str}': {e}"))
            })?;

            bars.push(PriceBar {
                date,
                open: number(&record, 1, "open", row)?,
                high: number(&record, 2, "high", row)?,
                low: number(&record, 3, "low", row)?,
                close: number(&record, 4, "close", row)?,
                adj_close: number(&record, 5, "adj_close", row)?,
                volume: number(&record, 6, "volume", row)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn unavailable(ticker: &str, reason: String) -> SigtraderError {
    SigtraderError::DataUnavailable {
        code: ticker.to_string(),
        reason,
    }
}

/// Field-level problems are `MalformedRow`, indexed by data row.
fn field<'r>(
    record: &'r StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<&'r str, SigtraderError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| SigtraderError::malformed(row, name, "missing column"))
}

fn number(
    record: &StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<f64, SigtraderError> {
    let raw = field(record, index, name, row)?;
    raw.parse::<f64>()
        .map_err(|e| SigtraderError::malformed(row, name, format!("invalid value '{raw}': {e}")))
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, SigtraderError> {
        let bars: Vec<PriceBar> = self
            .read_all(ticker)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        debug!(ticker, bars = bars.len(), "csv bars read");
        Ok(bars)
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SigtraderError> {
        let bars = self.read_all(ticker)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

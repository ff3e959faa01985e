//! CSV report adapter: ledger export and indicator frame dumps.

use crate::domain::backtest::BacktestLedger;
use crate::domain::error::SigtraderError;
use crate::domain::indicator::IndicatorFrame;
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

const LEDGER_HEADER: [&str; 12] = [
    "date",
    "adj_close",
    "prediction",
    "correct",
    "available",
    "invested",
    "return",
    "profit",
    "realized_profit",
    "realized_return",
    "total",
    "cumulative_realized",
];

const INDICATOR_HEADER: [&str; 12] = [
    "date",
    "adj_close",
    "rsi",
    "stochastic_k",
    "stochastic_d",
    "bollinger_ma",
    "bollinger_upper",
    "bollinger_lower",
    "macd_short",
    "macd_long",
    "adx",
    "obv",
];

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_ledger(
        &self,
        ledger: &BacktestLedger,
        predictions_correct: &[u8],
        output_path: &Path,
    ) -> Result<(), SigtraderError> {
        let file = File::create(output_path)?;
        write_ledger_csv(ledger, predictions_correct, file)?;
        info!(path = %output_path.display(), rows = ledger.len(), "ledger written");
        Ok(())
    }
}

/// One row per ledger row. `predictions_correct` must be empty or as long as the ledger.
pub fn write_ledger_csv<W: Write>(
    ledger: &BacktestLedger,
    predictions_correct: &[u8],
    writer: W,
) -> Result<(), SigtraderError> {
    if !predictions_correct.is_empty() && predictions_correct.len() != ledger.len() {
        return Err(SigtraderError::LengthMismatch {
            what: "accuracy flags".into(),
            expected: ledger.len(),
            got: predictions_correct.len(),
        });
    }

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(LEDGER_HEADER).map_err(std::io::Error::from)?;
    for (i, r) in ledger.rows.iter().enumerate() {
        let correct = predictions_correct
            .get(i)
            .map(|c| c.to_string())
            .unwrap_or_default();
        wtr.write_record([
            r.date.to_string(),
            format!("{:.6}", r.adj_close),
            r.prediction.to_string(),
            correct,
            format!("{:.6}", r.available),
            format!("{:.6}", r.invested),
            format!("{:.8}", r.period_return),
            format!("{:.6}", r.profit),
            format!("{:.6}", r.realized_profit),
            format!("{:.8}", r.realized_return),
            format!("{:.6}", r.total),
            format!("{:.6}", r.cumulative_realized),
        ])
        .map_err(std::io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_indicator_csv<W: Write>(
    frame: &IndicatorFrame,
    writer: W,
) -> Result<(), SigtraderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(INDICATOR_HEADER)
        .map_err(std::io::Error::from)?;
    for r in &frame.rows {
        wtr.write_record([
            r.date.to_string(),
            format!("{:.6}", r.adj_close),
            format!("{:.6}", r.rsi),
            format!("{:.6}", r.stochastic_k),
            format!("{:.6}", r.stochastic_d),
            format!("{:.6}", r.bollinger_ma),
            format!("{:.6}", r.bollinger_upper),
            format!("{:.6}", r.bollinger_lower),
            format!("{:.6}", r.macd_short),
            format!("{:.6}", r.macd_long),
            format!("{:.6}", r.adx),
            format!("{:.2}", r.obv),
        ])
        .map_err(std::io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

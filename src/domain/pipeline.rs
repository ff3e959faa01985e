//! End-to-end run: indicators, labels, signals, split, classifier, replay, risk.
//!
//! Every stage takes the previous stage's output by reference and returns a new value.

use crate::domain::backtest::{self, BacktestConfig, BacktestLedger};
use crate::domain::classifier::{Classifier, MinMaxScaler, ModelConfig};
use crate::domain::encoding::{self, EncodedDataset};
use crate::domain::error::SigtraderError;
use crate::domain::evaluation::{accuracy_flags, ClassificationReport};
use crate::domain::indicator::{compute_indicators, IndicatorParams};
use crate::domain::label::label_rows;
use crate::domain::metrics::{self, RiskSummary};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::split::{self, Split};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use ndarray::Array2;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub indicators: IndicatorParams,
    pub train_fraction: f64,
    pub backtest: BacktestConfig,
    pub sortino_threshold: f64,
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorParams::default(),
            train_fraction: 0.7,
            backtest: BacktestConfig::default(),
            sortino_threshold: 0.0,
            model: ModelConfig::default(),
        }
    }
}

/// Risk of the strategy against one benchmark ledger.
#[derive(Debug)]
pub struct BenchmarkRisk {
    pub benchmark: String,
    pub risk: Result<RiskSummary, SigtraderError>,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub code: String,
    pub split: Split,
    pub model_name: String,
    pub train_report: ClassificationReport,
    pub test_report: ClassificationReport,
    pub predictions: Vec<u8>,
    pub accuracy_flags: Vec<u8>,
    pub ledger: BacktestLedger,
    /// Buy and hold over the instrument's own test segment.
    pub buy_and_hold: BacktestLedger,
    /// Buy and hold over the market benchmark, restricted to the test dates.
    pub market: Option<(String, BacktestLedger)>,
    pub risk: Vec<BenchmarkRisk>,
}

/// Fetch bars for `ticker` and validate them into a series.
pub fn load_series(
    port: &dyn DataPort,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, SigtraderError> {
    let bars = port.fetch_bars(ticker, start, end)?;
    if bars.is_empty() {
        return Err(SigtraderError::DataUnavailable {
            code: ticker.to_string(),
            reason: format!("no bars between {start} and {end}"),
        });
    }
    let series = PriceSeries::new(ticker, bars)?;
    info!(ticker, bars = series.len(), %start, %end, "price series loaded");
    Ok(series)
}

/// Indicators, labels and one-hot signals for a whole series.
pub fn prepare_dataset(
    series: &PriceSeries,
    params: &IndicatorParams,
) -> Result<EncodedDataset, SigtraderError> {
    let frame = compute_indicators(series, params)?;
    let labeled = label_rows(series, &frame)?;
    let dataset = encoding::encode(&labeled);
    info!(
        code = series.code(),
        frame_rows = frame.len(),
        rows = dataset.len(),
        features = dataset.feature_names.len(),
        "dataset encoded"
    );
    Ok(dataset)
}

fn scaled(
    normalize: bool,
    train: Array2<f64>,
    test: Array2<f64>,
) -> Result<(Array2<f64>, Array2<f64>), SigtraderError> {
    if !normalize {
        return Ok((train, test));
    }
    let scaler = MinMaxScaler::fit(&train)?;
    Ok((scaler.transform(&train)?, scaler.transform(&test)?))
}

pub fn run_pipeline(
    series: &PriceSeries,
    market: Option<&PriceSeries>,
    config: &PipelineConfig,
    classifier: &mut dyn Classifier,
) -> Result<PipelineOutcome, SigtraderError> {
    let dataset = prepare_dataset(series, &config.indicators)?;
    let split = split::split(&dataset, config.train_fraction)?;
    info!(
        train = split.train.len(),
        test = split.test.len(),
        fraction = config.train_fraction,
        "dataset split"
    );

    let (x_train, x_test) = scaled(
        config.model.normalize,
        split.train.feature_matrix(),
        split.test.feature_matrix(),
    )?;
    let y_train = split.train.labels();
    let y_test = split.test.labels();

    classifier.train(&x_train, &y_train)?;
    let train_predictions = classifier.predict(&x_train)?;
    let predictions = classifier.predict(&x_test)?;
    let train_report = ClassificationReport::compute(&y_train, &train_predictions)?;
    let test_report = ClassificationReport::compute(&y_test, &predictions)?;
    info!(
        model = classifier.name(),
        train_accuracy = train_report.accuracy,
        test_accuracy = test_report.accuracy,
        "classifier evaluated"
    );
    let flags = accuracy_flags(&y_test, &predictions)?;

    let dates = split.test.dates();
    let closes = split.test.adj_closes();
    let ledger = backtest::replay(&dates, &closes, &predictions, &config.backtest)?;
    let buy_and_hold = backtest::replay_benchmark(&dates, &closes, &config.backtest)?;

    let market = match (market, dates.first(), dates.last()) {
        (Some(m), Some(&first), Some(&last)) => {
            let window = m.window(first, last)?;
            let bars = window.len();
            let ledger = backtest::replay_benchmark(
                &window.dates(),
                &window.adj_closes(),
                &config.backtest,
            )?;
            info!(benchmark = m.code(), bars, "market benchmark replayed");
            Some((m.code().to_string(), ledger))
        }
        _ => None,
    };

    let mut risk = Vec::new();
    if let Some((name, market_ledger)) = &market {
        risk.push(BenchmarkRisk {
            benchmark: name.clone(),
            risk: metrics::assess(&ledger, market_ledger, config.sortino_threshold),
        });
    }
    risk.push(BenchmarkRisk {
        benchmark: format!("{} buy and hold", series.code()),
        risk: metrics::assess(&ledger, &buy_and_hold, config.sortino_threshold),
    });
    for entry in &risk {
        if let Err(e) = &entry.risk {
            warn!(benchmark = %entry.benchmark, error = %e, "risk metrics unavailable");
        }
    }

    info!(
        rows = ledger.len(),
        realized = ledger.summary().sum_realized_profits,
        final_total = ledger.final_total(),
        "backtest replayed"
    );

    Ok(PipelineOutcome {
        code: series.code().to_string(),
        split,
        model_name: classifier.name().to_string(),
        train_report,
        test_report,
        predictions,
        accuracy_flags: flags,
        ledger,
        buy_and_hold,
        market,
        risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classifier::AlwaysInvest;
    use crate::domain::ohlcv::PriceBar;

    fn series(code: &str, count: usize, offset: i64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap() + chrono::Duration::days(offset);
        let bars = (0..count)
            .map(|i| {
                let close = 50.0 + (i as f64 * 0.3).sin() * 4.0 + i as f64 * 0.05;
                PriceBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + 0.8,
                    low: close - 0.6,
                    close,
                    adj_close: close,
                    volume: 500.0 + (i % 7) as f64 * 10.0,
                }
            })
            .collect();
        PriceSeries::new(code, bars).unwrap()
    }

    #[test]
    fn prepared_dataset_drops_lookback_and_last_bar() {
        let s = series("TEST", 80, 0);
        let dataset = prepare_dataset(&s, &IndicatorParams::default()).unwrap();
        assert_eq!(dataset.len(), 80 - 26 - 1);
        assert_eq!(dataset.rows[0].date, s.bars()[26].date);
    }

    #[test]
    fn always_invest_pipeline_matches_buy_and_hold() {
        let s = series("TEST", 120, 0);
        let mut model = AlwaysInvest;
        let outcome = run_pipeline(&s, None, &PipelineConfig::default(), &mut model).unwrap();

        assert_eq!(outcome.predictions.len(), outcome.split.test.len());
        assert!(outcome.predictions.iter().all(|p| *p == 1));
        assert_eq!(outcome.ledger.len(), outcome.split.test.len());
        for (a, b) in outcome.ledger.rows.iter().zip(&outcome.buy_and_hold.rows) {
            assert_eq!(a.total, b.total);
            assert_eq!(a.realized_profit, b.realized_profit);
        }
        assert!(outcome.market.is_none());
        assert_eq!(outcome.risk.len(), 1);
    }

    #[test]
    fn market_benchmark_is_windowed_to_test_dates() {
        let s = series("TEST", 120, 0);
        let m = series("INDEX", 200, -30);
        let mut model = AlwaysInvest;
        let outcome = run_pipeline(&s, Some(&m), &PipelineConfig::default(), &mut model).unwrap();

        let (name, market) = outcome.market.as_ref().unwrap();
        assert_eq!(name, "INDEX");
        assert_eq!(market.rows.first().unwrap().date, outcome.split.test.rows[0].date);
        assert_eq!(market.len(), outcome.split.test.len());
        assert_eq!(outcome.risk.len(), 2);
        assert_eq!(outcome.risk[0].benchmark, "INDEX");
    }

    #[test]
    fn insufficient_history_aborts() {
        let s = series("TEST", 20, 0);
        let mut model = AlwaysInvest;
        let err = run_pipeline(&s, None, &PipelineConfig::default(), &mut model).unwrap_err();
        assert!(matches!(err, SigtraderError::InsufficientData { .. }));
    }
}

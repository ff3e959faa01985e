//! Integration tests for the signal pipeline.
//!
//! Tests cover:
//! - Fetch through a mock data port into a validated price series
//! - Dataset preparation: alignment, labels, one-hot layout
//! - Full pipeline with the constant and trained classifiers
//! - Market benchmark alignment and risk metrics
//! - Ledger export through the report port (mock and CSV)
//! - CSV data adapter feeding the pipeline from disk

mod common;

use approx::assert_relative_eq;
use common::*;
use sigtrader::adapters::csv_adapter::CsvAdapter;
use sigtrader::adapters::csv_report_adapter::CsvReportAdapter;
use sigtrader::domain::backtest::{self, BacktestConfig, BacktestLedger, ProfitTaking};
use sigtrader::domain::classifier::{self, AlwaysInvest, ModelConfig, ModelKind};
use sigtrader::domain::encoding::EncodedRow;
use sigtrader::domain::error::SigtraderError;
use sigtrader::domain::indicator::{compute_indicators, IndicatorParams};
use sigtrader::domain::label::Position;
use sigtrader::domain::pipeline::{load_series, prepare_dataset, run_pipeline, PipelineConfig};
use sigtrader::domain::signal::{
    BandSignal, CrossSignal, RsiSignal, SignalCategory, StochasticSignal,
};
use sigtrader::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

mod data_loading {
    use super::*;

    #[test]
    fn load_series_filters_to_range() {
        let port = MockDataPort::new().with_bars("AAPL", generate_bars("2020-01-01", 60, 100.0));

        let series = load_series(&port, "AAPL", date(2020, 1, 11), date(2020, 1, 20)).unwrap();

        assert_eq!(series.len(), 10);
        assert_eq!(series.code(), "AAPL");
        assert_eq!(series.bars()[0].date, date(2020, 1, 11));
    }

    #[test]
    fn empty_range_is_unavailable() {
        let port = MockDataPort::new().with_bars("AAPL", generate_bars("2020-01-01", 10, 100.0));

        let err = load_series(&port, "AAPL", date(2021, 1, 1), date(2021, 12, 31)).unwrap_err();

        assert!(matches!(err, SigtraderError::DataUnavailable { code, .. } if code == "AAPL"));
    }

    #[test]
    fn source_failure_is_propagated() {
        let port = MockDataPort::new().with_error("AAPL", "connection refused");

        let err = load_series(&port, "AAPL", date(2020, 1, 1), date(2020, 12, 31)).unwrap_err();

        assert!(matches!(err, SigtraderError::DataUnavailable { .. }));
    }

    #[test]
    fn unsorted_bars_are_malformed() {
        let bars = vec![make_bar("2020-01-02", 10.0), make_bar("2020-01-01", 11.0)];
        let port = MockDataPort::new().with_bars("X", bars);

        let err = load_series(&port, "X", date(2020, 1, 1), date(2020, 1, 31)).unwrap_err();

        assert!(matches!(err, SigtraderError::MalformedRow { .. }));
    }
}

mod dataset_preparation {
    use super::*;

    #[test]
    fn frame_starts_at_longest_lookback() {
        let series = make_series("AAPL", 120, 100.0);
        let params = IndicatorParams::default();

        let frame = compute_indicators(&series, &params).unwrap();

        assert_eq!(frame.start, params.max_lookback());
        assert_eq!(frame.len(), series.len() - params.max_lookback());
        assert_eq!(frame.rows[0].date, series.bars()[params.max_lookback()].date);
    }

    #[test]
    fn labels_describe_the_following_move() {
        let series = make_series("AAPL", 120, 100.0);
        let dataset = prepare_dataset(&series, &IndicatorParams::default()).unwrap();
        let bars = series.bars();
        let start = IndicatorParams::default().max_lookback();

        assert_eq!(dataset.len(), series.len() - start - 1);
        for (k, row) in dataset.rows.iter().enumerate() {
            let today = bars[start + k].adj_close;
            let tomorrow = bars[start + k + 1].adj_close;
            assert_eq!(row.position, Position::from_move(today, tomorrow));
            assert_eq!(row.adj_close, today);
        }
    }

    #[test]
    fn one_hot_group_is_empty_only_for_default_signal() {
        let series = make_series("AAPL", 200, 100.0);
        let dataset = prepare_dataset(&series, &IndicatorParams::default()).unwrap();
        assert_eq!(&dataset.feature_names[..2], &["adx", "obv"]);

        let group_sum = |row: &EncodedRow, group: &str| -> f64 {
            dataset.group_columns(group).iter().map(|&c| row.features[c]).sum()
        };
        for row in &dataset.rows {
            let s = row.signals;
            let checks = [
                (RsiSignal::GROUP, s.rsi == RsiSignal::DEFAULT),
                (StochasticSignal::GROUP, s.stochastic_d == StochasticSignal::DEFAULT),
                (BandSignal::GROUP, s.bollinger == BandSignal::DEFAULT),
                (CrossSignal::GROUP, s.macd == CrossSignal::DEFAULT),
            ];
            for (group, is_default) in checks {
                let sum = group_sum(row, group);
                assert!(sum == 0.0 || sum == 1.0, "group {group} sums to {sum}");
                assert_eq!(sum == 0.0, is_default, "group {group} on {}", row.date);
            }
        }
    }

    #[test]
    fn too_short_series_is_insufficient() {
        let series = make_series("AAPL", 20, 100.0);
        let err = prepare_dataset(&series, &IndicatorParams::default()).unwrap_err();
        assert!(matches!(err, SigtraderError::InsufficientData { .. }));
    }

    #[test]
    fn zero_period_is_rejected() {
        let series = make_series("AAPL", 120, 100.0);
        let params = IndicatorParams {
            rsi_period: 0,
            ..IndicatorParams::default()
        };
        let err = prepare_dataset(&series, &params).unwrap_err();
        assert!(matches!(&err, SigtraderError::InvalidPeriod { name, .. } if name == "rsi_period"));
        assert_exit_code(std::process::ExitCode::from(&err), 2);
    }

    #[test]
    fn period_longer_than_series_is_insufficient() {
        let series = make_series("AAPL", 30, 100.0);
        let params = IndicatorParams {
            adx_period: 30,
            ..IndicatorParams::default()
        };
        let err = prepare_dataset(&series, &params).unwrap_err();
        assert!(matches!(err, SigtraderError::InsufficientData { bars: 30, .. }));
        assert_exit_code(std::process::ExitCode::from(&err), 5);
    }
}

mod full_pipeline {
    use super::*;

    #[test]
    fn always_invest_strategy_equals_buy_and_hold() {
        let series = make_series("AAPL", 200, 100.0);
        let mut model = AlwaysInvest;

        let outcome = run_pipeline(&series, None, &PipelineConfig::default(), &mut model).unwrap();

        assert_eq!(outcome.ledger.len(), outcome.split.test.len());
        assert_relative_eq!(outcome.ledger.final_total(), outcome.buy_and_hold.final_total());
        assert_eq!(outcome.accuracy_flags.len(), outcome.predictions.len());
        assert_eq!(*outcome.accuracy_flags.last().unwrap(), 0);
    }

    #[test]
    fn split_preserves_order_and_covers_dataset() {
        let series = make_series("AAPL", 200, 100.0);
        let mut model = AlwaysInvest;
        let config = PipelineConfig {
            train_fraction: 0.6,
            ..PipelineConfig::default()
        };

        let outcome = run_pipeline(&series, None, &config, &mut model).unwrap();
        let dataset = prepare_dataset(&series, &config.indicators).unwrap();
        let cut = (0.6 * dataset.len() as f64).floor() as usize;

        assert_eq!(outcome.split.train.len(), cut);
        assert_eq!(outcome.split.train.len() + outcome.split.test.len(), dataset.len());
        assert_eq!(outcome.split.test.rows[0].date, dataset.rows[cut].date);
        assert!(outcome.split.train.rows.last().unwrap().date < outcome.split.test.rows[0].date);
    }

    #[test]
    fn trained_models_produce_binary_predictions() {
        let series = make_series("AAPL", 250, 100.0);
        for kind in [ModelKind::Logistic, ModelKind::Mlp, ModelKind::Svm] {
            let config = PipelineConfig {
                model: ModelConfig {
                    kind,
                    epochs: 50,
                    ..ModelConfig::default()
                },
                ..PipelineConfig::default()
            };
            let mut model = classifier::build(&config.model);

            let outcome = run_pipeline(&series, None, &config, model.as_mut()).unwrap();

            assert_eq!(outcome.model_name, kind.to_string());
            assert_eq!(outcome.predictions.len(), outcome.split.test.len());
            assert!(outcome.predictions.iter().all(|p| *p <= 1));
            let c = outcome.test_report.confusion;
            assert_eq!(c.total(), outcome.split.test.len());
        }
    }

    #[test]
    fn seeded_network_is_reproducible() {
        let series = make_series("AAPL", 200, 100.0);
        let config = PipelineConfig {
            model: ModelConfig {
                kind: ModelKind::Mlp,
                epochs: 30,
                ..ModelConfig::default()
            },
            ..PipelineConfig::default()
        };

        let mut a = classifier::build(&config.model);
        let mut b = classifier::build(&config.model);
        let first = run_pipeline(&series, None, &config, a.as_mut()).unwrap();
        let second = run_pipeline(&series, None, &config, b.as_mut()).unwrap();

        assert_eq!(first.predictions, second.predictions);
    }

    #[test]
    fn market_benchmark_adds_risk_entry() {
        let series = make_series("AAPL", 200, 100.0);
        let market = PriceSeries::new("INDEX", generate_bars("2019-12-01", 260, 3000.0)).unwrap();
        let mut model = AlwaysInvest;

        let outcome =
            run_pipeline(&series, Some(&market), &PipelineConfig::default(), &mut model).unwrap();

        let (name, ledger) = outcome.market.as_ref().unwrap();
        assert_eq!(name, "INDEX");
        assert_eq!(ledger.rows[0].date, outcome.split.test.rows[0].date);
        assert_eq!(
            ledger.rows.last().unwrap().date,
            outcome.split.test.rows.last().unwrap().date
        );
        assert_eq!(outcome.risk.len(), 2);
        assert!(outcome.risk.iter().all(|r| r.risk.is_ok()));
    }

    #[test]
    fn disabled_profit_taking_realizes_nothing_for_benchmark() {
        let series = make_series("AAPL", 200, 100.0);
        let mut model = AlwaysInvest;
        let config = PipelineConfig {
            backtest: BacktestConfig {
                profit_taking: ProfitTaking::Disabled,
                ..BacktestConfig::default()
            },
            ..PipelineConfig::default()
        };

        let outcome = run_pipeline(&series, None, &config, &mut model).unwrap();

        assert_eq!(outcome.buy_and_hold.summary().sum_realized_profits, 0.0);
    }
}

mod backtest_replay {
    use super::*;

    #[test]
    fn profit_taking_realizes_each_gain() {
        let dates = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)];
        let ledger = backtest::replay(
            &dates,
            &[100.0, 101.0, 102.01],
            &[1, 1, 1],
            &BacktestConfig::default(),
        )
        .unwrap();

        let gain = 1000.0 * 1.01_f64.ln();
        assert_relative_eq!(ledger.final_total(), 1000.0, epsilon = 1e-9);
        assert_relative_eq!(ledger.rows[0].realized_profit, gain, epsilon = 1e-9);
        assert_relative_eq!(ledger.summary().sum_realized_profits, 2.0 * gain, epsilon = 1e-9);
    }

    #[test]
    fn never_invested_keeps_capital() {
        let dates = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)];
        let ledger = backtest::replay(
            &dates,
            &[100.0, 90.0, 120.0],
            &[0, 0, 0],
            &BacktestConfig::default(),
        )
        .unwrap();

        assert!(ledger.rows.iter().all(|r| r.total == 1000.0));
        assert_eq!(ledger.summary().sum_realized_profits, 0.0);
    }

    #[test]
    fn prediction_length_mismatch() {
        let err = backtest::replay(
            &[date(2024, 1, 1), date(2024, 1, 2)],
            &[1.0, 2.0],
            &[1],
            &BacktestConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SigtraderError::LengthMismatch { .. }));
    }
}

struct MockReportPort {
    calls: RefCell<Vec<(BacktestLedger, Vec<u8>, PathBuf)>>,
}

impl MockReportPort {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write_ledger(
        &self,
        ledger: &BacktestLedger,
        predictions_correct: &[u8],
        output_path: &Path,
    ) -> Result<(), SigtraderError> {
        self.calls.borrow_mut().push((
            ledger.clone(),
            predictions_correct.to_vec(),
            output_path.to_path_buf(),
        ));
        Ok(())
    }
}

mod report_generation {
    use super::*;

    #[test]
    fn report_port_receives_outcome_ledger() {
        let series = make_series("AAPL", 200, 100.0);
        let mut model = AlwaysInvest;
        let outcome = run_pipeline(&series, None, &PipelineConfig::default(), &mut model).unwrap();
        let port = MockReportPort::new();

        port.write_ledger(&outcome.ledger, &outcome.accuracy_flags, Path::new("out.csv"))
            .unwrap();

        let calls = port.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, outcome.ledger);
        assert_eq!(calls[0].1, outcome.accuracy_flags);
        assert_eq!(calls[0].2, PathBuf::from("out.csv"));
    }

    #[test]
    fn csv_report_has_one_line_per_ledger_row() {
        let series = make_series("AAPL", 200, 100.0);
        let mut model = AlwaysInvest;
        let outcome = run_pipeline(&series, None, &PipelineConfig::default(), &mut model).unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.csv");

        CsvReportAdapter::new()
            .write_ledger(&outcome.ledger, &outcome.accuracy_flags, &path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), outcome.ledger.len() + 1);
        let first_date = outcome.ledger.rows[0].date.to_string();
        assert!(content.lines().nth(1).unwrap().starts_with(&first_date));
    }
}

mod csv_data_source {
    use super::*;

    #[test]
    fn pipeline_runs_from_csv_files() {
        let dir = tempfile::TempDir::new().unwrap();
        write_price_csv(dir.path(), "AAPL", &generate_bars("2020-01-01", 150, 100.0));
        let port = CsvAdapter::new(dir.path().to_path_buf());

        let series = load_series(&port, "AAPL", date(2020, 1, 1), date(2020, 12, 31)).unwrap();
        let mut model = AlwaysInvest;
        let outcome = run_pipeline(&series, None, &PipelineConfig::default(), &mut model).unwrap();

        assert_eq!(series.len(), 150);
        assert!(!outcome.ledger.is_empty());
    }
}

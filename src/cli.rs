//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{write_indicator_csv, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestLedger, ProfitTaking};
use crate::domain::classifier::{self, ModelConfig, ModelKind};
use crate::domain::config_validation::{
    parse_date, parse_hidden_units, validate_data_config, validate_indicator_config,
    validate_run_config,
};
use crate::domain::error::SigtraderError;
use crate::domain::indicator::{compute_indicators, IndicatorParams, MacdMode};
use crate::domain::metrics::RiskReport;
use crate::domain::pipeline::{load_series, run_pipeline, PipelineConfig, PipelineOutcome};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "sigtrader",
    about = "Indicator signals, classifier training and signal backtesting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline: indicators, training, backtest and risk metrics
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
        /// Ledger CSV output path (overrides [report] ledger_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the aligned indicator frame as CSV on stdout
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range held for the configured ticker(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
}

/// What to fetch and for which dates.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub ticker: String,
    pub benchmark: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            ticker,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_signals(&config, ticker.as_deref(), output.as_deref())
            }
        }
        Command::Indicators { config, ticker } => run_indicators(&config, ticker.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: SigtraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn run_signals(config_path: &Path, ticker: Option<&str>, output_path: Option<&Path>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate config
    if let Err(e) = validate_run_config(&adapter) {
        return fail(e);
    }

    // Stage 3: Build request and pipeline config
    let request = match build_data_request(&adapter, ticker) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let pipeline_config = match build_pipeline_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let ledger_path = output_path
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "ledger_path").map(PathBuf::from));

    // Stage 4: Select data source
    let data_port = match build_data_port(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    run_signal_pipeline(
        data_port.as_ref(),
        &request,
        &pipeline_config,
        ledger_path.as_deref(),
    )
}

pub fn build_data_request(
    adapter: &dyn ConfigPort,
    ticker_override: Option<&str>,
) -> Result<DataRequest, SigtraderError> {
    let ticker = match ticker_override {
        Some(t) => t.trim().to_uppercase(),
        None => adapter
            .get_string("data", "ticker")
            .map(|t| t.trim().to_uppercase())
            .ok_or_else(|| SigtraderError::ConfigMissing {
                section: "data".into(),
                key: "ticker".into(),
            })?,
    };
    let start = parse_date(
        adapter.get_string("data", "start_date").as_deref(),
        "data",
        "start_date",
    )?;
    let end = parse_date(
        adapter.get_string("data", "end_date").as_deref(),
        "data",
        "end_date",
    )?;

    Ok(DataRequest {
        ticker,
        benchmark: adapter
            .get_string("data", "benchmark")
            .map(|b| b.trim().to_uppercase()),
        start,
        end,
    })
}

fn period(adapter: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, SigtraderError> {
    let value = adapter.get_int("indicators", key, default as i64);
    usize::try_from(value).map_err(|_| SigtraderError::ConfigInvalid {
        section: "indicators".into(),
        key: key.to_string(),
        reason: format!("{value} is negative"),
    })
}

pub fn build_indicator_params(adapter: &dyn ConfigPort) -> Result<IndicatorParams, SigtraderError> {
    let defaults = IndicatorParams::default();
    let macd_mode = match adapter.get_string("indicators", "macd_mode") {
        Some(s) => s
            .parse::<MacdMode>()
            .map_err(|reason| SigtraderError::ConfigInvalid {
                section: "indicators".into(),
                key: "macd_mode".into(),
                reason,
            })?,
        None => defaults.macd_mode,
    };

    Ok(IndicatorParams {
        rsi_period: period(adapter, "rsi_period", defaults.rsi_period)?,
        stochastic_period: period(adapter, "stochastic_period", defaults.stochastic_period)?,
        stochastic_ma_period: period(
            adapter,
            "stochastic_ma_period",
            defaults.stochastic_ma_period,
        )?,
        bollinger_period: period(adapter, "bollinger_period", defaults.bollinger_period)?,
        bollinger_k: adapter.get_double("indicators", "bollinger_k", defaults.bollinger_k),
        macd_short: period(adapter, "macd_short", defaults.macd_short)?,
        macd_long: period(adapter, "macd_long", defaults.macd_long)?,
        adx_period: period(adapter, "adx_period", defaults.adx_period)?,
        macd_mode,
    })
}

pub fn build_model_config(adapter: &dyn ConfigPort) -> Result<ModelConfig, SigtraderError> {
    let defaults = ModelConfig::default();
    let invalid = |key: &str, reason: String| SigtraderError::ConfigInvalid {
        section: "model".into(),
        key: key.to_string(),
        reason,
    };

    let kind = match adapter.get_string("model", "kind") {
        Some(s) => s.parse::<ModelKind>().map_err(|r| invalid("kind", r))?,
        None => defaults.kind,
    };
    let hidden_units = match adapter.get_string("model", "hidden_units") {
        Some(s) => parse_hidden_units(&s).map_err(|r| invalid("hidden_units", r))?,
        None => defaults.hidden_units,
    };
    let epochs = adapter.get_int("model", "epochs", defaults.epochs as i64);
    let seed = adapter.get_int("model", "seed", defaults.seed as i64);

    Ok(ModelConfig {
        kind,
        epochs: usize::try_from(epochs)
            .map_err(|_| invalid("epochs", format!("{epochs} is negative")))?,
        learning_rate: adapter.get_double("model", "learning_rate", defaults.learning_rate),
        hidden_units,
        regularization: adapter.get_double("model", "regularization", defaults.regularization),
        seed: u64::try_from(seed).map_err(|_| invalid("seed", format!("{seed} is negative")))?,
        normalize: adapter.get_bool("model", "normalize", defaults.normalize),
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    let defaults = BacktestConfig::default();
    BacktestConfig {
        initial_capital: adapter.get_double(
            "backtest",
            "initial_capital",
            defaults.initial_capital,
        ),
        profit_taking: if adapter.get_bool("backtest", "profit_taking", true) {
            ProfitTaking::AboveInitial
        } else {
            ProfitTaking::Disabled
        },
    }
}

pub fn build_pipeline_config(adapter: &dyn ConfigPort) -> Result<PipelineConfig, SigtraderError> {
    let defaults = PipelineConfig::default();
    Ok(PipelineConfig {
        indicators: build_indicator_params(adapter)?,
        train_fraction: adapter.get_double("split", "train_fraction", defaults.train_fraction),
        backtest: build_backtest_config(adapter),
        sortino_threshold: adapter.get_double(
            "backtest",
            "sortino_threshold",
            defaults.sortino_threshold,
        ),
        model: build_model_config(adapter)?,
    })
}

pub fn build_data_port(adapter: &dyn ConfigPort) -> Result<Box<dyn DataPort>, SigtraderError> {
    let source = adapter
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .trim()
        .to_lowercase();
    match source.as_str() {
        "csv" => {
            let dir = adapter
                .get_string("data", "data_dir")
                .ok_or_else(|| SigtraderError::ConfigMissing {
                    section: "data".into(),
                    key: "data_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "yahoo")]
        "yahoo" => Ok(Box::new(crate::adapters::yahoo_adapter::YahooAdapter::new()?)),
        #[cfg(not(feature = "yahoo"))]
        "yahoo" => Err(SigtraderError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: "yahoo feature is required for the yahoo source".into(),
        }),
        other => Err(SigtraderError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown source '{other}' (expected csv or yahoo)"),
        }),
    }
}

pub fn run_signal_pipeline(
    data_port: &dyn DataPort,
    request: &DataRequest,
    config: &PipelineConfig,
    ledger_path: Option<&Path>,
) -> ExitCode {
    // Stage 5: Fetch price series
    let series = match load_series(data_port, &request.ticker, request.start, request.end) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let market = match &request.benchmark {
        Some(benchmark) => match load_series(data_port, benchmark, request.start, request.end) {
            Ok(s) => Some(s),
            Err(e) => return fail(e),
        },
        None => None,
    };

    // Stage 6: Train, predict, replay
    eprintln!(
        "Running {} on {}: {} bars, {} to {}",
        config.model.kind,
        request.ticker,
        series.len(),
        request.start,
        request.end,
    );
    let mut model = classifier::build(&config.model);
    let outcome = match run_pipeline(&series, market.as_ref(), config, model.as_mut()) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    // Stage 7: Print console summary to stderr
    print_summary(&outcome);

    // Stage 8: Export ledger
    if let Some(path) = ledger_path {
        if let Err(e) =
            CsvReportAdapter::new().write_ledger(&outcome.ledger, &outcome.accuracy_flags, path)
        {
            return fail(e);
        }
        eprintln!("\nLedger written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn print_ledger(label: &str, ledger: &BacktestLedger) {
    let s = ledger.summary();
    eprintln!("  {label}:");
    eprintln!("    Final Total:       {:.2}", ledger.final_total());
    eprintln!("    Sum of Profits:    {:.2}", s.sum_profits);
    eprintln!("    Sum of Returns:    {:.4}", s.sum_returns);
    eprintln!("    Realized Profits:  {:.2}", s.sum_realized_profits);
    eprintln!("    Realized Gain:     {:.2}%", s.realized_pct);
}

fn print_ratio(name: &str, report: &RiskReport) {
    eprintln!(
        "    {:<8} asset {:>9.4} (E[r] {:.4}, vol {:.4})  benchmark {:>9.4}  relative {}",
        name,
        report.asset.ratio,
        report.asset.expected_return,
        report.asset.volatility,
        report.benchmark.ratio,
        report
            .relative
            .map(|r| format!("{r:.4}"))
            .unwrap_or_else(|| "n/a".to_string()),
    );
}

pub fn print_summary(outcome: &PipelineOutcome) {
    eprintln!("\n=== {} ({}) ===", outcome.code, outcome.model_name);
    eprintln!(
        "Rows: {} train, {} test",
        outcome.split.train.len(),
        outcome.split.test.len()
    );
    eprintln!("\nTrain:\n{}", outcome.train_report);
    eprintln!("\nTest:\n{}", outcome.test_report);

    eprintln!("\n=== Backtest ===");
    print_ledger("Strategy", &outcome.ledger);
    print_ledger("Buy and Hold", &outcome.buy_and_hold);
    if let Some((name, market)) = &outcome.market {
        print_ledger(name, market);
    }

    eprintln!("\n=== Risk ===");
    for entry in &outcome.risk {
        eprintln!("  vs {}:", entry.benchmark);
        match &entry.risk {
            Ok(summary) => {
                print_ratio("Sharpe", &summary.sharpe);
                print_ratio("Sortino", &summary.sortino);
            }
            Err(e) => eprintln!("    unavailable: {e}"),
        }
    }
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_run_config(&adapter) {
        return fail(e);
    }
    let (request, config) = match build_data_request(&adapter, None)
        .and_then(|r| build_pipeline_config(&adapter).map(|c| (r, c)))
    {
        Ok(pair) => pair,
        Err(e) => return fail(e),
    };
    eprintln!("Config validated successfully");

    let p = &config.indicators;
    eprintln!("\nData:");
    eprintln!("  ticker:     {}", request.ticker);
    eprintln!(
        "  benchmark:  {}",
        request.benchmark.as_deref().unwrap_or("(none)")
    );
    eprintln!("  range:      {} to {}", request.start, request.end);
    eprintln!("\nIndicators:");
    eprintln!(
        "  RSI({}) STOCH({},{}) BOLL({},{}) MACD({},{},{}) ADX({}) OBV",
        p.rsi_period,
        p.stochastic_period,
        p.stochastic_ma_period,
        p.bollinger_period,
        p.bollinger_k,
        p.macd_short,
        p.macd_long,
        p.macd_mode,
        p.adx_period,
    );
    eprintln!("  first usable bar: {}", p.max_lookback());
    eprintln!("\nModel:");
    eprintln!(
        "  {} (epochs {}, learning rate {}, seed {})",
        config.model.kind, config.model.epochs, config.model.learning_rate, config.model.seed
    );
    eprintln!("  train fraction: {}", config.train_fraction);
    eprintln!("  initial capital: {:.2}", config.backtest.initial_capital);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

/// Fetch the configured series and write its aligned indicator frame as CSV.
/// Returns the number of frame rows.
pub fn write_indicators<W: io::Write>(
    adapter: &dyn ConfigPort,
    ticker: Option<&str>,
    writer: W,
) -> Result<usize, SigtraderError> {
    validate_data_config(adapter)?;
    validate_indicator_config(adapter)?;
    let request = build_data_request(adapter, ticker)?;
    let params = build_indicator_params(adapter)?;
    let port = build_data_port(adapter)?;
    let series = load_series(port.as_ref(), &request.ticker, request.start, request.end)?;
    let frame = compute_indicators(&series, &params)?;
    write_indicator_csv(&frame, writer)?;
    Ok(frame.len())
}

pub fn run_indicators(config_path: &Path, ticker: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match write_indicators(&adapter, ticker, io::stdout().lock()) {
        Ok(rows) => {
            eprintln!("{rows} indicator rows written");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_run_config(&adapter).and_then(|_| build_pipeline_config(&adapter)) {
        Ok(config) => {
            eprintln!("  model: {}", config.model.kind);
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Tickers `info` reports on: the override, or the configured ticker and benchmark.
/// Normalized the same way as [`build_data_request`].
pub fn info_tickers(
    adapter: &dyn ConfigPort,
    ticker_override: Option<&str>,
) -> Result<Vec<String>, SigtraderError> {
    let tickers: Vec<String> = match ticker_override {
        Some(t) => vec![t.to_string()],
        None => adapter
            .get_string("data", "ticker")
            .into_iter()
            .chain(adapter.get_string("data", "benchmark"))
            .collect(),
    }
    .into_iter()
    .map(|t| t.trim().to_uppercase())
    .filter(|t| !t.is_empty())
    .collect();

    if tickers.is_empty() {
        return Err(SigtraderError::ConfigMissing {
            section: "data".into(),
            key: "ticker".into(),
        });
    }
    Ok(tickers)
}

/// Exits non-zero when no lookup succeeds.
pub fn run_info(config_path: &Path, ticker: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let tickers = match info_tickers(&adapter, ticker) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let port = match build_data_port(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let mut last_error = None;
    let mut answered = 0usize;
    for t in &tickers {
        match port.data_range(t) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", t, count, first, last);
                answered += 1;
            }
            Ok(None) => {
                eprintln!("{}: no data found", t);
                answered += 1;
            }
            Err(e) => {
                eprintln!("error querying {}: {}", t, e);
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) if answered == 0 => ExitCode::from(&e),
        _ => ExitCode::SUCCESS,
    }
}

//! Configuration validation.
//!
//! Validates every config field before a run touches market data.

use crate::domain::classifier::ModelKind;
use crate::domain::error::SigtraderError;
use crate::domain::indicator::MacdMode;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const INDICATOR_PERIODS: [(&str, i64); 7] = [
    ("rsi_period", 9),
    ("stochastic_period", 14),
    ("stochastic_ma_period", 5),
    ("bollinger_period", 20),
    ("macd_short", 12),
    ("macd_long", 26),
    ("adx_period", 14),
];

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_data_config(config)?;
    validate_indicator_config(config)?;
    validate_split(config)?;
    validate_backtest(config)?;
    validate_model_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_ticker(config)?;
    validate_dates(config)?;
    validate_source(config)?;
    Ok(())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    for (key, default) in INDICATOR_PERIODS {
        validate_period(config, "indicators", key, default)?;
    }
    let k = config.get_double("indicators", "bollinger_k", 2.0);
    if !k.is_finite() || k < 0.0 {
        return Err(invalid("indicators", "bollinger_k", "bollinger_k must be non-negative"));
    }
    if let Some(mode) = config.get_string("indicators", "macd_mode") {
        mode.parse::<MacdMode>()
            .map_err(|reason| invalid("indicators", "macd_mode", &reason))?;
    }
    Ok(())
}

pub fn validate_model_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    if let Some(kind) = config.get_string("model", "kind") {
        kind.parse::<ModelKind>()
            .map_err(|reason| invalid("model", "kind", &reason))?;
    }
    validate_period(config, "model", "epochs", 500)?;

    let rate = config.get_double("model", "learning_rate", 0.1);
    if !rate.is_finite() || rate <= 0.0 {
        return Err(invalid("model", "learning_rate", "learning_rate must be positive"));
    }
    let reg = config.get_double("model", "regularization", 0.01);
    if !reg.is_finite() || reg < 0.0 {
        return Err(invalid("model", "regularization", "regularization must be non-negative"));
    }
    if let Some(units) = config.get_string("model", "hidden_units") {
        parse_hidden_units(&units).map_err(|reason| invalid("model", "hidden_units", &reason))?;
    }
    if config.get_int("model", "seed", 100) < 0 {
        return Err(invalid("model", "seed", "seed must be non-negative"));
    }
    Ok(())
}

/// Parse a comma separated list of layer widths such as `10, 10`.
pub fn parse_hidden_units(value: &str) -> Result<Vec<usize>, String> {
    let units = value
        .split(',')
        .map(|part| match part.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("'{}' is not a positive layer width", part.trim())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if units.is_empty() {
        return Err("at least one hidden layer is required".to_string());
    }
    Ok(units)
}

pub fn parse_date(
    value: Option<&str>,
    section: &str,
    field: &str,
) -> Result<NaiveDate, SigtraderError> {
    match value {
        None => Err(SigtraderError::ConfigMissing {
            section: section.to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                section,
                field,
                &format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> SigtraderError {
    SigtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), SigtraderError> {
    if config.get_int(section, key, default) < 1 {
        return Err(invalid(section, key, &format!("{} must be at least 1", key)));
    }
    Ok(())
}

fn validate_ticker(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    match config.get_string("data", "ticker") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(SigtraderError::ConfigMissing {
            section: "data".to_string(),
            key: "ticker".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let start_str = config.get_string("data", "start_date");
    let end_str = config.get_string("data", "end_date");

    let start_date = parse_date(start_str.as_deref(), "data", "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "data", "end_date")?;

    if start_date >= end_date {
        return Err(invalid("data", "start_date", "start_date must be before end_date"));
    }
    Ok(())
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => match config.get_string("data", "data_dir") {
            Some(s) if !s.trim().is_empty() => Ok(()),
            _ => Err(SigtraderError::ConfigMissing {
                section: "data".to_string(),
                key: "data_dir".to_string(),
            }),
        },
        "yahoo" => Ok(()),
        other => Err(invalid(
            "data",
            "source",
            &format!("unknown source '{other}' (expected csv or yahoo)"),
        )),
    }
}

fn validate_split(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let fraction = config.get_double("split", "train_fraction", 0.7);
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(invalid(
            "split",
            "train_fraction",
            "train_fraction must be strictly between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let capital = config.get_double("backtest", "initial_capital", 1000.0);
    if !capital.is_finite() || capital <= 0.0 {
        return Err(invalid("backtest", "initial_capital", "initial_capital must be positive"));
    }
    let threshold = config.get_double("backtest", "sortino_threshold", 0.0);
    if !threshold.is_finite() {
        return Err(invalid("backtest", "sortino_threshold", "sortino_threshold must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const DATA: &str = "[data]\nticker = AAPL\nstart_date = 2015-01-01\nend_date = 2020-12-31\nsource = csv\ndata_dir = data\n";

    fn with_data(extra: &str) -> FileConfigAdapter {
        make_config(&format!("{DATA}{extra}"))
    }

    #[test]
    fn valid_run_config_passes() {
        let config = make_config(
            r#"
[data]
ticker = AAPL
benchmark = ^GSPC
start_date = 2015-01-01
end_date = 2020-12-31
source = yahoo

[indicators]
rsi_period = 9
bollinger_k = 2.5
macd_mode = cumulative

[split]
train_fraction = 0.8

[backtest]
initial_capital = 1000
profit_taking = false

[model]
kind = mlp
epochs = 200
learning_rate = 0.05
hidden_units = 10, 10
regularization = 0
seed = 100
"#,
        );
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn defaults_pass_with_data_section_only() {
        assert!(validate_run_config(&with_data("")).is_ok());
    }

    #[test]
    fn missing_ticker_fails() {
        let config = make_config("[data]\nstart_date = 2015-01-01\nend_date = 2020-01-01\nsource = yahoo\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigMissing { key, .. } if key == "ticker"));
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config = make_config("[data]\nticker = X\nstart_date = 2015/01/01\nend_date = 2020-01-01\nsource = yahoo\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn missing_end_date_fails() {
        let config = make_config("[data]\nticker = X\nstart_date = 2015-01-01\nsource = yahoo\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let config = make_config("[data]\nticker = X\nstart_date = 2020-01-01\nend_date = 2015-01-01\nsource = yahoo\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn csv_source_requires_data_dir() {
        let config = make_config("[data]\nticker = X\nstart_date = 2015-01-01\nend_date = 2020-01-01\nsource = csv\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigMissing { key, .. } if key == "data_dir"));
    }

    #[test]
    fn unknown_source_fails() {
        let config = make_config("[data]\nticker = X\nstart_date = 2015-01-01\nend_date = 2020-01-01\nsource = bloomberg\n");
        let err = validate_run_config(&config).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "source"));
    }

    #[test]
    fn zero_period_fails() {
        let err = validate_run_config(&with_data("[indicators]\nadx_period = 0\n")).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "adx_period"));
    }

    #[test]
    fn negative_bollinger_k_fails() {
        let err = validate_run_config(&with_data("[indicators]\nbollinger_k = -1\n")).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "bollinger_k"));
    }

    #[test]
    fn unknown_macd_mode_fails() {
        let err = validate_run_config(&with_data("[indicators]\nmacd_mode = ema\n")).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "macd_mode"));
    }

    #[test]
    fn train_fraction_bounds() {
        for bad in ["0", "1", "1.5", "-0.2"] {
            let config = with_data(&format!("[split]\ntrain_fraction = {bad}\n"));
            let err = validate_run_config(&config).unwrap_err();
            let rejected =
                matches!(err, SigtraderError::ConfigInvalid { ref key, .. } if key == "train_fraction");
            assert!(rejected, "fraction {bad} should be rejected");
        }
    }

    #[test]
    fn initial_capital_must_be_positive() {
        let err = validate_run_config(&with_data("[backtest]\ninitial_capital = 0\n")).unwrap_err();
        assert!(
            matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "initial_capital")
        );
    }

    #[test]
    fn unknown_model_kind_fails() {
        let err = validate_run_config(&with_data("[model]\nkind = lstm\n")).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "kind"));
    }

    #[test]
    fn zero_epochs_fails() {
        let err = validate_run_config(&with_data("[model]\nepochs = 0\n")).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "epochs"));
    }

    #[test]
    fn non_positive_learning_rate_fails() {
        let err = validate_run_config(&with_data("[model]\nlearning_rate = 0\n")).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "learning_rate"));
    }

    #[test]
    fn bad_hidden_units_fail() {
        let err = validate_run_config(&with_data("[model]\nhidden_units = 10, 0\n")).unwrap_err();
        assert!(matches!(err, SigtraderError::ConfigInvalid { key, .. } if key == "hidden_units"));
    }

    #[test]
    fn parse_hidden_units_accepts_list() {
        assert_eq!(parse_hidden_units("10, 10").unwrap(), vec![10, 10]);
        assert_eq!(parse_hidden_units("32").unwrap(), vec![32]);
        assert!(parse_hidden_units("").is_err());
        assert!(parse_hidden_units("a,2").is_err());
    }
}

//! Sharpe and Sortino ratios of a strategy against a benchmark.
//!
//! Per-period statistics are scaled with the exponent `250 / L`, where `L` is the length
//! of the series being scaled:
//!
//! - expected return = `(Σ returns + 1)^(250/L) - 1`
//! - volatility = `σ^(250/L)`, σ the population standard deviation
//! - ratio = expected return / volatility
//!
//! Sortino computes σ over the returns strictly below the threshold only (no such returns
//! gives σ = 0).
//!
//! Zero volatility gives a ratio of +∞ or -∞ following the sign of the expected return,
//! or 0 when the expected return is 0. An empty series, or `Σ returns + 1 < 0`, is an
//! [`SigtraderError::UndefinedMetric`].

use crate::domain::backtest::BacktestLedger;
use crate::domain::error::SigtraderError;

pub const PERIODS_PER_YEAR: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioStats {
    pub expected_return: f64,
    pub volatility: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskReport {
    pub asset: RatioStats,
    pub benchmark: RatioStats,
    /// Asset ratio over benchmark ratio; 1.0 when they are equal, `None` when the quotient
    /// is undefined.
    pub relative: Option<f64>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let d = v - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

fn exponent(metric: &str, len: usize) -> Result<f64, SigtraderError> {
    if len == 0 {
        return Err(SigtraderError::UndefinedMetric {
            metric: metric.to_string(),
            reason: "return series is empty".into(),
        });
    }
    Ok(PERIODS_PER_YEAR / len as f64)
}

fn expected_return(metric: &str, returns: &[f64], exp: f64) -> Result<f64, SigtraderError> {
    let base = returns.iter().sum::<f64>() + 1.0;
    if base < 0.0 {
        return Err(SigtraderError::UndefinedMetric {
            metric: metric.to_string(),
            reason: format!("compounding base {base} is negative"),
        });
    }
    Ok(base.powf(exp) - 1.0)
}

fn ratio(expected: f64, volatility: f64) -> f64 {
    if volatility == 0.0 {
        if expected > 0.0 {
            f64::INFINITY
        } else if expected < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        }
    } else {
        expected / volatility
    }
}

fn relative(asset: f64, benchmark: f64) -> Option<f64> {
    if asset == benchmark {
        return Some(1.0);
    }
    let q = asset / benchmark;
    if q.is_nan() { None } else { Some(q) }
}

fn stats(metric: &str, returns: &[f64], deviation: &[f64]) -> Result<RatioStats, SigtraderError> {
    let exp = exponent(metric, returns.len())?;
    let expected_return = expected_return(metric, returns, exp)?;
    let volatility = population_std(deviation).powf(exp);
    Ok(RatioStats {
        expected_return,
        volatility,
        ratio: ratio(expected_return, volatility),
    })
}

fn report(asset: RatioStats, benchmark: RatioStats) -> RiskReport {
    RiskReport {
        asset,
        benchmark,
        relative: relative(asset.ratio, benchmark.ratio),
    }
}

pub fn sharpe(asset: &[f64], benchmark: &[f64]) -> Result<RiskReport, SigtraderError> {
    Ok(report(
        stats("sharpe", asset, asset)?,
        stats("sharpe", benchmark, benchmark)?,
    ))
}

pub fn sortino(
    asset: &[f64],
    benchmark: &[f64],
    threshold: f64,
) -> Result<RiskReport, SigtraderError> {
    let below = |values: &[f64]| -> Vec<f64> {
        values.iter().copied().filter(|r| *r < threshold).collect()
    };
    Ok(report(
        stats("sortino", asset, &below(asset))?,
        stats("sortino", benchmark, &below(benchmark))?,
    ))
}

/// Sharpe and Sortino reports for a strategy ledger and a benchmark ledger. The strategy
/// is scored on its realized returns, the benchmark on its period returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSummary {
    pub sharpe: RiskReport,
    pub sortino: RiskReport,
}

pub fn assess(
    strategy: &BacktestLedger,
    benchmark: &BacktestLedger,
    sortino_threshold: f64,
) -> Result<RiskSummary, SigtraderError> {
    let asset = strategy.realized_returns();
    let market = benchmark.returns();
    Ok(RiskSummary {
        sharpe: sharpe(&asset, &market)?,
        sortino: sortino(&asset, &market, sortino_threshold)?,
    })
}

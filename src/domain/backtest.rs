//! Backtest replay of predicted positions.
//!
//! Replay is a left-to-right fold over consecutive closes. For every row but the last,
//! `r = ln(close[t+1]) - ln(close[t])`.
//!
//! - Prediction 0: leave the market. Capital that was invested becomes available again;
//!   capital that was already flat stays as it is. Profit is 0.
//! - Prediction 1: if flat, invest the full available amount. `profit = total * r`, then
//!   `total += profit`.
//! - Profit taking (every row): if `total > initial_capital`, realize the excess and reset
//!   `total` to `initial_capital`.
//!
//! The last row has no forward return and is zero-filled, with `available = total`.
//!
//! The benchmark replay ignores predictions and stays invested throughout.

use crate::domain::error::SigtraderError;
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfitTaking {
    /// Realize anything above the initial capital.
    #[default]
    AboveInitial,
    /// Let gains compound.
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub profit_taking: ProfitTaking,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1000.0,
            profit_taking: ProfitTaking::AboveInitial,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Holding {
    Flat,
    Invested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gating {
    Predicted,
    AlwaysInvested,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub adj_close: f64,
    pub prediction: u8,
    pub available: f64,
    /// Capital at work after this row's profit, before profit taking. 0 when flat.
    pub invested: f64,
    /// Single-period log return to the next close.
    pub period_return: f64,
    pub profit: f64,
    pub realized_profit: f64,
    pub realized_return: f64,
    /// Capital carried into the next row.
    pub total: f64,
    pub cumulative_realized: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestLedger {
    pub initial_capital: f64,
    pub rows: Vec<LedgerRow>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerSummary {
    pub sum_profits: f64,
    pub sum_returns: f64,
    pub sum_realized_profits: f64,
    /// `sum_realized_profits * 100 / initial_capital`.
    pub realized_pct: f64,
}

impl BacktestLedger {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.period_return).collect()
    }

    pub fn realized_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.realized_return).collect()
    }

    pub fn final_total(&self) -> f64 {
        self.rows.last().map_or(self.initial_capital, |r| r.total)
    }

    pub fn summary(&self) -> LedgerSummary {
        let sum_profits = self.rows.iter().map(|r| r.profit).sum();
        let sum_returns = self.rows.iter().map(|r| r.period_return).sum();
        let sum_realized_profits: f64 = self.rows.iter().map(|r| r.realized_profit).sum();
        LedgerSummary {
            sum_profits,
            sum_returns,
            sum_realized_profits,
            realized_pct: sum_realized_profits * 100.0 / self.initial_capital,
        }
    }
}

/// Replay `predictions` (0 = stay out, 1 = invest) over consecutive closes.
pub fn replay(
    dates: &[NaiveDate],
    closes: &[f64],
    predictions: &[u8],
    config: &BacktestConfig,
) -> Result<BacktestLedger, SigtraderError> {
    check_lengths("prediction vector", closes.len(), predictions.len())?;
    if let Some(index) = predictions.iter().position(|p| *p > 1) {
        return Err(SigtraderError::malformed(
            index,
            "prediction",
            format!("must be 0 or 1, got {}", predictions[index]),
        ));
    }
    run(dates, closes, predictions, config, Gating::Predicted)
}

/// Replay that is invested on every row.
pub fn replay_benchmark(
    dates: &[NaiveDate],
    closes: &[f64],
    config: &BacktestConfig,
) -> Result<BacktestLedger, SigtraderError> {
    let always = vec![1; closes.len()];
    run(dates, closes, &always, config, Gating::AlwaysInvested)
}

fn check_lengths(what: &str, expected: usize, got: usize) -> Result<(), SigtraderError> {
    if expected != got {
        return Err(SigtraderError::LengthMismatch {
            what: what.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

fn run(
    dates: &[NaiveDate],
    closes: &[f64],
    predictions: &[u8],
    config: &BacktestConfig,
    gating: Gating,
) -> Result<BacktestLedger, SigtraderError> {
    check_lengths("date vector", closes.len(), dates.len())?;
    if !(config.initial_capital.is_finite() && config.initial_capital > 0.0) {
        return Err(SigtraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_capital".into(),
            reason: format!("must be positive, got {}", config.initial_capital),
        });
    }
    if let Some(index) = closes.iter().position(|c| !(c.is_finite() && *c > 0.0)) {
        return Err(SigtraderError::malformed(index, "adj_close", "must be positive"));
    }

    let initial = config.initial_capital;
    let mut rows = Vec::with_capacity(closes.len());
    let mut holding = Holding::Flat;
    let mut available = initial;
    let mut total = initial;
    let mut cumulative_realized = 0.0;

    for t in 0..closes.len().saturating_sub(1) {
        let r = closes[t + 1].ln() - closes[t].ln();
        let prediction = predictions[t];

        let (profit, invested, mut realized_return) = if prediction == 0 {
            if holding == Holding::Invested {
                available = total;
            }
            holding = Holding::Flat;
            (0.0, 0.0, 0.0)
        } else {
            if holding == Holding::Flat {
                total = available;
                holding = Holding::Invested;
            }
            available = 0.0;
            let profit = total * r;
            total += profit;
            (profit, total, r)
        };

        let mut realized_profit = 0.0;
        if config.profit_taking == ProfitTaking::AboveInitial && total > initial {
            realized_profit = total - initial;
            total = initial;
        }
        if gating == Gating::AlwaysInvested {
            realized_return = if realized_profit > 0.0 { r } else { 0.0 };
        }
        if holding == Holding::Flat {
            available = total;
        }
        cumulative_realized += realized_profit;

        rows.push(LedgerRow {
            date: dates[t],
            adj_close: closes[t],
            prediction,
            available,
            invested,
            period_return: r,
            profit,
            realized_profit,
            realized_return,
            total,
            cumulative_realized,
        });
    }

    if let Some(last) = closes.len().checked_sub(1) {
        rows.push(LedgerRow {
            date: dates[last],
            adj_close: closes[last],
            prediction: predictions[last],
            available: total,
            invested: 0.0,
            period_return: 0.0,
            profit: 0.0,
            realized_profit: 0.0,
            realized_return: 0.0,
            total,
            cumulative_realized,
        });
    }

    let ledger = BacktestLedger {
        initial_capital: initial,
        rows,
    };
    debug!(
        rows = ledger.len(),
        final_total = ledger.final_total(),
        realized = cumulative_realized,
        benchmark = gating == Gating::AlwaysInvested,
        "replay finished"
    );
    Ok(ledger)
}

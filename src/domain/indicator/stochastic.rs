//! Stochastic Oscillator (%K) and its moving average (%D).
//!
//! %K[p] = (close[p] - low) / (high - low) * 100, where `high`/`low` are the extremes of
//! the adjusted-close window `[p - n, p]` (n + 1 bars). A zero-width window (every close
//! in it equal) yields %K = 50.
//!
//! %D is the simple moving average of the last `d` %K values, divisor `d`.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

const ZERO_WIDTH_K: f64 = 50.0;

pub fn lookback_k(k_period: usize) -> usize {
    k_period
}

pub fn lookback_d(k_period: usize, d_period: usize) -> usize {
    (k_period + d_period).saturating_sub(1)
}

pub fn calculate_stochastic(
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> (IndicatorSeries, IndicatorSeries) {
    let mut k_values = Vec::with_capacity(closes.len().saturating_sub(k_period));

    for p in k_period..closes.len() {
        let window = &closes[p - k_period..=p];
        let high = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().copied().fold(f64::INFINITY, f64::min);

        let k = if high == low {
            ZERO_WIDTH_K
        } else {
            (closes[p] - low) / (high - low) * 100.0
        };
        k_values.push(k);
    }

    let mut d_values = Vec::with_capacity(k_values.len().saturating_sub(d_period));
    if d_period > 0 {
        for i in (d_period - 1)..k_values.len() {
            let sum: f64 = k_values[i + 1 - d_period..=i].iter().sum();
            d_values.push(sum / d_period as f64);
        }
    }

    (
        IndicatorSeries {
            indicator_type: IndicatorType::StochasticK(k_period),
            start: lookback_k(k_period),
            values: k_values,
        },
        IndicatorSeries {
            indicator_type: IndicatorType::StochasticD { k_period, d_period },
            start: lookback_d(k_period, d_period),
            values: d_values,
        },
    )
}

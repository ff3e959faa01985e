//! RSI (Relative Strength Index).
//!
//! For each bar `p >= n` the last `n` single-step percentage changes of adjusted close
//! (ending at bar `p`) are split into gains `u` and losses `d`, each averaged with divisor
//! `n + 1`:
//!
//! RSI = 100 - 100 / (1 + u / d)
//!
//! The `n + 1` divisor cancels in `u / d` and is kept for parity with the reference
//! figures. If `d == 0` (no losing step in the window) RSI is 100.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn lookback(period: usize) -> usize {
    period
}

pub fn calculate_rsi(closes: &[f64], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(closes.len().saturating_sub(period));
    let divisor = (period + 1) as f64;

    for p in period..closes.len() {
        let mut gains = 0.0;
        let mut losses = 0.0;

        for j in (p - period)..p {
            let change = 100.0 * (closes[j + 1] - closes[j]) / closes[j];
            if change > 0.0 {
                gains += change;
            } else if change < 0.0 {
                losses += change.abs();
            }
        }

        let u = gains / divisor;
        let d = losses / divisor;
        let rsi = if d == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + u / d))
        };
        values.push(rsi);
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        start: lookback(period),
        values,
    }
}

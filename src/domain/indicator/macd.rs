//! MACD moving averages.
//!
//! Two averages of adjusted close are produced, one per period; the signal encoder
//! compares them for crossovers. Bar `p` uses the `n` closes strictly before it.
//!
//! `MacdMode::Trailing` (default) is a trailing simple mean over `[p - n, p)`.
//!
//! `MacdMode::Cumulative` keeps one accumulator per average that never drops old
//! values: each bar adds the sum of its `n` preceding closes to the accumulator and the
//! average is `accumulator / (short + 1)`, using the short period for both lines.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacdMode {
    #[default]
    Trailing,
    Cumulative,
}

impl fmt::Display for MacdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacdMode::Trailing => write!(f, "trailing"),
            MacdMode::Cumulative => write!(f, "cumulative"),
        }
    }
}

impl FromStr for MacdMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trailing" => Ok(MacdMode::Trailing),
            "cumulative" => Ok(MacdMode::Cumulative),
            other => Err(format!(
                "unknown macd mode '{other}' (expected trailing or cumulative)"
            )),
        }
    }
}

pub fn lookback(period: usize) -> usize {
    period
}

/// Returns `(short, long)` averages.
pub fn calculate_macd(
    closes: &[f64],
    short: usize,
    long: usize,
    mode: MacdMode,
) -> (IndicatorSeries, IndicatorSeries) {
    let short_values = moving_average(closes, short, short, mode);
    let long_values = moving_average(closes, long, short, mode);

    (
        IndicatorSeries {
            indicator_type: IndicatorType::MacdShort(short),
            start: lookback(short),
            values: short_values,
        },
        IndicatorSeries {
            indicator_type: IndicatorType::MacdLong(long),
            start: lookback(long),
            values: long_values,
        },
    )
}

fn moving_average(closes: &[f64], period: usize, short: usize, mode: MacdMode) -> Vec<f64> {
    let mut values = Vec::with_capacity(closes.len().saturating_sub(period));
    let mut accumulator = 0.0;

    for p in period..closes.len() {
        let window_sum: f64 = closes[p - period..p].iter().sum();
        let value = match mode {
            MacdMode::Trailing => window_sum / period as f64,
            MacdMode::Cumulative => {
                accumulator += window_sum;
                accumulator / (short + 1) as f64
            }
        };
        values.push(value);
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn trailing_hand_computed() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (short, long) = calculate_macd(&closes, 2, 3, MacdMode::Trailing);

        assert_eq!(short.start, 2);
        assert_eq!(short.values, vec![1.5, 2.5, 3.5]);
        assert_eq!(long.start, 3);
        assert_eq!(long.values, vec![2.0, 3.0]);
        assert_eq!(short.value_at(4), Some(3.5));
        assert_eq!(long.value_at(4), Some(3.0));
    }

    #[test]
    fn cumulative_accumulator_never_resets() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (short, long) = calculate_macd(&closes, 2, 3, MacdMode::Cumulative);

        // short: sums 3, 5, 7 accumulate to 3, 8, 15; divisor 3
        assert_abs_diff_eq!(short.values[0], 1.0);
        assert_abs_diff_eq!(short.values[1], 8.0 / 3.0);
        assert_abs_diff_eq!(short.values[2], 5.0);
        // long: sums 6, 9 accumulate to 6, 15; divisor also short + 1
        assert_abs_diff_eq!(long.values[0], 2.0);
        assert_abs_diff_eq!(long.values[1], 5.0);
    }

    #[test]
    fn trailing_constant_prices() {
        let (short, long) = calculate_macd(&[10.0; 30], 12, 26, MacdMode::Trailing);
        assert!(short.values.iter().all(|v| (*v - 10.0).abs() < 1e-12));
        assert!(long.values.iter().all(|v| (*v - 10.0).abs() < 1e-12));
        assert_eq!(long.values.len(), 4);
    }

    #[test]
    fn mode_parses() {
        assert_eq!("trailing".parse::<MacdMode>(), Ok(MacdMode::Trailing));
        assert_eq!(" Cumulative ".parse::<MacdMode>(), Ok(MacdMode::Cumulative));
        assert!("ema".parse::<MacdMode>().is_err());
        assert_eq!(MacdMode::Cumulative.to_string(), "cumulative");
    }
}

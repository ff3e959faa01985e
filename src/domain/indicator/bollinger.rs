//! Bollinger Bands.
//!
//! Over the trailing window `[p - n, p]` (n + 1 bars):
//! - Middle: mean of adjusted close, divisor n + 1
//! - Upper: Middle + k × σ
//! - Lower: Middle - k × σ
//!
//! Where σ is the population standard deviation over the same window (divisor n + 1).

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub middle: IndicatorSeries,
    pub upper: IndicatorSeries,
    pub lower: IndicatorSeries,
}

pub fn lookback(period: usize) -> usize {
    period
}

pub fn calculate_bollinger(closes: &[f64], period: usize, k: f64) -> BollingerBands {
    let capacity = closes.len().saturating_sub(period);
    let mut middle = Vec::with_capacity(capacity);
    let mut upper = Vec::with_capacity(capacity);
    let mut lower = Vec::with_capacity(capacity);
    let divisor = (period + 1) as f64;

    for p in period..closes.len() {
        let window = &closes[p - period..=p];
        let mean = window.iter().sum::<f64>() / divisor;
        let variance = window
            .iter()
            .map(|c| {
                let diff = c - mean;
                diff * diff
            })
            .sum::<f64>()
            / divisor;
        let sigma = variance.sqrt();

        middle.push(mean);
        upper.push(mean + k * sigma);
        lower.push(mean - k * sigma);
    }

    let k_x100 = (k * 100.0).round() as u32;
    let start = lookback(period);
    BollingerBands {
        middle: IndicatorSeries {
            indicator_type: IndicatorType::BollingerMiddle(period),
            start,
            values: middle,
        },
        upper: IndicatorSeries {
            indicator_type: IndicatorType::BollingerUpper { period, k_x100 },
            start,
            values: upper,
        },
        lower: IndicatorSeries {
            indicator_type: IndicatorType::BollingerLower { period, k_x100 },
            start,
            values: lower,
        },
    }
}

//! OBV (On-Balance Volume).

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub const LOOKBACK: usize = 0;

/// Calculate OBV over adjusted close.
///
/// OBV[0] = 0
/// If adj_close[i] > adj_close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If adj_close[i] < adj_close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// Otherwise OBV[i] = OBV[i-1]
///
/// No warmup period.
pub fn calculate_obv(bars: &[PriceBar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv: f64 = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev_close = bars[i - 1].adj_close;
            if bar.adj_close > prev_close {
                obv += bar.volume;
            } else if bar.adj_close < prev_close {
                obv -= bar.volume;
            }
        }
        values.push(obv);
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        start: LOOKBACK,
        values,
    }
}

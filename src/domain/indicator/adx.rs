//! ADX (Average Directional Index).
//!
//! - True range: TR[0] = high - low, TR[p] = max(high - low, |high - close[p-1]|,
//!   |low - close[p-1]|) against the previous adjusted close. A zero TR carries the
//!   previous TR forward.
//! - Directional movement: up = high[p] - high[p-1], down = low[p-1] - low[p];
//!   +DM = up when up > down and up > 0, -DM = down when down > up and down > 0.
//!   DM[0] = 0.
//! - Wilder smoothing: seeded with the sums over bars `0..n` at index `n - 1`, then
//!   `smooth[p] = smooth[p-1] - smooth[p-1] / n + new[p]`.
//! - DI± = 100 × smooth(DM±) / smooth(TR); DX = 100 × |DI+ - DI-| / (DI+ + DI-).
//! - ADX[p] = mean of DX over `[p - n + 1, p]`.
//!
//! A zero smoothed TR gives DI = 0, and DI+ + DI- = 0 gives DX = 0 (no directional
//! movement reads as no trend).
//!
//! Warmup: DX starts at `n - 1`, ADX at `2(n - 1)`.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn lookback(period: usize) -> usize {
    2 * period.saturating_sub(1)
}

pub fn true_ranges(bars: &[PriceBar]) -> Vec<f64> {
    let mut tr_values: Vec<f64> = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            (bar.high - bar.low).abs()
        } else {
            let tr = bar.true_range(bars[i - 1].adj_close);
            if tr == 0.0 { tr_values[i - 1] } else { tr }
        };
        tr_values.push(tr);
    }
    tr_values
}

/// Returns `(+DM, -DM)`.
pub fn directional_movement(bars: &[PriceBar]) -> (Vec<f64>, Vec<f64>) {
    let mut plus = vec![0.0; bars.len()];
    let mut minus = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up > down && up > 0.0 {
            plus[i] = up;
        } else if down > up && down > 0.0 {
            minus[i] = down;
        }
    }
    (plus, minus)
}

/// Wilder smoothing; entries before `period - 1` are zero.
fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut smoothed = vec![0.0; values.len()];
    if period == 0 || values.len() < period {
        return smoothed;
    }
    smoothed[period - 1] = values[..period].iter().sum();
    let n = period as f64;
    for p in period..values.len() {
        let prev = smoothed[p - 1];
        smoothed[p] = prev - prev / n + values[p];
    }
    smoothed
}

pub fn directional_index(smooth_plus: f64, smooth_minus: f64, smooth_tr: f64) -> f64 {
    let (di_plus, di_minus) = if smooth_tr == 0.0 {
        (0.0, 0.0)
    } else {
        (
            100.0 * smooth_plus / smooth_tr,
            100.0 * smooth_minus / smooth_tr,
        )
    };
    let di_sum = di_plus + di_minus;
    if di_sum == 0.0 {
        0.0
    } else {
        100.0 * (di_plus - di_minus).abs() / di_sum
    }
}

pub fn calculate_adx(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let start = lookback(period);
    if period == 0 || bars.len() < period {
        return IndicatorSeries {
            indicator_type: IndicatorType::Adx(period),
            start,
            values: Vec::new(),
        };
    }

    let tr = true_ranges(bars);
    let (dm_plus, dm_minus) = directional_movement(bars);
    let smooth_tr = wilder_smooth(&tr, period);
    let smooth_plus = wilder_smooth(&dm_plus, period);
    let smooth_minus = wilder_smooth(&dm_minus, period);

    let dx: Vec<f64> = (0..bars.len())
        .map(|p| directional_index(smooth_plus[p], smooth_minus[p], smooth_tr[p]))
        .collect();

    let values = (start..bars.len())
        .map(|p| dx[p + 1 - period..=p].iter().sum::<f64>() / period as f64)
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Adx(period),
        start,
        values,
    }
}

//! Technical indicator computation and alignment.
//!
//! Each indicator produces an [`IndicatorSeries`]: the values it can compute plus the
//! price index of its first value (its lookback). [`compute_indicators`] trims every
//! series to the common suffix starting at the largest lookback, so row `k` of the
//! resulting [`IndicatorFrame`] describes price bar `max_lookback + k`.
//!
//! Every indicator reads adjusted close unless its module says otherwise.

pub mod adx;
pub mod bollinger;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod stochastic;

use crate::domain::error::SigtraderError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;
use std::fmt;
use tracing::debug;

pub use macd::MacdMode;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Rsi(usize),
    StochasticK(usize),
    StochasticD { k_period: usize, d_period: usize },
    BollingerMiddle(usize),
    BollingerUpper { period: usize, k_x100: u32 },
    BollingerLower { period: usize, k_x100: u32 },
    MacdShort(usize),
    MacdLong(usize),
    Adx(usize),
    Obv,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::StochasticK(period) => write!(f, "STOCH_K({})", period),
            IndicatorType::StochasticD { k_period, d_period } => {
                write!(f, "STOCH_D({},{})", k_period, d_period)
            }
            IndicatorType::BollingerMiddle(period) => write!(f, "BOLL_MA({})", period),
            IndicatorType::BollingerUpper { period, k_x100 } => {
                write!(f, "BOLL_UP({},{})", period, *k_x100 as f64 / 100.0)
            }
            IndicatorType::BollingerLower { period, k_x100 } => {
                write!(f, "BOLL_DW({},{})", period, *k_x100 as f64 / 100.0)
            }
            IndicatorType::MacdShort(period) => write!(f, "MACD_SHORT({})", period),
            IndicatorType::MacdLong(period) => write!(f, "MACD_LONG({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
        }
    }
}

/// Values of one indicator. `values[k]` belongs to price index `start + k`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub start: usize,
    pub values: Vec<f64>,
}

impl IndicatorSeries {
    pub fn value_at(&self, price_index: usize) -> Option<f64> {
        price_index
            .checked_sub(self.start)
            .and_then(|k| self.values.get(k).copied())
    }

    /// Values from `price_index` onwards.
    fn suffix_from(&self, price_index: usize) -> &[f64] {
        let skip = price_index.saturating_sub(self.start).min(self.values.len());
        &self.values[skip..]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub stochastic_period: usize,
    pub stochastic_ma_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub macd_short: usize,
    pub macd_long: usize,
    pub adx_period: usize,
    pub macd_mode: MacdMode,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 9,
            stochastic_period: 14,
            stochastic_ma_period: 5,
            bollinger_period: 20,
            bollinger_k: 2.0,
            macd_short: 12,
            macd_long: 26,
            adx_period: 14,
            macd_mode: MacdMode::Trailing,
        }
    }
}

impl IndicatorParams {
    fn periods(&self) -> [(&'static str, usize); 7] {
        [
            ("rsi_period", self.rsi_period),
            ("stochastic_period", self.stochastic_period),
            ("stochastic_ma_period", self.stochastic_ma_period),
            ("bollinger_period", self.bollinger_period),
            ("macd_short", self.macd_short),
            ("macd_long", self.macd_long),
            ("adx_period", self.adx_period),
        ]
    }

    /// Price index of the first value of each indicator column.
    pub fn lookbacks(&self) -> [usize; 7] {
        [
            rsi::lookback(self.rsi_period),
            stochastic::lookback_d(self.stochastic_period, self.stochastic_ma_period),
            bollinger::lookback(self.bollinger_period),
            macd::lookback(self.macd_short),
            macd::lookback(self.macd_long),
            adx::lookback(self.adx_period),
            obv::LOOKBACK,
        ]
    }

    pub fn max_lookback(&self) -> usize {
        self.lookbacks().into_iter().max().unwrap_or(0)
    }

    /// Every period must be at least 1 and shorter than the series, and the series must
    /// extend past the longest lookback.
    pub fn validate(&self, code: &str, bars: usize) -> Result<(), SigtraderError> {
        for (name, value) in self.periods() {
            if value == 0 {
                return Err(SigtraderError::InvalidPeriod {
                    name: name.to_string(),
                    value,
                });
            }
            if value >= bars {
                return Err(SigtraderError::InsufficientData {
                    code: code.to_string(),
                    bars,
                    minimum: value + 1,
                });
            }
        }
        let max_lookback = self.max_lookback();
        if max_lookback >= bars {
            return Err(SigtraderError::InsufficientData {
                code: code.to_string(),
                bars,
                minimum: max_lookback + 1,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub adj_close: f64,
    pub rsi: f64,
    pub stochastic_k: f64,
    pub stochastic_d: f64,
    pub bollinger_ma: f64,
    pub bollinger_upper: f64,
    pub bollinger_lower: f64,
    pub macd_short: f64,
    pub macd_long: f64,
    pub adx: f64,
    pub obv: f64,
}

/// Indicator rows aligned 1:1 with the price bars from `start` onwards.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub start: usize,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn compute_indicators(
    series: &PriceSeries,
    params: &IndicatorParams,
) -> Result<IndicatorFrame, SigtraderError> {
    params.validate(series.code(), series.len())?;
    if !params.bollinger_k.is_finite() || params.bollinger_k < 0.0 {
        return Err(SigtraderError::ConfigInvalid {
            section: "indicators".into(),
            key: "bollinger_k".into(),
            reason: "must be a non-negative number".into(),
        });
    }

    let bars = series.bars();
    let closes = series.adj_closes();

    let rsi = rsi::calculate_rsi(&closes, params.rsi_period);
    let (stoch_k, stoch_d) = stochastic::calculate_stochastic(
        &closes,
        params.stochastic_period,
        params.stochastic_ma_period,
    );
    let boll = bollinger::calculate_bollinger(&closes, params.bollinger_period, params.bollinger_k);
    let (macd_short, macd_long) = macd::calculate_macd(
        &closes,
        params.macd_short,
        params.macd_long,
        params.macd_mode,
    );
    let adx = adx::calculate_adx(bars, params.adx_period);
    let obv = obv::calculate_obv(bars);

    let start = params.max_lookback();
    let columns = [
        rsi.suffix_from(start),
        stoch_k.suffix_from(start),
        stoch_d.suffix_from(start),
        boll.middle.suffix_from(start),
        boll.upper.suffix_from(start),
        boll.lower.suffix_from(start),
        macd_short.suffix_from(start),
        macd_long.suffix_from(start),
        adx.suffix_from(start),
        obv.suffix_from(start),
    ];
    let expected = bars.len() - start;
    if let Some(short) = columns.iter().find(|c| c.len() != expected) {
        return Err(SigtraderError::LengthMismatch {
            what: "aligned indicator column".into(),
            expected,
            got: short.len(),
        });
    }

    let rows = (0..expected)
        .map(|k| {
            let bar = &bars[start + k];
            IndicatorRow {
                date: bar.date,
                adj_close: bar.adj_close,
                rsi: columns[0][k],
                stochastic_k: columns[1][k],
                stochastic_d: columns[2][k],
                bollinger_ma: columns[3][k],
                bollinger_upper: columns[4][k],
                bollinger_lower: columns[5][k],
                macd_short: columns[6][k],
                macd_long: columns[7][k],
                adx: columns[8][k],
                obv: columns[9][k],
            }
        })
        .collect::<Vec<_>>();

    debug!(
        code = series.code(),
        bars = bars.len(),
        start,
        rows = rows.len(),
        "indicators aligned"
    );

    Ok(IndicatorFrame { start, rows })
}
